//! Small shared helpers.

/// Slugify a name (ASCII transliteration, lowercase, hyphenated).
///
/// Falls back to the raw input when transliteration leaves nothing usable,
/// so exotic keys still get a stable identity.
pub fn slugify_or_raw(raw: &str) -> String {
    let s = slug::slugify(raw);
    if s.is_empty() {
        raw.to_string()
    } else {
        s
    }
}

/// Uppercase the first character of a string.
pub fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Default caption for a grouped field: the dehyphenated base name with the
/// first letter uppercased.
pub fn caption_from_name(name: &str) -> String {
    ucfirst(&name.replace('-', " "))
}
