//! Streaming WXR parser.
//!
//! One pass over the XML event stream accumulates partial nodes and commits
//! them into a [`WxrDocument`] when their closing tags arrive. Namespace
//! prefixes for the `wp:`, `content:`, and `excerpt:` extension namespaces
//! are resolved from the `xmlns:*` declarations on the root element, with
//! the conventional prefixes as fallback.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::error::WxrError;
use super::types::{AuthorNode, CategoryNode, CategoryRef, ItemNode, WxrDocument};

const WP_EXPORT_URI: &str = "http://wordpress.org/export/";
const CONTENT_URI: &str = "purl.org/rss/1.0/modules/content";

/// Resolved namespace prefixes for the extension namespaces.
struct NsMap {
    wp: String,
    content: String,
    excerpt: String,
}

impl Default for NsMap {
    fn default() -> Self {
        Self {
            wp: "wp".to_string(),
            content: "content".to_string(),
            excerpt: "excerpt".to_string(),
        }
    }
}

impl NsMap {
    /// Read `xmlns:*` declarations off the root element. Malformed
    /// attributes are skipped; the conventional prefixes stay in place.
    fn bind(&mut self, root: &BytesStart<'_>) {
        for attr in root.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let Some(prefix) = key.strip_prefix("xmlns:") else {
                continue;
            };
            let uri = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => continue,
            };

            if uri.starts_with(WP_EXPORT_URI) && uri.contains("/excerpt") {
                self.excerpt = prefix.to_string();
            } else if uri.starts_with(WP_EXPORT_URI) {
                self.wp = prefix.to_string();
            } else if uri.contains(CONTENT_URI) {
                self.content = prefix.to_string();
            }
        }
    }

    fn matches(prefix: &str, qname: &str, local: &str) -> bool {
        qname
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix(':'))
            == Some(local)
    }

    fn wp(&self, qname: &str, local: &str) -> bool {
        Self::matches(&self.wp, qname, local)
    }

    fn content(&self, qname: &str, local: &str) -> bool {
        Self::matches(&self.content, qname, local)
    }

    fn excerpt(&self, qname: &str, local: &str) -> bool {
        Self::matches(&self.excerpt, qname, local)
    }
}

/// Leaf element currently capturing character data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Generator,
    TermId,
    CategoryParent,
    CatName,
    CategoryNicename,
    MetaKey,
    MetaValue,
    AuthorLogin,
    AuthorEmail,
    AuthorDisplayName,
    Title,
    PostId,
    PostTypeRaw,
    PostName,
    PostDate,
    Status,
    PostAuthor,
    PostParent,
    AttachmentUrl,
    Content,
    Excerpt,
    CategoryLabel,
}

#[derive(Default)]
struct ParseState {
    doc: WxrDocument,
    ns: NsMap,
    category: Option<CategoryNode>,
    author: Option<AuthorNode>,
    item: Option<ItemNode>,
    /// `wp:termmeta` / `wp:postmeta` pair under construction.
    meta: Option<(String, String)>,
    /// Item `<category>` reference under construction.
    category_ref: Option<CategoryRef>,
    field: Option<Field>,
    text: String,
}

impl ParseState {
    /// Map a qualified element name to a leaf field, given the current
    /// container context. Unknown elements return `None` and their text is
    /// ignored.
    fn resolve_field(&self, qname: &str) -> Option<Field> {
        let ns = &self.ns;

        if self.meta.is_some() {
            if ns.wp(qname, "meta_key") {
                return Some(Field::MetaKey);
            }
            if ns.wp(qname, "meta_value") {
                return Some(Field::MetaValue);
            }
            return None;
        }

        if self.category.is_some() {
            return if ns.wp(qname, "term_id") {
                Some(Field::TermId)
            } else if ns.wp(qname, "category_parent") {
                Some(Field::CategoryParent)
            } else if ns.wp(qname, "cat_name") {
                Some(Field::CatName)
            } else if ns.wp(qname, "category_nicename") {
                Some(Field::CategoryNicename)
            } else {
                None
            };
        }

        if self.author.is_some() {
            return if ns.wp(qname, "author_login") {
                Some(Field::AuthorLogin)
            } else if ns.wp(qname, "author_email") {
                Some(Field::AuthorEmail)
            } else if ns.wp(qname, "author_display_name") {
                Some(Field::AuthorDisplayName)
            } else {
                None
            };
        }

        if self.item.is_some() {
            return if qname == "title" {
                Some(Field::Title)
            } else if ns.wp(qname, "post_id") {
                Some(Field::PostId)
            } else if ns.wp(qname, "post_type") {
                Some(Field::PostTypeRaw)
            } else if ns.wp(qname, "post_name") {
                Some(Field::PostName)
            } else if ns.wp(qname, "post_date") {
                Some(Field::PostDate)
            } else if ns.wp(qname, "status") {
                Some(Field::Status)
            } else if ns.wp(qname, "post_author") {
                Some(Field::PostAuthor)
            } else if ns.wp(qname, "post_parent") {
                Some(Field::PostParent)
            } else if ns.wp(qname, "attachment_url") {
                Some(Field::AttachmentUrl)
            } else if ns.content(qname, "encoded") {
                Some(Field::Content)
            } else if ns.excerpt(qname, "encoded") {
                Some(Field::Excerpt)
            } else {
                None
            };
        }

        if qname == "generator" {
            return Some(Field::Generator);
        }

        None
    }

    fn commit_field(&mut self, field: Field) {
        let trimmed = self.text.trim().to_string();
        match field {
            Field::Generator => self.doc.generator = trimmed,
            Field::TermId => set(&mut self.category, |c| c.term_id = trimmed),
            Field::CategoryParent => set(&mut self.category, |c| c.parent_slug = trimmed),
            Field::CatName => set(&mut self.category, |c| c.name = trimmed),
            Field::CategoryNicename => set(&mut self.category, |c| c.slug = trimmed),
            Field::MetaKey => {
                if let Some(meta) = self.meta.as_mut() {
                    meta.0 = trimmed;
                }
            }
            Field::MetaValue => {
                // Meta values keep their raw shape; serialized blobs are
                // whitespace-sensitive.
                if let Some(meta) = self.meta.as_mut() {
                    meta.1 = std::mem::take(&mut self.text);
                }
            }
            Field::AuthorLogin => set(&mut self.author, |a| a.login = trimmed),
            Field::AuthorEmail => set(&mut self.author, |a| a.email = trimmed),
            Field::AuthorDisplayName => set(&mut self.author, |a| a.display_name = trimmed),
            Field::Title => set(&mut self.item, |i| i.title = trimmed),
            Field::PostId => set(&mut self.item, |i| i.post_id = trimmed),
            Field::PostTypeRaw => set(&mut self.item, |i| i.post_type_raw = trimmed),
            Field::PostName => set(&mut self.item, |i| i.post_name = trimmed),
            Field::PostDate => set(&mut self.item, |i| i.post_date = trimmed),
            Field::Status => set(&mut self.item, |i| i.status = trimmed),
            Field::PostAuthor => set(&mut self.item, |i| i.author_login = trimmed),
            Field::PostParent => set(&mut self.item, |i| i.post_parent = trimmed),
            Field::AttachmentUrl => set(&mut self.item, |i| i.attachment_url = trimmed),
            Field::Content => {
                if let Some(item) = self.item.as_mut() {
                    item.content = std::mem::take(&mut self.text);
                }
            }
            Field::Excerpt => {
                if let Some(item) = self.item.as_mut() {
                    item.excerpt = std::mem::take(&mut self.text);
                }
            }
            Field::CategoryLabel => {
                if let Some(cref) = self.category_ref.as_mut() {
                    cref.label = trimmed;
                }
            }
        }
        self.text.clear();
    }
}

fn set<T>(slot: &mut Option<T>, apply: impl FnOnce(&mut T)) {
    if let Some(value) = slot.as_mut() {
        apply(value);
    }
}

fn attr_value(e: &BytesStart<'_>, name: &str) -> String {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name.as_bytes() {
            return attr
                .unescape_value()
                .map(std::borrow::Cow::into_owned)
                .unwrap_or_default();
        }
    }
    String::new()
}

fn category_ref_from(e: &BytesStart<'_>) -> CategoryRef {
    CategoryRef {
        domain: attr_value(e, "domain"),
        nicename: attr_value(e, "nicename"),
        label: String::new(),
    }
}

/// Parse a WXR file from disk.
pub(super) fn parse_file(path: &Path) -> Result<WxrDocument, WxrError> {
    let file = File::open(path)?;
    parse_reader(Reader::from_reader(BufReader::new(file)))
}

/// Parse a WXR document from an in-memory string.
pub(super) fn parse_str(xml: &str) -> Result<WxrDocument, WxrError> {
    parse_reader(Reader::from_reader(xml.as_bytes()))
}

fn parse_reader<R: BufRead>(mut reader: Reader<R>) -> Result<WxrDocument, WxrError> {
    let mut state = ParseState::default();
    let mut buf = Vec::with_capacity(8192);

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) => {
                let qname = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if qname == "rss" {
                    state.ns.bind(e);
                } else if state.item.is_none() && state.ns.wp(&qname, "category") {
                    state.category = Some(CategoryNode::default());
                } else if state.ns.wp(&qname, "author") {
                    state.author = Some(AuthorNode::default());
                } else if qname == "item" {
                    state.item = Some(ItemNode::default());
                } else if state.ns.wp(&qname, "termmeta") || state.ns.wp(&qname, "postmeta") {
                    state.meta = Some((String::new(), String::new()));
                } else if qname == "category" && state.item.is_some() {
                    state.category_ref = Some(category_ref_from(e));
                    state.field = Some(Field::CategoryLabel);
                    state.text.clear();
                } else if let Some(field) = state.resolve_field(&qname) {
                    state.field = Some(field);
                    state.text.clear();
                }
            }
            Event::Empty(ref e) => {
                let qname = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if qname == "category" && state.item.is_some() {
                    if let Some(item) = state.item.as_mut() {
                        item.categories.push(category_ref_from(e));
                    }
                }
            }
            Event::Text(ref e) => {
                if state.field.is_some() {
                    state.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(ref e) => {
                if state.field.is_some() {
                    let bytes = e.to_vec();
                    state.text.push_str(&String::from_utf8_lossy(&bytes));
                }
            }
            Event::End(ref e) => {
                let qname = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if let Some(field) = state.field {
                    if state.resolve_field(&qname) == Some(field)
                        || (field == Field::CategoryLabel && qname == "category")
                    {
                        state.commit_field(field);
                        state.field = None;
                        if field == Field::CategoryLabel {
                            if let (Some(item), Some(cref)) =
                                (state.item.as_mut(), state.category_ref.take())
                            {
                                item.categories.push(cref);
                            }
                        }
                        buf.clear();
                        continue;
                    }
                }

                if state.ns.wp(&qname, "termmeta") {
                    if let (Some(cat), Some(meta)) = (state.category.as_mut(), state.meta.take()) {
                        cat.term_meta.push(meta);
                    }
                } else if state.ns.wp(&qname, "postmeta") {
                    if let (Some(item), Some(meta)) = (state.item.as_mut(), state.meta.take()) {
                        item.postmeta.push(meta);
                    }
                } else if state.item.is_none() && state.ns.wp(&qname, "category") {
                    if let Some(cat) = state.category.take() {
                        state.doc.categories.push(cat);
                    }
                } else if state.ns.wp(&qname, "author") {
                    if let Some(author) = state.author.take() {
                        state.doc.authors.push(author);
                    }
                } else if qname == "item" {
                    if let Some(item) = state.item.take() {
                        state.doc.items.push(item);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(state.doc)
}
