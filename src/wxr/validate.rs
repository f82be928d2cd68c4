//! Generator tag validation.
//!
//! WXR exports carry a `<generator>` line identifying the producing
//! WordPress install. Anything below WordPress 6 is rejected outright.

use std::sync::LazyLock;

use regex::Regex;

use super::error::WxrError;

/// Minimum supported WordPress major version.
const MIN_MAJOR_VERSION: u32 = 6;

#[expect(
    clippy::expect_used,
    reason = "Regex literal is compile-time constant and cannot fail"
)]
static VERSION_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v=([0-9]+\.?[0-9]*)").expect("VERSION_QUERY is a valid regex literal")
});

#[expect(
    clippy::expect_used,
    reason = "Regex literal is compile-time constant and cannot fail"
)]
static VERSION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)WordPress/?\s*([0-9]+\.?[0-9]*)")
        .expect("VERSION_NAME is a valid regex literal")
});

/// Extract the WordPress version token from a generator string.
///
/// Typical shapes: `https://wordpress.org/?v=6.3` and `WordPress/6.0`.
/// Returns the version token (e.g. `"6.3"`) when the major version is
/// supported.
pub fn extract_version(generator: &str) -> Result<String, WxrError> {
    if generator.is_empty() {
        return Err(WxrError::Validation("<generator> tag missing".to_string()));
    }

    let version = VERSION_QUERY
        .captures(generator)
        .or_else(|| VERSION_NAME.captures(generator))
        .and_then(|c| c.get(1))
        .map_or_else(|| "0".to_string(), |m| m.as_str().to_string());

    let major: u32 = version
        .split('.')
        .next()
        .and_then(|m| m.parse().ok())
        .unwrap_or(0);

    if major < MIN_MAJOR_VERSION {
        return Err(WxrError::Validation(format!(
            "unsupported WordPress version ({version}); this tool requires WordPress {MIN_MAJOR_VERSION}.0 or higher"
        )));
    }

    Ok(version)
}
