//! WXR document loading.
//!
//! Parses a WordPress WXR (eXtended RSS) export file into a typed
//! [`WxrDocument`] and validates that the export was produced by a
//! supported WordPress version.

mod error;
mod parse;
pub mod serialized;
mod types;
mod validate;

pub use error::WxrError;
pub use types::{AuthorNode, CategoryNode, CategoryRef, ItemNode, PostType, WxrDocument};
pub use validate::extract_version;

use std::path::Path;

/// Parse and validate a WXR export file.
///
/// Fails with [`WxrError::Parse`] on malformed XML and with
/// [`WxrError::Validation`] when the `<generator>` tag is missing or
/// encodes a WordPress version below 6.
pub fn load_document(path: &Path) -> Result<WxrDocument, WxrError> {
    let mut doc = parse_document(path)?;
    doc.version = validate::extract_version(&doc.generator)?;
    Ok(doc)
}

/// Parse a WXR export without the generator gate. Rollback uses this: the
/// file already imported once, re-checking its version would only block
/// cleanup.
pub fn parse_document(path: &Path) -> Result<WxrDocument, WxrError> {
    parse::parse_file(path)
}
