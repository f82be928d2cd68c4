use thiserror::Error;

#[derive(Debug, Error)]
pub enum WxrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid XML: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("Invalid WXR file: {0}")]
    Validation(String),
}
