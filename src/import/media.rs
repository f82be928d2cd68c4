//! Remote asset fetching and local caching.
//!
//! [`MediaFetcher::fetch`] never fails: any transport or validation
//! problem is recorded in the error list and the original URL is returned
//! unchanged, so stored content always keeps a usable reference. Transport
//! sits behind the [`AssetTransport`] trait; [`HttpTransport`] is the real
//! client, tests script their own.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::utils::slugify_or_raw;

/// Browser user-agent sent with asset requests. Some hosts refuse
/// anonymous download clients outright.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Per-request timeout.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Courtesy delay between requests.
const FETCH_DELAY: Duration = Duration::from_millis(200);

#[expect(
    clippy::expect_used,
    reason = "Regex literal is compile-time constant and cannot fail"
)]
static URL_DATE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(\d{4})/(\d{2})/").expect("URL_DATE_PATH is a valid regex literal")
});

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Response of a single asset GET, after any redirects: the final status,
/// the declared content type, and the body bytes.
pub struct AssetResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Minimal HTTP capability the fetcher needs.
#[async_trait]
pub trait AssetTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<AssetResponse, TransportError>;
}

/// Real transport over a reqwest client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<AssetResponse, TransportError> {
        // Redirects are followed by the client; the inspected status is the
        // final one of the chain.
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.bytes().await?.to_vec();
        Ok(AssetResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Fetcher configuration.
pub struct MediaConfig {
    /// Directory downloaded files are written under.
    pub base_dir: PathBuf,
    /// URL prefix stored content references downloads through.
    pub base_url: String,
    pub allow_pdf: bool,
    pub download_enabled: bool,
    /// Re-download files that already exist locally.
    pub overwrite_existing: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("assets/images/wpi"),
            base_url: "assets/images/wpi".to_string(),
            allow_pdf: true,
            download_enabled: true,
            overwrite_existing: false,
        }
    }
}

/// Downloads remote assets and rewrites references to local paths.
pub struct MediaFetcher {
    config: MediaConfig,
    transport: Box<dyn AssetTransport>,
    errors: Vec<String>,
}

impl MediaFetcher {
    #[must_use]
    pub fn new(config: MediaConfig, transport: Box<dyn AssetTransport>) -> Self {
        Self {
            config,
            transport,
            errors: Vec::new(),
        }
    }

    pub fn set_allow_pdf(&mut self, allow: bool) {
        self.config.allow_pdf = allow;
    }

    pub fn set_download_enabled(&mut self, enabled: bool) {
        self.config.download_enabled = enabled;
    }

    pub fn set_overwrite_existing(&mut self, overwrite: bool) {
        self.config.overwrite_existing = overwrite;
    }

    /// Accumulated error messages, in occurrence order.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Drain the accumulated error messages for end-of-run reporting.
    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }

    /// Fetch a remote asset and return the local reference, or the input
    /// URL unchanged on any failure.
    pub async fn fetch(&mut self, source_url: &str) -> String {
        if !self.config.download_enabled {
            return source_url.to_string();
        }

        tokio::time::sleep(FETCH_DELAY).await;

        let (stem, known_ext) = filename_parts(source_url);
        let date_path = date_path(source_url);
        let dir = self.config.base_dir.join(&date_path);

        // Known extension: a cached file short-circuits the network call
        if let Some(ext) = &known_ext {
            if !self.config.overwrite_existing && dir.join(format!("{stem}.{ext}")).exists() {
                return self.local_ref(&date_path, &stem, ext);
            }
        }

        let response = match self.transport.get(source_url).await {
            Ok(response) => response,
            Err(e) => {
                return self.fail(format!("Failed to open URL {source_url}: {e}"), source_url)
            }
        };

        if response.status != 200 {
            return self.fail(
                format!("HTTP error for {source_url}: status {}", response.status),
                source_url,
            );
        }

        let content_type = response
            .content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        let is_pdf_type = content_type.starts_with("application/pdf");
        let is_image_type = content_type.starts_with("image/");

        if !is_image_type && !(is_pdf_type && self.config.allow_pdf) {
            let message = if is_pdf_type {
                format!("Skipped PDF {source_url} (PDF downloads disabled)")
            } else {
                format!("Invalid content type for {source_url}: {content_type}")
            };
            return self.fail(message, source_url);
        }

        // Deep validation: never trust the declared type alone
        let is_pdf_body = response.body.starts_with(b"%PDF");
        if !(self.config.allow_pdf && is_pdf_body) && sniff_image(&response.body).is_none() {
            return self.fail(
                format!("Invalid image data for {source_url}"),
                source_url,
            );
        }

        let ext =
            known_ext.unwrap_or_else(|| extension_for_mime(&content_type).to_string());

        if let Err(e) = std::fs::create_dir_all(&dir) {
            return self.fail(
                format!("Cannot create {}: {e}", dir.display()),
                source_url,
            );
        }

        // The extension may have changed since the pre-request check
        let local_path = dir.join(format!("{stem}.{ext}"));
        if local_path.exists() && !self.config.overwrite_existing {
            return self.local_ref(&date_path, &stem, &ext);
        }

        if let Err(e) = std::fs::write(&local_path, &response.body) {
            return self.fail(
                format!("Cannot write {}: {e}", local_path.display()),
                source_url,
            );
        }

        self.local_ref(&date_path, &stem, &ext)
    }

    fn local_ref(&self, date_path: &str, stem: &str, ext: &str) -> String {
        format!("{}/{date_path}/{stem}.{ext}", self.config.base_url)
    }

    fn fail(&mut self, message: String, source_url: &str) -> String {
        warn!("{message}");
        self.errors.push(message);
        source_url.to_string()
    }
}

/// Derive the (slugified) filename stem and the extension from a URL path.
fn filename_parts(source_url: &str) -> (String, Option<String>) {
    let path = Url::parse(source_url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| source_url.to_string());
    let file = Path::new(&path);

    let stem = file
        .file_stem()
        .map_or_else(|| "image".to_string(), |s| s.to_string_lossy().into_owned());
    let ext = file
        .extension()
        .map(|s| s.to_string_lossy().into_owned());

    (slugify_or_raw(&stem), ext)
}

/// `YYYY/MM` storage subpath: taken from the URL when it carries an
/// upload-date segment, otherwise the current date.
fn date_path(source_url: &str) -> String {
    if let Some(caps) = URL_DATE_PATH.captures(source_url) {
        let year = caps.get(1).map_or("", |m| m.as_str());
        let month = caps.get(2).map_or("", |m| m.as_str());
        return format!("{year}/{month}");
    }
    chrono::Local::now().format("%Y/%m").to_string()
}

/// Map a declared MIME type to a file extension.
fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "application/pdf" => "pdf",
        // image/jpeg, image/pjpeg, and anything unmapped
        _ => "jpg",
    }
}

/// Magic-byte check for the image formats worth accepting.
fn sniff_image(body: &[u8]) -> Option<&'static str> {
    if body.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if body.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if body.starts_with(b"GIF87a") || body.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if body.starts_with(b"RIFF") && body.get(8..12).is_some_and(|m| m == b"WEBP") {
        Some("image/webp")
    } else if body.starts_with(b"BM") {
        Some("image/bmp")
    } else {
        None
    }
}

#[cfg(test)]
#[path = "media_tests.rs"]
mod tests;
