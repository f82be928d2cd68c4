//! Common test utilities: WXR fixture building and a scripted transport.
#![allow(dead_code)] // Not every test binary uses every helper

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use wxr_import::{AssetResponse, AssetTransport, MediaConfig, MediaFetcher, TransportError};

pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

/// Write a WXR document with the standard namespaces and a WordPress 6.3
/// generator around the given channel body.
pub fn write_wxr(dir: &Path, name: &str, channel_body: &str) -> PathBuf {
    write_wxr_with_generator(dir, name, "https://wordpress.org/?v=6.3", channel_body)
}

pub fn write_wxr_with_generator(
    dir: &Path,
    name: &str,
    generator: &str,
    channel_body: &str,
) -> PathBuf {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
    xmlns:content="http://purl.org/rss/1.0/modules/content/"
    xmlns:excerpt="http://wordpress.org/export/1.2/excerpt/"
    xmlns:wp="http://wordpress.org/export/1.2/">
  <channel>
    <title>Fixture Site</title>
    <generator>{generator}</generator>
{channel_body}
  </channel>
</rss>"#
    );
    let path = dir.join(name);
    std::fs::write(&path, xml).expect("Failed to write fixture");
    path
}

pub fn category(term_id: &str, slug: &str, name: &str, parent_slug: &str) -> String {
    format!(
        r#"    <wp:category>
      <wp:term_id>{term_id}</wp:term_id>
      <wp:category_nicename><![CDATA[{slug}]]></wp:category_nicename>
      <wp:category_parent><![CDATA[{parent_slug}]]></wp:category_parent>
      <wp:cat_name><![CDATA[{name}]]></wp:cat_name>
    </wp:category>
"#
    )
}

pub fn author(login: &str, email: &str, display_name: &str) -> String {
    format!(
        r#"    <wp:author>
      <wp:author_login><![CDATA[{login}]]></wp:author_login>
      <wp:author_email><![CDATA[{email}]]></wp:author_email>
      <wp:author_display_name><![CDATA[{display_name}]]></wp:author_display_name>
    </wp:author>
"#
    )
}

pub struct ItemSpec<'a> {
    pub post_id: &'a str,
    pub post_type: &'a str,
    pub title: &'a str,
    pub post_name: &'a str,
    pub status: &'a str,
    pub author: &'a str,
    pub post_parent: &'a str,
    pub content: &'a str,
    /// `(domain, nicename, label)` triples.
    pub category_refs: &'a [(&'a str, &'a str, &'a str)],
    /// Raw postmeta pairs.
    pub postmeta: &'a [(&'a str, &'a str)],
}

impl Default for ItemSpec<'_> {
    fn default() -> Self {
        ItemSpec {
            post_id: "1",
            post_type: "post",
            title: "Untitled",
            post_name: "untitled",
            status: "publish",
            author: "admin",
            post_parent: "0",
            content: "",
            category_refs: &[],
            postmeta: &[],
        }
    }
}

pub fn item(spec: &ItemSpec<'_>) -> String {
    use std::fmt::Write;

    let mut body = String::new();
    let _ = writeln!(body, "    <item>");
    let _ = writeln!(body, "      <title><![CDATA[{}]]></title>", spec.title);
    for (domain, nicename, label) in spec.category_refs {
        let _ = writeln!(
            body,
            "      <category domain=\"{domain}\" nicename=\"{nicename}\"><![CDATA[{label}]]></category>"
        );
    }
    let _ = writeln!(
        body,
        "      <content:encoded><![CDATA[{}]]></content:encoded>",
        spec.content
    );
    let _ = writeln!(body, "      <wp:post_id>{}</wp:post_id>", spec.post_id);
    let _ = writeln!(
        body,
        "      <wp:post_date><![CDATA[2023-05-01 10:00:00]]></wp:post_date>"
    );
    let _ = writeln!(
        body,
        "      <wp:post_name><![CDATA[{}]]></wp:post_name>",
        spec.post_name
    );
    let _ = writeln!(body, "      <wp:status><![CDATA[{}]]></wp:status>", spec.status);
    let _ = writeln!(
        body,
        "      <wp:post_author><![CDATA[{}]]></wp:post_author>",
        spec.author
    );
    let _ = writeln!(
        body,
        "      <wp:post_parent>{}</wp:post_parent>",
        spec.post_parent
    );
    let _ = writeln!(
        body,
        "      <wp:post_type><![CDATA[{}]]></wp:post_type>",
        spec.post_type
    );
    for (key, value) in spec.postmeta {
        let _ = writeln!(body, "      <wp:postmeta>");
        let _ = writeln!(body, "        <wp:meta_key><![CDATA[{key}]]></wp:meta_key>");
        let _ = writeln!(
            body,
            "        <wp:meta_value><![CDATA[{value}]]></wp:meta_value>"
        );
        let _ = writeln!(body, "      </wp:postmeta>");
    }
    let _ = writeln!(body, "    </item>");
    body
}

pub fn attachment(post_id: &str, url: &str) -> String {
    format!(
        r#"    <item>
      <title><![CDATA[attachment {post_id}]]></title>
      <wp:post_id>{post_id}</wp:post_id>
      <wp:post_type><![CDATA[attachment]]></wp:post_type>
      <wp:attachment_url><![CDATA[{url}]]></wp:attachment_url>
    </item>
"#
    )
}

/// Transport returning scripted responses in order; anything past the
/// script fails.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<AssetResponse>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<AssetResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }

    pub fn jpeg_ok() -> AssetResponse {
        AssetResponse {
            status: 200,
            content_type: "image/jpeg".to_string(),
            body: JPEG_BYTES.to_vec(),
        }
    }
}

#[async_trait]
impl AssetTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<AssetResponse, TransportError> {
        self.responses
            .lock()
            .expect("transport mutex poisoned")
            .pop_front()
            .ok_or_else(|| TransportError::Other(format!("no scripted response for {url}")))
    }
}

/// A media fetcher writing under `dir` and never touching the network
/// beyond the scripted responses.
pub fn scripted_fetcher(dir: &Path, responses: Vec<AssetResponse>) -> MediaFetcher {
    let config = MediaConfig {
        base_dir: dir.join("media"),
        base_url: "assets/images/wpi".to_string(),
        ..MediaConfig::default()
    };
    MediaFetcher::new(config, Box::new(ScriptedTransport::new(responses)))
}
