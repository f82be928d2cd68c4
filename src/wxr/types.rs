/// A fully parsed WXR export: channel metadata plus every category, author,
/// and item node, in document order.
#[derive(Debug, Default)]
pub struct WxrDocument {
    /// Raw `<channel><generator>` text.
    pub generator: String,
    /// Version token extracted during validation (e.g. `"6.3"`).
    pub version: String,
    pub categories: Vec<CategoryNode>,
    pub authors: Vec<AuthorNode>,
    pub items: Vec<ItemNode>,
}

impl WxrDocument {
    /// Number of attachment items carrying a source URL.
    #[must_use]
    pub fn attachment_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.post_type() == PostType::Attachment && !i.attachment_url.is_empty())
            .count()
    }
}

/// A `wp:category` node from the channel.
#[derive(Debug, Default, Clone)]
pub struct CategoryNode {
    /// WordPress term id (source-local, only valid within this document).
    pub term_id: String,
    /// Parent reference — a slug, not an id.
    pub parent_slug: String,
    pub name: String,
    pub slug: String,
    /// Raw `wp:termmeta` key/value pairs.
    pub term_meta: Vec<(String, String)>,
}

/// A `wp:author` node from the channel.
#[derive(Debug, Default, Clone)]
pub struct AuthorNode {
    pub login: String,
    pub email: String,
    pub display_name: String,
}

/// A `<category>` reference on an item (taxonomy membership).
#[derive(Debug, Default, Clone)]
pub struct CategoryRef {
    pub domain: String,
    pub nicename: String,
    /// Human-readable term label (element text).
    pub label: String,
}

/// Post type of an item, as this importer distinguishes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostType {
    Post,
    Page,
    Attachment,
    Other,
}

/// An `<item>` node from the channel.
#[derive(Debug, Default, Clone)]
pub struct ItemNode {
    pub post_id: String,
    /// Raw `wp:post_type` text.
    pub post_type_raw: String,
    pub title: String,
    /// URL slug (`wp:post_name`); may be empty.
    pub post_name: String,
    /// WordPress-formatted publish date (`%Y-%m-%d %H:%M:%S`).
    pub post_date: String,
    /// `publish`, `draft`, ...
    pub status: String,
    pub author_login: String,
    /// Parent item id; `"0"` or empty for root items.
    pub post_parent: String,
    /// Source URL for attachment items.
    pub attachment_url: String,
    /// `content:encoded` body HTML.
    pub content: String,
    /// `excerpt:encoded` intro HTML.
    pub excerpt: String,
    pub categories: Vec<CategoryRef>,
    /// Raw `wp:postmeta` key/value pairs.
    pub postmeta: Vec<(String, String)>,
}

impl ItemNode {
    #[must_use]
    pub fn post_type(&self) -> PostType {
        match self.post_type_raw.as_str() {
            "post" => PostType::Post,
            "page" => PostType::Page,
            "attachment" => PostType::Attachment,
            _ => PostType::Other,
        }
    }

    /// Look up a postmeta value by key.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.postmeta
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Comma-joined `post_tag` labels, or `None` when the item has no tags.
    #[must_use]
    pub fn tags(&self) -> Option<String> {
        let tags: Vec<&str> = self
            .categories
            .iter()
            .filter(|c| c.domain == "post_tag")
            .map(|c| c.label.as_str())
            .collect();
        if tags.is_empty() {
            None
        } else {
            Some(tags.join(","))
        }
    }
}
