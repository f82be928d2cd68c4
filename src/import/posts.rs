//! Post and page import.
//!
//! One pass splits the item stream into the attachment index and the
//! post/page worklist. Each worklist item becomes a resource with its
//! inline images localized, its metadata materialized as TVs, and its
//! featured image resolved through the attachment index. A second pass
//! fixes up page parent links once every id is known.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use indicatif::ProgressBar;
use regex::Regex;
use tracing::info;

use super::media::MediaFetcher;
use super::registry::{EntityKind, TvRegistry, FEATURED_IMAGE_TV, TAGS_TV};
use crate::store::{
    ContentStore, NewResource, ResourceId, StoreError, TemplateId, TvStore, UserId, SUPERUSER_ID,
};
use crate::utils::slugify_or_raw;
use crate::wxr::{ItemNode, PostType, WxrDocument};

/// Author id used when an item's login is not in the user map.
const FALLBACK_AUTHOR_ID: UserId = SUPERUSER_ID;

const THUMBNAIL_META_KEY: &str = "_thumbnail_id";

#[expect(
    clippy::expect_used,
    reason = "Regex literal is compile-time constant and cannot fail"
)]
static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\s+[^>]*src=["']([^"']+)["'][^>]*>"#)
        .expect("IMG_SRC is a valid regex literal")
});

/// Result of the post stage.
#[derive(Debug, Default)]
pub struct PostOutcome {
    /// WordPress post id → resource id, for every item that saved fully.
    pub map: HashMap<String, ResourceId>,
    pub created: usize,
    /// Attachment items indexed during the split pass.
    pub attachments: usize,
    /// Non-fatal per-item failures.
    pub errors: Vec<String>,
}

/// Import all posts and pages.
pub async fn import(
    doc: &WxrDocument,
    content: &dyn ContentStore,
    registry: &mut TvRegistry<'_>,
    media: &mut MediaFetcher,
    user_map: &HashMap<String, UserId>,
) -> PostOutcome {
    let mut outcome = PostOutcome::default();

    // Split attachments from the worklist
    let mut attachments: HashMap<&str, &str> = HashMap::new();
    let mut worklist: Vec<&ItemNode> = Vec::new();
    for item in &doc.items {
        match item.post_type() {
            PostType::Attachment => {
                if !item.attachment_url.is_empty() {
                    attachments.insert(&item.post_id, &item.attachment_url);
                }
            }
            PostType::Post | PostType::Page => worklist.push(item),
            PostType::Other => {}
        }
    }
    outcome.attachments = attachments.len();
    info!(
        "Importing {} posts/pages ({} attachments indexed)",
        worklist.len(),
        outcome.attachments
    );

    let bar = ProgressBar::new(worklist.len() as u64);
    for item in &worklist {
        match create_resource(item, content, registry, media, user_map, &attachments).await {
            Ok(id) => {
                outcome.map.insert(item.post_id.clone(), id);
                outcome.created += 1;
            }
            Err(e) => {
                outcome
                    .errors
                    .push(format!("Error importing post {}: {e}", item.post_id));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    // Second pass: page hierarchy. Both ends must have imported.
    for item in &worklist {
        if item.post_type() != PostType::Page {
            continue;
        }
        if item.post_parent.is_empty() || item.post_parent == "0" {
            continue;
        }
        if let (Some(child), Some(parent)) = (
            outcome.map.get(&item.post_id),
            outcome.map.get(&item.post_parent),
        ) {
            if let Err(e) = content.set_parent(*child, *parent).await {
                outcome.errors.push(format!(
                    "Error linking page {} to parent: {e}",
                    item.post_id
                ));
            }
        }
    }

    info!("Posts imported ({} created)", outcome.created);
    outcome
}

/// Build and persist one resource, then attach its metadata and featured
/// image. A failure anywhere makes the whole item count as failed, though
/// an already-created resource row is left in place (rollback by alias
/// picks it up).
async fn create_resource(
    item: &ItemNode,
    content: &dyn ContentStore,
    registry: &mut TvRegistry<'_>,
    media: &mut MediaFetcher,
    user_map: &HashMap<String, UserId>,
    attachments: &HashMap<&str, &str>,
) -> Result<ResourceId, StoreError> {
    let alias = if item.post_name.is_empty() {
        slugify_or_raw(&item.title)
    } else {
        item.post_name.clone()
    };

    let body = rewrite_images(media, &item.content).await;
    let intro = rewrite_images(media, &item.excerpt).await;

    let published = item.status == "publish";
    let created_at = parse_wp_date(&item.post_date);
    let created_by = user_map
        .get(&item.author_login)
        .copied()
        .unwrap_or(FALLBACK_AUTHOR_ID);

    // Posts nest under their first resolvable category; pages never do
    let mut parent: ResourceId = 0;
    if item.post_type() == PostType::Post {
        for category in &item.categories {
            if category.domain != "category" {
                continue;
            }
            if let Some(folder) = content.find_by_alias(&category.nicename).await? {
                parent = folder.id;
                break;
            }
        }
    }

    let kind = if item.post_type() == PostType::Page {
        EntityKind::Page
    } else {
        EntityKind::Post
    };
    let template_id = registry.template_id(kind).await?;

    let resource = content
        .create(NewResource {
            title: item.title.clone(),
            alias,
            parent,
            template: template_id,
            published,
            is_container: false,
            intro,
            body,
            created_at,
            created_by,
        })
        .await?;

    if parent > 0 {
        if let Some(parent_resource) = content.get(parent).await? {
            if !parent_resource.is_container {
                content.set_container(parent, true).await?;
            }
        }
    }

    registry
        .process_metadata(resource.id, item, template_id)
        .await?;
    attach_featured_image(item, resource.id, template_id, registry, media, attachments).await?;

    Ok(resource.id)
}

/// Resolve `_thumbnail_id` through the attachment index, localize the
/// file, and store the reference in the shared image TV.
async fn attach_featured_image(
    item: &ItemNode,
    resource_id: ResourceId,
    template_id: TemplateId,
    registry: &TvRegistry<'_>,
    media: &mut MediaFetcher,
    attachments: &HashMap<&str, &str>,
) -> Result<(), StoreError> {
    let Some(url) = item
        .meta(THUMBNAIL_META_KEY)
        .and_then(|thumb_id| attachments.get(thumb_id))
    else {
        return Ok(());
    };

    let local = media.fetch(url).await;
    registry
        .upsert_featured_image(resource_id, template_id, &local)
        .await
}

/// Rewrite every unique absolute `<img src>` URL through the fetcher.
async fn rewrite_images(media: &mut MediaFetcher, html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let mut urls: Vec<String> = Vec::new();
    for caps in IMG_SRC.captures_iter(html) {
        if let Some(m) = caps.get(1) {
            if !urls.iter().any(|u| u == m.as_str()) {
                urls.push(m.as_str().to_string());
            }
        }
    }

    let mut result = html.to_string();
    for source_url in urls {
        if !source_url.starts_with("http") {
            continue;
        }
        let local = media.fetch(&source_url).await;
        if local != source_url {
            result = result.replace(&source_url, &local);
        }
    }
    result
}

/// Parse a WordPress `post_date` string, falling back to now.
fn parse_wp_date(raw: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map_or_else(|_| Utc::now(), |naive| naive.and_utc())
}

/// Delete every post/page resource by alias (TV values first), drop each
/// encountered TV definition once, and finally the shared image TV.
pub async fn rollback(
    doc: &WxrDocument,
    content: &dyn ContentStore,
    tv: &dyn TvStore,
    registry: &TvRegistry<'_>,
) -> super::RollbackStage {
    let mut stage = super::RollbackStage::default();

    let worklist: Vec<&ItemNode> = doc
        .items
        .iter()
        .filter(|i| matches!(i.post_type(), PostType::Post | PostType::Page))
        .collect();
    info!("Deleting {} posts/pages", worklist.len());

    let mut seen_tv_keys: HashSet<String> = HashSet::new();

    let bar = ProgressBar::new(worklist.len() as u64);
    for item in &worklist {
        if let Err(e) = rollback_item(item, content, tv, registry, &mut seen_tv_keys).await {
            stage
                .errors
                .push(format!("Error deleting post {}: {e}", item.post_id));
        } else {
            stage.deleted += 1;
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    // The shared image TV goes regardless of whether any item used it
    if let Err(e) = registry.delete_tv(FEATURED_IMAGE_TV).await {
        stage
            .errors
            .push(format!("Error deleting image TV: {e}"));
    }

    stage
}

async fn rollback_item(
    item: &ItemNode,
    content: &dyn ContentStore,
    tv: &dyn TvStore,
    registry: &TvRegistry<'_>,
    seen_tv_keys: &mut HashSet<String>,
) -> Result<(), StoreError> {
    let alias = if item.post_name.is_empty() {
        slugify_or_raw(&item.title)
    } else {
        item.post_name.clone()
    };

    if let Some(resource) = content.find_by_alias_any(&alias).await? {
        tv.delete_values(resource.id).await?;
        content.delete(resource.id).await?;
    }

    for (key, _) in &item.postmeta {
        if key.starts_with('_') {
            continue;
        }
        if seen_tv_keys.insert(key.clone()) {
            registry.delete_tv(key).await?;
        }
    }

    if item.tags().is_some() && seen_tv_keys.insert(TAGS_TV.to_string()) {
        registry.delete_tv(TAGS_TV).await?;
    }

    Ok(())
}
