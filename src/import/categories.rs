//! Category import.
//!
//! Two passes over the `wp:category` nodes: materialize every category as
//! a root-level resource first (parents may appear after their children in
//! document order), then resolve the slug-based parent links and flip the
//! container flag on parents that gained a child.

use std::collections::HashMap;

use chrono::Utc;
use indicatif::ProgressBar;
use tracing::{debug, info};

use super::registry::{EntityKind, TvRegistry};
use crate::store::{ContentStore, NewResource, ResourceId, StoreError, TemplateId, SUPERUSER_ID};
use crate::wxr::{serialized, CategoryNode, WxrDocument};

/// Term-meta key the SEO plugin stores category descriptions under.
const DESCRIPTION_META_KEY: &str = "autodescription-term-settings";

/// Result of the category stage.
#[derive(Debug, Default)]
pub struct CategoryOutcome {
    /// WordPress term id → resource id, for every category that saved.
    pub map: HashMap<String, ResourceId>,
    pub created: usize,
    pub reused: usize,
    /// Non-fatal per-node failures.
    pub errors: Vec<String>,
}

/// Working record for one category while the batch is in flight.
struct CategoryRecord {
    wp_id: String,
    parent_slug: String,
    name: String,
    slug: String,
    description: String,
    cms_id: ResourceId,
}

/// Decode the category description from the SEO-plugin term-meta blob.
///
/// The blob is JSON in recent exports and a legacy serialized array in
/// older ones; both failures together mean "no description", never an
/// error.
fn decode_description(node: &CategoryNode) -> String {
    for (key, raw) in &node.term_meta {
        if key != DESCRIPTION_META_KEY {
            continue;
        }

        if let Ok(json) = serde_json::from_str::<serde_json::Value>(raw) {
            if let Some(description) = json.get("description").and_then(|d| d.as_str()) {
                return description.to_string();
            }
            continue;
        }

        if let Some(decoded) = serialized::decode(raw) {
            if let Some(description) = decoded.get("description").and_then(serialized::Value::as_str)
            {
                return description.to_string();
            }
        }
    }
    String::new()
}

/// Import all categories, returning the term-id → resource-id map for the
/// post stage.
pub async fn import(
    doc: &WxrDocument,
    content: &dyn ContentStore,
    registry: &mut TvRegistry<'_>,
) -> CategoryOutcome {
    info!("Importing {} categories", doc.categories.len());
    let mut outcome = CategoryOutcome::default();

    // Pass 0: collect
    let mut records: Vec<CategoryRecord> = doc
        .categories
        .iter()
        .map(|node| CategoryRecord {
            wp_id: node.term_id.clone(),
            parent_slug: node.parent_slug.clone(),
            name: node.name.clone(),
            slug: node.slug.clone(),
            description: decode_description(node),
            cms_id: 0,
        })
        .collect();

    let template_id = match registry.template_id(EntityKind::Category).await {
        Ok(id) => id,
        Err(e) => {
            outcome
                .errors
                .push(format!("Cannot prepare category template: {e}"));
            return outcome;
        }
    };

    // Pass 1: create or reuse resources, all rooted at 0
    let bar = ProgressBar::new(records.len() as u64);
    for record in &mut records {
        match materialize(content, record, template_id).await {
            Ok(reused) => {
                if reused {
                    outcome.reused += 1;
                } else {
                    outcome.created += 1;
                }
            }
            Err(e) => {
                outcome
                    .errors
                    .push(format!("Error saving category {}: {e}", record.name));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    // Pass 2: resolve parent links through the slug index
    let mut slug_to_wp: HashMap<&str, &str> = HashMap::new();
    for record in &records {
        slug_to_wp.insert(record.slug.as_str(), record.wp_id.as_str());
    }
    let mut by_wp: HashMap<&str, ResourceId> = HashMap::new();
    for record in &records {
        by_wp.insert(record.wp_id.as_str(), record.cms_id);
    }

    for record in &records {
        if record.parent_slug.is_empty() || record.cms_id == 0 {
            continue;
        }
        let Some(parent_cms) = slug_to_wp
            .get(record.parent_slug.as_str())
            .and_then(|wp| by_wp.get(wp))
            .copied()
            .filter(|id| *id != 0)
        else {
            continue;
        };

        // Parent-link failures never fail the batch
        if let Err(e) = link_parent(content, record.cms_id, parent_cms).await {
            debug!(
                "Skipping parent link for category {}: {e}",
                record.slug
            );
        }
    }

    for record in records {
        if record.cms_id != 0 {
            outcome.map.insert(record.wp_id, record.cms_id);
        }
    }

    info!(
        "Categories imported ({} created, {} reused)",
        outcome.created, outcome.reused
    );
    outcome
}

/// Create the resource for a category, or adopt an existing one with the
/// same alias. Existing resources only get the template backfilled when
/// they have none.
async fn materialize(
    content: &dyn ContentStore,
    record: &mut CategoryRecord,
    template_id: TemplateId,
) -> Result<bool, StoreError> {
    if let Some(existing) = content.find_by_alias(&record.slug).await? {
        record.cms_id = existing.id;
        if existing.template == 0 {
            content.set_template(existing.id, template_id).await?;
        }
        return Ok(true);
    }

    let created = content
        .create(NewResource {
            title: record.name.clone(),
            alias: record.slug.clone(),
            parent: 0,
            template: template_id,
            published: true,
            is_container: false,
            intro: record.description.clone(),
            body: String::new(),
            created_at: Utc::now(),
            created_by: SUPERUSER_ID,
        })
        .await?;
    record.cms_id = created.id;
    Ok(false)
}

async fn link_parent(
    content: &dyn ContentStore,
    child: ResourceId,
    parent: ResourceId,
) -> Result<(), StoreError> {
    let Some(resource) = content.get(child).await? else {
        return Ok(());
    };
    if resource.parent == parent {
        return Ok(());
    }

    content.set_parent(child, parent).await?;

    if let Some(parent_resource) = content.get(parent).await? {
        if !parent_resource.is_container {
            content.set_container(parent, true).await?;
        }
    }
    Ok(())
}

/// Delete every resource matching a category slug from the document,
/// trashed ones included.
pub async fn rollback(doc: &WxrDocument, content: &dyn ContentStore) -> super::RollbackStage {
    info!("Deleting {} categories", doc.categories.len());
    let mut stage = super::RollbackStage::default();

    let bar = ProgressBar::new(doc.categories.len() as u64);
    for node in &doc.categories {
        match delete_by_alias(content, &node.slug).await {
            Ok(true) => stage.deleted += 1,
            Ok(false) => {}
            Err(e) => stage
                .errors
                .push(format!("Error deleting category {}: {e}", node.slug)),
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    stage
}

async fn delete_by_alias(content: &dyn ContentStore, alias: &str) -> Result<bool, StoreError> {
    match content.find_by_alias_any(alias).await? {
        Some(resource) => {
            content.delete(resource.id).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}
