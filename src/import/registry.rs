//! Template and template-variable registry.
//!
//! Owns the per-run template cache and everything custom-field shaped:
//! metadata extraction, key slugification, repeater grouping, TV type
//! inference, idempotent TV/template linking, and the TV side of rollback.
//! The cache lives for one run and dies with the registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::store::{ResourceId, StoreError, TemplateId, TvStore, TvType};
use crate::utils::{caption_from_name, slugify_or_raw, ucfirst};
use crate::wxr::ItemNode;

/// Deterministic name prefix shared by every template this importer
/// creates. Doubles as the rollback match pattern.
pub const TEMPLATE_PREFIX: &str = "WordPress Import - ";

/// Name of the shared featured-image TV.
pub const FEATURED_IMAGE_TV: &str = "image";

/// Name of the synthetic tag-list TV.
pub const TAGS_TV: &str = "tags";

/// Logical entity kinds a template is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Category,
    Post,
    Page,
}

impl EntityKind {
    fn label(self) -> &'static str {
        match self {
            EntityKind::Category => "Category",
            EntityKind::Post => "Post",
            EntityKind::Page => "Page",
        }
    }
}

#[expect(
    clippy::expect_used,
    reason = "Regex literal is compile-time constant and cannot fail"
)]
static NESTED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)-(\d+)-(.+)$").expect("NESTED_KEY is a valid regex literal")
});

#[expect(
    clippy::expect_used,
    reason = "Regex literal is compile-time constant and cannot fail"
)]
static FLAT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)-(\d+)$").expect("FLAT_KEY is a valid regex literal"));

#[expect(
    clippy::expect_used,
    reason = "Regex literal is compile-time constant and cannot fail"
)]
static GROUPED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)-(\d+)(-.+)?$").expect("GROUPED_KEY is a valid regex literal")
});

/// Infer a TV value type from its slugified name.
///
/// Booking/plan-like names are free text no matter what the keyword table
/// says — those fields carry formatted schedules, not single values.
fn infer_tv_type(name: &str) -> TvType {
    if name.contains("bronirovaniya") || name.contains("plan") {
        return TvType::Textarea;
    }

    match name {
        "nights" | "price" | "cost" | "count" | "order" | "cena" | "stoimost" | "kol-vo"
        | "kol-vo-celovek" | "skidka" | "sale" => TvType::Number,
        "date" | "start-date" | "end-date" | "data" => TvType::Date,
        "image" | "img" | "photo" | "thumb" | "picture" | "foto" | "izobrazenie" => TvType::Image,
        _ => TvType::Textarea,
    }
}

/// Normalized metadata of one item, ready for TV materialization.
#[derive(Debug, Default)]
struct ExtractedMeta {
    /// Scalar fields, in document order.
    single: Vec<(String, String)>,
    /// Repeater groups: base name → numeric index → entry.
    grouped: BTreeMap<String, BTreeMap<u64, Value>>,
    /// Preferred captions by slugified name.
    captions: HashMap<String, String>,
    /// Comma-joined `post_tag` labels.
    tags: Option<String>,
}

fn capture<'a>(caps: &'a regex::Captures<'_>, group: usize) -> &'a str {
    caps.get(group).map_or("", |m| m.as_str())
}

/// Extract and normalize an item's metadata.
///
/// Underscore-prefixed keys are WordPress-internal and always skipped.
/// Keys matching `<base>-<n>-<sub>` land in a nested group, `<base>-<n>`
/// in a flat group, anything else stays scalar.
fn extract_meta(item: &ItemNode) -> ExtractedMeta {
    let mut meta = ExtractedMeta {
        tags: item.tags(),
        ..ExtractedMeta::default()
    };

    // Slugify keys first; a later duplicate overwrites the earlier value.
    let mut all: Vec<(String, String)> = Vec::new();
    for (raw_key, value) in &item.postmeta {
        if raw_key.starts_with('_') {
            continue;
        }
        let key = slugify_or_raw(raw_key);
        meta.captions.insert(key.clone(), raw_key.clone());
        if let Some(slot) = all.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value.clone();
        } else {
            all.push((key, value.clone()));
        }
    }

    for (key, value) in all {
        if let Some(caps) = NESTED_KEY.captures(&key) {
            let base = capture(&caps, 1).to_string();
            let index: u64 = capture(&caps, 2).parse().unwrap_or(0);
            let sub = capture(&caps, 3).to_string();

            let entry = meta
                .grouped
                .entry(base.clone())
                .or_default()
                .entry(index)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = entry {
                map.insert(sub, Value::String(value));
            }

            meta.captions
                .entry(base.clone())
                .or_insert_with(|| caption_from_name(&base));
        } else if let Some(caps) = FLAT_KEY.captures(&key) {
            let base = capture(&caps, 1).to_string();
            let index: u64 = capture(&caps, 2).parse().unwrap_or(0);

            meta.grouped
                .entry(base.clone())
                .or_default()
                .insert(index, Value::String(value));

            meta.captions
                .entry(base.clone())
                .or_insert_with(|| caption_from_name(&base));
        } else {
            meta.single.push((key, value));
        }
    }

    meta
}

/// Per-run registry over a TV store.
pub struct TvRegistry<'a> {
    store: &'a dyn TvStore,
    template_cache: HashMap<String, TemplateId>,
}

impl<'a> TvRegistry<'a> {
    #[must_use]
    pub fn new(store: &'a dyn TvStore) -> Self {
        Self {
            store,
            template_cache: HashMap::new(),
        }
    }

    /// Get or create the shared template for an entity kind.
    /// Memoized for the lifetime of the run.
    pub async fn template_id(&mut self, kind: EntityKind) -> Result<TemplateId, StoreError> {
        let name = format!("{TEMPLATE_PREFIX}{}", kind.label());

        if let Some(id) = self.template_cache.get(&name) {
            return Ok(*id);
        }

        let template = match self.store.find_template(&name).await? {
            Some(template) => template,
            None => {
                let description = format!("Template for imported WordPress {}s", kind.label());
                self.store.create_template(&name, &description).await?
            }
        };

        self.template_cache.insert(name, template.id);
        Ok(template.id)
    }

    /// Materialize an item's metadata as TV definitions and values.
    pub async fn process_metadata(
        &mut self,
        resource_id: ResourceId,
        item: &ItemNode,
        template_id: TemplateId,
    ) -> Result<(), StoreError> {
        let meta = extract_meta(item);

        for (key, value) in &meta.single {
            let caption = meta
                .captions
                .get(key)
                .cloned()
                .unwrap_or_else(|| ucfirst(key));
            self.ensure_tv_linked(key, template_id, &caption).await?;
            self.save_value(resource_id, key, value).await?;
        }

        for (base, entries) in &meta.grouped {
            // Dense, index-ordered sequence regardless of input key order
            let ordered: Vec<&Value> = entries.values().collect();
            let json = serde_json::to_string(&ordered)?;

            let caption = meta
                .captions
                .get(base)
                .cloned()
                .unwrap_or_else(|| caption_from_name(base));
            self.ensure_tv_linked(base, template_id, &caption).await?;
            self.save_value(resource_id, base, &json).await?;
        }

        if let Some(tags) = &meta.tags {
            self.ensure_tv_linked(TAGS_TV, template_id, "Tags").await?;
            self.save_value(resource_id, TAGS_TV, tags).await?;
        }

        Ok(())
    }

    /// Upsert the shared featured-image TV for a resource.
    pub async fn upsert_featured_image(
        &self,
        resource_id: ResourceId,
        template_id: TemplateId,
        value: &str,
    ) -> Result<(), StoreError> {
        let tv = match self.store.find_tv(FEATURED_IMAGE_TV).await? {
            Some(tv) => tv,
            None => {
                self.store
                    .create_tv(FEATURED_IMAGE_TV, "Post Image", TvType::Image)
                    .await?
            }
        };
        self.store.link_tv(tv.id, template_id).await?;
        if !value.is_empty() {
            self.store.upsert_value(resource_id, tv.id, value).await?;
        }
        Ok(())
    }

    /// Delete a TV by its (slugified) key. Keys matching the grouped
    /// pattern also take the group's base-name TV with them.
    pub async fn delete_tv(&self, key: &str) -> Result<(), StoreError> {
        let name = slugify_or_raw(key);

        if let Some(tv) = self.store.find_tv(&name).await? {
            self.store.delete_tv(tv.id).await?;
        }

        if let Some(caps) = GROUPED_KEY.captures(&name) {
            let base = capture(&caps, 1);
            if let Some(tv) = self.store.find_tv(base).await? {
                self.store.delete_tv(tv.id).await?;
            }
        }

        Ok(())
    }

    /// Delete every template this importer created, detaching TV links
    /// first.
    pub async fn rollback_templates(&self) -> Result<(), StoreError> {
        for template in self.store.templates_with_prefix(TEMPLATE_PREFIX).await? {
            self.store.unlink_template(template.id).await?;
            self.store.delete_template(template.id).await?;
        }
        Ok(())
    }

    /// Ensure a TV exists (creating it with an inferred type when absent)
    /// and is linked to the template.
    async fn ensure_tv_linked(
        &self,
        name: &str,
        template_id: TemplateId,
        caption: &str,
    ) -> Result<(), StoreError> {
        let tv = match self.store.find_tv(name).await? {
            Some(tv) => tv,
            None => {
                self.store
                    .create_tv(name, caption, infer_tv_type(name))
                    .await?
            }
        };
        self.store.link_tv(tv.id, template_id).await
    }

    /// Upsert a value by TV name. Empty values are never written.
    async fn save_value(
        &self,
        resource_id: ResourceId,
        name: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        if value.is_empty() {
            return Ok(());
        }
        if let Some(tv) = self.store.find_tv(name).await? {
            self.store.upsert_value(resource_id, tv.id, value).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
