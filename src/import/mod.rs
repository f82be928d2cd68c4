//! The import pipeline.
//!
//! Stage order is fixed: categories and users first (they produce the id
//! maps the post stage consumes), posts last. Rollback runs the inverse
//! order and is keyed by the same natural identifiers the import used, so
//! it needs no persisted mapping table — only the original export file.

pub mod categories;
pub mod media;
pub mod posts;
pub mod registry;
pub mod users;

use tracing::info;

use crate::store::{ContentStore, TvStore, UserStore};
use crate::wxr::WxrDocument;
use media::MediaFetcher;
use registry::TvRegistry;

/// The three persistence seams of the target CMS, bundled for the
/// pipeline.
pub struct Stores<'a> {
    pub content: &'a dyn ContentStore,
    pub tv: &'a dyn TvStore,
    pub users: &'a dyn UserStore,
}

/// Aggregated result of a full import run.
#[derive(Debug)]
pub struct ImportReport {
    pub categories: categories::CategoryOutcome,
    pub users: users::UserOutcome,
    pub posts: posts::PostOutcome,
    /// Media fetch failures, drained from the fetcher.
    pub media_errors: Vec<String>,
}

impl ImportReport {
    /// Every stage error, in pipeline order, for the end-of-run listing.
    #[must_use]
    pub fn stage_errors(&self) -> Vec<&str> {
        self.categories
            .errors
            .iter()
            .chain(&self.users.errors)
            .chain(&self.posts.errors)
            .map(String::as_str)
            .collect()
    }
}

/// Result of one rollback stage.
#[derive(Debug, Default)]
pub struct RollbackStage {
    pub deleted: usize,
    pub errors: Vec<String>,
}

/// Aggregated result of a rollback run.
#[derive(Debug)]
pub struct RollbackReport {
    pub posts: RollbackStage,
    pub categories: RollbackStage,
    pub users: RollbackStage,
    pub templates: RollbackStage,
}

impl RollbackReport {
    #[must_use]
    pub fn errors(&self) -> Vec<&str> {
        self.posts
            .errors
            .iter()
            .chain(&self.categories.errors)
            .chain(&self.users.errors)
            .chain(&self.templates.errors)
            .map(String::as_str)
            .collect()
    }
}

/// Run the full import pipeline against a validated document.
///
/// Fatal errors cannot happen past this point: every stage isolates its
/// per-node failures into the report and keeps going.
pub async fn run_import(
    doc: &WxrDocument,
    stores: &Stores<'_>,
    media: &mut MediaFetcher,
) -> ImportReport {
    let mut registry = TvRegistry::new(stores.tv);

    info!("Step 1: categories");
    let categories = categories::import(doc, stores.content, &mut registry).await;

    info!("Step 2: users");
    let users = users::import(doc, stores.users).await;

    info!("Step 3: posts and attachments");
    let posts = posts::import(doc, stores.content, &mut registry, media, &users.map).await;

    ImportReport {
        categories,
        users,
        posts,
        media_errors: media.take_errors(),
    }
}

/// Roll an import back, recomputing the same natural keys from the same
/// file. Posts go first, then categories, users, and the import
/// templates.
pub async fn run_rollback(doc: &WxrDocument, stores: &Stores<'_>) -> RollbackReport {
    let registry = TvRegistry::new(stores.tv);

    let posts = posts::rollback(doc, stores.content, stores.tv, &registry).await;
    let categories = categories::rollback(doc, stores.content).await;
    let users = users::rollback(doc, stores.users).await;

    let mut templates = RollbackStage::default();
    match registry.rollback_templates().await {
        Ok(()) => {}
        Err(e) => templates
            .errors
            .push(format!("Error deleting import templates: {e}")),
    }

    RollbackReport {
        posts,
        categories,
        users,
        templates,
    }
}
