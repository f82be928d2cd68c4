use async_trait::async_trait;
use thiserror::Error;

use super::types::{
    NewResource, Resource, ResourceId, Template, TemplateId, TvDefinition, TvId, TvType, User,
    UserProfile,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Backend(String),
}

/// Resource (page/category) persistence.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Find a live resource by its alias.
    async fn find_by_alias(&self, alias: &str) -> Result<Option<Resource>, StoreError>;

    /// Find a resource by alias, including trashed ones.
    async fn find_by_alias_any(&self, alias: &str) -> Result<Option<Resource>, StoreError>;

    async fn get(&self, id: ResourceId) -> Result<Option<Resource>, StoreError>;

    async fn create(&self, resource: NewResource) -> Result<Resource, StoreError>;

    async fn set_parent(&self, id: ResourceId, parent: ResourceId) -> Result<(), StoreError>;

    async fn set_template(&self, id: ResourceId, template: TemplateId) -> Result<(), StoreError>;

    async fn set_container(&self, id: ResourceId, is_container: bool) -> Result<(), StoreError>;

    /// Permanently delete a resource, trashed or not.
    async fn delete(&self, id: ResourceId) -> Result<(), StoreError>;
}

/// Template and template-variable persistence.
#[async_trait]
pub trait TvStore: Send + Sync {
    async fn find_template(&self, name: &str) -> Result<Option<Template>, StoreError>;

    async fn create_template(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Template, StoreError>;

    async fn templates_with_prefix(&self, prefix: &str) -> Result<Vec<Template>, StoreError>;

    async fn delete_template(&self, id: TemplateId) -> Result<(), StoreError>;

    async fn find_tv(&self, name: &str) -> Result<Option<TvDefinition>, StoreError>;

    async fn create_tv(
        &self,
        name: &str,
        caption: &str,
        kind: TvType,
    ) -> Result<TvDefinition, StoreError>;

    async fn delete_tv(&self, id: TvId) -> Result<(), StoreError>;

    /// Associate a TV with a template. Creating an existing link is a no-op.
    async fn link_tv(&self, tv_id: TvId, template_id: TemplateId) -> Result<(), StoreError>;

    /// Remove every TV association of a template.
    async fn unlink_template(&self, template_id: TemplateId) -> Result<(), StoreError>;

    /// Templates a TV is associated with.
    async fn tv_links(&self, tv_id: TvId) -> Result<Vec<TemplateId>, StoreError>;

    async fn upsert_value(
        &self,
        resource_id: ResourceId,
        tv_id: TvId,
        value: &str,
    ) -> Result<(), StoreError>;

    /// Drop every TV value attached to a resource.
    async fn delete_values(&self, resource_id: ResourceId) -> Result<(), StoreError>;

    /// Read a single TV value, if present.
    async fn value(&self, resource_id: ResourceId, tv_id: TvId)
        -> Result<Option<String>, StoreError>;
}

/// Manager-user persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Create a user with no usable password (reset happens out-of-band).
    async fn create_user(&self, username: &str) -> Result<User, StoreError>;

    async fn create_profile(&self, profile: UserProfile) -> Result<(), StoreError>;

    /// Delete a user and its profile by username. Unknown usernames are a
    /// no-op.
    async fn delete_user(&self, username: &str) -> Result<(), StoreError>;
}
