use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ResourceId = u64;
pub type TemplateId = u64;
pub type TvId = u64;
pub type UserId = u64;

/// A content resource — the store's unified page/category entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub title: String,
    /// URL alias. The natural key for idempotent lookups.
    pub alias: String,
    /// Parent resource id; 0 = site root.
    pub parent: ResourceId,
    /// Linked template id; 0 = none.
    pub template: TemplateId,
    pub published: bool,
    /// Whether the resource acts as a folder for child resources.
    pub is_container: bool,
    pub intro: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
    /// Soft-delete marker. Trashed resources keep their alias.
    pub trashed: bool,
}

/// Fields for creating a resource. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub title: String,
    pub alias: String,
    pub parent: ResourceId,
    pub template: TemplateId,
    pub published: bool,
    pub is_container: bool,
    pub intro: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
}

/// A named, reusable rendering/schema definition resources link to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub description: String,
}

/// Value type of a template variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TvType {
    Number,
    Date,
    Image,
    Textarea,
}

/// A custom-field definition. Identity is `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvDefinition {
    pub id: TvId,
    pub name: String,
    pub caption: String,
    pub kind: TvType,
}

/// A per-resource custom-field value. Identity is `(resource_id, tv_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvValue {
    pub resource_id: ResourceId,
    pub tv_id: TvId,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub fullname: String,
    pub email: String,
    pub role: u32,
    pub blocked: bool,
}
