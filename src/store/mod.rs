//! Target content store abstraction.
//!
//! The CMS persistence layer is an external collaborator: the import
//! pipeline only talks to the three traits in [`traits`], issuing plain
//! create/find/update/delete calls. [`JsonStore`] is the reference backend
//! used by the CLI and the integration tests — the whole relational state
//! lives in one JSON snapshot file.

mod json;
mod traits;
mod types;

pub use json::{JsonStore, SUPERUSER_ID};
pub use traits::{ContentStore, StoreError, TvStore, UserStore};
pub use types::{
    NewResource, Resource, ResourceId, Template, TemplateId, TvDefinition, TvId, TvType, TvValue,
    User, UserId, UserProfile,
};
