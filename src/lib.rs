// Allow panic/unwrap/expect in tests (denied globally via Cargo.toml lints)
#![cfg_attr(
    test,
    allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)
)]

pub mod import;
pub mod logging;
pub mod store;
pub mod utils;
pub mod wxr;

// Re-export commonly used types
pub use import::media::{
    AssetResponse, AssetTransport, HttpTransport, MediaConfig, MediaFetcher, TransportError,
};
pub use import::{run_import, run_rollback, ImportReport, RollbackReport, Stores};
pub use store::{
    ContentStore, JsonStore, NewResource, Resource, StoreError, Template, TvDefinition, TvStore,
    TvType, User, UserProfile, UserStore,
};
pub use wxr::{load_document, parse_document, WxrDocument, WxrError};
