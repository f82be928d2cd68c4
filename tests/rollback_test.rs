//! Rollback tests: the inverse pipeline keyed by natural identifiers.

mod common;

use common::{author, category, item, scripted_fetcher, ItemSpec};
use wxr_import::{
    load_document, parse_document, run_import, run_rollback, ContentStore, JsonStore, Stores,
    TvStore, UserStore,
};

fn open_store(dir: &tempfile::TempDir) -> JsonStore {
    JsonStore::open(&dir.path().join("store.json")).expect("Failed to open store")
}

fn fixture_body() -> String {
    let mut body = String::new();
    body.push_str(&category("3", "travel", "Travel", ""));
    body.push_str(&author("alice", "alice@example.com", "Alice"));
    body.push_str(&item(&ItemSpec {
        post_id: "11",
        title: "Trip",
        post_name: "trip",
        author: "alice",
        category_refs: &[
            ("category", "travel", "Travel"),
            ("post_tag", "sea", "sea"),
        ],
        postmeta: &[("price", "120"), ("price-0", "1"), ("price-1", "2")],
        ..ItemSpec::default()
    }));
    body
}

#[tokio::test]
async fn test_rollback_reverses_import() {
    let dir = tempfile::tempdir().unwrap();
    let file = common::write_wxr(dir.path(), "export.xml", &fixture_body());
    let doc = load_document(&file).unwrap();

    let store = open_store(&dir);
    let stores = Stores {
        content: &store,
        tv: &store,
        users: &store,
    };
    let mut media = scripted_fetcher(dir.path(), vec![]);
    run_import(&doc, &stores, &mut media).await;

    // Sanity: everything landed
    assert!(store.find_by_alias("travel").await.unwrap().is_some());
    assert!(store.find_by_alias("trip").await.unwrap().is_some());
    assert!(store.find_user("alice").await.unwrap().is_some());
    assert!(store.find_tv("tags").await.unwrap().is_some());

    let rollback_doc = parse_document(&file).unwrap();
    let report = run_rollback(&rollback_doc, &stores).await;
    assert!(report.errors().is_empty());

    // Resources gone, trashed ones included
    assert!(store.find_by_alias_any("travel").await.unwrap().is_none());
    assert!(store.find_by_alias_any("trip").await.unwrap().is_none());

    // Imported users gone, TVs gone (scalar, group base, tags, image)
    assert!(store.find_user("alice").await.unwrap().is_none());
    assert!(store.find_tv("price").await.unwrap().is_none());
    assert!(store.find_tv("tags").await.unwrap().is_none());
    assert!(store.find_tv("image").await.unwrap().is_none());

    // Import templates gone
    assert!(store
        .templates_with_prefix("WordPress Import - ")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_rollback_never_deletes_superuser() {
    let dir = tempfile::tempdir().unwrap();

    // The export claims an "admin" author — rollback must not honor it
    let mut body = author("admin", "root@example.com", "Root");
    body.push_str(&author("alice", "alice@example.com", "Alice"));
    let file = common::write_wxr(dir.path(), "export.xml", &body);
    let doc = load_document(&file).unwrap();

    let store = open_store(&dir);
    let stores = Stores {
        content: &store,
        tv: &store,
        users: &store,
    };
    let mut media = scripted_fetcher(dir.path(), vec![]);
    run_import(&doc, &stores, &mut media).await;

    let report = run_rollback(&doc, &stores).await;
    assert!(report.errors().is_empty());

    assert!(store.find_user("admin").await.unwrap().is_some());
    assert!(store.find_user("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn test_rollback_on_clean_store_is_harmless() {
    let dir = tempfile::tempdir().unwrap();
    let file = common::write_wxr(dir.path(), "export.xml", &fixture_body());
    let doc = parse_document(&file).unwrap();

    let store = open_store(&dir);
    let stores = Stores {
        content: &store,
        tv: &store,
        users: &store,
    };

    // Nothing was ever imported; rollback still completes without errors
    let report = run_rollback(&doc, &stores).await;
    assert!(report.errors().is_empty());
    assert!(store.find_user("admin").await.unwrap().is_some());
}
