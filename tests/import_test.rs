//! End-to-end import pipeline tests against the JSON snapshot store.

mod common;

use common::{attachment, author, category, item, scripted_fetcher, ItemSpec, ScriptedTransport};
use wxr_import::import::categories;
use wxr_import::import::registry::TvRegistry;
use wxr_import::store::SUPERUSER_ID;
use wxr_import::{
    load_document, run_import, ContentStore, JsonStore, Stores, TvStore, UserStore, WxrError,
};

fn open_store(dir: &tempfile::TempDir) -> JsonStore {
    JsonStore::open(&dir.path().join("store.json")).expect("Failed to open store")
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let dir = tempfile::tempdir().unwrap();

    let mut body = String::new();
    body.push_str(&category("3", "travel", "Travel", ""));
    body.push_str(&author("alice", "alice@example.com", "Alice"));
    body.push_str(&item(&ItemSpec {
        post_id: "10",
        post_type: "page",
        title: "About",
        post_name: "about",
        author: "alice",
        ..ItemSpec::default()
    }));
    body.push_str(&item(&ItemSpec {
        post_id: "11",
        title: "Trip",
        post_name: "trip",
        author: "alice",
        category_refs: &[("category", "travel", "Travel")],
        postmeta: &[("price", "120")],
        ..ItemSpec::default()
    }));

    let file = common::write_wxr(dir.path(), "export.xml", &body);
    let doc = load_document(&file).unwrap();

    let store = open_store(&dir);
    let stores = Stores {
        content: &store,
        tv: &store,
        users: &store,
    };
    let mut media = scripted_fetcher(dir.path(), vec![]);

    let report = run_import(&doc, &stores, &mut media).await;

    assert!(report.stage_errors().is_empty());
    assert!(report.media_errors.is_empty());
    assert_eq!(report.categories.created, 1);
    assert_eq!(report.users.created, 1);
    assert_eq!(report.posts.created, 2);

    // One category resource aliased travel
    let travel = store.find_by_alias("travel").await.unwrap().unwrap();
    assert!(travel.published);

    // One user alice
    let alice = store.find_user("alice").await.unwrap().unwrap();

    // One page aliased about, rooted, no category parent
    let about = store.find_by_alias("about").await.unwrap().unwrap();
    assert_eq!(about.parent, 0);
    assert_eq!(about.created_by, alice.id);

    // One post aliased trip, nested under the travel category
    let trip = store.find_by_alias("trip").await.unwrap().unwrap();
    assert_eq!(trip.parent, travel.id);
    assert_eq!(trip.created_by, alice.id);

    // One TV value price = "120", linked to the shared Post template
    let price = store.find_tv("price").await.unwrap().unwrap();
    assert_eq!(
        store.value(trip.id, price.id).await.unwrap(),
        Some("120".to_string())
    );
    let post_template = store
        .find_template("WordPress Import - Post")
        .await
        .unwrap()
        .unwrap();
    assert!(store
        .tv_links(price.id)
        .await
        .unwrap()
        .contains(&post_template.id));
    assert_eq!(trip.template, post_template.id);
}

#[tokio::test]
async fn test_category_hierarchy_two_pass() {
    let dir = tempfile::tempdir().unwrap();

    // Child precedes parent in document order
    let mut body = String::new();
    body.push_str(&category("5", "spain", "Spain", "travel"));
    body.push_str(&category("3", "travel", "Travel", ""));

    let file = common::write_wxr(dir.path(), "export.xml", &body);
    let doc = load_document(&file).unwrap();

    let store = open_store(&dir);
    let mut registry = TvRegistry::new(&store);
    let outcome = categories::import(&doc, &store, &mut registry).await;

    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.created, 2);

    let travel = store.find_by_alias("travel").await.unwrap().unwrap();
    let spain = store.find_by_alias("spain").await.unwrap().unwrap();
    assert_eq!(spain.parent, travel.id);
    assert!(travel.is_container);
    // Leaf category stays a plain resource
    assert!(!spain.is_container);
}

#[tokio::test]
async fn test_category_import_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();

    let body = category("3", "travel", "Travel", "");
    let file = common::write_wxr(dir.path(), "export.xml", &body);
    let doc = load_document(&file).unwrap();

    let store = open_store(&dir);

    let mut registry = TvRegistry::new(&store);
    let first = categories::import(&doc, &store, &mut registry).await;
    let first_id = *first.map.get("3").unwrap();

    // A second run over the same file reuses the resource by alias
    let mut registry = TvRegistry::new(&store);
    let second = categories::import(&doc, &store, &mut registry).await;

    assert_eq!(second.created, 0);
    assert_eq!(second.reused, 1);
    assert_eq!(*second.map.get("3").unwrap(), first_id);
}

#[tokio::test]
async fn test_version_gate() {
    let dir = tempfile::tempdir().unwrap();

    for generator in ["https://wordpress.org/?v=5.9", "WordPress/5.9"] {
        let file =
            common::write_wxr_with_generator(dir.path(), "old.xml", generator, "");
        assert!(matches!(
            load_document(&file),
            Err(WxrError::Validation(_))
        ));
    }

    for generator in ["https://wordpress.org/?v=6.3", "WordPress 6.3"] {
        let file = common::write_wxr_with_generator(dir.path(), "new.xml", generator, "");
        let doc = load_document(&file).unwrap();
        assert!(doc.version.starts_with('6'));
    }
}

#[tokio::test]
async fn test_page_parent_fixup_second_pass() {
    let dir = tempfile::tempdir().unwrap();

    // Child page precedes its parent in the item stream
    let mut body = String::new();
    body.push_str(&item(&ItemSpec {
        post_id: "21",
        post_type: "page",
        title: "Team",
        post_name: "team",
        post_parent: "20",
        ..ItemSpec::default()
    }));
    body.push_str(&item(&ItemSpec {
        post_id: "20",
        post_type: "page",
        title: "About",
        post_name: "about",
        ..ItemSpec::default()
    }));

    let file = common::write_wxr(dir.path(), "export.xml", &body);
    let doc = load_document(&file).unwrap();

    let store = open_store(&dir);
    let stores = Stores {
        content: &store,
        tv: &store,
        users: &store,
    };
    let mut media = scripted_fetcher(dir.path(), vec![]);
    let report = run_import(&doc, &stores, &mut media).await;

    assert!(report.stage_errors().is_empty());
    let about = store.find_by_alias("about").await.unwrap().unwrap();
    let team = store.find_by_alias("team").await.unwrap().unwrap();
    assert_eq!(team.parent, about.id);
}

#[tokio::test]
async fn test_featured_image_through_attachment_index() {
    let dir = tempfile::tempdir().unwrap();

    let mut body = String::new();
    body.push_str(&attachment(
        "21",
        "https://example.com/uploads/2023/05/beach.jpg",
    ));
    body.push_str(&item(&ItemSpec {
        post_id: "11",
        title: "Trip",
        post_name: "trip",
        postmeta: &[("_thumbnail_id", "21")],
        ..ItemSpec::default()
    }));

    let file = common::write_wxr(dir.path(), "export.xml", &body);
    let doc = load_document(&file).unwrap();
    assert_eq!(doc.attachment_count(), 1);

    let store = open_store(&dir);
    let stores = Stores {
        content: &store,
        tv: &store,
        users: &store,
    };
    let mut media = scripted_fetcher(dir.path(), vec![ScriptedTransport::jpeg_ok()]);
    let report = run_import(&doc, &stores, &mut media).await;

    assert!(report.stage_errors().is_empty());
    let trip = store.find_by_alias("trip").await.unwrap().unwrap();
    let image_tv = store.find_tv("image").await.unwrap().unwrap();
    assert_eq!(
        store.value(trip.id, image_tv.id).await.unwrap(),
        Some("assets/images/wpi/2023/05/beach.jpg".to_string())
    );
    // The underscore key never became a TV of its own
    assert!(store.find_tv("thumbnail-id").await.unwrap().is_none());
}

#[tokio::test]
async fn test_inline_images_rewritten_with_fetch_fallback() {
    let dir = tempfile::tempdir().unwrap();

    let mut body = String::new();
    body.push_str(&item(&ItemSpec {
        post_id: "11",
        title: "Gallery",
        post_name: "gallery",
        content: r#"<img src="https://example.com/uploads/2023/05/ok.jpg"><img src="https://example.com/uploads/2023/05/broken.jpg">"#,
        ..ItemSpec::default()
    }));

    let file = common::write_wxr(dir.path(), "export.xml", &body);
    let doc = load_document(&file).unwrap();

    let store = open_store(&dir);
    let stores = Stores {
        content: &store,
        tv: &store,
        users: &store,
    };
    // First URL succeeds, second 404s
    let mut media = scripted_fetcher(
        dir.path(),
        vec![
            ScriptedTransport::jpeg_ok(),
            wxr_import::AssetResponse {
                status: 404,
                content_type: "text/html".to_string(),
                body: b"gone".to_vec(),
            },
        ],
    );
    let report = run_import(&doc, &stores, &mut media).await;

    let gallery = store.find_by_alias("gallery").await.unwrap().unwrap();
    assert!(gallery
        .body
        .contains("assets/images/wpi/2023/05/ok.jpg"));
    // The failed URL stays untouched and is reported exactly once
    assert!(gallery
        .body
        .contains("https://example.com/uploads/2023/05/broken.jpg"));
    assert_eq!(report.media_errors.len(), 1);
}

#[tokio::test]
async fn test_unknown_author_falls_back_to_superuser() {
    let dir = tempfile::tempdir().unwrap();

    let body = item(&ItemSpec {
        post_id: "11",
        title: "Orphan",
        post_name: "orphan",
        status: "draft",
        author: "ghost",
        ..ItemSpec::default()
    });

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

    let orphan = store.find_by_alias("orphan").await.unwrap().unwrap();
    assert_eq!(orphan.created_by, SUPERUSER_ID);
    assert!(!orphan.published);
}

#[tokio::test]
async fn test_empty_slug_falls_back_to_slugified_title() {
    let dir = tempfile::tempdir().unwrap();

    let body = item(&ItemSpec {
        post_id: "11",
        title: "My Great Trip",
        post_name: "",
        ..ItemSpec::default()
    });

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

    assert!(store
        .find_by_alias("my-great-trip")
        .await
        .unwrap()
        .is_some());
}
