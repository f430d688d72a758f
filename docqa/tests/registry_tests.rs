//! Durability and resolution tests for the JSON file registry.

use docqa::{CollectionRecord, CollectionRegistry, JsonFileRegistry};

#[tokio::test]
async fn appended_collections_survive_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    {
        let registry = JsonFileRegistry::open(&path).unwrap();
        registry
            .append_collection(
                "ada",
                CollectionRecord { name: "specs".into(), index_name: "specs-idx".into() },
                &["notes.txt".to_string(), "owners.csv".to_string()],
            )
            .await
            .unwrap();
    }

    let reopened = JsonFileRegistry::open(&path).unwrap();
    assert_eq!(
        reopened.collections("ada").await.unwrap(),
        vec![CollectionRecord { name: "specs".into(), index_name: "specs-idx".into() }]
    );
    assert_eq!(reopened.index_name("ada", "specs").await.unwrap(), Some("specs-idx".to_string()));
    assert_eq!(
        reopened.uploaded_files("ada", "specs").await.unwrap(),
        vec!["notes.txt".to_string(), "owners.csv".to_string()]
    );
}

#[tokio::test]
async fn unknown_collections_resolve_to_none() {
    let dir = tempfile::tempdir().unwrap();
    let registry = JsonFileRegistry::open(dir.path().join("storage.json")).unwrap();

    assert!(registry.collections("nobody").await.unwrap().is_empty());
    assert_eq!(registry.index_name("nobody", "specs").await.unwrap(), None);
    assert!(registry.uploaded_files("nobody", "specs").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_top_level_keys_are_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    // A registry document written by an account system that also stores
    // credential material the pipeline never reads.
    std::fs::write(
        &path,
        r#"{
            "users": {"ada": "9f86d081884c7d659a2feaa0c55ad015"},
            "collections": {"ada": [{"name": "specs", "index_name": "specs-idx"}]},
            "uploaded_files": {"ada": {"specs": ["notes.txt"]}}
        }"#,
    )
    .unwrap();

    let registry = JsonFileRegistry::open(&path).unwrap();
    assert_eq!(registry.index_name("ada", "specs").await.unwrap(), Some("specs-idx".to_string()));
}

#[tokio::test]
async fn collections_accumulate_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let registry = JsonFileRegistry::open(dir.path().join("storage.json")).unwrap();

    for (name, index) in [("specs", "specs-idx"), ("ops", "ops-idx")] {
        registry
            .append_collection(
                "ada",
                CollectionRecord { name: name.into(), index_name: index.into() },
                &[],
            )
            .await
            .unwrap();
    }

    let collections = registry.collections("ada").await.unwrap();
    assert_eq!(collections.len(), 2);
    assert_eq!(registry.index_name("ada", "ops").await.unwrap(), Some("ops-idx".to_string()));
}
