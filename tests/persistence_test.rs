//! Disk persistence: round trips, corruption recovery, restart and offline
//! startup, all through `FileStorage` in a temp directory.

mod common;

use common::*;
use cure_sync::adapters::mock::MockTransport;
use cure_sync::adapters::FileStorage;
use cure_sync::models::{DataStoreItem, FieldValue};
use cure_sync::storage::{keys, PersistedState, PersistenceLayer, Snapshot};
use cure_sync::StartupOutcome;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tempfile::TempDir;

fn layer(dir: &TempDir) -> PersistenceLayer {
    PersistenceLayer::new(Arc::new(FileStorage::new(dir.path())))
}

#[test]
fn test_disk_round_trip() {
    let dir = TempDir::new().unwrap();
    let persistence = layer(&dir);

    let mut translations = BTreeMap::new();
    translations.insert(
        "home".to_string(),
        BTreeMap::from([(
            "title".to_string(),
            BTreeMap::from([
                ("en".to_string(), "Hi".to_string()),
                ("fr".to_string(), "Salut".to_string()),
            ]),
        )]),
    );
    let known_tabs: BTreeSet<String> = ["home".to_string()].into();
    let stores = BTreeMap::from([(
        "products".to_string(),
        vec![DataStoreItem {
            id: "p1".to_string(),
            data: BTreeMap::from([
                ("price".to_string(), FieldValue::Double(4.5)),
                ("stock".to_string(), FieldValue::Int(3)),
                ("note".to_string(), FieldValue::Null),
            ]),
            created_at: Some("2024-01-01T00:00:00Z".to_string()),
            updated_at: None,
        }],
    )]);

    persistence.save_document(keys::TRANSLATIONS, &translations).unwrap();
    persistence.save_document(keys::KNOWN_TABS, &known_tabs).unwrap();
    persistence.save_document(keys::STORES, &stores).unwrap();
    persistence.save_scalar(keys::CURRENT_LANGUAGE, Some("fr")).unwrap();

    let loaded = layer(&dir).load_all();
    assert_eq!(loaded.translations, translations);
    assert_eq!(loaded.known_tabs, known_tabs);
    assert_eq!(loaded.stores, stores);
    assert_eq!(loaded.current_language.as_deref(), Some("fr"));
    assert!(loaded.auth_token.is_none());
}

#[test]
fn test_corrupt_document_loads_empty_and_is_removed() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(keys::TRANSLATIONS), b"{not json").unwrap();
    std::fs::write(dir.path().join(keys::KNOWN_TABS), b"[\"home\"]").unwrap();

    let loaded = layer(&dir).load_all();

    assert!(loaded.translations.is_empty());
    assert!(loaded.known_tabs.contains("home"));
    assert!(!dir.path().join(keys::TRANSLATIONS).exists());
}

#[test]
fn test_empty_directory_loads_default_state() {
    let dir = TempDir::new().unwrap();
    assert_eq!(layer(&dir).load_all(), PersistedState::default());
}

#[test]
fn test_concurrent_snapshots_leave_the_newest_on_disk() {
    let dir = TempDir::new().unwrap();
    let persistence = layer(&dir);

    std::thread::scope(|scope| {
        for generation in 1..=16u64 {
            let persistence = &persistence;
            scope.spawn(move || {
                let tabs: BTreeSet<String> =
                    (0..generation).map(|i| format!("tab{}", i)).collect();
                persistence.persist_snapshot(
                    keys::KNOWN_TABS,
                    &Snapshot {
                        generation,
                        value: tabs,
                    },
                );
            });
        }
    });

    let loaded = layer(&dir).load_all();
    assert_eq!(loaded.known_tabs.len(), 16);
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_restart_restores_cache_and_language() {
    let backend = TestBackend::start().await;
    backend.mount_auth("t1", &["home"]).await;
    backend.mount_empty_reserved().await;
    backend
        .mount_translations(
            "home",
            json!({"keys": [{"key": "title", "values": {"en": "Hi", "fr": "Salut"}}]}),
            None,
        )
        .await;

    let dir = TempDir::new().unwrap();
    {
        let context = context_at(dir.path(), MockTransport::new());
        context.configure(backend.config()).unwrap().wait().await;
        assert!(context.set_language("fr", false).await);
        context.shutdown().await;
    }

    let restarted = context_at(dir.path(), MockTransport::new());
    assert_eq!(restarted.language(), "fr");
    assert_eq!(restarted.get("home", "title", "fr"), "Salut");
    assert!(restarted.known_collections().contains("home"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join(keys::AUTH_TOKEN)).unwrap(),
        "t1"
    );
}

#[tokio::test]
async fn test_offline_startup_serves_cache_and_still_connects() {
    let dir = TempDir::new().unwrap();
    {
        let backend = TestBackend::start().await;
        backend.mount_auth("t1", &["home"]).await;
        backend.mount_empty_reserved().await;
        backend
            .mount_translations("home", keys_body("en", &[("title", "Hi")]), None)
            .await;
        let context = context_at(dir.path(), MockTransport::new());
        assert_eq!(
            context.configure(backend.config()).unwrap().wait().await,
            StartupOutcome::Online
        );
        context.shutdown().await;
    }

    let backend = TestBackend::start().await;
    backend.mount_auth_failure(503).await;
    let transport = MockTransport::new();
    let context = context_at(dir.path(), transport.clone());

    let outcome = context.configure(backend.config()).unwrap().wait().await;

    assert_eq!(outcome, StartupOutcome::Offline);
    assert_eq!(context.translation("title", "home"), "Hi");
    assert_eq!(transport.open_calls(), 1);
}

#[tokio::test]
async fn test_clear_all_data_removes_files() {
    let backend = TestBackend::start().await;
    backend.mount_auth("t1", &["home"]).await;
    backend.mount_empty_reserved().await;
    backend
        .mount_translations("home", keys_body("en", &[("title", "Hi")]), None)
        .await;

    let dir = TempDir::new().unwrap();
    let context = context_at(dir.path(), MockTransport::new());
    context.configure(backend.config()).unwrap().wait().await;
    assert!(dir.path().join(keys::TRANSLATIONS).exists());

    context.clear_all_data();

    for name in keys::DOCUMENTS.iter().chain(keys::SCALARS.iter()) {
        assert!(!dir.path().join(name).exists(), "{} still on disk", name);
    }
    assert_eq!(context.get("home", "title", "en"), "");
}
