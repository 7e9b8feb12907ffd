use super::*;

use std::sync::atomic::{AtomicUsize, Ordering};

fn temp_session_path(label: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir()
        .join(format!("tpm-client-{}-{label}-{n}", std::process::id()))
        .join("session.json")
}

// =============================================================================
// MemoryStore
// =============================================================================

#[test]
fn memory_store_set_get_remove() {
    let store = MemoryStore::new();
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

    store.set(TOKEN_KEY, "T1").unwrap();
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("T1"));

    store.set(TOKEN_KEY, "T2").unwrap();
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("T2"));

    store.remove(TOKEN_KEY).unwrap();
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}

#[test]
fn memory_store_remove_missing_is_ok() {
    let store = MemoryStore::new();
    assert!(store.remove(USER_KEY).is_ok());
    assert!(store.snapshot().is_empty());
}

#[test]
fn session_keys_cover_every_named_key() {
    for key in [TOKEN_KEY, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, IS_AUTHENTICATED_KEY, USER_KEY] {
        assert!(SESSION_KEYS.contains(&key), "{key} missing from SESSION_KEYS");
    }
}

// =============================================================================
// FileStore
// =============================================================================

#[test]
fn file_store_missing_file_reads_empty() {
    let store = FileStore::new(temp_session_path("missing"));
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}

#[test]
fn file_store_persists_across_instances() {
    let path = temp_session_path("persist");
    FileStore::new(&path).set(REFRESH_TOKEN_KEY, "R1").unwrap();

    let reopened = FileStore::new(&path);
    assert_eq!(reopened.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R1"));

    reopened.remove(REFRESH_TOKEN_KEY).unwrap();
    assert_eq!(FileStore::new(&path).get(REFRESH_TOKEN_KEY).unwrap(), None);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn file_store_rejects_corrupt_file() {
    let path = temp_session_path("corrupt");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let store = FileStore::new(&path);
    assert!(matches!(store.get(TOKEN_KEY), Err(StorageError::Corrupt { .. })));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn file_store_empty_file_reads_empty() {
    let path = temp_session_path("empty");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "").unwrap();

    let store = FileStore::new(&path);
    assert_eq!(store.get(USER_KEY).unwrap(), None);
    store.set(USER_KEY, r#"{"id":"u1"}"#).unwrap();
    assert_eq!(store.get(USER_KEY).unwrap().as_deref(), Some(r#"{"id":"u1"}"#));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
