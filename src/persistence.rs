//! JSON snapshot persistence for the aggregate store, dedup ledger, and cursor

use {
    crate::aggregator::UserAggregate,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::{
        collections::HashMap,
        fs, io,
        path::PathBuf,
        sync::Mutex,
    },
    thiserror::Error,
};

/// Snapshot keys; the store maps each to its backing location.
pub const AGGREGATES_KEY: &str = "mintEvents";
pub const LEDGER_KEY: &str = "processedEvents";
pub const CURSOR_KEY: &str = "cursor";

/// Durability failure. The engine aborts the current batch on these rather
/// than advancing past state that never hit disk.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot io error: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value snapshot durability.
///
/// `save` must be durable on return and never leave a partially written
/// snapshot visible under the key.
pub trait SnapshotStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// File-backed store: one `<key>.json` per key under a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store over `dir`, creating the directory if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            log::info!("No existing snapshot file found: {}", path.display());
            return Ok(None);
        }
        Ok(Some(fs::read(&path)?))
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        // Write a sibling temp file and rename it into place so a crash
        // mid-write never leaves a truncated snapshot behind.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Volatile store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Cursor snapshot: the last fully processed block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorSnapshot {
    pub last_processed_block: u64,
    pub updated_at: DateTime<Utc>,
}

/// Load the persisted aggregate entries, newest snapshot wins; an absent
/// file is an empty aggregate.
pub fn load_aggregates(store: &dyn SnapshotStore) -> Result<Vec<UserAggregate>, StoreError> {
    match store.load(AGGREGATES_KEY)? {
        Some(bytes) => {
            let entries: Vec<UserAggregate> = serde_json::from_slice(&bytes)?;
            log::info!("Loaded {} aggregate entries", entries.len());
            Ok(entries)
        }
        None => Ok(Vec::new()),
    }
}

/// Persist the full aggregate snapshot (caller passes it already sorted).
pub fn save_aggregates(
    store: &dyn SnapshotStore,
    entries: &[UserAggregate],
) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(entries)?;
    store.save(AGGREGATES_KEY, &json)?;
    log::debug!("Saved {} aggregate entries", entries.len());
    Ok(())
}

/// Load the persisted dedup ledger ids; an absent file is an empty ledger.
pub fn load_ledger(store: &dyn SnapshotStore) -> Result<Vec<String>, StoreError> {
    match store.load(LEDGER_KEY)? {
        Some(bytes) => {
            let ids: Vec<String> = serde_json::from_slice(&bytes)?;
            log::info!("Loaded {} processed event ids", ids.len());
            Ok(ids)
        }
        None => Ok(Vec::new()),
    }
}

/// Persist the full dedup ledger.
pub fn save_ledger(store: &dyn SnapshotStore, ids: &[String]) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(ids)?;
    store.save(LEDGER_KEY, &json)?;
    log::debug!("Saved {} processed event ids", ids.len());
    Ok(())
}

/// Load the persisted cursor, if one has ever been written.
pub fn load_cursor(store: &dyn SnapshotStore) -> Result<Option<u64>, StoreError> {
    match store.load(CURSOR_KEY)? {
        Some(bytes) => {
            let snapshot: CursorSnapshot = serde_json::from_slice(&bytes)?;
            log::info!("Loaded cursor at block {}", snapshot.last_processed_block);
            Ok(Some(snapshot.last_processed_block))
        }
        None => Ok(None),
    }
}

/// Persist the cursor after a fully durable batch.
pub fn save_cursor(store: &dyn SnapshotStore, block: u64) -> Result<(), StoreError> {
    let snapshot = CursorSnapshot {
        last_processed_block: block,
        updated_at: Utc::now(),
    };
    let json = serde_json::to_vec_pretty(&snapshot)?;
    store.save(CURSOR_KEY, &json)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::primitives::{Address, U512},
        tempfile::tempdir,
    };

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        assert!(store.load("cursor").unwrap().is_none());
        store.save("cursor", b"{\"x\":1}").unwrap();
        assert_eq!(store.load("cursor").unwrap().unwrap(), b"{\"x\":1}");
        assert!(dir.path().join("cursor.json").exists());
    }

    #[test]
    fn test_new_creates_missing_data_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("data").join("snapshots");

        let store = FileStore::new(&nested).unwrap();
        store.save("cursor", b"{}").unwrap();

        assert!(nested.join("cursor.json").exists());
    }

    #[test]
    fn test_file_store_save_replaces_whole_snapshot() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        store.save("ledger", b"first snapshot, longer payload").unwrap();
        store.save("ledger", b"second").unwrap();
        assert_eq!(store.load("ledger").unwrap().unwrap(), b"second");
    }

    #[test]
    fn test_missing_snapshots_load_as_empty_state() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        assert!(load_aggregates(&store).unwrap().is_empty());
        assert!(load_ledger(&store).unwrap().is_empty());
        assert!(load_cursor(&store).unwrap().is_none());
    }

    #[test]
    fn test_aggregates_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let entries = vec![UserAggregate {
            user: Address::repeat_byte(0x42),
            primary_amount: U512::from(1000u64),
            secondary_amount: U512::from(1086u64),
        }];
        save_aggregates(&store, &entries).unwrap();

        assert_eq!(load_aggregates(&store).unwrap(), entries);
    }

    #[test]
    fn test_ledger_round_trip() {
        let store = MemoryStore::new();
        let ids = vec!["0xaa-0".to_string(), "0xaa-1".to_string()];

        save_ledger(&store, &ids).unwrap();
        assert_eq!(load_ledger(&store).unwrap(), ids);
    }

    #[test]
    fn test_cursor_round_trip() {
        let store = MemoryStore::new();

        save_cursor(&store, 21065777).unwrap();
        assert_eq!(load_cursor(&store).unwrap(), Some(21065777));
    }
}
