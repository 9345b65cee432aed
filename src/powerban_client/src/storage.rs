use crate::error::StorageError;
use candid::{Decode, Encode};
use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
use ic_stable_structures::storable::Bound;
use ic_stable_structures::{DefaultMemoryImpl, FileMemory, Memory, StableBTreeMap, Storable};
use std::borrow::Cow;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{info, warn};

pub const USER_ID_KEY: &str = "powerban_userId";
pub const DEPOSIT_ADDRESS_KEY: &str = "powerban_depositAddress";
pub const WIN_ADDRESS_KEY: &str = "powerban_winAddress";

const MAX_KEY_SIZE: u32 = 64;
const SETTINGS_MEMORY_ID: u8 = 0;

/// Get/set/remove of plain string values that survive a restart.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct StorageKey(String);

impl StorageKey {
    fn new(key: &str) -> Result<Self, StorageError> {
        if key.len() > MAX_KEY_SIZE as usize {
            return Err(StorageError::KeyTooLong {
                key: key.to_string(),
                max: MAX_KEY_SIZE,
            });
        }
        Ok(StorageKey(key.to_string()))
    }
}

impl Storable for StorageKey {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Borrowed(self.0.as_bytes())
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        StorageKey(String::from_utf8_lossy(&bytes).into_owned())
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: MAX_KEY_SIZE,
        is_fixed_size: false,
    };
}

#[derive(candid::CandidType, Clone, Debug, Serialize, Deserialize)]
struct StoredValue {
    value: String,
}

/// Candid-encoded `StoredValue` as kept in the map. Decoding happens on read
/// so a damaged entry reads as absent.
#[derive(Clone, Debug)]
struct RawValue(Vec<u8>);

impl Storable for RawValue {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Borrowed(&self.0)
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        RawValue(bytes.into_owned())
    }

    const BOUND: Bound = Bound::Unbounded;
}

/// Backing memory picked from configuration: a file when a path is set,
/// the heap otherwise.
pub enum SettingsMemory {
    Heap(DefaultMemoryImpl),
    File(FileMemory),
}

impl Memory for SettingsMemory {
    fn size(&self) -> u64 {
        match self {
            SettingsMemory::Heap(memory) => memory.size(),
            SettingsMemory::File(memory) => memory.size(),
        }
    }

    fn grow(&self, pages: u64) -> i64 {
        match self {
            SettingsMemory::Heap(memory) => memory.grow(pages),
            SettingsMemory::File(memory) => memory.grow(pages),
        }
    }

    fn read(&self, offset: u64, dst: &mut [u8]) {
        match self {
            SettingsMemory::Heap(memory) => memory.read(offset, dst),
            SettingsMemory::File(memory) => memory.read(offset, dst),
        }
    }

    fn write(&self, offset: u64, src: &[u8]) {
        match self {
            SettingsMemory::Heap(memory) => memory.write(offset, src),
            SettingsMemory::File(memory) => memory.write(offset, src),
        }
    }
}

/// Key-value store kept in a stable BTreeMap, either in memory or backed by a file.
pub struct StableStore<M: Memory> {
    entries: StableBTreeMap<StorageKey, RawValue, VirtualMemory<M>>,
}

impl StableStore<DefaultMemoryImpl> {
    pub fn in_memory() -> Self {
        StableStore::init(DefaultMemoryImpl::default())
    }
}

impl StableStore<FileMemory> {
    /// Opens (or creates) a store persisted in the file at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(StableStore::init(open_file(path)?))
    }
}

impl StableStore<SettingsMemory> {
    /// File-backed store at `path` when given, in-memory otherwise.
    pub fn configured(path: Option<&Path>) -> Result<Self, StorageError> {
        let memory = match path {
            Some(path) => {
                info!(path = %path.display(), "opening settings file");
                SettingsMemory::File(open_file(path)?)
            }
            None => SettingsMemory::Heap(DefaultMemoryImpl::default()),
        };
        Ok(StableStore::init(memory))
    }
}

impl<M: Memory> StableStore<M> {
    pub fn init(memory: M) -> Self {
        let manager = MemoryManager::init(memory);
        StableStore {
            entries: StableBTreeMap::init(manager.get(MemoryId::new(SETTINGS_MEMORY_ID))),
        }
    }
}

impl<M: Memory> KeyValueStore for StableStore<M> {
    fn get(&self, key: &str) -> Option<String> {
        let key = StorageKey::new(key).ok()?;
        let raw = self.entries.get(&key)?;
        match Decode!(raw.0.as_slice(), StoredValue) {
            Ok(stored) => Some(stored.value),
            Err(e) => {
                warn!(key = %key.0, error = %e, "ignoring unreadable stored value");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let key = StorageKey::new(key)?;
        let stored = StoredValue {
            value: value.to_string(),
        };
        let bytes = Encode!(&stored).map_err(|e| StorageError::Encode {
            key: key.0.clone(),
            reason: e.to_string(),
        })?;
        self.entries.insert(key, RawValue(bytes));
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let key = StorageKey::new(key)?;
        self.entries.remove(&key);
        Ok(())
    }
}

fn open_file(path: &Path) -> Result<FileMemory, StorageError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| StorageError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    Ok(FileMemory::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_remove() {
        let mut store = StableStore::in_memory();
        assert_eq!(store.get(USER_ID_KEY), None);

        store.set(USER_ID_KEY, "player-1").unwrap();
        store.set(WIN_ADDRESS_KEY, "ban_1win").unwrap();
        assert_eq!(store.get(USER_ID_KEY).as_deref(), Some("player-1"));

        store.set(USER_ID_KEY, "player-2").unwrap();
        assert_eq!(store.get(USER_ID_KEY).as_deref(), Some("player-2"));

        store.remove(USER_ID_KEY).unwrap();
        assert_eq!(store.get(USER_ID_KEY), None);
        assert_eq!(store.get(WIN_ADDRESS_KEY).as_deref(), Some("ban_1win"));
    }

    #[test]
    fn oversized_keys_are_refused() {
        let mut store = StableStore::in_memory();
        let key = "k".repeat(65);
        assert_eq!(
            store.set(&key, "v"),
            Err(StorageError::KeyTooLong { key: key.clone(), max: 64 })
        );
        assert_eq!(store.get(&key), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = std::env::temp_dir().join(format!("powerban-store-{}.bin", std::process::id()));
        let _ = std::fs::remove_file(&path);

        {
            let mut store = StableStore::open(&path).unwrap();
            store.set(DEPOSIT_ADDRESS_KEY, "ban_3deposit").unwrap();
        }

        let store = StableStore::open(&path).unwrap();
        assert_eq!(store.get(DEPOSIT_ADDRESS_KEY).as_deref(), Some("ban_3deposit"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unreadable_value_reads_as_absent() {
        let mut store = StableStore::in_memory();
        store.set(WIN_ADDRESS_KEY, "ban_1win").unwrap();
        store
            .entries
            .insert(StorageKey::new(USER_ID_KEY).unwrap(), RawValue(b"not candid".to_vec()));

        assert_eq!(store.get(USER_ID_KEY), None);
        assert_eq!(store.get(WIN_ADDRESS_KEY).as_deref(), Some("ban_1win"));

        // a fresh write replaces the damaged entry
        store.set(USER_ID_KEY, "player-1").unwrap();
        assert_eq!(store.get(USER_ID_KEY).as_deref(), Some("player-1"));
    }

    #[test]
    fn configured_store_without_path_lives_in_memory() {
        let mut store = StableStore::configured(None).unwrap();
        store.set(USER_ID_KEY, "player-1").unwrap();
        assert_eq!(store.get(USER_ID_KEY).as_deref(), Some("player-1"));
        assert_eq!(StableStore::configured(None).unwrap().get(USER_ID_KEY), None);
    }

    #[test]
    fn configured_store_with_path_is_file_backed() {
        let path = std::env::temp_dir().join(format!("powerban-configured-{}.bin", std::process::id()));
        let _ = std::fs::remove_file(&path);

        {
            let mut store = StableStore::configured(Some(&path)).unwrap();
            store.set(WIN_ADDRESS_KEY, "ban_1win").unwrap();
        }
        let store = StableStore::configured(Some(&path)).unwrap();
        assert_eq!(store.get(WIN_ADDRESS_KEY).as_deref(), Some("ban_1win"));

        let _ = std::fs::remove_file(&path);
    }
}
