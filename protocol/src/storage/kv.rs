//! Namespaced key-value substrate.
//!
//! Keys are UTF-8 strings scoped by a [`Vault`]. Values are opaque bytes
//! (in practice, codec-encoded records). Writes only ever reach a store
//! through [`KvStore::commit`], which applies a whole [`WriteSet`]
//! atomically.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};

use crate::codec::{self, CodecError};
use crate::config::{TREE_LOCKS, TREE_META, TREE_PAYMENTS, TREE_TRANSACTIONS};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors raised by the storage substrate.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("storage commit aborted: {0}")]
    Aborted(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// A key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Vault {
    /// Scalar metadata slots (the escrow identity).
    Meta,
    /// Transaction records keyed by transaction id.
    Transactions,
    /// Locked balances keyed by account.
    Locks,
    /// Payment records keyed by payment id.
    Payments,
}

impl Vault {
    /// Every vault, in commit order.
    pub const ALL: [Vault; 4] = [
        Vault::Meta,
        Vault::Transactions,
        Vault::Locks,
        Vault::Payments,
    ];

    /// Name of the backing tree / namespace.
    pub fn name(&self) -> &'static str {
        match self {
            Vault::Meta => TREE_META,
            Vault::Transactions => TREE_TRANSACTIONS,
            Vault::Locks => TREE_LOCKS,
            Vault::Payments => TREE_PAYMENTS,
        }
    }
}

// ---------------------------------------------------------------------------
// WriteSet
// ---------------------------------------------------------------------------

/// An ordered batch of pending writes.
///
/// Later writes to the same `(vault, key)` replace earlier ones, so a
/// write set holds at most one value per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    entries: BTreeMap<(Vault, String), Vec<u8>>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a value, replacing any earlier staged value for the key.
    pub fn put(&mut self, vault: Vault, key: impl Into<String>, value: Vec<u8>) {
        self.entries.insert((vault, key.into()), value);
    }

    /// Look up a staged value.
    pub fn get(&self, vault: Vault, key: &str) -> Option<&[u8]> {
        self.entries
            .get(&(vault, key.to_string()))
            .map(Vec::as_slice)
    }

    /// Iterate staged writes in `(vault, key)` order.
    pub fn iter(&self) -> impl Iterator<Item = (Vault, &str, &[u8])> + '_ {
        self.entries
            .iter()
            .map(|((vault, key), value)| (*vault, key.as_str(), value.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// KvStore
// ---------------------------------------------------------------------------

/// A namespaced key-value store with atomic batch commit.
///
/// Implementations must guarantee that [`commit`](KvStore::commit) is
/// all-or-nothing: after an error, none of the batch is visible.
pub trait KvStore: Send + Sync {
    /// Read the raw value stored under `key`, if any.
    fn get(&self, vault: Vault, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Apply every write in `writes` atomically.
    fn commit(&self, writes: WriteSet) -> StorageResult<()>;

    /// Number of entries in a vault.
    fn count(&self, vault: Vault) -> StorageResult<usize>;
}

/// Read and decode a record straight from a store.
pub fn load<T, S>(store: &S, vault: Vault, key: &str) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
    S: KvStore + ?Sized,
{
    match store.get(vault, key)? {
        Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A process-local store. Commit holds the write lock for the whole
/// batch, so readers never observe half a commit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(Vault, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, vault: Vault, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(&(vault, key.to_string())).cloned())
    }

    fn commit(&self, writes: WriteSet) -> StorageResult<()> {
        let mut entries = self.entries.write();
        for (vault, key, value) in writes.iter() {
            entries.insert((vault, key.to_string()), value.to_vec());
        }
        Ok(())
    }

    fn count(&self, vault: Vault) -> StorageResult<usize> {
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|(v, _)| *v == vault)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;

    #[test]
    fn write_set_last_write_wins() {
        let mut ws = WriteSet::new();
        ws.put(Vault::Locks, "alice", b"1".to_vec());
        ws.put(Vault::Locks, "alice", b"2".to_vec());
        assert_eq!(ws.len(), 1);
        assert_eq!(ws.get(Vault::Locks, "alice"), Some(&b"2"[..]));
    }

    #[test]
    fn write_set_keys_are_scoped_by_vault() {
        let mut ws = WriteSet::new();
        ws.put(Vault::Locks, "k", b"lock".to_vec());
        ws.put(Vault::Transactions, "k", b"tx".to_vec());
        assert_eq!(ws.len(), 2);
        assert_eq!(ws.get(Vault::Locks, "k"), Some(&b"lock"[..]));
        assert_eq!(ws.get(Vault::Transactions, "k"), Some(&b"tx"[..]));
        assert_eq!(ws.get(Vault::Payments, "k"), None);
    }

    #[test]
    fn write_set_iterates_in_vault_order() {
        let mut ws = WriteSet::new();
        ws.put(Vault::Locks, "b", vec![]);
        ws.put(Vault::Meta, "z", vec![]);
        ws.put(Vault::Locks, "a", vec![]);
        let order: Vec<_> = ws.iter().map(|(v, k, _)| (v, k.to_string())).collect();
        assert_eq!(
            order,
            vec![
                (Vault::Meta, "z".to_string()),
                (Vault::Locks, "a".to_string()),
                (Vault::Locks, "b".to_string()),
            ]
        );
    }

    #[test]
    fn memory_store_commit_and_get() {
        let store = MemoryStore::new();
        assert!(store.get(Vault::Meta, "x").unwrap().is_none());

        let mut ws = WriteSet::new();
        ws.put(Vault::Meta, "x", b"hello".to_vec());
        ws.put(Vault::Locks, "x", b"other".to_vec());
        store.commit(ws).unwrap();

        assert_eq!(store.get(Vault::Meta, "x").unwrap(), Some(b"hello".to_vec()));
        assert_eq!(store.count(Vault::Meta).unwrap(), 1);
        assert_eq!(store.count(Vault::Locks).unwrap(), 1);
        assert_eq!(store.count(Vault::Payments).unwrap(), 0);
    }

    #[test]
    fn load_decodes_records() {
        let store = MemoryStore::new();
        let amount: Amount = "9.75".parse().unwrap();
        let mut ws = WriteSet::new();
        ws.put(Vault::Locks, "alice", codec::encode(&amount).unwrap());
        store.commit(ws).unwrap();

        let loaded: Option<Amount> = load(&store, Vault::Locks, "alice").unwrap();
        assert_eq!(loaded, Some(amount));
        let missing: Option<Amount> = load(&store, Vault::Locks, "bob").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn load_surfaces_corrupt_records() {
        let store = MemoryStore::new();
        let mut ws = WriteSet::new();
        ws.put(Vault::Locks, "alice", b"garbage".to_vec());
        store.commit(ws).unwrap();

        let err = load::<Amount, _>(&store, Vault::Locks, "alice").unwrap_err();
        assert!(matches!(err, StorageError::Codec(_)));
    }

    #[test]
    fn vault_names_match_config() {
        let names: Vec<_> = Vault::ALL.iter().map(Vault::name).collect();
        assert_eq!(
            names,
            vec![TREE_META, TREE_TRANSACTIONS, TREE_LOCKS, TREE_PAYMENTS]
        );
    }
}
