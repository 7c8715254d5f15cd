//! Per-call staging overlay.
//!
//! A [`StagedStore`] sits between one ledger call and the backing store.
//! Reads see the call's own pending writes first, then fall through to the
//! store. Nothing reaches the store until [`StagedStore::commit`]; if the
//! call bails out with an error, the overlay is dropped and the store is
//! untouched.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::kv::{KvStore, StorageResult, Vault, WriteSet};
use crate::codec;

/// Write-ahead staging buffer over a [`KvStore`].
pub struct StagedStore<'a, S: KvStore + ?Sized> {
    base: &'a S,
    writes: WriteSet,
}

impl<'a, S: KvStore + ?Sized> StagedStore<'a, S> {
    /// Open an empty overlay on `base`.
    pub fn new(base: &'a S) -> Self {
        Self {
            base,
            writes: WriteSet::new(),
        }
    }

    /// Read a raw value, preferring staged writes.
    pub fn get(&self, vault: Vault, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if let Some(staged) = self.writes.get(vault, key) {
            return Ok(Some(staged.to_vec()));
        }
        self.base.get(vault, key)
    }

    /// Stage a raw value.
    pub fn put(&mut self, vault: Vault, key: &str, value: Vec<u8>) {
        self.writes.put(vault, key, value);
    }

    /// Read and decode a record.
    pub fn get_record<T: DeserializeOwned>(
        &self,
        vault: Vault,
        key: &str,
    ) -> StorageResult<Option<T>> {
        match self.get(vault, key)? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Encode and stage a record.
    pub fn put_record<T: Serialize>(
        &mut self,
        vault: Vault,
        key: &str,
        record: &T,
    ) -> StorageResult<()> {
        let bytes = codec::encode(record)?;
        self.put(vault, key, bytes);
        Ok(())
    }

    /// Apply every staged write to the backing store in one atomic step.
    pub fn commit(self) -> StorageResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        self.base.commit(self.writes)
    }
}
