//! # CautionDB: Persistent Storage Engine
//!
//! The on-disk [`KvStore`], built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! Each vault gets its own sled tree:
//!
//! | Tree                | Key                     | Value                      |
//! |---------------------|-------------------------|----------------------------|
//! | `meta`              | slot name (UTF-8)       | JSON string                |
//! | `transaction_vault` | transaction id (UTF-8)  | JSON `TransactionRecord`   |
//! | `lock_vault`        | account (UTF-8)         | JSON `LockBalance`         |
//! | `payment_vault`     | payment id (UTF-8)      | JSON `PaymentRecord`       |
//!
//! ## Atomicity
//!
//! A commit touches several trees at once (a create writes both the
//! transaction vault and the lock vault). All of them are written inside
//! one sled multi-tree transaction, so either every tree sees the batch or
//! none does.

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;

use super::kv::{KvStore, StorageError, StorageResult, Vault, WriteSet};

/// Persistent storage engine for the caution ledger.
///
/// # Thread Safety
///
/// sled handles are cheap to clone and safe to share; `CautionDB` can be
/// used from many threads via `Arc<CautionDB>` or by cloning.
#[derive(Debug, Clone)]
pub struct CautionDB {
    db: Db,
    meta: Tree,
    transactions: Tree,
    locks: Tree,
    payments: Tree,
}

impl CautionDB {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    ///
    /// Ideal for unit tests: no filesystem side effects, no cleanup needed.
    pub fn open_temporary() -> StorageResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StorageResult<Self> {
        let meta = db.open_tree(Vault::Meta.name())?;
        let transactions = db.open_tree(Vault::Transactions.name())?;
        let locks = db.open_tree(Vault::Locks.name())?;
        let payments = db.open_tree(Vault::Payments.name())?;

        Ok(Self {
            db,
            meta,
            transactions,
            locks,
            payments,
        })
    }

    fn tree(&self, vault: Vault) -> &Tree {
        match vault {
            Vault::Meta => &self.meta,
            Vault::Transactions => &self.transactions,
            Vault::Locks => &self.locks,
            Vault::Payments => &self.payments,
        }
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> StorageResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl KvStore for CautionDB {
    fn get(&self, vault: Vault, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.tree(vault).get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn commit(&self, writes: WriteSet) -> StorageResult<()> {
        let result: Result<(), TransactionError<()>> =
            (&self.meta, &self.transactions, &self.locks, &self.payments).transaction(
                |(meta, transactions, locks, payments)| {
                    for (vault, key, value) in writes.iter() {
                        let tree = match vault {
                            Vault::Meta => meta,
                            Vault::Transactions => transactions,
                            Vault::Locks => locks,
                            Vault::Payments => payments,
                        };
                        tree.insert(key.as_bytes(), value)?;
                    }
                    Ok::<(), ConflictableTransactionError<()>>(())
                },
            );

        match result {
            Ok(()) => {}
            Err(TransactionError::Storage(e)) => return Err(StorageError::Sled(e)),
            Err(TransactionError::Abort(())) => {
                return Err(StorageError::Aborted("multi-tree transaction".into()))
            }
        }

        self.db.flush()?;
        Ok(())
    }

    fn count(&self, vault: Vault) -> StorageResult<usize> {
        Ok(self.tree(vault).len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
