//! # Storage Module
//!
//! The keyed persistence substrate underneath the ledger.
//!
//! ## Architecture
//!
//! ```text
//! kv.rs: Vault namespaces, WriteSet, the KvStore trait, MemoryStore
//! staged.rs: Per-call staging overlay (read-your-writes, commit or drop)
//! db.rs: sled persistence, one tree per vault
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! ledger call ─► StagedStore ──(reads)──► KvStore
//!                    │
//!                    └─ commit(WriteSet) ─► KvStore  (all or nothing)
//! ```
//!
//! A ledger call never writes to the store directly. Every mutation lands
//! in the call's [`StagedStore`]; the call commits the accumulated
//! [`WriteSet`] in one atomic step when it succeeds, or simply drops the
//! overlay when it fails. Dropping *is* the rollback.

pub mod db;
pub mod kv;
pub mod staged;

pub use db::CautionDB;
pub use kv::{load, KvStore, MemoryStore, StorageError, StorageResult, Vault, WriteSet};
pub use staged::StagedStore;
