//! # Escrow Ledger
//!
//! Bookkeeping for caution deposits. The lifecycle of one deposit is:
//!
//! 1. **Create**: a participant (never the escrow itself) registers a
//!    deposit under a fresh transaction id. The amount is added to the
//!    depositor's locked balance.
//! 2. **Release**: the escrow identity that recorded the deposit releases
//!    it. The amount leaves the locked balance and the record is marked
//!    refunded, once and forever.
//!
//! The ledger keeps two vaults: transaction records keyed by id, and
//! locked balances keyed by account. For every account, the locked
//! balance equals the sum of its deposits that are not yet refunded.
//!
//! No tokens move here. Value transfer is whatever the host does when a
//! call commits.

mod error;
mod ledger;
mod types;

pub use error::EscrowError;
pub use ledger::EscrowLedger;
pub use types::{is_valid_asset_type, AssetType, DepositRequest, LockBalance, TransactionRecord};
