//! Error types for the escrow ledger.
//!
//! Every ledger operation that can fail returns an [`EscrowError`]. Any
//! error aborts the call; none of its writes are committed.

use caution_protocol::storage::StorageError;
use caution_protocol::Amount;
use thiserror::Error;

/// Errors that can occur during escrow ledger operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    /// A deposit was attempted by the escrow identity itself.
    #[error("invalid sender {0}: deposits must come from a non-escrow account")]
    InvalidSender(String),

    #[error("invalid transaction id: must be non-empty")]
    InvalidTransactionId,

    /// The address failed format validation.
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("invalid asset type {0}: must be 1 (resource) or 2 (application)")]
    InvalidAssetType(u8),

    #[error("invalid amount {0}: must not be negative")]
    InvalidAmount(Amount),

    /// A record already exists under this transaction id.
    #[error("transaction {0} already exists")]
    DuplicateTransactionId(String),

    #[error("transaction {0} not found")]
    TransactionNotFound(String),

    /// The caller is not the escrow identity stored on the record.
    #[error("unauthorized release: caller {caller} is not escrow {escrow}")]
    UnauthorizedRelease {
        /// Identity that issued the call.
        caller: String,
        /// Identity recorded on the transaction.
        escrow: String,
    },

    /// The transaction has already been released.
    #[error("transaction {0} already refunded")]
    AlreadyRefunded(String),

    #[error("no amount locked for {0}")]
    NoLockedBalance(String),

    #[error("insufficient locked balance for {account}: requested {requested}, locked {locked}")]
    InsufficientLockedBalance {
        account: String,
        requested: Amount,
        locked: Amount,
    },

    /// The locked balance would leave the representable decimal range.
    #[error("amount overflow: locked balance out of range")]
    AmountOverflow,

    #[error("ledger not initialized: no escrow account stored")]
    NotInitialized,

    #[error("ledger already initialized with escrow {0}")]
    AlreadyInitialized(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl EscrowError {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EscrowError::InvalidSender(_) => "InvalidSender",
            EscrowError::InvalidTransactionId => "InvalidTransactionId",
            EscrowError::InvalidAddress(_) => "InvalidAddress",
            EscrowError::InvalidAssetType(_) => "InvalidAssetType",
            EscrowError::InvalidAmount(_) => "InvalidAmount",
            EscrowError::DuplicateTransactionId(_) => "DuplicateTransactionId",
            EscrowError::TransactionNotFound(_) => "TransactionNotFound",
            EscrowError::UnauthorizedRelease { .. } => "UnauthorizedRelease",
            EscrowError::AlreadyRefunded(_) => "AlreadyRefunded",
            EscrowError::NoLockedBalance(_) => "NoLockedBalance",
            EscrowError::InsufficientLockedBalance { .. } => "InsufficientLockedBalance",
            EscrowError::AmountOverflow => "AmountOverflow",
            EscrowError::NotInitialized => "NotInitialized",
            EscrowError::AlreadyInitialized(_) => "AlreadyInitialized",
            EscrowError::Storage(_) => "Storage",
        }
    }
}
