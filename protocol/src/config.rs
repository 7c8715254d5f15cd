//! # Protocol Configuration & Constants
//!
//! Every fixed value the ledger and the node agree on lives here. The
//! escrow identity itself is *not* a constant: it is chosen once at
//! `init` time and persisted in the metadata vault.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Ledger protocol version. Bump the minor on new operations, the major
/// on any change to the persisted record encoding.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Bech32 human-readable prefix for account addresses.
pub const ADDRESS_HRP: &str = "caution";

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// sled tree holding scalar metadata (the escrow identity).
pub const TREE_META: &str = "meta";

/// sled tree holding transaction records, keyed by transaction id.
pub const TREE_TRANSACTIONS: &str = "transaction_vault";

/// sled tree holding locked balances, keyed by account.
pub const TREE_LOCKS: &str = "lock_vault";

/// sled tree holding payment records, keyed by payment id.
pub const TREE_PAYMENTS: &str = "payment_vault";

/// Metadata key under which the escrow identity is stored.
pub const META_ESCROW_ACCOUNT: &str = "escrow_account";

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// HTTP header carrying the identity of the account issuing a call.
pub const CALLER_HEADER: &str = "x-caller";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_names_are_distinct() {
        let names = [TREE_META, TREE_TRANSACTIONS, TREE_LOCKS, TREE_PAYMENTS];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn ports_do_not_collide() {
        assert_ne!(DEFAULT_RPC_PORT, DEFAULT_METRICS_PORT);
    }

    #[test]
    fn caller_header_is_lowercase() {
        // http::HeaderName only accepts lowercase static names.
        assert_eq!(CALLER_HEADER, CALLER_HEADER.to_lowercase());
    }
}
