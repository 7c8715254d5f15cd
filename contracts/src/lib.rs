//! # Caution Contracts
//!
//! Ledger logic for refundable listing deposits. When a participant adds a
//! resource or an application to the platform they post a caution amount;
//! when the listing is withdrawn, the escrow authority releases it.
//!
//! - **Escrow Ledger**: records every deposit as an immutable transaction,
//!   keeps a per-account locked balance, and lets only the escrow identity
//!   that recorded a deposit release it.
//! - **Payment Registry**: a flat append/lookup store of usage payments
//!   between application users and resource providers. No balances.
//!
//! ## Design Principles
//!
//! 1. All monetary arithmetic is exact and checked: `Amount` is a decimal,
//!    never a float, and sums use `checked_add` / `checked_sub`.
//! 2. Every mutating call runs inside one writer lock and one staging
//!    overlay: it commits everything or nothing.
//! 3. Failures are typed and returned; nothing panics, nothing is
//!    logged-and-ignored.
//! 4. Every persisted type is serializable (serde) so the same structs
//!    travel over the API and into storage.

pub mod escrow;
pub mod payment;

pub use escrow::{
    is_valid_asset_type, AssetType, DepositRequest, EscrowError, EscrowLedger, LockBalance,
    TransactionRecord,
};
pub use payment::{PaymentError, PaymentRecord, PaymentRegistry, PaymentRequest};
