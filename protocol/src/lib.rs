// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Caution Protocol: Core Library
//!
//! The primitives underneath the caution escrow ledger. A participant who
//! lists a resource or an application on the platform posts a refundable
//! deposit (the "caution"); the ledger in `caution-contracts` keeps the
//! books for those deposits. This crate holds everything the ledger needs
//! that is not ledger logic itself.
//!
//! ## Modules
//!
//! - **amount**: Exact decimal amounts. No floats anywhere near money.
//! - **identity**: Account addresses and the address validity oracle.
//! - **codec**: Textual record encoding for vault entries.
//! - **storage**: Namespaced key-value substrate with atomic commit.
//! - **config**: Protocol constants.
//!
//! ## Design Philosophy
//!
//! 1. Bookkeeping is exact or it is wrong. Amounts are decimals that
//!    round-trip through storage byte-for-byte.
//! 2. A ledger call either commits every write or none of them.
//! 3. If it touches money, it has tests. Plural.

pub mod amount;
pub mod codec;
pub mod config;
pub mod identity;
pub mod storage;

pub use amount::Amount;
pub use identity::{AddressValidator, Bech32AddressValidator};
