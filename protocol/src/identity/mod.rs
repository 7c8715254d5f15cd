//! # Identity Module
//!
//! Account identifiers for the caution ledger. The ledger itself never
//! decides what a well-formed address looks like; it asks an
//! [`AddressValidator`], which is a capability provided by the host.
//!
//! ## Address Format
//!
//! The default validator accepts Bech32 addresses carrying a 32-byte
//! payload under the `caution` human-readable prefix:
//!
//! ```text
//! seed / public key bytes
//!     -> BLAKE3(bytes) -> 32 bytes
//!     -> Bech32("caution", hash) -> caution1qw508d6qe...
//! ```
//!
//! Hosts with their own address scheme plug in a closure instead.

pub mod address;

pub use address::{derive_address, AddressValidator, Bech32AddressValidator};
