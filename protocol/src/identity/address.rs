//! Address validity oracle and the default Bech32 address scheme.

use bech32::{Bech32, Hrp};
use thiserror::Error;

use crate::config::ADDRESS_HRP;

/// Length of the hash payload carried by a Bech32 address.
const ADDRESS_PAYLOAD_LEN: usize = 32;

/// Errors from address construction.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The human-readable prefix is not a legal Bech32 HRP.
    #[error("invalid address prefix '{0}'")]
    InvalidHrp(String),

    /// Bech32 encoding failed.
    #[error("bech32 encode error: {0}")]
    Encode(String),
}

/// Decides whether a string is a syntactically valid account identifier.
///
/// This is the host's address-format oracle. The ledger calls it on every
/// address it is about to store and never second-guesses the answer.
pub trait AddressValidator: Send + Sync {
    /// `true` if `address` is well-formed.
    fn is_valid(&self, address: &str) -> bool;
}

impl<F> AddressValidator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid(&self, address: &str) -> bool {
        self(address)
    }
}

/// Accepts Bech32 strings with a fixed prefix and a 32-byte payload.
#[derive(Debug, Clone)]
pub struct Bech32AddressValidator {
    hrp: Hrp,
}

impl Bech32AddressValidator {
    /// Build a validator for the given human-readable prefix.
    pub fn new(hrp: &str) -> Result<Self, AddressError> {
        let hrp = Hrp::parse(hrp).map_err(|_| AddressError::InvalidHrp(hrp.to_string()))?;
        Ok(Self { hrp })
    }

    /// The prefix this validator enforces.
    pub fn hrp(&self) -> &str {
        self.hrp.as_str()
    }
}

impl Default for Bech32AddressValidator {
    fn default() -> Self {
        Self::new(ADDRESS_HRP).expect("static HRP is valid")
    }
}

impl AddressValidator for Bech32AddressValidator {
    /// Only the lowercase form is accepted. Bech32 decoding ignores case,
    /// and the ledger keys balances by the raw string, so an uppercase
    /// spelling would name the same account twice.
    fn is_valid(&self, address: &str) -> bool {
        if address.bytes().any(|b| b.is_ascii_uppercase()) {
            return false;
        }
        match bech32::decode(address) {
            Ok((hrp, data)) => hrp == self.hrp && data.len() == ADDRESS_PAYLOAD_LEN,
            Err(_) => false,
        }
    }
}

/// Derive a well-formed address from arbitrary seed bytes.
///
/// The seed is hashed with BLAKE3 and the digest is Bech32-encoded under
/// `hrp`. Deterministic: the same seed always yields the same address.
pub fn derive_address(hrp: &str, seed: &[u8]) -> Result<String, AddressError> {
    let hrp = Hrp::parse(hrp).map_err(|_| AddressError::InvalidHrp(hrp.to_string()))?;
    let digest = blake3::hash(seed);
    bech32::encode::<Bech32>(hrp, digest.as_bytes())
        .map_err(|e| AddressError::Encode(e.to_string()))
}
