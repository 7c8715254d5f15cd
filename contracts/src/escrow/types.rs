//! Ledger entities. Storage-agnostic: these types only know how to
//! serialize, not where they are kept.

use caution_protocol::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// AssetType
// ---------------------------------------------------------------------------

/// What a deposit backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    /// A resource listing (wire tag 1).
    Resource,
    /// An application listing (wire tag 2).
    Application,
}

impl AssetType {
    /// Decode a wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(AssetType::Resource),
            2 => Some(AssetType::Application),
            _ => None,
        }
    }

    /// The wire tag for this asset type.
    pub fn tag(&self) -> u8 {
        match self {
            AssetType::Resource => 1,
            AssetType::Application => 2,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetType::Resource => write!(f, "Resource"),
            AssetType::Application => write!(f, "Application"),
        }
    }
}

/// `true` iff `tag` names a known asset type.
pub fn is_valid_asset_type(tag: u8) -> bool {
    AssetType::from_tag(tag).is_some()
}

// ---------------------------------------------------------------------------
// DepositRequest
// ---------------------------------------------------------------------------

/// Caller-supplied arguments to `create_transaction`.
///
/// `asset_type` stays a raw tag here; the ledger validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub transaction_id: String,
    pub from: String,
    pub asset_id: String,
    pub asset_type: u8,
    pub amount: Amount,
    pub payment_id: String,
}

// ---------------------------------------------------------------------------
// TransactionRecord
// ---------------------------------------------------------------------------

/// One deposit, as stored in the transaction vault.
///
/// Immutable after creation except for the single refund transition,
/// which flips `is_refunded` to `true` and sets `refund_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Depositor account.
    pub from: String,
    /// Resource or application this deposit backs.
    pub asset_id: String,
    pub asset_type: AssetType,
    /// Deposited amount. Never negative.
    pub amount: Amount,
    /// Escrow identity that recorded the deposit and alone may release it.
    pub escrow_account: String,
    /// Correlation id of the payment that funded the deposit.
    pub payment_id: String,
    pub is_refunded: bool,
    /// Correlation id of the refund. Set only by release.
    pub refund_id: Option<String>,
}

impl TransactionRecord {
    /// `true` while the amount still counts towards the locked balance.
    pub fn is_open(&self) -> bool {
        !self.is_refunded
    }

    pub(crate) fn mark_refunded(&mut self, refund_id: &str) {
        self.is_refunded = true;
        self.refund_id = Some(refund_id.to_string());
    }
}

// ---------------------------------------------------------------------------
// LockBalance
// ---------------------------------------------------------------------------

/// Total currently locked for one account. Never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockBalance {
    pub balance: Amount,
}

impl LockBalance {
    pub fn new(balance: Amount) -> Self {
        Self { balance }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_tags_round_trip() {
        for ty in [AssetType::Resource, AssetType::Application] {
            assert_eq!(AssetType::from_tag(ty.tag()), Some(ty));
        }
    }

    #[test]
    fn only_resource_and_application_are_valid() {
        assert!(!is_valid_asset_type(0));
        assert!(is_valid_asset_type(1));
        assert!(is_valid_asset_type(2));
        assert!(!is_valid_asset_type(3));
        assert!(!is_valid_asset_type(u8::MAX));
    }

    #[test]
    fn mark_refunded_sets_both_fields() {
        let mut record = TransactionRecord {
            from: "a".into(),
            asset_id: "res-1".into(),
            asset_type: AssetType::Resource,
            amount: "10".parse().unwrap(),
            escrow_account: "e".into(),
            payment_id: "pay1".into(),
            is_refunded: false,
            refund_id: None,
        };
        assert!(record.is_open());
        record.mark_refunded("refund1");
        assert!(!record.is_open());
        assert_eq!(record.refund_id.as_deref(), Some("refund1"));
    }

    #[test]
    fn lock_balance_default_is_zero() {
        assert!(LockBalance::default().balance.is_zero());
    }

    #[test]
    fn deposit_request_amount_is_a_string_on_the_wire() {
        let json = r#"{
            "transaction_id": "tx1",
            "from": "caution1abc",
            "asset_id": "res-1",
            "asset_type": 1,
            "amount": "100.25",
            "payment_id": "pay1"
        }"#;
        let req: DepositRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.amount.to_string(), "100.25");
        assert_eq!(req.asset_type, 1);
    }
}
