//! # Payment Registry
//!
//! Append/lookup store of usage payments from application users to
//! resource providers. A payment records who paid whom, for how many
//! hours, at what rate. There are no balances here and payments are never
//! amended.

use caution_protocol::storage::{load, KvStore, StagedStore, StorageError, Vault};
use caution_protocol::{AddressValidator, Amount};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("invalid payment id: must be non-empty")]
    InvalidPaymentId,

    /// Payer or payee is malformed, or both are the same account.
    #[error("invalid parties: {from:?} -> {to:?}")]
    InvalidParties { from: String, to: String },

    #[error("invalid amount {0}: must not be negative")]
    InvalidAmount(Amount),

    #[error("invalid rate {0}: must not be negative")]
    InvalidRate(Amount),

    #[error("payment {0} already exists")]
    PaymentIdAlreadyExists(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl PaymentError {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentError::InvalidPaymentId => "InvalidPaymentId",
            PaymentError::InvalidParties { .. } => "InvalidParties",
            PaymentError::InvalidAmount(_) => "InvalidAmount",
            PaymentError::InvalidRate(_) => "InvalidRate",
            PaymentError::PaymentIdAlreadyExists(_) => "PaymentIdAlreadyExists",
            PaymentError::Storage(_) => "Storage",
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Caller-supplied arguments to `create_payment`. The payer is the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub payment_id: String,
    /// Resource provider receiving the payment.
    pub to: String,
    pub hours: u64,
    /// Price per hour.
    pub rate: Amount,
    pub amount: Amount,
    pub resource_id: String,
    pub application_id: String,
}

/// One stored payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub from: String,
    pub to: String,
    pub amount: Amount,
    pub hours: u64,
    pub rate: Amount,
    pub resource_id: String,
    pub application_id: String,
}

// ---------------------------------------------------------------------------
// PaymentRegistry
// ---------------------------------------------------------------------------

pub struct PaymentRegistry<S: KvStore> {
    store: S,
    validator: Box<dyn AddressValidator>,
    writer: Mutex<()>,
}

impl<S: KvStore> PaymentRegistry<S> {
    pub fn new(store: S, validator: impl AddressValidator + 'static) -> Self {
        Self {
            store,
            validator: Box::new(validator),
            writer: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a payment from `caller` to `request.to`.
    ///
    /// Checks, in order: id non-empty, both parties valid and distinct,
    /// amount and rate not negative, id not already used.
    pub fn create_payment(
        &self,
        caller: &str,
        request: &PaymentRequest,
    ) -> Result<PaymentRecord, PaymentError> {
        let _writer = self.writer.lock();

        let result = self.apply_create(caller, request);
        match &result {
            Ok(record) => info!(
                payment_id = %request.payment_id,
                from = %record.from,
                to = %record.to,
                amount = %record.amount,
                hours = record.hours,
                "payment recorded"
            ),
            Err(e @ PaymentError::Storage(_)) => warn!(
                payment_id = %request.payment_id,
                error = %e,
                "create_payment failed in storage"
            ),
            Err(e) => debug!(
                payment_id = %request.payment_id,
                kind = e.kind(),
                error = %e,
                "create_payment rejected"
            ),
        }
        result
    }

    fn apply_create(
        &self,
        caller: &str,
        request: &PaymentRequest,
    ) -> Result<PaymentRecord, PaymentError> {
        if request.payment_id.is_empty() {
            return Err(PaymentError::InvalidPaymentId);
        }
        if caller == request.to
            || !self.validator.is_valid(caller)
            || !self.validator.is_valid(&request.to)
        {
            return Err(PaymentError::InvalidParties {
                from: caller.to_string(),
                to: request.to.clone(),
            });
        }
        if request.amount.is_negative() {
            return Err(PaymentError::InvalidAmount(request.amount));
        }
        if request.rate.is_negative() {
            return Err(PaymentError::InvalidRate(request.rate));
        }

        let mut staged = StagedStore::new(&self.store);
        if staged.get(Vault::Payments, &request.payment_id)?.is_some() {
            return Err(PaymentError::PaymentIdAlreadyExists(
                request.payment_id.clone(),
            ));
        }

        let record = PaymentRecord {
            from: caller.to_string(),
            to: request.to.clone(),
            amount: request.amount,
            hours: request.hours,
            rate: request.rate,
            resource_id: request.resource_id.clone(),
            application_id: request.application_id.clone(),
        };
        staged.put_record(Vault::Payments, &request.payment_id, &record)?;
        staged.commit()?;

        Ok(record)
    }

    pub fn get_payment(&self, payment_id: &str) -> Result<Option<PaymentRecord>, PaymentError> {
        Ok(load(&self.store, Vault::Payments, payment_id)?)
    }

    /// Number of payments on record.
    pub fn payment_count(&self) -> Result<usize, PaymentError> {
        Ok(self.store.count(Vault::Payments)?)
    }
}
