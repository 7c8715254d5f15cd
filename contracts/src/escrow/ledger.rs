//! The escrow ledger state machine.

use caution_protocol::config::META_ESCROW_ACCOUNT;
use caution_protocol::storage::{load, KvStore, StagedStore, Vault};
use caution_protocol::{AddressValidator, Amount};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::error::EscrowError;
use super::types::{AssetType, DepositRequest, LockBalance, TransactionRecord};

/// Escrow ledger over a key-value store.
///
/// Holds the ledger's own escrow identity, fixed at [`init`](Self::init)
/// and never changed afterwards. Mutating calls serialize on an internal
/// writer lock and stage their writes; reads go straight to the store.
pub struct EscrowLedger<S: KvStore> {
    store: S,
    escrow_account: String,
    validator: Box<dyn AddressValidator>,
    writer: Mutex<()>,
}

impl<S: KvStore> EscrowLedger<S> {
    /// Initialize a ledger on `store` with the given escrow identity.
    ///
    /// The identity is persisted in the metadata vault. Calling `init`
    /// again on the same store with the same identity just reopens it.
    ///
    /// # Errors
    ///
    /// [`EscrowError::InvalidAddress`] if the identity is malformed,
    /// [`EscrowError::AlreadyInitialized`] if the store already belongs to a
    /// different escrow.
    pub fn init(
        store: S,
        escrow_account: impl Into<String>,
        validator: impl AddressValidator + 'static,
    ) -> Result<Self, EscrowError> {
        let escrow_account = escrow_account.into();
        if !validator.is_valid(&escrow_account) {
            return Err(EscrowError::InvalidAddress(escrow_account));
        }

        match load::<String, _>(&store, Vault::Meta, META_ESCROW_ACCOUNT)? {
            Some(existing) if existing == escrow_account => {
                debug!(escrow = %escrow_account, "escrow ledger already initialized");
            }
            Some(existing) => return Err(EscrowError::AlreadyInitialized(existing)),
            None => {
                let mut staged = StagedStore::new(&store);
                staged.put_record(Vault::Meta, META_ESCROW_ACCOUNT, &escrow_account)?;
                staged.commit()?;
                info!(escrow = %escrow_account, "escrow ledger initialized");
            }
        }

        Ok(Self {
            store,
            escrow_account,
            validator: Box::new(validator),
            writer: Mutex::new(()),
        })
    }

    /// Reopen a previously initialized ledger.
    ///
    /// # Errors
    ///
    /// [`EscrowError::NotInitialized`] if the store carries no escrow identity.
    pub fn open(store: S, validator: impl AddressValidator + 'static) -> Result<Self, EscrowError> {
        let escrow_account = load::<String, _>(&store, Vault::Meta, META_ESCROW_ACCOUNT)?
            .ok_or(EscrowError::NotInitialized)?;

        Ok(Self {
            store,
            escrow_account,
            validator: Box::new(validator),
            writer: Mutex::new(()),
        })
    }

    /// The ledger's escrow identity.
    pub fn escrow_address(&self) -> &str {
        &self.escrow_account
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a new deposit and lock its amount for the depositor.
    ///
    /// Checks run in order and the first failure aborts the call:
    /// caller is not the escrow, id non-empty, depositor address valid,
    /// asset type known, amount not negative, id not already used.
    ///
    /// On success both the new record and the depositor's increased
    /// locked balance are committed together.
    pub fn create_transaction(
        &self,
        caller: &str,
        request: &DepositRequest,
    ) -> Result<TransactionRecord, EscrowError> {
        let _writer = self.writer.lock();

        let result = self.apply_create(caller, request);
        match &result {
            Ok(record) => info!(
                transaction_id = %request.transaction_id,
                from = %record.from,
                amount = %record.amount,
                asset_type = %record.asset_type,
                "deposit locked"
            ),
            Err(e @ EscrowError::Storage(_)) => warn!(
                transaction_id = %request.transaction_id,
                error = %e,
                "create_transaction failed in storage"
            ),
            Err(e) => debug!(
                transaction_id = %request.transaction_id,
                kind = e.kind(),
                error = %e,
                "create_transaction rejected"
            ),
        }
        result
    }

    fn apply_create(
        &self,
        caller: &str,
        request: &DepositRequest,
    ) -> Result<TransactionRecord, EscrowError> {
        // Bech32 is case-insensitive; any spelling of the escrow is the escrow.
        if caller.eq_ignore_ascii_case(&self.escrow_account) {
            return Err(EscrowError::InvalidSender(caller.to_string()));
        }
        if request.transaction_id.is_empty() {
            return Err(EscrowError::InvalidTransactionId);
        }
        if !self.validator.is_valid(&request.from) {
            return Err(EscrowError::InvalidAddress(request.from.clone()));
        }
        let asset_type = AssetType::from_tag(request.asset_type)
            .ok_or(EscrowError::InvalidAssetType(request.asset_type))?;
        if request.amount.is_negative() {
            return Err(EscrowError::InvalidAmount(request.amount));
        }

        let mut staged = StagedStore::new(&self.store);
        if staged
            .get(Vault::Transactions, &request.transaction_id)?
            .is_some()
        {
            return Err(EscrowError::DuplicateTransactionId(
                request.transaction_id.clone(),
            ));
        }

        let record = TransactionRecord {
            from: request.from.clone(),
            asset_id: request.asset_id.clone(),
            asset_type,
            amount: request.amount,
            escrow_account: self.escrow_account.clone(),
            payment_id: request.payment_id.clone(),
            is_refunded: false,
            refund_id: None,
        };
        staged.put_record(Vault::Transactions, &request.transaction_id, &record)?;
        lock(&mut staged, &record.from, record.amount)?;
        staged.commit()?;

        Ok(record)
    }

    /// Release a deposit back to its depositor.
    ///
    /// Only the escrow identity stored on the record may release it, and
    /// only once. On success the depositor's locked balance drops by the
    /// record's amount and the record is marked refunded with `refund_id`.
    pub fn release_amount(
        &self,
        caller: &str,
        transaction_id: &str,
        refund_id: &str,
    ) -> Result<TransactionRecord, EscrowError> {
        let _writer = self.writer.lock();

        let result = self.apply_release(caller, transaction_id, refund_id);
        match &result {
            Ok(record) => info!(
                transaction_id,
                from = %record.from,
                amount = %record.amount,
                refund_id,
                "deposit released"
            ),
            Err(e @ EscrowError::Storage(_)) => warn!(
                transaction_id,
                error = %e,
                "release_amount failed in storage"
            ),
            Err(e) => debug!(
                transaction_id,
                kind = e.kind(),
                error = %e,
                "release_amount rejected"
            ),
        }
        result
    }

    fn apply_release(
        &self,
        caller: &str,
        transaction_id: &str,
        refund_id: &str,
    ) -> Result<TransactionRecord, EscrowError> {
        if transaction_id.is_empty() {
            return Err(EscrowError::InvalidTransactionId);
        }

        let mut staged = StagedStore::new(&self.store);
        let mut record: TransactionRecord = staged
            .get_record(Vault::Transactions, transaction_id)?
            .ok_or_else(|| EscrowError::TransactionNotFound(transaction_id.to_string()))?;

        if caller != record.escrow_account {
            return Err(EscrowError::UnauthorizedRelease {
                caller: caller.to_string(),
                escrow: record.escrow_account,
            });
        }
        if !record.is_open() {
            return Err(EscrowError::AlreadyRefunded(transaction_id.to_string()));
        }

        release(&mut staged, &record.from, &record.from, record.amount)?;
        record.mark_refunded(refund_id);
        staged.put_record(Vault::Transactions, transaction_id, &record)?;
        staged.commit()?;

        Ok(record)
    }

    /// Currently locked balance for `account`, if it ever had one.
    pub fn amount_locked(&self, account: &str) -> Result<Option<LockBalance>, EscrowError> {
        Ok(load(&self.store, Vault::Locks, account)?)
    }

    /// The stored record for `transaction_id`, if any.
    pub fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, EscrowError> {
        Ok(load(&self.store, Vault::Transactions, transaction_id)?)
    }
}

// ---------------------------------------------------------------------------
// Lock bookkeeping
// ---------------------------------------------------------------------------

/// Add `amount` to the locked balance of `from`, creating it at zero.
fn lock<S: KvStore + ?Sized>(
    staged: &mut StagedStore<'_, S>,
    from: &str,
    amount: Amount,
) -> Result<LockBalance, EscrowError> {
    let current: LockBalance = staged.get_record(Vault::Locks, from)?.unwrap_or_default();
    let balance = current
        .balance
        .checked_add(amount)
        .ok_or(EscrowError::AmountOverflow)?;

    let updated = LockBalance::new(balance);
    staged.put_record(Vault::Locks, from, &updated)?;
    trace!(account = from, %balance, "lock balance increased");
    Ok(updated)
}

/// Take `amount` out of the locked balance of `from`.
///
/// `to` is the intended recipient of the value. Moving value to it is the
/// host's job; the ledger only adjusts the books of `from`.
fn release<S: KvStore + ?Sized>(
    staged: &mut StagedStore<'_, S>,
    from: &str,
    to: &str,
    amount: Amount,
) -> Result<LockBalance, EscrowError> {
    let current: LockBalance = staged
        .get_record(Vault::Locks, from)?
        .ok_or_else(|| EscrowError::NoLockedBalance(from.to_string()))?;

    if amount > current.balance {
        return Err(EscrowError::InsufficientLockedBalance {
            account: from.to_string(),
            requested: amount,
            locked: current.balance,
        });
    }

    let balance = current
        .balance
        .checked_sub(amount)
        .ok_or(EscrowError::AmountOverflow)?;

    let updated = LockBalance::new(balance);
    staged.put_record(Vault::Locks, from, &updated)?;
    trace!(account = from, recipient = to, %balance, "lock balance decreased");
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
