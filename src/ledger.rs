use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Insufficient funds on account {account}: required {required}, available {available}")]
    InsufficientFunds {
        account: String,
        required: i64,
        available: i64,
    },

    #[error("Unknown ledger account: {account}")]
    UnknownAccount { account: String },

    #[error("Ledger rejected operation: {message}")]
    Rejected { message: String },
}

/// Serialized, deferred instruction to move value between accounts.
///
/// The engine treats this as an opaque descriptor: it is queued on an order
/// as a `PaymentOrderItem` and handed to the `Ledger` when the order
/// finalizes. `kind` names the operation for the ledger's own dispatch
/// ("charge", "withdraw", "withdraw_reserve", "withdraw_rollback", ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerOperation {
    pub kind: String,
    /// Minor units.
    pub amount: i64,
    pub from_account: String,
    pub to_account: String,
    #[serde(default)]
    pub payer_id: Option<i64>,
    /// Reference back to the payment order that produced this movement.
    #[serde(default)]
    pub document_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
}

impl LedgerOperation {
    pub fn new(
        kind: impl Into<String>,
        amount: i64,
        from_account: impl Into<String>,
        to_account: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            amount,
            from_account: from_account.into(),
            to_account: to_account.into(),
            payer_id: None,
            document_id: None,
            title: None,
        }
    }
}

/// The double-entry ledger as the engine sees it: construct-from-descriptor
/// and execute. Internals (balance algorithm, document linkage) are the
/// implementor's business.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn execute(&self, op: &LedgerOperation) -> Result<(), LedgerError>;

    /// All-or-nothing: either every operation applies, in order, or none
    /// does. `OrderStore::finalize` relies on this to keep a terminal
    /// status and its ledger effects inseparable.
    async fn execute_batch(&self, ops: &[LedgerOperation]) -> Result<(), LedgerError>;
}

/// In-memory ledger with per-account balances and an append-only journal.
/// Validates a whole batch against a scratch balance map before committing
/// anything, which is what gives `execute_batch` its atomicity.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<String, i64>,
    journal: Vec<LedgerOperation>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn credit(&self, account: &str, amount: i64) {
        let mut state = self.state.lock().await;
        *state.balances.entry(account.to_string()).or_insert(0) += amount;
    }

    pub async fn balance(&self, account: &str) -> i64 {
        self.state
            .lock()
            .await
            .balances
            .get(account)
            .copied()
            .unwrap_or(0)
    }

    /// Executed operations, in application order.
    pub async fn journal(&self) -> Vec<LedgerOperation> {
        self.state.lock().await.journal.clone()
    }

    fn apply(
        balances: &mut HashMap<String, i64>,
        op: &LedgerOperation,
    ) -> Result<(), LedgerError> {
        let available = balances.get(&op.from_account).copied().unwrap_or(0);
        if available < op.amount {
            return Err(LedgerError::InsufficientFunds {
                account: op.from_account.clone(),
                required: op.amount,
                available,
            });
        }
        *balances.entry(op.from_account.clone()).or_insert(0) -= op.amount;
        *balances.entry(op.to_account.clone()).or_insert(0) += op.amount;
        Ok(())
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn execute(&self, op: &LedgerOperation) -> Result<(), LedgerError> {
        self.execute_batch(std::slice::from_ref(op)).await
    }

    async fn execute_batch(&self, ops: &[LedgerOperation]) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;

        // Dry run on a scratch copy so a mid-batch failure applies nothing.
        let mut scratch = state.balances.clone();
        for op in ops {
            Self::apply(&mut scratch, op)?;
        }

        state.balances = scratch;
        for op in ops {
            debug!(
                kind = %op.kind,
                amount = op.amount,
                from = %op.from_account,
                to = %op.to_account,
                "ledger operation applied"
            );
            state.journal.push(op.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn batch_applies_in_order() {
        let ledger = InMemoryLedger::new();
        ledger.credit("user:1", 1000).await;

        let ops = [
            LedgerOperation::new("withdraw_reserve", 600, "user:1", "system:reserve"),
            LedgerOperation::new("withdraw", 600, "system:reserve", "system:payout"),
        ];
        ledger.execute_batch(&ops).await.unwrap();

        assert_eq!(ledger.balance("user:1").await, 400);
        assert_eq!(ledger.balance("system:reserve").await, 0);
        assert_eq!(ledger.balance("system:payout").await, 600);

        let journal = ledger.journal().await;
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].kind, "withdraw_reserve");
        assert_eq!(journal[1].kind, "withdraw");
    }

    #[tokio::test]
    async fn failed_batch_applies_nothing() {
        let ledger = InMemoryLedger::new();
        ledger.credit("user:1", 100).await;

        let ops = [
            LedgerOperation::new("charge", 100, "user:1", "system:main"),
            // Second leg overdraws: the first leg must not stick either.
            LedgerOperation::new("charge", 500, "user:1", "system:main"),
        ];
        let err = ledger.execute_batch(&ops).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

        assert_eq!(ledger.balance("user:1").await, 100);
        assert_eq!(ledger.balance("system:main").await, 0);
        assert!(ledger.journal().await.is_empty());
    }

    #[test]
    fn operation_descriptor_round_trips_as_json() {
        let mut op = LedgerOperation::new("charge", 10_000, "system:gateway", "user:7");
        op.payer_id = Some(7);
        op.document_id = Some(42);

        let json = serde_json::to_string(&op).unwrap();
        let parsed: LedgerOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, op);
    }
}
