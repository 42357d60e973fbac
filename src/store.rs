use crate::error::{PaymentError, PaymentResult};
use crate::ledger::{Ledger, LedgerOperation};
use crate::order::{PaymentOrder, PaymentStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;

/// Result of an attempted terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The status was persisted and `executed` queued operations fired.
    Applied { executed: usize },
    /// The stored order was already terminal (or already at the target
    /// status): nothing happened. Duplicate and racing terminal signals
    /// land here.
    AlreadyFinalized,
}

/// Persistence seam for orders. Real deployments implement this over their
/// database; an in-memory implementation ships for tests and embedding.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order and assigns its identity.
    async fn create(&self, order: PaymentOrder) -> PaymentResult<PaymentOrder>;

    async fn get(&self, id: i64) -> PaymentResult<PaymentOrder>;

    async fn save(&self, order: &PaymentOrder) -> PaymentResult<()>;

    /// The atomic terminal transition, and the only place queued ledger
    /// operations execute.
    ///
    /// Contract: re-read the stored order under the store's own lock or
    /// transaction and compare-and-swap on the status - if it is already
    /// terminal, return `AlreadyFinalized` without side effects. Otherwise
    /// execute the operations whose condition matches `new_status` in
    /// position order as one all-or-nothing ledger batch, then persist the
    /// status. A failure anywhere must leave both status and ledger
    /// untouched. A SQL implementation would take a row lock
    /// (`SELECT ... FOR UPDATE`) or a conditional status `UPDATE` for the
    /// same effect.
    async fn finalize(
        &self,
        order: &mut PaymentOrder,
        new_status: PaymentStatus,
        ledger: &dyn Ledger,
    ) -> PaymentResult<FinalizeOutcome>;
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    orders: HashMap<i64, PaymentOrder>,
    next_id: i64,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, mut order: PaymentOrder) -> PaymentResult<PaymentOrder> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        order.id = state.next_id;
        // Items queued before creation pick up the document reference now.
        for item in &mut order.items {
            item.operation.document_id = Some(order.id);
        }
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: i64) -> PaymentResult<PaymentOrder> {
        self.state
            .lock()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or(PaymentError::UnknownOrder { id })
    }

    async fn save(&self, order: &PaymentOrder) -> PaymentResult<()> {
        let mut state = self.state.lock().await;
        if !state.orders.contains_key(&order.id) {
            return Err(PaymentError::UnknownOrder { id: order.id });
        }
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn finalize(
        &self,
        order: &mut PaymentOrder,
        new_status: PaymentStatus,
        ledger: &dyn Ledger,
    ) -> PaymentResult<FinalizeOutcome> {
        // The table lock is held across the whole transition; the order row
        // is the serialization point.
        let mut state = self.state.lock().await;
        let stored = state
            .orders
            .get(&order.id)
            .cloned()
            .ok_or(PaymentError::UnknownOrder { id: order.id })?;

        if stored.status.is_terminal() || stored.status == new_status {
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }

        let items = order.items_for(new_status);
        let ops: Vec<LedgerOperation> = items.iter().map(|i| i.operation.clone()).collect();
        ledger.execute_batch(&ops).await?;

        order.status = new_status;
        order.updated_at = Utc::now();
        state.orders.insert(order.id, order.clone());

        info!(
            order_id = order.id,
            status = %new_status,
            executed = ops.len(),
            "payment order finalized"
        );
        Ok(FinalizeOutcome::Applied {
            executed: ops.len(),
        })
    }
}
