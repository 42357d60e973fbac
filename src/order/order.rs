use crate::commission::CommissionSnapshot;
use crate::ledger::LedgerOperation;
use crate::order::item::PaymentOrderItem;
use crate::order::method::{PaymentDirection, PaymentMethod};
use crate::order::status::PaymentStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;

/// The aggregate root: one payment or payout attempt.
///
/// Created by the caller through a `PaymentMethod`, mutated only by the
/// engine's lifecycle operations, never deleted. The provider call log is
/// the append-only audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentOrder {
    /// Assigned by the store at creation; 0 until then.
    pub id: i64,
    /// Opaque external-facing identifier.
    pub uid: String,
    pub description: Option<String>,

    pub method_name: String,
    /// Copied from the method so the order survives method edits.
    pub provider_name: String,
    pub direction: PaymentDirection,

    pub payer_id: i64,
    /// `None` for system-initiated orders.
    pub creator_id: Option<i64>,

    /// Site-side amount, minor units.
    pub in_amount: i64,
    pub in_currency: String,
    /// Provider-side amount, computed from `in_amount` at persistence time.
    pub out_amount: i64,
    pub out_currency: String,
    pub commission: CommissionSnapshot,
    /// Conversion rate used for the last `out_amount` calculation.
    pub rate_snapshot: Option<Decimal>,

    pub status: PaymentStatus,
    /// Provider's transaction id, set by the adapter.
    pub external_id: Option<String>,

    /// Provider-private scratch values, opaque to the engine.
    pub provider_params: BTreeMap<String, JsonValue>,
    /// Caller-supplied method parameters (card number, wallet account, ...).
    pub method_params: BTreeMap<String, JsonValue>,

    /// Where to send the end user after the order finalizes.
    pub redirect_url: Option<String>,
    pub error_message: Option<String>,

    /// Amounts actually settled, when the provider reports a different
    /// figure than requested.
    pub real_in_amount: Option<i64>,
    pub real_out_amount: Option<i64>,

    /// Deferred ledger operation queue, FIFO by position.
    pub items: Vec<PaymentOrderItem>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional creation parameters, mirroring what callers pass alongside the
/// amount.
#[derive(Debug, Clone, Default)]
pub struct CreateOrderParams {
    pub description: Option<String>,
    pub redirect_url: Option<String>,
    pub creator_id: Option<i64>,
    pub method_params: BTreeMap<String, JsonValue>,
}

impl PaymentOrder {
    pub(crate) fn new(
        method: &PaymentMethod,
        payer_id: i64,
        in_currency: &str,
        in_amount: i64,
        params: CreateOrderParams,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            uid: Uuid::new_v4().to_string(),
            description: params.description,
            method_name: method.name.clone(),
            provider_name: method.provider_name.clone(),
            direction: method.direction,
            payer_id,
            creator_id: params.creator_id,
            in_amount,
            in_currency: in_currency.to_string(),
            out_amount: 0,
            out_currency: method.out_currency.clone(),
            commission: CommissionSnapshot::from_method(method),
            rate_snapshot: None,
            status: PaymentStatus::Created,
            external_id: None,
            provider_params: BTreeMap::new(),
            method_params: params.method_params,
            redirect_url: params.redirect_url,
            error_message: None,
            real_in_amount: None,
            real_out_amount: None,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_charge(&self) -> bool {
        self.direction == PaymentDirection::Charge
    }

    pub fn is_withdraw(&self) -> bool {
        self.direction == PaymentDirection::Withdraw
    }

    /// Queue a ledger operation to fire when the order reaches
    /// `condition_status`. Positions are sequential; execution order is
    /// FIFO by position.
    pub fn add_operation(&mut self, mut operation: LedgerOperation, condition_status: PaymentStatus) {
        operation.payer_id = Some(self.payer_id);
        if self.id != 0 {
            operation.document_id = Some(self.id);
        }
        let position = self.items.len() as u32;
        self.items
            .push(PaymentOrderItem::new(position, condition_status, operation));
    }

    /// Compensating/rollback operation, fired only when the order fails.
    pub fn add_failure_operation(&mut self, operation: LedgerOperation) {
        self.add_operation(operation, PaymentStatus::Failure);
    }

    /// Items that must fire for `status`, in position order.
    pub fn items_for(&self, status: PaymentStatus) -> Vec<PaymentOrderItem> {
        let mut items: Vec<PaymentOrderItem> = self
            .items
            .iter()
            .filter(|item| item.condition_status == status)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.position);
        items
    }

    pub fn set_external_id(&mut self, value: impl Into<String>) {
        self.external_id = Some(value.into());
    }

    /// Record the amount the provider actually settled. `real_in_amount`
    /// is recomputed from it at the next persist when it diverges from the
    /// requested amount.
    pub fn set_external_amount(&mut self, amount: i64) {
        self.real_out_amount = Some(amount);
    }

    pub fn set_error_message(&mut self, value: impl Into<String>) {
        self.error_message = Some(value.into());
    }

    pub fn provider_param(&self, key: &str) -> Option<&JsonValue> {
        self.provider_params.get(key)
    }

    pub fn set_provider_param(&mut self, key: impl Into<String>, value: JsonValue) {
        self.provider_params.insert(key.into(), value);
    }

    pub fn method_param(&self, key: &str) -> Option<&str> {
        self.method_params.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method() -> PaymentMethod {
        PaymentMethod {
            name: "card_usd".to_string(),
            title: None,
            provider_name: "formgate".to_string(),
            direction: PaymentDirection::Charge,
            out_currency: "USD".to_string(),
            out_commission_fixed: 0,
            out_commission_percent: Decimal::ZERO,
            out_commission_currency: None,
            enabled: true,
            system_account: "system:formgate".to_string(),
        }
    }

    #[test]
    fn operations_are_queued_in_position_order() {
        let mut order = PaymentOrder::new(&method(), 7, "USD", 1000, CreateOrderParams::default());
        order.add_operation(
            LedgerOperation::new("charge", 1000, "system:formgate", "user:7"),
            PaymentStatus::Success,
        );
        order.add_failure_operation(LedgerOperation::new(
            "withdraw_rollback",
            1000,
            "system:reserve",
            "user:7",
        ));
        order.add_operation(
            LedgerOperation::new("charge", 50, "system:formgate", "system:fees"),
            PaymentStatus::Success,
        );

        let positions: Vec<u32> = order.items.iter().map(|i| i.position).collect();
        assert_eq!(positions, [0, 1, 2]);

        let success_items = order.items_for(PaymentStatus::Success);
        assert_eq!(success_items.len(), 2);
        assert_eq!(success_items[0].position, 0);
        assert_eq!(success_items[1].position, 2);

        let failure_items = order.items_for(PaymentStatus::Failure);
        assert_eq!(failure_items.len(), 1);
        assert_eq!(failure_items[0].operation.kind, "withdraw_rollback");
    }

    #[test]
    fn queued_operations_carry_the_payer() {
        let mut order = PaymentOrder::new(&method(), 99, "USD", 1000, CreateOrderParams::default());
        order.add_operation(
            LedgerOperation::new("charge", 1000, "system:formgate", "user:99"),
            PaymentStatus::Success,
        );
        assert_eq!(order.items[0].operation.payer_id, Some(99));
    }

    #[test]
    fn orders_get_a_uid_and_created_status() {
        let order = PaymentOrder::new(&method(), 1, "USD", 500, CreateOrderParams::default());
        assert!(!order.uid.is_empty());
        assert_eq!(order.status, PaymentStatus::Created);
        assert_eq!(order.out_amount, 0);
    }
}
