//! Manual provider: no external gateway behind it.
//!
//! Charges redirect the payer to an internal page where an operator (or a
//! bank-transfer instruction flow) completes the payment out of band; the
//! operator tooling later posts a callback-shaped request. Payouts confirm
//! immediately, so a withdraw order finalizes as soon as the engine asks.

use crate::error::{PaymentError, PaymentResult};
use crate::order::{PaymentOrder, PaymentProcess, PaymentStatus};
use crate::provider::adapter::{ProviderAdapter, WithdrawProvider};
use crate::request::RequestInfo;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub struct ManualAdapter {
    /// Internal page that shows payment instructions for a charge order.
    manual_url: String,
}

impl ManualAdapter {
    pub fn new(manual_url: String) -> Self {
        Self { manual_url }
    }
}

#[async_trait]
impl ProviderAdapter for ManualAdapter {
    fn name(&self) -> &str {
        "manual"
    }

    async fn start(
        &self,
        order: &mut PaymentOrder,
        _request: &RequestInfo,
    ) -> PaymentResult<PaymentProcess> {
        if order.is_withdraw() {
            // Nothing to show the payer; the order waits for confirmation.
            return Ok(PaymentProcess::default());
        }
        let mut params = BTreeMap::new();
        params.insert("orderId".to_string(), order.id.to_string());
        Ok(PaymentProcess::redirect(RequestInfo::synthetic(
            self.manual_url.clone(),
            params,
        )))
    }

    async fn callback(
        &self,
        _order: &mut PaymentOrder,
        _request: &RequestInfo,
    ) -> PaymentResult<PaymentProcess> {
        // Operator tooling drives the transition; the request carries no
        // provider state to interpret.
        Ok(PaymentProcess::default())
    }

    fn resolve_order_id(&self, request: &RequestInfo) -> PaymentResult<Option<i64>> {
        match request.param("orderId") {
            Some(raw) => {
                let id = raw.parse::<i64>().map_err(|_| {
                    PaymentError::protocol(self.name(), format!("invalid orderId: {raw}"))
                })?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    fn resolve_error_message(&self, request: &RequestInfo) -> Option<String> {
        request.param("error").map(String::from)
    }

    fn withdraw_support(&self) -> Option<&dyn WithdrawProvider> {
        Some(self)
    }
}

#[async_trait]
impl WithdrawProvider for ManualAdapter {
    async fn withdraw(&self, _order: &mut PaymentOrder) -> PaymentResult<PaymentProcess> {
        Ok(PaymentProcess::with_status(PaymentStatus::Success))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::method::{PaymentDirection, PaymentMethod};
    use crate::order::CreateOrderParams;
    use rust_decimal::Decimal;

    fn method(direction: PaymentDirection) -> PaymentMethod {
        PaymentMethod {
            name: "manual_usd".to_string(),
            title: None,
            provider_name: "manual".to_string(),
            direction,
            out_currency: "USD".to_string(),
            out_commission_fixed: 0,
            out_commission_percent: Decimal::ZERO,
            out_commission_currency: None,
            enabled: true,
            system_account: "system:manual".to_string(),
        }
    }

    #[tokio::test]
    async fn charge_start_redirects_to_the_instruction_page() {
        let adapter = ManualAdapter::new("https://pay.example/manual".to_string());
        let mut order = PaymentOrder::new(
            &method(PaymentDirection::Charge),
            7,
            "USD",
            1000,
            CreateOrderParams::default(),
        );
        order.id = 42;

        let process = adapter
            .start(&mut order, &RequestInfo::default())
            .await
            .unwrap();
        let redirect = process.request.expect("redirect descriptor");
        assert_eq!(redirect.url, "https://pay.example/manual");
        assert_eq!(redirect.param("orderId"), Some("42"));
        assert_eq!(process.new_status, None);
    }

    #[tokio::test]
    async fn withdraw_start_is_a_no_op() {
        let adapter = ManualAdapter::new("https://pay.example/manual".to_string());
        let mut order = PaymentOrder::new(
            &method(PaymentDirection::Withdraw),
            7,
            "USD",
            1000,
            CreateOrderParams::default(),
        );

        let process = adapter
            .start(&mut order, &RequestInfo::default())
            .await
            .unwrap();
        assert!(process.request.is_none());
        assert_eq!(process.new_status, None);
    }

    #[tokio::test]
    async fn withdraw_confirms_immediately() {
        let adapter = ManualAdapter::new("https://pay.example/manual".to_string());
        let mut order = PaymentOrder::new(
            &method(PaymentDirection::Withdraw),
            7,
            "USD",
            1000,
            CreateOrderParams::default(),
        );

        let support = adapter.withdraw_support().expect("payout capability");
        let process = support.withdraw(&mut order).await.unwrap();
        assert_eq!(process.new_status, Some(PaymentStatus::Success));
    }

    #[test]
    fn order_id_resolution_is_optional() {
        let adapter = ManualAdapter::new("https://pay.example/manual".to_string());

        let mut params = BTreeMap::new();
        params.insert("orderId".to_string(), "42".to_string());
        let request = RequestInfo::synthetic("https://x", params);
        assert_eq!(adapter.resolve_order_id(&request).unwrap(), Some(42));

        assert_eq!(
            adapter.resolve_order_id(&RequestInfo::default()).unwrap(),
            None
        );

        let mut bad = BTreeMap::new();
        bad.insert("orderId".to_string(), "not-a-number".to_string());
        let request = RequestInfo::synthetic("https://x", bad);
        assert!(adapter.resolve_order_id(&request).is_err());
    }
}
