//! CardBridge: a widget-based card gateway.
//!
//! `start` has no network round-trip - the caller redirects the payer to a
//! hosted checkout page keyed by order id. Callbacks are authenticated by
//! an HMAC-SHA256 of the raw request body against the `X-Content-HMAC`
//! header, with an optional IP allow-list as a supplementary control.
//! Payer and amount cross-checks that fail map to coded FAILURE responses
//! per the gateway protocol; they are declined payments, not faults.

use crate::error::{PaymentError, PaymentResult};
use crate::order::{PaymentOrder, PaymentProcess, PaymentStatus};
use crate::provider::adapter::ProviderAdapter;
use crate::provider::signature::{verify_hmac_sha256_base64, IpAllowList};
use crate::request::RequestInfo;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;

const HMAC_HEADER: &str = "X-Content-HMAC";

/// Rejection codes defined by the gateway protocol.
const CODE_WRONG_ACCOUNT: u32 = 11;
const CODE_WRONG_AMOUNT: u32 = 12;

#[derive(Debug, Clone)]
pub struct CardBridgeConfig {
    /// Terminal identifier issued by the gateway.
    pub public_id: String,
    pub api_secret: String,
    pub checkout_url: String,
    pub allowed_ips: Vec<String>,
}

impl CardBridgeConfig {
    pub fn from_env() -> PaymentResult<Self> {
        let api_secret =
            std::env::var("CARDBRIDGE_API_SECRET").map_err(|_| PaymentError::Configuration {
                message: "CARDBRIDGE_API_SECRET environment variable is required".to_string(),
            })?;
        Ok(Self {
            public_id: std::env::var("CARDBRIDGE_PUBLIC_ID").unwrap_or_default(),
            api_secret,
            checkout_url: std::env::var("CARDBRIDGE_CHECKOUT_URL")
                .unwrap_or_else(|_| "https://checkout.cardbridge.example/pay".to_string()),
            allowed_ips: std::env::var("CARDBRIDGE_ALLOWED_IPS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

pub struct CardBridgeAdapter {
    config: CardBridgeConfig,
    allow_list: IpAllowList,
}

impl CardBridgeAdapter {
    pub fn new(config: CardBridgeConfig) -> Self {
        let allow_list = IpAllowList::new(config.allowed_ips.clone());
        Self { config, allow_list }
    }

    pub fn from_env() -> PaymentResult<Self> {
        Ok(Self::new(CardBridgeConfig::from_env()?))
    }

    fn verify_request(&self, request: &RequestInfo) -> PaymentResult<()> {
        if !self.allow_list.allows(request.remote_ip.as_deref()) {
            return Err(PaymentError::protocol(
                self.name(),
                format!(
                    "callback source {} is not on the allow-list",
                    request.remote_ip.as_deref().unwrap_or("<unknown>")
                ),
            ));
        }

        let remote_hmac = request.header(HMAC_HEADER).ok_or_else(|| {
            PaymentError::protocol(self.name(), format!("not found header {HMAC_HEADER}"))
        })?;
        let body = request.raw_body.as_deref().unwrap_or_default();
        if !verify_hmac_sha256_base64(body.as_bytes(), &self.config.api_secret, remote_hmac) {
            return Err(PaymentError::signature_mismatch(
                self.name(),
                request.params_json(),
            ));
        }
        Ok(())
    }

    fn decline(code: u32) -> PaymentProcess {
        PaymentProcess {
            request: None,
            new_status: Some(PaymentStatus::Failure),
            response_text: Some(json!({"code": code}).to_string()),
        }
    }
}

#[async_trait]
impl ProviderAdapter for CardBridgeAdapter {
    fn name(&self) -> &str {
        "cardbridge"
    }

    async fn start(
        &self,
        order: &mut PaymentOrder,
        _request: &RequestInfo,
    ) -> PaymentResult<PaymentProcess> {
        let mut params = BTreeMap::new();
        params.insert("orderId".to_string(), order.id.to_string());
        params.insert("publicId".to_string(), self.config.public_id.clone());
        Ok(PaymentProcess::redirect(RequestInfo::synthetic(
            self.config.checkout_url.clone(),
            params,
        )))
    }

    async fn callback(
        &self,
        order: &mut PaymentOrder,
        request: &RequestInfo,
    ) -> PaymentResult<PaymentProcess> {
        // Authenticate before trusting any field.
        self.verify_request(request)?;

        let account_ok = request
            .param("AccountId")
            .and_then(|v| v.parse::<i64>().ok())
            .map(|id| id == order.payer_id)
            .unwrap_or(false);
        if !account_ok {
            return Ok(Self::decline(CODE_WRONG_ACCOUNT));
        }

        let amount_ok = request
            .param("Amount")
            .and_then(|v| v.parse::<rust_decimal::Decimal>().ok())
            .map(|amount| {
                amount * rust_decimal::Decimal::ONE_HUNDRED
                    == rust_decimal::Decimal::from(order.out_amount)
            })
            .unwrap_or(false);
        if !amount_ok {
            return Ok(Self::decline(CODE_WRONG_AMOUNT));
        }

        if let Some(transaction_id) = request.param("TransactionId") {
            order.set_external_id(transaction_id);
        }

        // "Authorized" is an intermediate notification: explicitly
        // unmapped, never terminal.
        let new_status = match request.param("Status") {
            Some("Authorized") => None,
            Some("Completed") => Some(PaymentStatus::Success),
            _ => Some(PaymentStatus::Failure),
        };

        Ok(PaymentProcess {
            request: None,
            new_status,
            response_text: Some("OK".to_string()),
        })
    }

    fn resolve_order_id(&self, request: &RequestInfo) -> PaymentResult<Option<i64>> {
        let invoice = request.param("InvoiceId").ok_or_else(|| {
            PaymentError::protocol(self.name(), "missing InvoiceId parameter")
        })?;
        let id = invoice.parse::<i64>().map_err(|_| {
            PaymentError::protocol(self.name(), format!("invalid InvoiceId: {invoice}"))
        })?;
        Ok(Some(id))
    }

    fn resolve_error_message(&self, request: &RequestInfo) -> Option<String> {
        request.param("Reason").map(String::from)
    }
}
