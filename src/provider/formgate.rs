//! FormGate: a signed-form payment aggregator.
//!
//! Initiation is a JSON API call returning a hosted redirect URL; inbound
//! callbacks carry a keyed SHA-256 signature over the sorted request
//! fields. The protocol never echoes our internal order id, so
//! `resolve_order_id` is unsupported. Payouts go through the `massPayment`
//! API method.

use crate::error::{PaymentError, PaymentResult};
use crate::order::{PaymentOrder, PaymentProcess, PaymentStatus};
use crate::provider::adapter::{ProviderAdapter, WithdrawProvider};
use crate::provider::http::ProviderHttpClient;
use crate::provider::signature::{secure_eq, sha256_hex, sign_sorted_fields};
use crate::request::RequestInfo;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

const SIGNATURE_SEPARATOR: &str = "{fg}";
const SIGNED_START_FIELDS: &[&str] = &["account", "currency", "desc", "sum"];

const STATUS_PAY: &str = "pay";
const STATUS_CHECK: &str = "check";
const STATUS_PREAUTH: &str = "preauth";

const PAYOUT_SUCCESS: &str = "success";
const PAYOUT_PROCESS: &str = "not_completed";

#[derive(Debug, Clone)]
pub struct FormGateConfig {
    pub project_id: String,
    pub secret_key: String,
    /// Merchant account for payout authentication.
    pub login: String,
    pub api_url: String,
    /// Provider-side payment instrument code.
    pub payment_type: String,
    pub currency: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for FormGateConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            secret_key: String::new(),
            login: String::new(),
            api_url: "https://api.formgate.example/v1".to_string(),
            payment_type: "card".to_string(),
            currency: "USD".to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl FormGateConfig {
    pub fn from_env() -> PaymentResult<Self> {
        let require = |name: &str| {
            std::env::var(name).map_err(|_| PaymentError::Configuration {
                message: format!("{name} environment variable is required"),
            })
        };
        Ok(Self {
            project_id: require("FORMGATE_PROJECT_ID")?,
            secret_key: require("FORMGATE_SECRET_KEY")?,
            login: std::env::var("FORMGATE_LOGIN").unwrap_or_default(),
            api_url: std::env::var("FORMGATE_API_URL")
                .unwrap_or_else(|_| "https://api.formgate.example/v1".to_string()),
            payment_type: std::env::var("FORMGATE_PAYMENT_TYPE")
                .unwrap_or_else(|_| "card".to_string()),
            currency: std::env::var("FORMGATE_CURRENCY").unwrap_or_else(|_| "USD".to_string()),
            timeout_secs: std::env::var("FORMGATE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            max_retries: std::env::var("FORMGATE_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        })
    }
}

pub struct FormGateAdapter {
    config: FormGateConfig,
    http: ProviderHttpClient,
}

impl FormGateAdapter {
    pub fn new(config: FormGateConfig) -> PaymentResult<Self> {
        let http =
            ProviderHttpClient::new(Duration::from_secs(config.timeout_secs), config.max_retries)?;
        Ok(Self { config, http })
    }

    pub fn from_env() -> PaymentResult<Self> {
        Self::new(FormGateConfig::from_env()?)
    }

    /// Major-unit decimal string the API expects ("10.50" for 1050).
    fn major_units(amount: i64) -> String {
        Decimal::new(amount, 2).to_string()
    }

    /// Callback signature: sorted param values (signature excluded),
    /// prefixed with the reported status, joined with the separator,
    /// secret appended, SHA-256 over the whole string.
    fn response_signature(&self, status: &str, params: &BTreeMap<String, String>) -> String {
        let values: Vec<&str> = params
            .iter()
            .filter(|(k, _)| k.as_str() != "signature")
            .map(|(_, v)| v.as_str())
            .collect();
        let mut parts = vec![status];
        parts.extend(values);
        parts.push(&self.config.secret_key);
        sha256_hex(&parts.join(SIGNATURE_SEPARATOR))
    }

    fn verify_callback(&self, order: &PaymentOrder, request: &RequestInfo) -> PaymentResult<()> {
        let status = request.param("method").unwrap_or_default().to_lowercase();
        let expected = self.response_signature(&status, &request.params);
        let provided = request.param("signature").unwrap_or_default();
        let signature_ok = secure_eq(expected.as_bytes(), provided.trim().as_bytes());

        // The amount and currency are part of what the signature attests;
        // a mismatch against the order is treated the same as a bad
        // signature.
        let currency_ok = request
            .param("payerCurrency")
            .map(|c| c.eq_ignore_ascii_case(&order.out_currency))
            .unwrap_or(false);
        let sum_ok = request
            .param("orderSum")
            .and_then(|s| s.parse::<Decimal>().ok())
            .map(|sum| sum * Decimal::ONE_HUNDRED == Decimal::from(order.out_amount))
            .unwrap_or(false);

        if !signature_ok || !currency_ok || !sum_ok {
            return Err(PaymentError::signature_mismatch(
                self.name(),
                request.params_json(),
            ));
        }
        Ok(())
    }

    fn ack_ok() -> String {
        json!({"result": {"message": "OK"}}).to_string()
    }

    fn ack_error(message: &str) -> String {
        json!({"error": {"message": message}}).to_string()
    }
}

#[async_trait]
impl ProviderAdapter for FormGateAdapter {
    fn name(&self) -> &str {
        "formgate"
    }

    async fn start(
        &self,
        order: &mut PaymentOrder,
        _request: &RequestInfo,
    ) -> PaymentResult<PaymentProcess> {
        let account = order
            .method_param("account")
            .map(String::from)
            .unwrap_or_else(|| order.payer_id.to_string());

        let mut params = BTreeMap::new();
        params.insert("account".to_string(), account);
        params.insert("sum".to_string(), Self::major_units(order.out_amount));
        params.insert("currency".to_string(), self.config.currency.clone());
        if let Some(desc) = &order.description {
            params.insert("desc".to_string(), desc.clone());
        }
        let signature = sign_sorted_fields(
            &params,
            SIGNED_START_FIELDS,
            SIGNATURE_SEPARATOR,
            &self.config.secret_key,
        );

        let payload = json!({
            "method": "initPayment",
            "params": {
                "projectId": self.config.project_id,
                "paymentType": self.config.payment_type,
                "account": params.get("account"),
                "sum": params.get("sum"),
                "currency": params.get("currency"),
                "desc": params.get("desc"),
                "signature": signature,
            }
        });

        let response: FormGateEnvelope<FormGateInitResult> =
            self.http.post_json(&self.config.api_url, &payload, &[]).await?;

        let result = response.result.ok_or_else(|| {
            PaymentError::protocol(
                self.name(),
                format!(
                    "not found payment url, wrong response: {}",
                    response.error.map(|e| e.message).unwrap_or_default()
                ),
            )
        })?;

        order.set_external_id(result.payment_id.to_string());
        info!(order_id = order.id, payment_id = result.payment_id, "formgate payment initiated");

        let redirect = url::Url::parse(&result.redirect_url).map_err(|e| {
            PaymentError::protocol(self.name(), format!("invalid redirect url: {e}"))
        })?;
        let mut redirect_params = BTreeMap::new();
        for (k, v) in redirect.query_pairs() {
            redirect_params.insert(k.into_owned(), v.into_owned());
        }
        let mut base = redirect.clone();
        base.set_query(None);

        Ok(PaymentProcess::redirect(RequestInfo::synthetic(
            base.to_string(),
            redirect_params,
        )))
    }

    async fn callback(
        &self,
        order: &mut PaymentOrder,
        request: &RequestInfo,
    ) -> PaymentResult<PaymentProcess> {
        self.verify_callback(order, request)?;

        if let Some(payment_id) = request.param("paymentId") {
            order.set_external_id(payment_id);
        }

        let status = request.param("method").unwrap_or_default().to_lowercase();
        let new_status = match status.as_str() {
            STATUS_PAY => PaymentStatus::Success,
            STATUS_CHECK | STATUS_PREAUTH => PaymentStatus::Process,
            _ => PaymentStatus::Failure,
        };

        let response_text = if new_status == PaymentStatus::Failure {
            let reason = request.param("errorMessage").unwrap_or("payment error");
            order.set_error_message(reason);
            Self::ack_error(reason)
        } else {
            Self::ack_ok()
        };

        Ok(PaymentProcess {
            request: None,
            new_status: Some(new_status),
            response_text: Some(response_text),
        })
    }

    fn resolve_order_id(&self, _request: &RequestInfo) -> PaymentResult<Option<i64>> {
        // The protocol never echoes our internal order id.
        Ok(None)
    }

    fn resolve_error_message(&self, request: &RequestInfo) -> Option<String> {
        request.param("errorMessage").map(String::from)
    }

    fn withdraw_support(&self) -> Option<&dyn WithdrawProvider> {
        Some(self)
    }
}

#[async_trait]
impl WithdrawProvider for FormGateAdapter {
    async fn withdraw(&self, order: &mut PaymentOrder) -> PaymentResult<PaymentProcess> {
        let purse = order
            .method_param("cardNumber")
            .ok_or_else(|| PaymentError::Validation {
                message: "cardNumber method param is required for formgate payouts".to_string(),
                field: Some("cardNumber".to_string()),
            })?
            .to_string();

        let payload = json!({
            "method": "massPayment",
            "params": {
                "login": self.config.login,
                "sum": Self::major_units(order.out_amount),
                "transactionId": order.id,
                "purse": purse,
                "paymentType": self.config.payment_type,
                "secretKey": self.config.secret_key,
            }
        });

        let response: FormGateEnvelope<FormGatePayoutResult> =
            self.http.post_json(&self.config.api_url, &payload, &[]).await?;

        let payout_status = response
            .result
            .as_ref()
            .map(|r| r.status.as_str())
            .unwrap_or_default();
        let new_status = match payout_status {
            PAYOUT_SUCCESS => PaymentStatus::Success,
            PAYOUT_PROCESS => PaymentStatus::Process,
            _ => PaymentStatus::Failure,
        };

        if let Some(result) = &response.result {
            if let Some(payout_id) = result.payment_id {
                order.set_external_id(payout_id.to_string());
            }
        }

        let response_text = if new_status == PaymentStatus::Failure {
            let message = response
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "withdraw error".to_string());
            order.set_error_message(&message);
            Self::ack_error(&message)
        } else {
            Self::ack_ok()
        };

        Ok(PaymentProcess {
            request: None,
            new_status: Some(new_status),
            response_text: Some(response_text),
        })
    }
}

#[derive(Debug, Deserialize)]
struct FormGateEnvelope<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<FormGateError>,
}

#[derive(Debug, Deserialize)]
struct FormGateError {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormGateInitResult {
    redirect_url: String,
    payment_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormGatePayoutResult {
    status: String,
    #[serde(default)]
    payment_id: Option<i64>,
}
