use crate::error::PaymentResult;
use crate::order::{PaymentOrder, PaymentProcess};
use crate::request::RequestInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Fixed set of adapter operations the engine can dispatch. Each funnels
/// through the same call wrapper (audit log, events, restore-on-error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCall {
    Start,
    Callback,
    Withdraw,
}

impl ProviderCall {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderCall::Start => "start",
            ProviderCall::Callback => "callback",
            ProviderCall::Withdraw => "withdraw",
        }
    }
}

impl std::fmt::Display for ProviderCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Protocol-specific integration with one external payment provider.
///
/// Adapters own request construction, callback parsing, signature
/// verification and status mapping; they know nothing about persistence,
/// the ledger queue or the state machine beyond the mutators on
/// `PaymentOrder`.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Construct whatever the protocol requires to initiate payment -
    /// a redirect URL, a signed form, or a direct API call returning a
    /// URL. Must not touch the order status.
    async fn start(
        &self,
        order: &mut PaymentOrder,
        request: &RequestInfo,
    ) -> PaymentResult<PaymentProcess>;

    /// Parse and authenticate an inbound provider notification, map the
    /// provider's status codes onto the order's status enum, and optionally
    /// record the external transaction id or settled amount.
    ///
    /// Authentication failures must surface as
    /// `PaymentError::SignatureMismatch` before any field is trusted;
    /// declined payments are an ordinary `Failure` mapping, not an error.
    /// Unmapped provider statuses must map to `None`, never to a terminal
    /// value.
    async fn callback(
        &self,
        order: &mut PaymentOrder,
        request: &RequestInfo,
    ) -> PaymentResult<PaymentProcess>;

    /// Which order an inbound request refers to, without loading the order.
    /// `Ok(None)` means the protocol legitimately never echoes an
    /// identifier; `Err` means the request is malformed for a protocol
    /// that does.
    fn resolve_order_id(&self, request: &RequestInfo) -> PaymentResult<Option<i64>>;

    /// Best-effort extraction of a human-readable failure reason from a
    /// redirect-time request.
    fn resolve_error_message(&self, request: &RequestInfo) -> Option<String>;

    /// Payout capability. Adapters that cannot execute payouts keep the
    /// default; the engine turns a withdraw request against them into a
    /// configuration error.
    fn withdraw_support(&self) -> Option<&dyn WithdrawProvider> {
        None
    }
}

/// Optional payout capability: a second round-trip confirming the actual
/// money movement, with payout-specific status mapping distinct from
/// `callback`'s inbound-notification semantics.
#[async_trait]
pub trait WithdrawProvider: Send + Sync {
    async fn withdraw(&self, order: &mut PaymentOrder) -> PaymentResult<PaymentProcess>;
}
