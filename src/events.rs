use crate::order::{PaymentOrder, PaymentProcess};
use crate::request::RequestInfo;
use serde::{Deserialize, Serialize};

/// The four named lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    Start,
    Callback,
    Withdraw,
    End,
}

/// Event payload handed to registered listeners: the order as persisted for
/// that call, the inbound request context, and the operation result.
#[derive(Debug)]
pub struct PaymentProcessEvent<'a> {
    pub stage: LifecycleStage,
    pub order: &'a PaymentOrder,
    pub request: &'a RequestInfo,
    pub process: &'a PaymentProcess,
}

/// Synchronous, fire-and-forget lifecycle subscriber (notification senders
/// and the like). Listeners run in registration order; no delivery
/// guarantee beyond the in-process call. A listener cannot veto or roll
/// back the transition it observes.
pub trait LifecycleListener: Send + Sync {
    fn on_event(&self, event: &PaymentProcessEvent<'_>);
}
