use crate::order::status::PaymentStatus;
use crate::request::RequestInfo;
use serde::{Deserialize, Serialize};

/// Result of one lifecycle operation, returned to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentProcess {
    /// Outbound request descriptor for the caller to redirect the end user
    /// to (typically returned at `start` to obtain the provider's payment
    /// form).
    pub request: Option<RequestInfo>,

    /// Status transition the adapter mapped from the provider's response.
    /// `None` is never terminal: the engine only finalizes on an explicit
    /// terminal value.
    pub new_status: Option<PaymentStatus>,

    /// Body to answer the provider's callback HTTP call with, verbatim.
    /// Most provider protocols require a specific acknowledgement payload.
    pub response_text: Option<String>,
}

impl PaymentProcess {
    pub fn with_status(status: PaymentStatus) -> Self {
        Self {
            new_status: Some(status),
            ..Default::default()
        }
    }

    pub fn redirect(request: RequestInfo) -> Self {
        Self {
            request: Some(request),
            ..Default::default()
        }
    }
}
