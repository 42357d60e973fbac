use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

/// Errors surfaced by the order lifecycle engine and provider adapters.
///
/// Declined payments are not errors: adapters map them to an ordinary
/// `PaymentStatus::Failure` transition. Everything here aborts the current
/// call and leaves the order in its prior state.
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Protocol error: provider={provider}, message={message}")]
    Protocol { provider: String, message: String },

    #[error("Signature mismatch: provider={provider}, params={params}")]
    SignatureMismatch {
        provider: String,
        params: serde_json::Value,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after_seconds: Option<u64>,
    },

    #[error("Unknown payment method: {name}")]
    UnknownMethod { name: String },

    #[error("Unknown payment order: {id}")]
    UnknownOrder { id: i64 },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error(transparent)]
    Ledger(#[from] crate::ledger::LedgerError),
}

impl PaymentError {
    pub fn configuration(message: impl Into<String>) -> Self {
        PaymentError::Configuration {
            message: message.into(),
        }
    }

    pub fn protocol(provider: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::Protocol {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Signature-mismatch errors keep the offending parameters for audit.
    pub fn signature_mismatch(provider: impl Into<String>, params: serde_json::Value) -> Self {
        PaymentError::SignatureMismatch {
            provider: provider.into(),
            params,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::Network { .. } | PaymentError::RateLimit { .. }
        )
    }

    /// A signature mismatch is a protocol-error subtype for callers that
    /// only distinguish the coarse taxonomy.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            PaymentError::Protocol { .. } | PaymentError::SignatureMismatch { .. }
        )
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration { .. } => 500,
            PaymentError::Protocol { .. } => 502,
            PaymentError::SignatureMismatch { .. } => 401,
            PaymentError::Validation { .. } => 400,
            PaymentError::Network { .. } => 503,
            PaymentError::RateLimit { .. } => 429,
            PaymentError::UnknownMethod { .. } => 404,
            PaymentError::UnknownOrder { .. } => 404,
            PaymentError::Storage { .. } => 500,
            PaymentError::Ledger(_) => 500,
        }
    }
}
