use crate::error::{PaymentError, PaymentResult};
use serde::{Deserialize, Serialize};

/// Engine-wide configuration, loaded from the environment.
///
/// Provider credentials live in the per-adapter config structs; this only
/// carries the policy flags and URL roots the engine itself needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// When set, withdrawal orders stop at PROCESS and wait for an
    /// operator decision; the engine never auto-confirms payouts.
    pub manual_withdraw: bool,
    /// Public root of the site, used to build provider callback URLs.
    pub site_url: String,
    /// Default post-payment redirect targets, used when the order carries
    /// no redirect target of its own.
    pub success_url: String,
    pub failure_url: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            manual_withdraw: false,
            site_url: "http://localhost:8080".to_string(),
            success_url: "http://localhost:8080/payment/success".to_string(),
            failure_url: "http://localhost:8080/payment/failure".to_string(),
        }
    }
}

impl PaymentConfig {
    pub fn from_env() -> PaymentResult<Self> {
        dotenv::dotenv().ok();

        let site_url = std::env::var("PAYMENT_SITE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        let config = Self {
            manual_withdraw: std::env::var("PAYMENT_MANUAL_WITHDRAW")
                .map(|v| matches!(v.trim(), "1" | "true" | "on" | "yes"))
                .unwrap_or(false),
            success_url: std::env::var("PAYMENT_SUCCESS_URL")
                .unwrap_or_else(|_| format!("{}/payment/success", site_url.trim_end_matches('/'))),
            failure_url: std::env::var("PAYMENT_FAILURE_URL")
                .unwrap_or_else(|_| format!("{}/payment/failure", site_url.trim_end_matches('/'))),
            site_url,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PaymentResult<()> {
        for (name, value) in [
            ("PAYMENT_SITE_URL", &self.site_url),
            ("PAYMENT_SUCCESS_URL", &self.success_url),
            ("PAYMENT_FAILURE_URL", &self.failure_url),
        ] {
            url::Url::parse(value).map_err(|e| PaymentError::Configuration {
                message: format!("{name} is not a valid URL ({value}): {e}"),
            })?;
        }
        Ok(())
    }

    /// Inbound callback endpoint the provider should be pointed at for a
    /// given payment method.
    pub fn callback_url(&self, method_name: &str) -> String {
        format!(
            "{}/payment/callback/{method_name}",
            self.site_url.trim_end_matches('/')
        )
    }
}
