use crate::error::{PaymentError, PaymentResult};
use crate::money::RateDirection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

/// Direction of money movement relative to the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDirection {
    Charge,
    Withdraw,
}

impl PaymentDirection {
    /// Charges buy the out currency, withdrawals sell it.
    pub fn rate_direction(self) -> RateDirection {
        match self {
            PaymentDirection::Charge => RateDirection::Buy,
            PaymentDirection::Withdraw => RateDirection::Sell,
        }
    }
}

impl FromStr for PaymentDirection {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "charge" => Ok(PaymentDirection::Charge),
            "withdraw" => Ok(PaymentDirection::Withdraw),
            _ => Err(PaymentError::Validation {
                message: format!("unsupported payment direction: {value}"),
                field: Some("direction".to_string()),
            }),
        }
    }
}

/// A configured payment channel. Immutable once referenced by an order:
/// commission values are copied onto the order at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub name: String,
    pub title: Option<String>,
    pub provider_name: String,
    pub direction: PaymentDirection,
    pub out_currency: String,
    /// Fixed commission in minor units of `out_commission_currency`
    /// (or of `out_currency` when unset).
    pub out_commission_fixed: i64,
    pub out_commission_percent: Decimal,
    pub out_commission_currency: Option<String>,
    pub enabled: bool,
    /// Linked system ledger account for this channel.
    pub system_account: String,
}

/// Read-through registry of payment methods keyed by name.
///
/// Replaces the source's process-wide static cache with an explicitly
/// constructed, injected registry. Read-mostly: populated once (or
/// re-populated wholesale by admin tooling), then shared.
#[derive(Default)]
pub struct MethodRegistry {
    methods: RwLock<HashMap<String, Arc<PaymentMethod>>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, method: PaymentMethod) {
        self.methods
            .write()
            .expect("method registry lock poisoned")
            .insert(method.name.clone(), Arc::new(method));
    }

    /// Disabled methods are invisible, matching the source's
    /// `isEnable` filter.
    pub fn get(&self, name: &str) -> PaymentResult<Arc<PaymentMethod>> {
        self.methods
            .read()
            .expect("method registry lock poisoned")
            .get(name)
            .filter(|m| m.enabled)
            .cloned()
            .ok_or_else(|| PaymentError::UnknownMethod {
                name: name.to_string(),
            })
    }

    pub fn all(&self) -> Vec<Arc<PaymentMethod>> {
        let mut methods: Vec<Arc<PaymentMethod>> = self
            .methods
            .read()
            .expect("method registry lock poisoned")
            .values()
            .filter(|m| m.enabled)
            .cloned()
            .collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods
    }
}
