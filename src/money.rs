use crate::error::{PaymentError, PaymentResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Which side of the spread a conversion uses. Charges buy the out
/// currency, withdrawals sell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateDirection {
    Buy,
    Sell,
}

/// Black-box currency rate source. Rate sourcing itself is out of scope;
/// the engine only asks for a rate and snapshots it on the order.
pub trait CurrencyConverter: Send + Sync {
    /// Multiplier such that `amount_to = amount_from * rate(from, to, dir)`.
    fn rate(&self, from: &str, to: &str, direction: RateDirection) -> PaymentResult<Decimal>;

    /// Integer minor-unit conversion, rounded up.
    fn convert(
        &self,
        from: &str,
        to: &str,
        amount: i64,
        direction: RateDirection,
    ) -> PaymentResult<i64> {
        let rate = self.rate(from, to, direction)?;
        let converted = Decimal::from(amount) * rate;
        decimal_to_minor_units(converted)
    }
}

pub fn decimal_to_minor_units(value: Decimal) -> PaymentResult<i64> {
    use rust_decimal::prelude::ToPrimitive;
    value.ceil().to_i64().ok_or(PaymentError::Validation {
        message: format!("amount out of range: {value}"),
        field: Some("amount".to_string()),
    })
}

/// Fixed rate table keyed by currency pair, one buy and one sell rate per
/// pair. Same-currency conversions are identity. Suitable for tests and for
/// embedders that refresh the table from their own rate service.
#[derive(Default)]
pub struct FixedRateConverter {
    rates: RwLock<HashMap<(String, String), (Decimal, Decimal)>>,
}

impl FixedRateConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rate(&self, from: &str, to: &str, buy: Decimal, sell: Decimal) {
        self.rates
            .write()
            .expect("rate table lock poisoned")
            .insert((from.to_string(), to.to_string()), (buy, sell));
    }
}

impl CurrencyConverter for FixedRateConverter {
    fn rate(&self, from: &str, to: &str, direction: RateDirection) -> PaymentResult<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        let rates = self.rates.read().expect("rate table lock poisoned");
        let (buy, sell) = rates
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .ok_or_else(|| PaymentError::Configuration {
                message: format!("no currency rate configured for {from}->{to}"),
            })?;
        Ok(match direction {
            RateDirection::Buy => buy,
            RateDirection::Sell => sell,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromStr;

    #[test]
    fn identity_rate_for_same_currency() {
        let rates = FixedRateConverter::new();
        assert_eq!(
            rates.rate("USD", "USD", RateDirection::Buy).unwrap(),
            Decimal::ONE
        );
        assert_eq!(rates.convert("USD", "USD", 1234, RateDirection::Sell).unwrap(), 1234);
    }

    #[test]
    fn direction_selects_buy_or_sell_rate() {
        let rates = FixedRateConverter::new();
        rates.set_rate(
            "USD",
            "EUR",
            Decimal::from_str("0.90").unwrap(),
            Decimal::from_str("0.88").unwrap(),
        );
        assert_eq!(
            rates.rate("USD", "EUR", RateDirection::Buy).unwrap(),
            Decimal::from_str("0.90").unwrap()
        );
        assert_eq!(
            rates.rate("USD", "EUR", RateDirection::Sell).unwrap(),
            Decimal::from_str("0.88").unwrap()
        );
    }

    #[test]
    fn conversion_rounds_up_to_minor_units() {
        let rates = FixedRateConverter::new();
        rates.set_rate(
            "USD",
            "EUR",
            Decimal::from_str("0.9999").unwrap(),
            Decimal::from_str("0.9999").unwrap(),
        );
        // 101 * 0.9999 = 100.9899 -> 101
        assert_eq!(rates.convert("USD", "EUR", 101, RateDirection::Buy).unwrap(), 101);
    }

    #[test]
    fn missing_pair_is_a_configuration_error() {
        let rates = FixedRateConverter::new();
        let err = rates.rate("USD", "JPY", RateDirection::Buy).unwrap_err();
        assert!(matches!(err, PaymentError::Configuration { .. }));
    }
}
