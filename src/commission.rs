use crate::error::PaymentResult;
use crate::money::{decimal_to_minor_units, CurrencyConverter};
use crate::order::method::{PaymentDirection, PaymentMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Commission configuration copied from the method onto the order at
/// creation time, so later method edits never change an in-flight order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommissionSnapshot {
    pub percent: Decimal,
    /// Minor units of `fixed_currency` (or of the out currency when unset).
    pub fixed: i64,
    pub fixed_currency: Option<String>,
}

impl CommissionSnapshot {
    pub fn from_method(method: &PaymentMethod) -> Self {
        Self {
            percent: method.out_commission_percent,
            fixed: method.out_commission_fixed,
            fixed_currency: method.out_commission_currency.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutAmount {
    /// Provider-side amount in minor units, rounded up.
    pub amount: i64,
    /// The in->out conversion rate actually used, snapshotted for audit.
    pub rate: Decimal,
}

/// Provider-side amount from the site-side amount.
///
/// Convert with the method's rate direction (buy for charge, sell for
/// withdraw), add (charge) or subtract (withdraw) the percentage
/// commission, then the fixed commission - converted when its currency
/// differs from the out currency - and round up to the nearest integer
/// minor unit. Deterministic and replayable given the same rates.
pub fn calculate_out_amount(
    in_amount: i64,
    in_currency: &str,
    out_currency: &str,
    direction: PaymentDirection,
    commission: &CommissionSnapshot,
    rates: &dyn CurrencyConverter,
) -> PaymentResult<OutAmount> {
    let rate_direction = direction.rate_direction();
    let rate = rates.rate(in_currency, out_currency, rate_direction)?;

    let mut out = Decimal::from(in_amount) * rate;

    let percent_part = out * commission.percent / Decimal::ONE_HUNDRED;
    out = apply(direction, out, percent_part);

    if commission.fixed != 0 {
        let fixed_currency = commission.fixed_currency.as_deref().unwrap_or(out_currency);
        let fixed = if fixed_currency == out_currency {
            Decimal::from(commission.fixed)
        } else {
            let fixed_rate = rates.rate(fixed_currency, out_currency, rate_direction)?;
            Decimal::from(commission.fixed) * fixed_rate
        };
        out = apply(direction, out, fixed);
    }

    Ok(OutAmount {
        amount: decimal_to_minor_units(out)?,
        rate,
    })
}

fn apply(direction: PaymentDirection, amount: Decimal, commission: Decimal) -> Decimal {
    match direction {
        PaymentDirection::Charge => amount + commission,
        PaymentDirection::Withdraw => amount - commission,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::FixedRateConverter;
    use rust_decimal::prelude::FromStr;

    fn snapshot(percent: &str, fixed: i64, fixed_currency: Option<&str>) -> CommissionSnapshot {
        CommissionSnapshot {
            percent: Decimal::from_str(percent).unwrap(),
            fixed,
            fixed_currency: fixed_currency.map(String::from),
        }
    }

    #[test]
    fn five_percent_charge_at_par() {
        let rates = FixedRateConverter::new();
        let out = calculate_out_amount(
            1000,
            "USD",
            "USD",
            PaymentDirection::Charge,
            &snapshot("5", 0, None),
            &rates,
        )
        .unwrap();
        assert_eq!(out.amount, 1050);
        assert_eq!(out.rate, Decimal::ONE);
    }

    #[test]
    fn five_percent_withdraw_at_par() {
        let rates = FixedRateConverter::new();
        let out = calculate_out_amount(
            1000,
            "USD",
            "USD",
            PaymentDirection::Withdraw,
            &snapshot("5", 0, None),
            &rates,
        )
        .unwrap();
        assert_eq!(out.amount, 950);
    }

    #[test]
    fn fixed_commission_converted_from_its_own_currency() {
        let rates = FixedRateConverter::new();
        rates.set_rate(
            "EUR",
            "USD",
            Decimal::from_str("1.10").unwrap(),
            Decimal::from_str("1.05").unwrap(),
        );
        // charge: 1000 USD + 0% + 200 EUR * 1.10 = 1220 USD
        let out = calculate_out_amount(
            1000,
            "USD",
            "USD",
            PaymentDirection::Charge,
            &snapshot("0", 200, Some("EUR")),
            &rates,
        )
        .unwrap();
        assert_eq!(out.amount, 1220);
    }

    #[test]
    fn result_is_rounded_up() {
        let rates = FixedRateConverter::new();
        // 999 * 1.015 = 1013.985 -> 1014
        let out = calculate_out_amount(
            999,
            "USD",
            "USD",
            PaymentDirection::Charge,
            &snapshot("1.5", 0, None),
            &rates,
        )
        .unwrap();
        assert_eq!(out.amount, 1014);
    }

    #[test]
    fn calculation_is_deterministic() {
        let rates = FixedRateConverter::new();
        rates.set_rate(
            "USD",
            "EUR",
            Decimal::from_str("0.93").unwrap(),
            Decimal::from_str("0.91").unwrap(),
        );
        let commission = snapshot("2.5", 150, None);
        let first = calculate_out_amount(
            12345,
            "USD",
            "EUR",
            PaymentDirection::Charge,
            &commission,
            &rates,
        )
        .unwrap();
        for _ in 0..10 {
            let again = calculate_out_amount(
                12345,
                "USD",
                "EUR",
                PaymentDirection::Charge,
                &commission,
                &rates,
            )
            .unwrap();
            assert_eq!(again, first);
        }
    }
}
