use crate::error::{PayrollError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Elapsed hours between two instants, rounded half-up to 2 decimal places.
pub fn compute_hours(clock_in: DateTime<Utc>, clock_out: DateTime<Utc>) -> Result<Decimal> {
    if clock_out <= clock_in {
        return Err(PayrollError::InvalidRange(format!(
            "clock-out {clock_out} is not after clock-in {clock_in}"
        )));
    }

    let millis = (clock_out - clock_in).num_milliseconds();
    let hours = Decimal::from(millis) / Decimal::from(MILLIS_PER_HOUR);
    Ok(hours.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// `hours * rate`, left unrounded.
pub fn compute_pay(hours: Decimal, hourly_rate: Decimal) -> Result<Decimal> {
    hours.checked_mul(hourly_rate).ok_or_else(|| {
        PayrollError::Validation(format!(
            "pay for {hours}h at rate {hourly_rate} is out of range"
        ))
    })
}

/// Sum of pay amounts. Missing amounts count as zero.
pub fn total_pay<I>(amounts: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Option<Decimal>>,
{
    amounts
        .into_iter()
        .flatten()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .ok_or_else(|| PayrollError::Internal("pay total overflowed".to_string()))
}

/// Currency rounding applied only when amounts are displayed.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
