use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Paid,
}

/// Immutable result of one settlement run.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PaymentRecord {
    pub id: u64,
    pub employee_id: u64,

    /// Exact sum of the settled entries' pay.
    #[schema(value_type = f64, example = 170.0)]
    pub amount: Decimal,

    #[schema(value_type = String, format = "date-time")]
    pub pay_date: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub period_start: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub period_end: DateTime<Utc>,

    pub status: PaymentStatus,
}

/// What a settlement asks the store to claim and record in one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementClaim {
    pub employee_id: u64,
    pub entry_ids: Vec<u64>,
    pub amount: Decimal,
    pub pay_date: DateTime<Utc>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl SettlementClaim {
    pub fn into_record(self, id: u64) -> PaymentRecord {
        PaymentRecord {
            id,
            employee_id: self.employee_id,
            amount: self.amount,
            pay_date: self.pay_date,
            period_start: self.period_start,
            period_end: self.period_end,
            status: PaymentStatus::Paid,
        }
    }
}
