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
pub enum LogStatus {
    #[default]
    Pending,
    Paid,
}

/// One work session. Open while `clock_out` is unset.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TimeLogEntry {
    pub id: u64,
    pub employee_id: u64,

    #[schema(value_type = String, format = "date-time")]
    pub clock_in: DateTime<Utc>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_out: Option<DateTime<Utc>>,

    #[schema(value_type = Option<f64>, example = 8.5)]
    pub total_hours: Option<Decimal>,

    #[schema(value_type = Option<f64>, example = 170.0)]
    pub pay_amount: Option<Decimal>,

    pub status: LogStatus,

    /// Payment that settled this entry.
    pub payment_id: Option<u64>,
}

impl TimeLogEntry {
    pub fn open(id: u64, employee_id: u64, clock_in: DateTime<Utc>) -> Self {
        Self {
            id,
            employee_id,
            clock_in,
            clock_out: None,
            total_hours: None,
            pay_amount: None,
            status: LogStatus::Pending,
            payment_id: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.clock_out.is_none()
    }

    /// Closed and not yet attached to a payment.
    pub fn is_settleable(&self) -> bool {
        !self.is_open() && self.status == LogStatus::Pending
    }

    pub fn close(&mut self, closing: &SessionClose) {
        self.clock_out = Some(closing.clock_out);
        self.total_hours = Some(closing.total_hours);
        self.pay_amount = Some(closing.pay_amount);
    }

    pub fn mark_paid(&mut self, payment_id: u64) {
        self.status = LogStatus::Paid;
        self.payment_id = Some(payment_id);
    }
}

/// Values written when an open entry is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClose {
    pub clock_out: DateTime<Utc>,
    pub total_hours: Decimal,
    pub pay_amount: Decimal,
}
