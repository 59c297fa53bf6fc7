use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// Default kiosk PIN handed to employees created without one.
pub const DEFAULT_PIN: &str = "1234";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Jane Doe",
        "email": "jane.doe@company.com",
        "hourly_rate": 20.0,
        "is_active": false,
        "created_at": "2026-01-01T08:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Jane Doe")]
    pub name: String,

    #[schema(example = "jane.doe@company.com")]
    pub email: String,

    /// argon2 PHC string of the kiosk PIN
    #[serde(skip_serializing)]
    pub pin_hash: String,

    #[schema(value_type = f64, example = 20.0)]
    pub hourly_rate: Decimal,

    /// True while the employee has an open time-log entry.
    #[schema(example = false)]
    pub is_active: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

/// Fields needed to register an employee. Credentials arrive already hashed.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub pin_hash: String,
    pub hourly_rate: Decimal,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct EmployeeChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub pin_hash: Option<String>,
    pub hourly_rate: Option<Decimal>,
}

impl EmployeeChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.pin_hash.is_none()
            && self.hourly_rate.is_none()
    }

    pub fn apply(self, employee: &mut Employee) {
        if let Some(name) = self.name {
            employee.name = name;
        }
        if let Some(email) = self.email {
            employee.email = email;
        }
        if let Some(pin_hash) = self.pin_hash {
            employee.pin_hash = pin_hash;
        }
        if let Some(rate) = self.hourly_rate {
            employee.hourly_rate = rate;
        }
    }
}

/// Kiosk PINs are exactly four ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
