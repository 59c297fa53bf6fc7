#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::time::Duration as StdDuration;
use timeclock::auth::password::hash_password;
use timeclock::config::Config;
use timeclock::model::employee::NewEmployee;
use timeclock::state::AppState;
use timeclock::store::Stores;

pub const SECRET: &str = "test-secret";

pub fn config() -> Config {
    Config::new(SECRET)
}

pub fn memory_state() -> AppState {
    AppState::new(Stores::memory(StdDuration::from_secs(2)))
}

pub async fn hire(state: &AppState, name: &str, rate: Decimal, pin: &str) -> u64 {
    state
        .stores
        .employees
        .insert(NewEmployee {
            name: name.to_string(),
            email: format!("{}@company.com", name.to_lowercase()),
            pin_hash: hash_password(pin).unwrap(),
            hourly_rate: rate,
        })
        .await
        .unwrap()
        .id
}

pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, minute, 0).unwrap()
}

/// Clock in at `start`, clock out `minutes` later.
pub async fn shift(state: &AppState, employee_id: u64, start: DateTime<Utc>, minutes: i64) {
    state.ledger.clock_in_at(employee_id, start).await.unwrap();
    state
        .ledger
        .clock_out_at(employee_id, start + Duration::minutes(minutes))
        .await
        .unwrap();
}
