use super::calculator::{compute_hours, compute_pay};
use super::locks::EmployeeLocks;
use crate::error::{PayrollError, Result};
use crate::model::time_log::{SessionClose, TimeLogEntry};
use crate::store::Stores;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use tracing::debug;

/// Timestamps are kept at millisecond precision, the resolution the
/// database stores.
pub(crate) fn now_millis() -> DateTime<Utc> {
    truncate_millis(Utc::now())
}

pub(crate) fn truncate_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(at)
}

/// Owns the open/closed lifecycle of each employee's time logs.
///
/// At most one open entry exists per employee. The active flag on the
/// employee is written by the store in the same unit as the entry, so the two
/// never drift apart.
#[derive(Clone)]
pub struct ClockLedger {
    stores: Stores,
    locks: EmployeeLocks,
}

impl ClockLedger {
    pub fn new(stores: Stores, locks: EmployeeLocks) -> Self {
        Self { stores, locks }
    }

    pub async fn clock_in(&self, employee_id: u64) -> Result<TimeLogEntry> {
        self.clock_in_at(employee_id, now_millis()).await
    }

    /// Opens a session starting at `at`.
    ///
    /// `NotFound` for an unknown employee, `Conflict` while a session is open.
    pub async fn clock_in_at(&self, employee_id: u64, at: DateTime<Utc>) -> Result<TimeLogEntry> {
        let _guard = self.locks.acquire(employee_id).await;
        let stores = &self.stores;

        if stores.call(stores.employees.get(employee_id)).await?.is_none() {
            return Err(PayrollError::NotFound(format!("Employee {employee_id}")));
        }
        if stores.call(stores.time_logs.find_open(employee_id)).await?.is_some() {
            return Err(PayrollError::Conflict("Already clocked in".to_string()));
        }

        // the store re-checks, covering writers outside this process
        let entry = stores
            .call(stores.time_logs.open_session(employee_id, truncate_millis(at)))
            .await?;
        debug!(employee_id, entry_id = entry.id, "Clocked in");
        Ok(entry)
    }

    pub async fn clock_out(&self, employee_id: u64) -> Result<TimeLogEntry> {
        self.clock_out_at(employee_id, now_millis()).await
    }

    /// Closes the open session at `at`, pricing it at the employee's current
    /// hourly rate.
    ///
    /// `NotFound` for an unknown employee, `Conflict` when nothing is open and
    /// `InvalidRange` if `at` is not after the clock-in.
    pub async fn clock_out_at(
        &self,
        employee_id: u64,
        at: DateTime<Utc>,
    ) -> Result<TimeLogEntry> {
        let _guard = self.locks.acquire(employee_id).await;
        let stores = &self.stores;

        let employee = stores
            .call(stores.employees.get(employee_id))
            .await?
            .ok_or_else(|| PayrollError::NotFound(format!("Employee {employee_id}")))?;
        let open = stores
            .call(stores.time_logs.find_open(employee_id))
            .await?
            .ok_or_else(|| PayrollError::Conflict("No active session".to_string()))?;

        let clock_out = truncate_millis(at);
        let total_hours = compute_hours(open.clock_in, clock_out)?;
        let closing = SessionClose {
            clock_out,
            total_hours,
            pay_amount: compute_pay(total_hours, employee.hourly_rate)?,
        };

        let entry = stores
            .call(stores.time_logs.close_session(open.id, closing))
            .await?;
        debug!(employee_id, entry_id = entry.id, hours = %total_hours, "Clocked out");
        Ok(entry)
    }

    /// All entries for an employee, newest first.
    pub async fn logs_for(&self, employee_id: u64) -> Result<Vec<TimeLogEntry>> {
        let stores = &self.stores;
        if stores.call(stores.employees.get(employee_id)).await?.is_none() {
            return Err(PayrollError::NotFound(format!("Employee {employee_id}")));
        }
        stores
            .call(stores.time_logs.list_for_employee(employee_id))
            .await
    }
}
