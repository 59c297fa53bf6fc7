//! Persistence ports used by the payroll core.
//!
//! The ledger and the settlement engine only talk to these traits. `memory`
//! keeps everything behind one async lock, `mysql` maps each atomic unit onto a
//! database transaction.

pub mod memory;
pub mod mysql;

use crate::error::{PayrollError, Result};
use crate::model::admin::{Admin, NewAdmin};
use crate::model::employee::{Employee, EmployeeChanges, NewEmployee};
use crate::model::payment::{PaymentRecord, SettlementClaim};
use crate::model::time_log::{SessionClose, TimeLogEntry};
use crate::payroll::period::PayWindow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn insert(&self, employee: NewEmployee) -> Result<Employee>;
    async fn get(&self, id: u64) -> Result<Option<Employee>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<Employee>>;
    async fn update(&self, id: u64, changes: EmployeeChanges) -> Result<Option<Employee>>;
    /// Refuses with `Conflict` while the employee is clocked in or has unsettled work.
    async fn delete(&self, id: u64) -> Result<bool>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn insert(&self, admin: NewAdmin) -> Result<Admin>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>>;
    async fn count(&self) -> Result<u64>;
}

#[async_trait]
pub trait TimeLogStore: Send + Sync {
    /// Creates an open entry and flags the employee active, as one unit.
    ///
    /// `NotFound` for an unknown employee, `Conflict` if an open entry exists.
    async fn open_session(&self, employee_id: u64, clock_in: DateTime<Utc>)
    -> Result<TimeLogEntry>;

    async fn find_open(&self, employee_id: u64) -> Result<Option<TimeLogEntry>>;

    /// Closes the entry only if it is still open and clears the employee's
    /// active flag in the same unit. `Conflict` otherwise.
    async fn close_session(&self, entry_id: u64, closing: SessionClose) -> Result<TimeLogEntry>;

    /// Closed, pending entries whose clock-in falls inside `window`.
    async fn pending_between(
        &self,
        employee_id: u64,
        window: &PayWindow,
    ) -> Result<Vec<TimeLogEntry>>;

    /// Newest clock-in first.
    async fn list_for_employee(&self, employee_id: u64) -> Result<Vec<TimeLogEntry>>;

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<TimeLogEntry>>;

    async fn count_open(&self) -> Result<u64>;

    /// Pay owed on closed entries not yet settled.
    async fn pending_total(&self) -> Result<Decimal>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Atomic claim-and-record.
    ///
    /// Every listed entry must move pending -> paid together with the creation
    /// of the payment. If any entry is no longer claimable nothing is written
    /// and `SettlementFailed` is returned.
    async fn claim_and_record(&self, claim: SettlementClaim) -> Result<PaymentRecord>;

    /// Newest pay date first.
    async fn list_for_employee(&self, employee_id: u64) -> Result<Vec<PaymentRecord>>;

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<PaymentRecord>>;
}

pub type EmployeeStoreRef = Arc<dyn EmployeeStore>;
pub type AdminStoreRef = Arc<dyn AdminStore>;
pub type TimeLogStoreRef = Arc<dyn TimeLogStore>;
pub type PaymentStoreRef = Arc<dyn PaymentStore>;

/// The set of ports a running service is wired to.
#[derive(Clone)]
pub struct Stores {
    pub employees: EmployeeStoreRef,
    pub admins: AdminStoreRef,
    pub time_logs: TimeLogStoreRef,
    pub payments: PaymentStoreRef,
    /// Upper bound for any single storage call.
    pub timeout: Duration,
}

impl Stores {
    pub fn memory(timeout: Duration) -> Self {
        let store = memory::MemoryStore::new();
        Self {
            employees: Arc::new(store.clone()),
            admins: Arc::new(store.clone()),
            time_logs: Arc::new(store.clone()),
            payments: Arc::new(store),
            timeout,
        }
    }

    pub fn mysql(pool: sqlx::MySqlPool, timeout: Duration) -> Self {
        let store = mysql::MySqlStore::new(pool);
        Self {
            employees: Arc::new(store.clone()),
            admins: Arc::new(store.clone()),
            time_logs: Arc::new(store.clone()),
            payments: Arc::new(store),
            timeout,
        }
    }

    /// Runs a storage call under this set's timeout.
    pub async fn call<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        bounded(self.timeout, fut).await
    }
}

/// Fails with a retryable `StorageUnavailable` if `fut` outlives `limit`.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(PayrollError::StorageUnavailable(format!(
            "storage call exceeded {}ms",
            limit.as_millis()
        ))),
    }
}
