use super::{AdminStore, EmployeeStore, PaymentStore, TimeLogStore};
use crate::error::{PayrollError, Result};
use crate::model::admin::{Admin, NewAdmin};
use crate::model::employee::{Employee, EmployeeChanges, NewEmployee};
use crate::model::payment::{PaymentRecord, SettlementClaim};
use crate::model::role::Role;
use crate::model::time_log::{SessionClose, TimeLogEntry};
use crate::payroll::calculator::total_pay;
use crate::payroll::period::PayWindow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    employees: BTreeMap<u64, Employee>,
    admins: BTreeMap<u64, Admin>,
    time_logs: BTreeMap<u64, TimeLogEntry>,
    payments: BTreeMap<u64, PaymentRecord>,
    last_employee_id: u64,
    last_admin_id: u64,
    last_time_log_id: u64,
    last_payment_id: u64,
}

impl State {
    fn open_entry(&self, employee_id: u64) -> Option<&TimeLogEntry> {
        self.time_logs
            .values()
            .find(|log| log.employee_id == employee_id && log.is_open())
    }

    fn email_taken(&self, email: &str, except: Option<u64>) -> bool {
        self.employees
            .values()
            .any(|e| e.email == email && Some(e.id) != except)
    }
}

/// A thread-safe in-memory implementation of every store port.
///
/// All entities live behind a single `RwLock`, so each trait method is one
/// atomic unit across employees, time logs and payments. Used when no
/// database is configured and throughout the tests.
#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn insert(&self, new: NewEmployee) -> Result<Employee> {
        let mut state = self.state.write().await;
        if state.email_taken(&new.email, None) {
            return Err(PayrollError::Conflict("Email already exists".to_string()));
        }

        state.last_employee_id += 1;
        let employee = Employee {
            id: state.last_employee_id,
            name: new.name,
            email: new.email,
            pin_hash: new.pin_hash,
            hourly_rate: new.hourly_rate,
            is_active: false,
            created_at: Utc::now(),
        };
        state.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    async fn get(&self, id: u64) -> Result<Option<Employee>> {
        let state = self.state.read().await;
        Ok(state.employees.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>> {
        let state = self.state.read().await;
        Ok(state.employees.values().find(|e| e.email == email).cloned())
    }

    async fn list(&self) -> Result<Vec<Employee>> {
        let state = self.state.read().await;
        Ok(state.employees.values().rev().cloned().collect())
    }

    async fn update(&self, id: u64, changes: EmployeeChanges) -> Result<Option<Employee>> {
        let mut state = self.state.write().await;
        if let Some(email) = changes.email.as_deref()
            && state.email_taken(email, Some(id))
        {
            return Err(PayrollError::Conflict("Email already exists".to_string()));
        }

        let Some(employee) = state.employees.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(employee);
        Ok(Some(employee.clone()))
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.employees.contains_key(&id) {
            return Ok(false);
        }

        let blocked = state
            .time_logs
            .values()
            .any(|log| log.employee_id == id && (log.is_open() || log.is_settleable()));
        if blocked {
            return Err(PayrollError::Conflict(
                "Employee is clocked in or has unsettled work".to_string(),
            ));
        }

        // settled logs and payments are kept as history
        state.employees.remove(&id);
        Ok(true)
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn insert(&self, new: NewAdmin) -> Result<Admin> {
        let mut state = self.state.write().await;
        if state.admins.values().any(|a| a.email == new.email) {
            return Err(PayrollError::Conflict(
                "Admin with this email already exists".to_string(),
            ));
        }

        state.last_admin_id += 1;
        let admin = Admin {
            id: state.last_admin_id,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: Role::Admin,
            created_at: Utc::now(),
        };
        state.admins.insert(admin.id, admin.clone());
        Ok(admin)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>> {
        let state = self.state.read().await;
        Ok(state.admins.values().find(|a| a.email == email).cloned())
    }

    async fn count(&self) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.admins.len() as u64)
    }
}

#[async_trait]
impl TimeLogStore for MemoryStore {
    async fn open_session(
        &self,
        employee_id: u64,
        clock_in: DateTime<Utc>,
    ) -> Result<TimeLogEntry> {
        let mut state = self.state.write().await;
        if !state.employees.contains_key(&employee_id) {
            return Err(PayrollError::NotFound(format!("Employee {employee_id}")));
        }
        if state.open_entry(employee_id).is_some() {
            return Err(PayrollError::Conflict("Already clocked in".to_string()));
        }

        state.last_time_log_id += 1;
        let entry = TimeLogEntry::open(state.last_time_log_id, employee_id, clock_in);
        state.time_logs.insert(entry.id, entry.clone());
        if let Some(employee) = state.employees.get_mut(&employee_id) {
            employee.is_active = true;
        }
        Ok(entry)
    }

    async fn find_open(&self, employee_id: u64) -> Result<Option<TimeLogEntry>> {
        let state = self.state.read().await;
        Ok(state.open_entry(employee_id).cloned())
    }

    async fn close_session(&self, entry_id: u64, closing: SessionClose) -> Result<TimeLogEntry> {
        let mut state = self.state.write().await;
        let entry = match state.time_logs.get_mut(&entry_id) {
            Some(entry) if entry.is_open() => entry,
            _ => return Err(PayrollError::Conflict("No active session".to_string())),
        };
        entry.close(&closing);
        let closed = entry.clone();

        if let Some(employee) = state.employees.get_mut(&closed.employee_id) {
            employee.is_active = false;
        }
        Ok(closed)
    }

    async fn pending_between(
        &self,
        employee_id: u64,
        window: &PayWindow,
    ) -> Result<Vec<TimeLogEntry>> {
        let state = self.state.read().await;
        Ok(state
            .time_logs
            .values()
            .filter(|log| {
                log.employee_id == employee_id
                    && log.is_settleable()
                    && window.contains(log.clock_in)
            })
            .cloned()
            .collect())
    }

    async fn list_for_employee(&self, employee_id: u64) -> Result<Vec<TimeLogEntry>> {
        let state = self.state.read().await;
        let mut logs: Vec<_> = state
            .time_logs
            .values()
            .filter(|log| log.employee_id == employee_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.clock_in.cmp(&a.clock_in));
        Ok(logs)
    }

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<TimeLogEntry>> {
        let state = self.state.read().await;
        Ok(state
            .time_logs
            .values()
            .filter(|log| log.clock_in >= since)
            .cloned()
            .collect())
    }

    async fn count_open(&self) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.time_logs.values().filter(|log| log.is_open()).count() as u64)
    }

    async fn pending_total(&self) -> Result<Decimal> {
        let state = self.state.read().await;
        total_pay(
            state
                .time_logs
                .values()
                .filter(|log| log.is_settleable())
                .map(|log| log.pay_amount),
        )
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn claim_and_record(&self, claim: SettlementClaim) -> Result<PaymentRecord> {
        if claim.entry_ids.is_empty() {
            return Err(PayrollError::NoPendingWork);
        }
        let mut state = self.state.write().await;

        // Validate the whole set before touching anything.
        for id in &claim.entry_ids {
            match state.time_logs.get(id) {
                Some(log) if log.employee_id == claim.employee_id && log.is_settleable() => {}
                _ => {
                    return Err(PayrollError::SettlementFailed(format!(
                        "time log {id} is no longer pending"
                    )));
                }
            }
        }

        state.last_payment_id += 1;
        let payment_id = state.last_payment_id;
        for id in &claim.entry_ids {
            if let Some(log) = state.time_logs.get_mut(id) {
                log.mark_paid(payment_id);
            }
        }

        let record = claim.into_record(payment_id);
        state.payments.insert(payment_id, record.clone());
        Ok(record)
    }

    async fn list_for_employee(&self, employee_id: u64) -> Result<Vec<PaymentRecord>> {
        let state = self.state.read().await;
        let mut payments: Vec<_> = state
            .payments
            .values()
            .filter(|p| p.employee_id == employee_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.pay_date.cmp(&a.pay_date).then(b.id.cmp(&a.id)));
        Ok(payments)
    }

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<PaymentRecord>> {
        let state = self.state.read().await;
        Ok(state
            .payments
            .values()
            .filter(|p| p.pay_date >= since)
            .cloned()
            .collect())
    }
}
