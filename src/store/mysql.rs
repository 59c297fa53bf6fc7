use super::{AdminStore, EmployeeStore, PaymentStore, TimeLogStore};
use crate::error::{PayrollError, Result};
use crate::model::admin::{Admin, NewAdmin};
use crate::model::employee::{Employee, EmployeeChanges, NewEmployee};
use crate::model::payment::{PaymentRecord, PaymentStatus, SettlementClaim};
use crate::model::role::Role;
use crate::model::time_log::{LogStatus, SessionClose, TimeLogEntry};
use crate::payroll::period::PayWindow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};
use std::str::FromStr;
use tracing::debug;

const EMPLOYEE_COLUMNS: &str = "id, name, email, pin_hash, hourly_rate, is_active, created_at";
const TIME_LOG_COLUMNS: &str =
    "id, employee_id, clock_in, clock_out, total_hours, pay_amount, status, payment_id";
const PAYMENT_COLUMNS: &str =
    "id, employee_id, amount, pay_date, period_start, period_end, status";

#[derive(FromRow)]
struct EmployeeRow {
    id: u64,
    name: String,
    email: String,
    pin_hash: String,
    hourly_rate: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            id: row.id,
            name: row.name,
            email: row.email,
            pin_hash: row.pin_hash,
            hourly_rate: row.hourly_rate,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AdminRow {
    id: u64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdminRow> for Admin {
    type Error = PayrollError;

    fn try_from(row: AdminRow) -> Result<Self> {
        let role = Role::from_str(&row.role)
            .map_err(|_| PayrollError::Internal(format!("unknown admin role {}", row.role)))?;
        Ok(Admin {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct TimeLogRow {
    id: u64,
    employee_id: u64,
    clock_in: DateTime<Utc>,
    clock_out: Option<DateTime<Utc>>,
    total_hours: Option<Decimal>,
    pay_amount: Option<Decimal>,
    status: String,
    payment_id: Option<u64>,
}

impl TryFrom<TimeLogRow> for TimeLogEntry {
    type Error = PayrollError;

    fn try_from(row: TimeLogRow) -> Result<Self> {
        let status = LogStatus::from_str(&row.status)
            .map_err(|_| PayrollError::Internal(format!("unknown log status {}", row.status)))?;
        Ok(TimeLogEntry {
            id: row.id,
            employee_id: row.employee_id,
            clock_in: row.clock_in,
            clock_out: row.clock_out,
            total_hours: row.total_hours,
            pay_amount: row.pay_amount,
            status,
            payment_id: row.payment_id,
        })
    }
}

#[derive(FromRow)]
struct PaymentRow {
    id: u64,
    employee_id: u64,
    amount: Decimal,
    pay_date: DateTime<Utc>,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    status: String,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = PayrollError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        let status = PaymentStatus::from_str(&row.status).map_err(|_| {
            PayrollError::Internal(format!("unknown payment status {}", row.status))
        })?;
        Ok(PaymentRecord {
            id: row.id,
            employee_id: row.employee_id,
            amount: row.amount,
            pay_date: row.pay_date,
            period_start: row.period_start,
            period_end: row.period_end,
            status,
        })
    }
}

fn collect_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = PayrollError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// MySQL-backed store.
///
/// Each multi-row unit (clock-in, clock-out, settlement, delete) runs in a
/// transaction that first locks the employee row with `SELECT ... FOR UPDATE`,
/// which serializes writers for the same employee across processes. The
/// `uq_time_logs_open` unique index additionally rejects a second open entry.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_employee(&self, id: u64) -> Result<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Employee::from))
    }

    async fn fetch_time_log(&self, id: u64) -> Result<TimeLogEntry> {
        let sql = format!("SELECT {TIME_LOG_COLUMNS} FROM time_logs WHERE id = ?");
        sqlx::query_as::<_, TimeLogRow>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
            .try_into()
    }
}

/// Locks the employee row for the rest of the transaction.
async fn lock_employee(
    conn: &mut sqlx::MySqlConnection,
    employee_id: u64,
) -> Result<Option<EmployeeRow>> {
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ? FOR UPDATE");
    Ok(sqlx::query_as::<_, EmployeeRow>(&sql)
        .bind(employee_id)
        .fetch_optional(conn)
        .await?)
}

#[async_trait]
impl EmployeeStore for MySqlStore {
    async fn insert(&self, new: NewEmployee) -> Result<Employee> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees (name, email, pin_hash, hourly_rate)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.pin_hash)
        .bind(new.hourly_rate)
        .execute(&self.pool)
        .await
        .map_err(|e| match PayrollError::from(e) {
            PayrollError::Conflict(_) => PayrollError::Conflict("Email already exists".into()),
            other => other,
        })?;

        self.fetch_employee(result.last_insert_id())
            .await?
            .ok_or_else(|| PayrollError::Internal("inserted employee vanished".into()))
    }

    async fn get(&self, id: u64) -> Result<Option<Employee>> {
        self.fetch_employee(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE email = ?");
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Employee::from))
    }

    async fn list(&self) -> Result<Vec<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, EmployeeRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn update(&self, id: u64, changes: EmployeeChanges) -> Result<Option<Employee>> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = lock_employee(&mut tx, id).await? else {
            return Ok(None);
        };
        let mut employee = Employee::from(row);
        changes.apply(&mut employee);

        sqlx::query(
            r#"
            UPDATE employees
            SET name = ?, email = ?, pin_hash = ?, hourly_rate = ?
            WHERE id = ?
            "#,
        )
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.pin_hash)
        .bind(employee.hourly_rate)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match PayrollError::from(e) {
            PayrollError::Conflict(_) => PayrollError::Conflict("Email already exists".into()),
            other => other,
        })?;

        tx.commit().await?;
        Ok(Some(employee))
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        if lock_employee(&mut tx, id).await?.is_none() {
            return Ok(false);
        }

        let unsettled: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM time_logs
            WHERE employee_id = ?
            AND (clock_out IS NULL OR status = 'pending')
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if unsettled > 0 {
            return Err(PayrollError::Conflict(
                "Employee is clocked in or has unsettled work".to_string(),
            ));
        }

        // settled logs and payments are kept as history
        sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl AdminStore for MySqlStore {
    async fn insert(&self, new: NewAdmin) -> Result<Admin> {
        let result = sqlx::query(
            r#"
            INSERT INTO admins (name, email, password_hash, role)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(Role::Admin.as_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| match PayrollError::from(e) {
            PayrollError::Conflict(_) => {
                PayrollError::Conflict("Admin with this email already exists".into())
            }
            other => other,
        })?;

        sqlx::query_as::<_, AdminRow>(
            "SELECT id, name, email, password_hash, role, created_at FROM admins WHERE id = ?",
        )
        .bind(result.last_insert_id())
        .fetch_one(&self.pool)
        .await?
        .try_into()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, name, email, password_hash, role, created_at FROM admins WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Admin::try_from).transpose()
    }

    async fn count(&self) -> Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.max(0) as u64)
    }
}

#[async_trait]
impl TimeLogStore for MySqlStore {
    async fn open_session(
        &self,
        employee_id: u64,
        clock_in: DateTime<Utc>,
    ) -> Result<TimeLogEntry> {
        let mut tx = self.pool.begin().await?;

        if lock_employee(&mut tx, employee_id).await?.is_none() {
            return Err(PayrollError::NotFound(format!("Employee {employee_id}")));
        }

        let open: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM time_logs WHERE employee_id = ? AND clock_out IS NULL",
        )
        .bind(employee_id)
        .fetch_one(&mut *tx)
        .await?;
        if open > 0 {
            return Err(PayrollError::Conflict("Already clocked in".to_string()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO time_logs (employee_id, clock_in, status)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(clock_in)
        .bind(LogStatus::Pending.as_ref())
        .execute(&mut *tx)
        .await
        .map_err(|e| match PayrollError::from(e) {
            // uq_time_logs_open caught a concurrent clock-in
            PayrollError::Conflict(_) => PayrollError::Conflict("Already clocked in".into()),
            other => other,
        })?;

        sqlx::query("UPDATE employees SET is_active = TRUE WHERE id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(employee_id, entry_id = result.last_insert_id(), "Opened time log");

        self.fetch_time_log(result.last_insert_id()).await
    }

    async fn find_open(&self, employee_id: u64) -> Result<Option<TimeLogEntry>> {
        let sql = format!(
            "SELECT {TIME_LOG_COLUMNS} FROM time_logs WHERE employee_id = ? AND clock_out IS NULL"
        );
        let row = sqlx::query_as::<_, TimeLogRow>(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TimeLogEntry::try_from).transpose()
    }

    async fn close_session(&self, entry_id: u64, closing: SessionClose) -> Result<TimeLogEntry> {
        let mut tx = self.pool.begin().await?;

        let employee_id: Option<u64> =
            sqlx::query_scalar("SELECT employee_id FROM time_logs WHERE id = ?")
                .bind(entry_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(employee_id) = employee_id else {
            return Err(PayrollError::Conflict("No active session".to_string()));
        };
        lock_employee(&mut tx, employee_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE time_logs
            SET clock_out = ?, total_hours = ?, pay_amount = ?
            WHERE id = ?
            AND clock_out IS NULL
            "#,
        )
        .bind(closing.clock_out)
        .bind(closing.total_hours)
        .bind(closing.pay_amount)
        .bind(entry_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PayrollError::Conflict("No active session".to_string()));
        }

        sqlx::query("UPDATE employees SET is_active = FALSE WHERE id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.fetch_time_log(entry_id).await
    }

    async fn pending_between(
        &self,
        employee_id: u64,
        window: &PayWindow,
    ) -> Result<Vec<TimeLogEntry>> {
        let sql = format!(
            r#"
            SELECT {TIME_LOG_COLUMNS}
            FROM time_logs
            WHERE employee_id = ?
            AND status = 'pending'
            AND clock_out IS NOT NULL
            AND clock_in BETWEEN ? AND ?
            ORDER BY clock_in
            "#
        );
        let rows = sqlx::query_as::<_, TimeLogRow>(&sql)
            .bind(employee_id)
            .bind(window.starts_at())
            .bind(window.ends_at())
            .fetch_all(&self.pool)
            .await?;
        collect_rows(rows)
    }

    async fn list_for_employee(&self, employee_id: u64) -> Result<Vec<TimeLogEntry>> {
        let sql = format!(
            "SELECT {TIME_LOG_COLUMNS} FROM time_logs WHERE employee_id = ? ORDER BY clock_in DESC"
        );
        let rows = sqlx::query_as::<_, TimeLogRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;
        collect_rows(rows)
    }

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<TimeLogEntry>> {
        let sql = format!("SELECT {TIME_LOG_COLUMNS} FROM time_logs WHERE clock_in >= ?");
        let rows = sqlx::query_as::<_, TimeLogRow>(&sql)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        collect_rows(rows)
    }

    async fn count_open(&self) -> Result<u64> {
        let open: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM time_logs WHERE clock_out IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(open.max(0) as u64)
    }

    async fn pending_total(&self) -> Result<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT SUM(pay_amount) FROM time_logs
            WHERE status = 'pending' AND clock_out IS NOT NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or_default())
    }
}

#[async_trait]
impl PaymentStore for MySqlStore {
    async fn claim_and_record(&self, claim: SettlementClaim) -> Result<PaymentRecord> {
        if claim.entry_ids.is_empty() {
            return Err(PayrollError::NoPendingWork);
        }

        let mut tx = self.pool.begin().await?;
        lock_employee(&mut tx, claim.employee_id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO payments (employee_id, amount, pay_date, period_start, period_end, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(claim.employee_id)
        .bind(claim.amount)
        .bind(claim.pay_date)
        .bind(claim.period_start)
        .bind(claim.period_end)
        .bind(PaymentStatus::Paid.as_ref())
        .execute(&mut *tx)
        .await?;
        let payment_id = result.last_insert_id();

        // Compare-and-swap: only rows still pending and closed are claimed.
        let mut update: QueryBuilder<MySql> =
            QueryBuilder::new("UPDATE time_logs SET status = 'paid', payment_id = ");
        update
            .push_bind(payment_id)
            .push(" WHERE employee_id = ")
            .push_bind(claim.employee_id)
            .push(" AND status = 'pending' AND clock_out IS NOT NULL AND id IN (");
        let mut ids = update.separated(", ");
        for id in &claim.entry_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");

        let claimed = update.build().execute(&mut *tx).await?.rows_affected();
        if claimed != claim.entry_ids.len() as u64 {
            // dropping the payment insert together with any partial claim
            tx.rollback().await?;
            return Err(PayrollError::SettlementFailed(format!(
                "claimed {claimed} of {} time logs",
                claim.entry_ids.len()
            )));
        }

        tx.commit().await?;
        Ok(claim.into_record(payment_id))
    }

    async fn list_for_employee(&self, employee_id: u64) -> Result<Vec<PaymentRecord>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE employee_id = ? ORDER BY pay_date DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;
        collect_rows(rows)
    }

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<PaymentRecord>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE pay_date >= ?");
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        collect_rows(rows)
    }
}
