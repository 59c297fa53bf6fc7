//! Dashboard aggregates. Read-only over the stores.

use crate::error::Result;
use crate::model::employee::Employee;
use crate::model::payment::PaymentRecord;
use crate::model::time_log::TimeLogEntry;
use crate::payroll::calculator::{round_currency, total_pay};
use crate::store::Stores;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use utoipa::ToSchema;

const PAYMENT_MONTHS: u32 = 6;
const HOURS_DAYS: u64 = 7;
const TOP_PAID: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_employees: u64,
    pub total_active_employees: u64,
    pub employees_clocked_in: u64,
    #[schema(value_type = f64)]
    pub total_hours_this_month: Decimal,
    #[schema(value_type = f64)]
    pub total_payments_this_month: Decimal,
    #[schema(value_type = f64)]
    pub total_pending_payments: Decimal,
    pub new_employees_this_month: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChartPoint {
    pub name: String,
    #[schema(value_type = f64)]
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCharts {
    pub employee_status_chart: Vec<ChartPoint>,
    /// `YYYY-MM` buckets, oldest first.
    pub monthly_payments_chart: Vec<ChartPoint>,
    /// `YYYY-MM-DD` buckets, oldest first.
    pub recent_hours_chart: Vec<ChartPoint>,
    pub top_paid_employees_chart: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub charts: DashboardCharts,
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn at_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Builds the dashboard as of `now`.
pub async fn collect(stores: &Stores, now: DateTime<Utc>) -> Result<DashboardData> {
    let today = now.date_naive();
    let this_month = month_start(today);
    let next_month = this_month
        .checked_add_months(Months::new(1))
        .unwrap_or(this_month);
    let first_chart_month = this_month
        .checked_sub_months(Months::new(PAYMENT_MONTHS - 1))
        .unwrap_or(this_month);
    let first_chart_day = today
        .checked_sub_days(Days::new(HOURS_DAYS - 1))
        .unwrap_or(today);

    let employees = stores.call(stores.employees.list()).await?;
    let clocked_in = stores.call(stores.time_logs.count_open()).await?;
    let pending = stores.call(stores.time_logs.pending_total()).await?;
    let logs = stores
        .call(
            stores
                .time_logs
                .list_since(at_midnight(this_month.min(first_chart_day))),
        )
        .await?;
    let payments = stores
        .call(stores.payments.list_since(at_midnight(first_chart_month)))
        .await?;

    let in_month = |at: DateTime<Utc>| {
        let day = at.date_naive();
        this_month <= day && day < next_month
    };

    let month_logs: Vec<&TimeLogEntry> = logs.iter().filter(|l| in_month(l.clock_in)).collect();
    let month_payments: Vec<&PaymentRecord> =
        payments.iter().filter(|p| in_month(p.pay_date)).collect();

    let paid_this_month = total_pay(month_payments.iter().map(|p| Some(p.amount)))?;

    let active = employees.iter().filter(|e| e.is_active).count() as u64;
    let stats = DashboardStats {
        total_employees: employees.len() as u64,
        total_active_employees: active,
        employees_clocked_in: clocked_in,
        total_hours_this_month: month_logs.iter().filter_map(|l| l.total_hours).sum(),
        total_payments_this_month: round_currency(paid_this_month),
        total_pending_payments: round_currency(pending),
        new_employees_this_month: employees.iter().filter(|e| in_month(e.created_at)).count()
            as u64,
    };

    let charts = DashboardCharts {
        employee_status_chart: vec![
            ChartPoint {
                name: "Clocked In".to_string(),
                value: Decimal::from(clocked_in),
            },
            ChartPoint {
                name: "Clocked Out".to_string(),
                value: Decimal::from(employees.len() as u64 - clocked_in.min(employees.len() as u64)),
            },
        ],
        monthly_payments_chart: monthly_payments(&payments, first_chart_month),
        recent_hours_chart: daily_hours(&logs, first_chart_day, today),
        top_paid_employees_chart: top_paid(&month_payments, &employees),
    };

    Ok(DashboardData { stats, charts })
}

fn monthly_payments(payments: &[PaymentRecord], first_month: NaiveDate) -> Vec<ChartPoint> {
    let mut buckets: BTreeMap<NaiveDate, Decimal> = (0..PAYMENT_MONTHS)
        .filter_map(|i| first_month.checked_add_months(Months::new(i)))
        .map(|month| (month, Decimal::ZERO))
        .collect();

    for payment in payments {
        if let Some(total) = buckets.get_mut(&month_start(payment.pay_date.date_naive())) {
            *total += payment.amount;
        }
    }

    buckets
        .into_iter()
        .map(|(month, total)| ChartPoint {
            name: month.format("%Y-%m").to_string(),
            value: round_currency(total),
        })
        .collect()
}

fn daily_hours(logs: &[TimeLogEntry], first_day: NaiveDate, today: NaiveDate) -> Vec<ChartPoint> {
    let mut buckets: BTreeMap<NaiveDate, Decimal> = first_day
        .iter_days()
        .take_while(|day| *day <= today)
        .map(|day| (day, Decimal::ZERO))
        .collect();

    for log in logs {
        if let (Some(total), Some(hours)) =
            (buckets.get_mut(&log.clock_in.date_naive()), log.total_hours)
        {
            *total += hours;
        }
    }

    buckets
        .into_iter()
        .map(|(day, hours)| ChartPoint {
            name: day.format("%Y-%m-%d").to_string(),
            value: hours,
        })
        .collect()
}

fn top_paid(payments: &[&PaymentRecord], employees: &[Employee]) -> Vec<ChartPoint> {
    let mut per_employee: HashMap<u64, Decimal> = HashMap::new();
    for payment in payments {
        *per_employee.entry(payment.employee_id).or_default() += payment.amount;
    }

    let names: HashMap<u64, &str> = employees.iter().map(|e| (e.id, e.name.as_str())).collect();
    let mut ranked: Vec<(u64, Decimal)> = per_employee.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .filter_map(|(id, total)| {
            names.get(&id).map(|name| ChartPoint {
                name: name.to_string(),
                value: round_currency(total),
            })
        })
        .take(TOP_PAID)
        .collect()
}
