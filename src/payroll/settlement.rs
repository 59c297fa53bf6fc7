use super::calculator::{round_currency, total_pay};
use super::ledger::now_millis;
use super::locks::EmployeeLocks;
use super::period::PayWindow;
use crate::error::{PayrollError, Result};
use crate::model::payment::{PaymentRecord, SettlementClaim};
use crate::model::time_log::TimeLogEntry;
use crate::store::Stores;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

/// Pending work in a window, as settlement would see it.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UnpaidPreview {
    pub entries: Vec<TimeLogEntry>,

    #[schema(value_type = f64, example = 170.0)]
    pub total_amount: Decimal,

    /// `total_amount` rounded to cents for display.
    #[schema(value_type = f64, example = 170.0)]
    pub total_amount_rounded: Decimal,
}

/// Turns pending time logs into payments.
///
/// Settlements for the same employee are serialized through `EmployeeLocks`,
/// shared with the clock ledger. The store's claim-and-record is the final
/// guard: if any selected entry was claimed elsewhere in the meantime the whole
/// settlement fails and nothing is written.
#[derive(Clone)]
pub struct SettlementEngine {
    stores: Stores,
    locks: EmployeeLocks,
}

impl SettlementEngine {
    pub fn new(stores: Stores, locks: EmployeeLocks) -> Self {
        Self { stores, locks }
    }

    /// Settles `YYYY-MM-DD` bounds. See [`SettlementEngine::settle_window`].
    pub async fn settle(
        &self,
        employee_id: u64,
        period_start: &str,
        period_end: &str,
    ) -> Result<PaymentRecord> {
        let window = PayWindow::parse(period_start, period_end)?;
        self.settle_window(employee_id, window).await
    }

    /// Pays every closed, pending entry whose clock-in lies in `window`.
    ///
    /// `NoPendingWork` when there is nothing to pay, `SettlementFailed` when a
    /// concurrent claim took any of the selected entries.
    pub async fn settle_window(&self, employee_id: u64, window: PayWindow) -> Result<PaymentRecord> {
        let _guard = self.locks.acquire(employee_id).await;

        let pending = self.pending_in(employee_id, &window).await?;
        if pending.is_empty() {
            return Err(PayrollError::NoPendingWork);
        }

        let claim = SettlementClaim {
            employee_id,
            entry_ids: pending.iter().map(|entry| entry.id).collect(),
            amount: total_pay(pending.iter().map(|entry| entry.pay_amount))?,
            pay_date: now_millis(),
            period_start: window.starts_at(),
            period_end: window.ends_at(),
        };

        let stores = &self.stores;
        let payment = stores
            .call(stores.payments.claim_and_record(claim))
            .await
            .inspect_err(|err| {
                if let PayrollError::SettlementFailed(reason) = err {
                    warn!(employee_id, %reason, "Settlement rolled back");
                }
            })?;

        debug!(
            employee_id,
            payment_id = payment.id,
            entries = pending.len(),
            amount = %payment.amount,
            "Settled pending work"
        );
        Ok(payment)
    }

    /// Same selection as `settle`, without writing anything.
    pub async fn preview_unpaid(
        &self,
        employee_id: u64,
        start_date: &str,
        end_date: &str,
    ) -> Result<UnpaidPreview> {
        let window = PayWindow::parse(start_date, end_date)?;
        let entries = self.pending_in(employee_id, &window).await?;
        let total_amount = total_pay(entries.iter().map(|entry| entry.pay_amount))?;

        Ok(UnpaidPreview {
            entries,
            total_amount,
            total_amount_rounded: round_currency(total_amount),
        })
    }

    /// Payment history, newest first.
    pub async fn payments_for(&self, employee_id: u64) -> Result<Vec<PaymentRecord>> {
        let stores = &self.stores;
        stores
            .call(stores.payments.list_for_employee(employee_id))
            .await
    }

    async fn pending_in(&self, employee_id: u64, window: &PayWindow) -> Result<Vec<TimeLogEntry>> {
        let stores = &self.stores;
        let entries = stores
            .call(stores.time_logs.pending_between(employee_id, window))
            .await?;
        // open sessions are never settled
        Ok(entries.into_iter().filter(TimeLogEntry::is_settleable).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::NewEmployee;
    use crate::model::time_log::LogStatus;
    use crate::payroll::ClockLedger;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::time::Duration as StdDuration;

    struct Fixture {
        stores: Stores,
        ledger: ClockLedger,
        engine: SettlementEngine,
        employee_id: u64,
    }

    async fn fixture() -> Fixture {
        let stores = Stores::memory(StdDuration::from_secs(1));
        let employee = stores
            .employees
            .insert(NewEmployee {
                name: "Grace".into(),
                email: "grace@example.com".into(),
                pin_hash: "hash".into(),
                hourly_rate: dec!(20.00),
            })
            .await
            .unwrap();
        let locks = EmployeeLocks::new();
        Fixture {
            ledger: ClockLedger::new(stores.clone(), locks.clone()),
            engine: SettlementEngine::new(stores.clone(), locks),
            stores,
            employee_id: employee.id,
        }
    }

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
    }

    async fn work(f: &Fixture, start: DateTime<Utc>, hours: i64) {
        f.ledger.clock_in_at(f.employee_id, start).await.unwrap();
        f.ledger
            .clock_out_at(f.employee_id, start + Duration::hours(hours))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_settle_pays_window_and_marks_entries() {
        let f = fixture().await;
        work(&f, day(4, 9), 8).await;
        work(&f, day(5, 9), 4).await;
        work(&f, day(20, 9), 2).await;

        let payment = f
            .engine
            .settle(f.employee_id, "2024-03-01", "2024-03-15")
            .await
            .unwrap();
        assert_eq!(payment.amount, dec!(240.00));
        assert_eq!(payment.period_start, day(1, 0));

        let logs = f
            .stores
            .time_logs
            .list_for_employee(f.employee_id)
            .await
            .unwrap();
        let paid: Vec<_> = logs
            .iter()
            .filter(|log| log.status == LogStatus::Paid)
            .collect();
        assert_eq!(paid.len(), 2);
        assert!(paid.iter().all(|log| log.payment_id == Some(payment.id)));
    }

    #[tokio::test]
    async fn test_second_settle_finds_nothing() {
        let f = fixture().await;
        work(&f, day(4, 9), 8).await;

        let first = f
            .engine
            .settle(f.employee_id, "2024-03-01", "2024-03-31")
            .await
            .unwrap();
        let second = f
            .engine
            .settle(f.employee_id, "2024-03-01", "2024-03-31")
            .await;
        assert_eq!(second, Err(PayrollError::NoPendingWork));

        let payments = f.engine.payments_for(f.employee_id).await.unwrap();
        assert_eq!(payments, vec![first]);
    }

    #[tokio::test]
    async fn test_preview_matches_settlement() {
        let f = fixture().await;
        work(&f, day(4, 9), 3).await;
        work(&f, day(6, 13), 5).await;

        let preview = f
            .engine
            .preview_unpaid(f.employee_id, "2024-03-01", "2024-03-31")
            .await
            .unwrap();
        assert_eq!(preview.entries.len(), 2);

        let payment = f
            .engine
            .settle(f.employee_id, "2024-03-01", "2024-03-31")
            .await
            .unwrap();
        assert_eq!(payment.amount, preview.total_amount);
    }

    #[tokio::test]
    async fn test_open_session_is_not_settled() {
        let f = fixture().await;
        work(&f, day(4, 9), 8).await;
        f.ledger.clock_in_at(f.employee_id, day(5, 9)).await.unwrap();

        let preview = f
            .engine
            .preview_unpaid(f.employee_id, "2024-03-01", "2024-03-31")
            .await
            .unwrap();
        assert_eq!(preview.entries.len(), 1);

        let payment = f
            .engine
            .settle(f.employee_id, "2024-03-01", "2024-03-31")
            .await
            .unwrap();
        assert_eq!(payment.amount, dec!(160.00));
        assert!(f
            .stores
            .time_logs
            .find_open(f.employee_id)
            .await
            .unwrap()
            .is_some_and(|open| open.status == LogStatus::Pending));
    }

    #[tokio::test]
    async fn test_inverted_window_is_invalid() {
        let f = fixture().await;
        let err = f
            .engine
            .settle(f.employee_id, "2024-03-31", "2024-03-01")
            .await
            .unwrap_err();
        assert!(matches!(err, PayrollError::InvalidRange(_)));

        let err = f
            .engine
            .preview_unpaid(f.employee_id, "2024-3-1x", "2024-03-31")
            .await
            .unwrap_err();
        assert!(matches!(err, PayrollError::InvalidRange(_)));
    }

    #[tokio::test]
    async fn test_unknown_employee_has_no_pending_work() {
        let f = fixture().await;
        let result = f.engine.settle(404, "2024-03-01", "2024-03-31").await;
        assert_eq!(result, Err(PayrollError::NoPendingWork));
    }

    #[tokio::test]
    async fn test_window_edges_are_inclusive() {
        let f = fixture().await;
        work(&f, day(1, 0), 1).await;
        work(&f, Utc.with_ymd_and_hms(2024, 3, 2, 23, 0, 0).unwrap(), 2).await;
        work(&f, day(3, 0), 1).await;

        let preview = f
            .engine
            .preview_unpaid(f.employee_id, "2024-03-01", "2024-03-02")
            .await
            .unwrap();
        // the 23:00 shift runs past midnight but clocked in on the 2nd
        assert_eq!(preview.entries.len(), 2);
        assert_eq!(preview.total_amount, dec!(60.00));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_settlements_pay_once() {
        let f = fixture().await;
        for d in 4..9 {
            work(&f, day(d, 9), 8).await;
        }

        // two engines over one store share no lock, leaving only the store's claim
        let engines = [
            f.engine.clone(),
            SettlementEngine::new(f.stores.clone(), EmployeeLocks::new()),
            f.engine.clone(),
            SettlementEngine::new(f.stores.clone(), EmployeeLocks::new()),
        ];
        let tasks: Vec<_> = engines
            .into_iter()
            .map(|engine| {
                let id = f.employee_id;
                tokio::spawn(async move { engine.settle(id, "2024-03-01", "2024-03-31").await })
            })
            .collect();

        let mut paid = Vec::new();
        for task in tasks {
            match task.await.unwrap() {
                Ok(payment) => paid.push(payment),
                Err(PayrollError::NoPendingWork) | Err(PayrollError::SettlementFailed(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].amount, dec!(800.00));
        let payments = f.engine.payments_for(f.employee_id).await.unwrap();
        assert_eq!(payments.len(), 1);
    }
}
