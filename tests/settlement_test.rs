mod common;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{at, hire, memory_state, shift};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use timeclock::error::{PayrollError, Result};
use timeclock::model::payment::{PaymentRecord, SettlementClaim};
use timeclock::model::time_log::LogStatus;
use timeclock::payroll::{EmployeeLocks, SettlementEngine};
use timeclock::store::memory::MemoryStore;
use timeclock::store::{PaymentStore, Stores};

#[tokio::test]
async fn test_full_pay_cycle() {
    let state = memory_state();
    let id = hire(&state, "Ada", dec!(20.00), "1234").await;

    // 09:00-17:30 and 09:00-13:20
    shift(&state, id, at(6, 9, 0), 510).await;
    shift(&state, id, at(7, 9, 0), 260).await;

    let preview = state
        .settlement
        .preview_unpaid(id, "2024-05-01", "2024-05-31")
        .await
        .unwrap();
    assert_eq!(preview.entries.len(), 2);
    // 8.5h + 4.33h at 20.00
    assert_eq!(preview.total_amount, dec!(256.60));

    let payment = state
        .settlement
        .settle(id, "2024-05-01", "2024-05-31")
        .await
        .unwrap();
    assert_eq!(payment.amount, preview.total_amount);

    let again = state.settlement.settle(id, "2024-05-01", "2024-05-31").await;
    assert_eq!(again, Err(PayrollError::NoPendingWork));

    let logs = state.ledger.logs_for(id).await.unwrap();
    assert!(logs.iter().all(|log| log.status == LogStatus::Paid));
    assert!(logs.iter().all(|log| log.payment_id == Some(payment.id)));

    let paid: rust_decimal::Decimal = state
        .settlement
        .payments_for(id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.amount)
        .sum();
    assert_eq!(paid, payment.amount);
}

#[tokio::test]
async fn test_one_open_session_per_employee_across_sequences() {
    let state = memory_state();
    let ada = hire(&state, "Ada", dec!(15), "1234").await;
    let bob = hire(&state, "Bob", dec!(15), "1234").await;

    state.ledger.clock_in_at(ada, at(6, 8, 0)).await.unwrap();
    state.ledger.clock_in_at(bob, at(6, 8, 0)).await.unwrap();
    assert!(matches!(
        state.ledger.clock_in_at(ada, at(6, 8, 5)).await,
        Err(PayrollError::Conflict(_))
    ));
    state.ledger.clock_out_at(ada, at(6, 12, 0)).await.unwrap();
    assert!(matches!(
        state.ledger.clock_out_at(ada, at(6, 12, 5)).await,
        Err(PayrollError::Conflict(_))
    ));
    state.ledger.clock_in_at(ada, at(6, 13, 0)).await.unwrap();

    for id in [ada, bob] {
        let open = state
            .ledger
            .logs_for(id)
            .await
            .unwrap()
            .into_iter()
            .filter(|log| log.is_open())
            .count();
        assert_eq!(open, 1);
    }
}

#[tokio::test]
async fn test_late_clock_out_is_left_for_the_next_run() {
    let state = memory_state();
    let id = hire(&state, "Ada", dec!(10), "1234").await;

    shift(&state, id, at(6, 9, 0), 60).await;
    state.ledger.clock_in_at(id, at(7, 9, 0)).await.unwrap();

    let first = state
        .settlement
        .settle(id, "2024-05-01", "2024-05-31")
        .await
        .unwrap();
    assert_eq!(first.amount, dec!(10));

    state.ledger.clock_out_at(id, at(7, 11, 0)).await.unwrap();
    let second = state
        .settlement
        .settle(id, "2024-05-01", "2024-05-31")
        .await
        .unwrap();
    assert_eq!(second.amount, dec!(20));
    assert_ne!(first.id, second.id);
}

/// Payment port that never answers in time.
struct StalledPayments;

#[async_trait]
impl PaymentStore for StalledPayments {
    async fn claim_and_record(&self, _claim: SettlementClaim) -> Result<PaymentRecord> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(PayrollError::Internal("unreachable".into()))
    }

    async fn list_for_employee(&self, _employee_id: u64) -> Result<Vec<PaymentRecord>> {
        Ok(Vec::new())
    }

    async fn list_since(&self, _since: DateTime<Utc>) -> Result<Vec<PaymentRecord>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_stalled_storage_surfaces_as_retryable() {
    let memory = MemoryStore::new();
    let stores = Stores {
        employees: Arc::new(memory.clone()),
        admins: Arc::new(memory.clone()),
        time_logs: Arc::new(memory),
        payments: Arc::new(StalledPayments),
        timeout: Duration::from_millis(50),
    };
    let state = timeclock::state::AppState::new(stores.clone());
    let id = hire(&state, "Ada", dec!(10), "1234").await;
    shift(&state, id, at(6, 9, 0), 60).await;

    let engine = SettlementEngine::new(stores.clone(), EmployeeLocks::new());
    let err = engine
        .settle(id, "2024-05-01", "2024-05-31")
        .await
        .unwrap_err();
    assert!(matches!(err, PayrollError::StorageUnavailable(_)));
    assert!(err.is_retryable());

    // nothing was claimed
    let preview = engine
        .preview_unpaid(id, "2024-05-01", "2024-05-31")
        .await
        .unwrap();
    assert_eq!(preview.entries.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_settlements_never_double_pay() {
    let state = memory_state();
    let id = hire(&state, "Ada", dec!(12.5), "1234").await;
    for day in 1..=10 {
        shift(&state, id, at(day, 9, 0), 480).await;
    }

    let mut tasks = Vec::new();
    for i in 0..8 {
        // half share the app's lock, half bring their own
        let engine = if i % 2 == 0 {
            state.settlement.clone()
        } else {
            SettlementEngine::new(state.stores.clone(), EmployeeLocks::new())
        };
        let (start, end) = if i % 3 == 0 {
            ("2024-05-01", "2024-05-31")
        } else {
            ("2024-05-03", "2024-05-20")
        };
        tasks.push(tokio::spawn(async move { engine.settle(id, start, end).await }));
    }

    let mut payments = Vec::new();
    for task in tasks {
        match task.await.unwrap() {
            Ok(payment) => payments.push(payment),
            Err(PayrollError::NoPendingWork) | Err(PayrollError::SettlementFailed(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(!payments.is_empty());

    // every entry is paid at most once and the payments add up to the entries
    let logs = state.ledger.logs_for(id).await.unwrap();
    let paid_total: rust_decimal::Decimal = logs
        .iter()
        .filter(|log| log.status == LogStatus::Paid)
        .filter_map(|log| log.pay_amount)
        .sum();
    let recorded: rust_decimal::Decimal = state
        .settlement
        .payments_for(id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.amount)
        .sum();
    assert_eq!(paid_total, recorded);

    for payment in state.settlement.payments_for(id).await.unwrap() {
        let covered: rust_decimal::Decimal = logs
            .iter()
            .filter(|log| log.payment_id == Some(payment.id))
            .filter_map(|log| log.pay_amount)
            .sum();
        assert_eq!(covered, payment.amount);
    }
}
