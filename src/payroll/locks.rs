use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per employee.
///
/// Clock-in, clock-out and settlement for the same employee take the same
/// guard, so they run one after another inside this process. Different
/// employees never contend.
#[derive(Clone, Default)]
pub struct EmployeeLocks {
    slots: Arc<Mutex<HashMap<u64, Arc<AsyncMutex<()>>>>>,
}

impl EmployeeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, employee_id: u64) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // drop slots nobody holds or waits on
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(employee_id).or_default().clone()
        };
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_employee_is_serialized() {
        let locks = EmployeeLocks::new();
        let guard = locks.acquire(1).await;

        let waiting = tokio::time::timeout(Duration::from_millis(20), locks.acquire(1)).await;
        assert!(waiting.is_err());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(100), locks.acquire(1)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_employees_do_not_block() {
        let locks = EmployeeLocks::new();
        let _first = locks.acquire(1).await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(2)).await;
        assert!(second.is_ok());
    }
}
