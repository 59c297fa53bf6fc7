use crate::error::Result;
use crate::model::employee::normalize_email;
use crate::store::Stores;
use autoscale_cuckoo_filter::CuckooFilter;
use moka::future::Cache;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::info;

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

const CACHE_CAPACITY: u64 = 500_000;
const CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Fast answers to "is this employee email free?".
///
/// The cuckoo filter gives definite negatives, the cache gives recent
/// positives, and the employee store settles everything else.
#[derive(Clone)]
pub struct EmailRegistry {
    filter: Arc<RwLock<CuckooFilter<String>>>,
    taken: Cache<String, bool>,
}

impl Default for EmailRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailRegistry {
    pub fn new() -> Self {
        Self {
            filter: Arc::new(RwLock::new(CuckooFilter::new(
                FILTER_CAPACITY,
                FALSE_POSITIVE_RATE,
            ))),
            taken: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// False positives possible, false negatives not.
    pub fn might_exist(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.filter
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&email)
    }

    pub async fn mark_taken(&self, email: &str) {
        let email = normalize_email(email);
        self.filter
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .add(&email);
        self.taken.insert(email, true).await;
    }

    pub async fn release(&self, email: &str) {
        let email = normalize_email(email);
        self.filter
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&email);
        self.taken.invalidate(&email).await;
    }

    /// `true` when no employee uses `email`.
    pub async fn is_available(&self, email: &str, stores: &Stores) -> Result<bool> {
        if !self.might_exist(email) {
            return Ok(true);
        }

        let email = normalize_email(email);
        if self.taken.get(&email).await.unwrap_or(false) {
            return Ok(false);
        }

        let existing = stores.call(stores.employees.find_by_email(&email)).await?;
        if existing.is_some() {
            self.taken.insert(email, true).await;
            return Ok(false);
        }
        Ok(true)
    }

    /// Loads every registered employee email. Returns how many were loaded.
    pub async fn warmup(&self, stores: &Stores, batch_size: usize) -> anyhow::Result<usize> {
        let employees = stores.call(stores.employees.list()).await?;

        for batch in employees.chunks(batch_size.max(1)) {
            {
                let mut filter = self
                    .filter
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                for employee in batch {
                    filter.add(&normalize_email(&employee.email));
                }
            }

            let inserts: Vec<_> = batch
                .iter()
                .map(|employee| self.taken.insert(normalize_email(&employee.email), true))
                .collect();
            futures::future::join_all(inserts).await;
        }

        info!(total = employees.len(), "Email registry warmup complete");
        Ok(employees.len())
    }
}
