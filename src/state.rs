use crate::payroll::{ClockLedger, EmployeeLocks, SettlementEngine};
use crate::store::Stores;
use crate::utils::email_registry::EmailRegistry;

/// Shared services handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub ledger: ClockLedger,
    pub settlement: SettlementEngine,
    pub emails: EmailRegistry,
}

impl AppState {
    pub fn new(stores: Stores) -> Self {
        let locks = EmployeeLocks::new();
        Self {
            ledger: ClockLedger::new(stores.clone(), locks.clone()),
            settlement: SettlementEngine::new(stores.clone(), locks),
            emails: EmailRegistry::new(),
            stores,
        }
    }
}
