//! Clock ledger, pay calculation and settlement.

pub mod calculator;
pub mod ledger;
pub mod locks;
pub mod period;
pub mod settlement;

pub use ledger::ClockLedger;
pub use locks::EmployeeLocks;
pub use period::PayWindow;
pub use settlement::{SettlementEngine, UnpaidPreview};
