pub mod dashboard;
pub mod employee;
pub mod payment;
pub mod time_log;
