pub mod admin;
pub mod employee;
pub mod payment;
pub mod role;
pub mod time_log;
