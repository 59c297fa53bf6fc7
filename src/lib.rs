pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod model;
pub mod models;
pub mod payroll;
pub mod reporting;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;

use actix_web::{Responder, get, web};
use config::Config;
use state::AppState;

#[get("/")]
async fn index() -> impl Responder {
    "Timeclock payroll service is running"
}

/// Registers shared data and every route. Used by the server and the tests.
pub fn configure_app(cfg: &mut web::ServiceConfig, state: AppState, config: Config) {
    cfg.app_data(web::Data::new(state))
        .app_data(web::Data::new(config.clone()))
        .service(index)
        .configure(|cfg| routes::configure(cfg, &config));
}
