use crate::{
    api::{dashboard, employee, payment, time_log},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Per-peer-IP limiter allowing `requests_per_min` with an equal burst.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let clock_limiter = Arc::new(build_limiter(config.rate_clock_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            // Public, rate limited
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/employee")
                            .wrap(login_limiter.clone())
                            .route(web::post().to(handlers::employee_login)),
                    )
                    .service(
                        web::resource("/admin")
                            .wrap(login_limiter.clone())
                            .route(web::post().to(handlers::admin_login)),
                    )
                    // open until the first admin exists
                    .service(
                        web::resource("/register-admin")
                            .wrap(login_limiter.clone())
                            .route(web::post().to(handlers::register_admin)),
                    )
                    .service(
                        web::resource("/change-password")
                            .wrap(from_fn(auth_middleware))
                            .wrap(protected_limiter.clone())
                            .route(web::post().to(handlers::change_password)),
                    ),
            )
            .service(
                web::scope("/time")
                    // kiosk, PIN in body
                    .service(
                        web::resource("/clock-in")
                            .wrap(clock_limiter.clone())
                            .route(web::post().to(time_log::clock_in)),
                    )
                    .service(
                        web::resource("/clock-out")
                            .wrap(clock_limiter.clone())
                            .route(web::post().to(time_log::clock_out)),
                    )
                    // /time/{employee_id}
                    .service(
                        web::resource("/{employee_id}")
                            .wrap(from_fn(auth_middleware))
                            .wrap(protected_limiter.clone())
                            .route(web::get().to(time_log::employee_logs)),
                    ),
            )
            // Protected
            .service(
                web::scope("/employees")
                    .wrap(from_fn(auth_middleware))
                    .wrap(protected_limiter.clone())
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // /employees/profile/{id}
                    .service(
                        web::resource("/profile/{id}")
                            .route(web::get().to(employee::employee_profile)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/payments")
                    .wrap(from_fn(auth_middleware))
                    .wrap(protected_limiter.clone())
                    .service(web::resource("").route(web::post().to(payment::create_payment)))
                    .service(web::resource("/unpaid").route(web::get().to(payment::unpaid_logs)))
                    .service(
                        web::resource("/mine/{employee_id}")
                            .route(web::get().to(payment::my_payments)),
                    ),
            )
            .service(
                web::scope("/dashboard")
                    .wrap(from_fn(auth_middleware))
                    .wrap(protected_limiter)
                    .service(web::resource("").route(web::get().to(dashboard::dashboard_data))),
            ),
    );
}
