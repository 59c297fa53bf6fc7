use actix_web::middleware::NormalizePath;
use actix_web::{App, HttpServer};
use anyhow::Context;
use timeclock::config::Config;
use timeclock::db::init_db;
use timeclock::docs::ApiDoc;
use timeclock::state::AppState;
use timeclock::store::Stores;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!("Server starting...");

    let stores = match &config.database_url {
        Some(url) => {
            let pool = init_db(url, config.db_max_connections, config.storage_timeout).await?;
            Stores::mysql(pool, config.storage_timeout)
        }
        None => {
            warn!("DATABASE_URL not set, data lives in memory only");
            Stores::memory(config.storage_timeout)
        }
    };
    let state = AppState::new(stores);

    let warmup_state = state.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warmup_state
            .emails
            .warmup(&warmup_state.stores, 250)
            .await
        {
            error!(error = %e, "Failed to warm up email registry");
        }
    });

    let server_addr = config.server_addr.clone();
    info!(addr = %server_addr, "Listening");

    HttpServer::new(move || {
        let state = state.clone();
        let config = config.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard so the UI's JS/CSS files resolve
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .configure(move |cfg| timeclock::configure_app(cfg, state, config))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
