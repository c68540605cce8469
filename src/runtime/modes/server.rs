//! Server mode
//!
//! Builds the shared components and runs the HTTP server.

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::configure_routes;
use crate::api::services::PageSettings;
use crate::api::middleware::TimingMiddleware;
use crate::config::get_config;
use crate::runtime::lifetime;

/// worker 数量上限
const MAX_WORKERS: usize = 32;

/// Run the HTTP server
///
/// **Note**: Configuration and logging must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let config = get_config();

    let startup = lifetime::startup::prepare_server_startup(&config)
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;

    let journal = startup.journal.clone();
    let query_service = startup.query_service.clone();
    let geo_cache = startup.geo_cache.clone();

    let pages = PageSettings::new(&config.server.static_dir);
    info!("Static page directory: {}", pages.static_dir.display());

    let workers = config.server.workers.clamp(1, MAX_WORKERS);
    info!("Using {} workers for the server", workers);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TimingMiddleware)
            .wrap(Compress::default())
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-cache, no-store, must-revalidate")))
            .app_data(web::Data::new(journal.clone()))
            .app_data(web::Data::new(query_service.clone()))
            .app_data(web::Data::new(pages.clone()))
            .configure(configure_routes)
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_millis(5000))
    .client_disconnect_timeout(Duration::from_millis(1000))
    .workers(workers);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server.bind(&bind_address)?.run();

    tokio::select! {
        res = server => {
            res?;
            lifetime::shutdown::flush_geo_cache(&geo_cache).await;
        }
        _ = lifetime::shutdown::listen_for_shutdown(geo_cache.clone()) => {
            warn!("Graceful shutdown: GeoIP cache flushed");
        }
    }

    Ok(())
}
