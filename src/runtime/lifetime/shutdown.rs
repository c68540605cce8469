use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::services::GeoCache;

/// 关闭阶段刷写缓存的超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// 等待 Ctrl+C，然后把 GeoIP 缓存最后落盘一次
pub async fn listen_for_shutdown(geo_cache: Arc<GeoCache>) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, flushing GeoIP cache...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    flush_geo_cache(&geo_cache).await;
}

/// 落盘 GeoIP 缓存（带超时）
pub async fn flush_geo_cache(geo_cache: &GeoCache) {
    if geo_cache.is_empty() {
        info!("GeoIP cache is empty, nothing to flush");
        return;
    }

    match timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        geo_cache.persist(),
    )
    .await
    {
        Ok(Ok(())) => info!(
            "GeoIP cache flushed ({} entries) to {}",
            geo_cache.len(),
            geo_cache.path().display()
        ),
        Ok(Err(e)) => error!("Failed to flush GeoIP cache: {}", e),
        Err(_) => error!(
            "GeoIP cache flush timed out after {} seconds",
            SHUTDOWN_TIMEOUT_SECS
        ),
    }
}
