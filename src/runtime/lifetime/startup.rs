use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::StaticConfig;
use crate::errors::VisitLogError;
use crate::journal::VisitJournal;
use crate::services::{GeoCache, GeoIpProvider, QueryService};

/// 服务器运行所需的共享组件
pub struct StartupContext {
    pub journal: Arc<VisitJournal>,
    pub geo_cache: Arc<GeoCache>,
    pub query_service: Arc<QueryService>,
}

/// 准备服务器启动的上下文
///
/// 访问日志文件不存在时不创建，首次追加时再创建；
/// GeoIP 缓存文件缺失或损坏时以空缓存启动
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = Instant::now();
    debug!("Starting pre-startup processing...");

    let journal_path = std::path::Path::new(&config.journal.path);
    if let Some(parent) = journal_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create journal directory {}", parent.display())
        })?;
    }
    if journal_path.is_dir() {
        return Err(VisitLogError::config(format!(
            "journal.path {} is a directory",
            journal_path.display()
        ))
        .into());
    }

    let journal = Arc::new(VisitJournal::new(
        &config.journal.path,
        config.journal.sync_on_append,
    ));
    info!(
        "Visit journal: {} (sync_on_append = {})",
        journal.path().display(),
        config.journal.sync_on_append
    );

    let provider = GeoIpProvider::new(&config.geoip);
    if !config.geoip.enabled {
        warn!("GeoIP lookups are disabled; public IPs resolve to empty records");
    }

    let geo_cache = GeoCache::open(&config.geoip.cache_path, provider).await;
    info!(
        "GeoIP cache: {} ({} entries, provider = {})",
        geo_cache.path().display(),
        geo_cache.len(),
        geo_cache.provider_name()
    );

    let query_service = Arc::new(
        QueryService::new(Arc::clone(&journal), Arc::clone(&geo_cache)).with_limits(
            config.journal.display_limit,
            config.journal.export_ceiling,
        ),
    );
    debug!(
        "Query limits: display = {}, export ceiling = {}",
        query_service.display_limit(),
        query_service.export_ceiling()
    );

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        journal,
        geo_cache,
        query_service,
    })
}
