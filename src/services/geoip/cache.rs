//! GeoIP 解析缓存
//!
//! 内存中的 IP → GeoRecord 映射，整体镜像到一个 JSON 文件。
//! 只有公网 IP 的缓存未命中才会访问外部 provider。
//!
//! - 记录一旦写入即视为永久有效（无 TTL，不刷新）
//! - 查询失败同样缓存为空记录，避免对同一 IP 反复发起外部请求
//! - 外部查询关闭时返回空记录，但不写入缓存
//! - 同一 IP 的并发未命中只发起一次查询（moka entry API 的 singleflight 语义）
//! - 持久化串行执行，快照在拿到锁之后生成，后写入的文件总是包含先前所有记录

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use moka::future::Cache;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

use super::provider::{GeoIpProvider, GeoRecord, LookupOutcome};
use crate::errors::{Result, VisitLogError};
use crate::utils::{IpClass, atomic_write, classify_ip};

/// 解析结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// 空串、回环、私有或保留地址，未查缓存也未查 provider
    Private,
    /// 不是合法 IP，未查询也未缓存
    Invalid,
    /// 缓存命中
    Cached,
    /// 本次调用查询了 provider 并得到结果
    Provider,
    /// 本次调用查询 provider 失败，空记录已缓存
    ProviderUnavailable,
    /// 外部查询关闭，返回空记录但不缓存
    Disabled,
}

/// 带来源标记的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub record: GeoRecord,
    pub source: ResolutionSource,
}

pub struct GeoCache {
    path: PathBuf,
    provider: GeoIpProvider,
    entries: Cache<String, GeoRecord>,
    persist_lock: Mutex<()>,
}

impl GeoCache {
    /// 创建空缓存（不读取文件）
    pub fn new(path: impl Into<PathBuf>, provider: GeoIpProvider) -> Self {
        Self {
            path: path.into(),
            provider,
            // 不设容量和 TTL：记录永久有效
            entries: Cache::builder().build(),
            persist_lock: Mutex::new(()),
        }
    }

    /// 创建缓存并从文件加载
    pub async fn open(path: impl Into<PathBuf>, provider: GeoIpProvider) -> Arc<Self> {
        let cache = Arc::new(Self::new(path, provider));
        cache.load().await;
        cache
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// 从文件加载全部映射，返回加载的条数
    ///
    /// 文件不存在或格式错误都按空缓存处理，不返回错误
    pub async fn load(&self) -> usize {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("GeoIP cache file {} not found, starting empty", self.path.display());
                return 0;
            }
            Err(e) => {
                warn!(
                    "GeoIP cache file {} unreadable ({}), starting empty",
                    self.path.display(),
                    e
                );
                return 0;
            }
        };

        let map: BTreeMap<String, GeoRecord> = match serde_json::from_slice(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    "GeoIP cache file {} is malformed ({}), starting empty",
                    self.path.display(),
                    e
                );
                return 0;
            }
        };

        let count = map.len();
        for (ip, record) in map {
            self.entries.insert(ip, record).await;
        }

        info!(
            "GeoIP cache: loaded {} entries from {}",
            count,
            self.path.display()
        );
        count
    }

    /// 将完整映射写回文件（临时文件 + rename）
    pub async fn persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;

        let snapshot = self.snapshot();
        let count = snapshot.len();
        let body = serde_json::to_vec_pretty(&snapshot)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || atomic_write(&path, &body))
            .await
            .map_err(|e| VisitLogError::file_operation(format!("Persist task failed: {}", e)))?
            .map_err(|e| {
                VisitLogError::file_operation(format!(
                    "Failed to write GeoIP cache {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        trace!("GeoIP cache persisted: {} entries", count);
        Ok(())
    }

    /// 当前内存映射的有序快照
    pub fn snapshot(&self) -> BTreeMap<String, GeoRecord> {
        self.entries
            .iter()
            .map(|(ip, record)| (ip.as_ref().clone(), record))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 仅查内存，不触发外部查询
    pub async fn get_cached(&self, ip: &str) -> Option<GeoRecord> {
        self.entries.get(ip).await
    }

    /// 解析 IP 的地理信息
    pub async fn resolve(&self, ip: &str) -> GeoRecord {
        self.resolve_detailed(ip).await.record
    }

    /// 解析 IP 的地理信息，并说明结果来源
    pub async fn resolve_detailed(&self, ip: &str) -> Resolution {
        let addr = match classify_ip(ip) {
            IpClass::Private => {
                return Resolution {
                    record: GeoRecord::private(),
                    source: ResolutionSource::Private,
                };
            }
            IpClass::Invalid => {
                debug!("GeoIP: refusing to resolve non-IP value {:?}", ip);
                return Resolution {
                    record: GeoRecord::default(),
                    source: ResolutionSource::Invalid,
                };
            }
            IpClass::Public(addr) => addr,
        };

        let key = addr.to_string();
        let mut fresh_source = ResolutionSource::Cached;

        // Disabled 的结果不写入缓存，重新开启查询后这些 IP 仍会被查询
        let entry = self
            .entries
            .entry(key.clone())
            .or_optionally_insert_with(async {
                trace!("GeoIP cache miss for {}, querying {}", key, self.provider_name());
                match self.provider.lookup(&key).await {
                    LookupOutcome::Found(record) => {
                        fresh_source = ResolutionSource::Provider;
                        Some(record)
                    }
                    LookupOutcome::ProviderUnavailable(reason) => {
                        warn!("GeoIP lookup for {} failed, caching empty record: {}", key, reason);
                        fresh_source = ResolutionSource::ProviderUnavailable;
                        Some(GeoRecord::default())
                    }
                    LookupOutcome::Disabled => None,
                }
            })
            .await;

        let Some(entry) = entry else {
            trace!("GeoIP lookups disabled, not caching {}", key);
            return Resolution {
                record: GeoRecord::default(),
                source: ResolutionSource::Disabled,
            };
        };

        if !entry.is_fresh() {
            trace!("GeoIP cache hit for {}", key);
            return Resolution {
                record: entry.into_value(),
                source: ResolutionSource::Cached,
            };
        }

        if let Err(e) = self.persist().await {
            error!("GeoIP cache persist failed after resolving {}: {}", key, e);
        }

        Resolution {
            record: entry.into_value(),
            source: fresh_source,
        }
    }
}
