//! GeoIP Provider 抽象层
//!
//! 统一的 GeoIP 查询接口，根据配置选择实现：
//! - `geoip.enabled = true` → ExternalApiProvider
//! - `geoip.enabled = false` → DisabledProvider（不发起任何网络请求）

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::external_api::ExternalApiProvider;
use crate::config::GeoIpConfig;

/// 私有 / 保留地址的国家字段占位
pub const PRIVATE_COUNTRY: &str = "(private)";

/// 地理位置信息，空字符串表示未知
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoRecord {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub org: String,
}

impl GeoRecord {
    /// 私有地址哨兵记录 `{country: "(private)", city: "", org: ""}`
    pub fn private() -> Self {
        Self {
            country: PRIVATE_COUNTRY.to_string(),
            ..Self::default()
        }
    }

    pub fn is_private(&self) -> bool {
        self.country == PRIVATE_COUNTRY
    }

    pub fn is_empty(&self) -> bool {
        self.country.is_empty() && self.city.is_empty() && self.org.is_empty()
    }
}

/// 单次外部查询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// 服务正常返回（字段可能为空）
    Found(GeoRecord),
    /// 超时、网络错误、响应格式错误或服务返回失败状态
    ProviderUnavailable(String),
    /// 外部查询已被配置关闭
    Disabled,
}

impl LookupOutcome {
    /// 折叠为记录：失败和关闭都得到空记录
    pub fn into_record(self) -> GeoRecord {
        match self {
            LookupOutcome::Found(record) => record,
            LookupOutcome::ProviderUnavailable(_) | LookupOutcome::Disabled => GeoRecord::default(),
        }
    }
}

/// GeoIP 查询 trait
#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    /// 查询 IP 地址的地理位置，不返回错误
    async fn lookup(&self, ip: &str) -> LookupOutcome;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 关闭外部查询时使用
pub struct DisabledProvider;

#[async_trait]
impl GeoIpLookup for DisabledProvider {
    async fn lookup(&self, _ip: &str) -> LookupOutcome {
        LookupOutcome::Disabled
    }

    fn name(&self) -> &'static str {
        "Disabled"
    }
}

/// 统一 GeoIP Provider
#[derive(Clone)]
pub struct GeoIpProvider {
    inner: Arc<dyn GeoIpLookup>,
}

impl GeoIpProvider {
    /// 根据 GeoIpConfig 初始化
    pub fn new(config: &GeoIpConfig) -> Self {
        let inner: Arc<dyn GeoIpLookup> = if config.enabled {
            Arc::new(ExternalApiProvider::new(
                &config.api_url,
                std::time::Duration::from_secs(config.timeout_secs),
            ))
        } else {
            Arc::new(DisabledProvider)
        };

        info!("GeoIP: Initialized with {} provider", inner.name());
        Self { inner }
    }

    /// 使用自定义实现（测试或嵌入时注入）
    pub fn with_lookup(inner: Arc<dyn GeoIpLookup>) -> Self {
        Self { inner }
    }

    pub fn disabled() -> Self {
        Self::with_lookup(Arc::new(DisabledProvider))
    }

    pub async fn lookup(&self, ip: &str) -> LookupOutcome {
        self.inner.lookup(ip).await
    }

    /// 获取当前使用的 provider 名称
    pub fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}
