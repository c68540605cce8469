//! GeoIP 服务模块
//!
//! - `provider`: 查询接口与 provider 选择
//! - `external_api`: 外部 HTTP API 实现
//! - `cache`: 持久化的 IP → 地理信息缓存

mod cache;
mod external_api;
mod provider;

pub use cache::{GeoCache, Resolution, ResolutionSource};
pub use external_api::{ExternalApiProvider, parse_response};
pub use provider::{
    DisabledProvider, GeoIpLookup, GeoIpProvider, GeoRecord, LookupOutcome, PRIVATE_COUNTRY,
};
