//! 外部 GeoIP API 实现
//!
//! 使用外部 HTTP API 进行 IP 地理位置查询（默认 ip-api.com）。
//! 本层不做缓存，缓存由 `GeoCache` 负责。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{trace, warn};
use ureq::Agent;

use super::provider::{GeoIpLookup, GeoRecord, LookupOutcome};

/// 外部 API GeoIP Provider
pub struct ExternalApiProvider {
    api_url_template: String,
    agent: Agent,
}

impl ExternalApiProvider {
    /// 创建外部 API Provider
    ///
    /// `api_url_template` 使用 `{ip}` 作为占位符
    /// 例如: `http://ip-api.com/json/{ip}?fields=status,country,city,org,as`
    pub fn new(api_url_template: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            api_url_template: api_url_template.to_string(),
            agent,
        }
    }

    /// 同步请求（在 spawn_blocking 中调用）
    fn fetch_from_api_sync(agent: &Agent, url: &str) -> LookupOutcome {
        let resp = match agent.get(url).call() {
            Ok(r) => r,
            Err(e) => {
                warn!("GeoIP API request to \"{}\" failed: {}", url, e);
                return LookupOutcome::ProviderUnavailable(format!("request failed: {}", e));
            }
        };

        let json: Value = match resp.into_body().read_json() {
            Ok(j) => j,
            Err(e) => {
                warn!("GeoIP API response from \"{}\" parse failed: {}", url, e);
                return LookupOutcome::ProviderUnavailable(format!("bad response: {}", e));
            }
        };

        parse_response(&json)
    }
}

/// 解析服务返回的 JSON
///
/// 兼容常见的字段命名：
/// - country: `country` → `country_name` → `countryCode` → `country_code`
/// - city: `city`
/// - org: `org` → `organization` → `isp` → `as` → `asn`
pub fn parse_response(json: &Value) -> LookupOutcome {
    if !json.is_object() {
        return LookupOutcome::ProviderUnavailable("response is not a JSON object".to_string());
    }

    // ip-api.com 失败时返回: {"status": "fail", "message": "..."}
    if json["status"].as_str() == Some("fail") {
        let message = json["message"].as_str().unwrap_or("unknown");
        trace!("External API returned fail status: {}", message);
        return LookupOutcome::ProviderUnavailable(format!("provider failure: {}", message));
    }

    let country = first_field(json, &["country", "country_name", "countryCode", "country_code"]);
    let city = first_field(json, &["city"]);
    let org = first_field(json, &["org", "organization", "isp", "as", "asn"]);

    trace!(
        "External API lookup: country={:?}, city={:?}, org={:?}",
        country, city, org
    );

    LookupOutcome::Found(GeoRecord { country, city, org })
}

/// 取第一个非空字段；数字形式的 ASN 转成 `AS<n>`
fn first_field(json: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| match &json[*key] {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) if *key == "asn" => Some(format!("AS{}", n)),
            _ => None,
        })
        .unwrap_or_default()
}

#[async_trait]
impl GeoIpLookup for ExternalApiProvider {
    async fn lookup(&self, ip: &str) -> LookupOutcome {
        let url = self.api_url_template.replace("{ip}", ip);
        let agent = self.agent.clone();

        trace!("GeoIP lookup for {} via external API", ip);

        // 使用 spawn_blocking 在线程池中执行同步 HTTP 请求
        tokio::task::spawn_blocking(move || Self::fetch_from_api_sync(&agent, &url))
            .await
            .unwrap_or_else(|e| {
                warn!("GeoIP spawn_blocking failed: {}", e);
                LookupOutcome::ProviderUnavailable(format!("lookup task failed: {}", e))
            })
    }

    fn name(&self) -> &'static str {
        "ExternalAPI"
    }
}
