use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

/// 一次访问记录
///
/// 写入后不可变。JSON 键名与日志文件格式一致（`ts` / `ua`），
/// 读取时兼容 `timestamp` / `user_agent`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEntry {
    /// ISO-8601 时间戳（带时区偏移）
    #[serde(rename = "ts", alias = "timestamp")]
    pub timestamp: String,
    pub ip: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub referer: String,
    #[serde(rename = "ua", alias = "user_agent", default)]
    pub user_agent: String,
}

impl VisitEntry {
    /// 以当前本地时间创建记录
    pub fn now(
        ip: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        origin: impl Into<String>,
        referer: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: current_timestamp(),
            ip: ip.into(),
            method: method.into(),
            path: path.into(),
            origin: origin.into(),
            referer: referer.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// 本地时间 RFC 3339，微秒精度，例如 `2025-03-01T08:15:30.123456+08:00`
pub fn current_timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
