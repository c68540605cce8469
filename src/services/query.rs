//! 查询 / 导出服务
//!
//! 在访问日志与 GeoIP 缓存之上的只读投影：
//! - 最近 N 条记录（JSON）
//! - 最近 N 条记录（CSV 附件）
//! - 单个 IP 的地理信息

use std::num::IntErrorKind;
use std::sync::Arc;

use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{Result, VisitLogError};
use crate::journal::{VisitEntry, VisitJournal};
use crate::services::geoip::{GeoCache, GeoRecord};

/// 页面展示的默认条数
pub const DEFAULT_LIMIT: usize = 500;

/// CSV 导出的条数上限
pub const EXPORT_CEILING: usize = 5000;

/// CSV 表头（固定 7 列）
pub const CSV_HEADERS: [&str; 7] = ["ts", "ip", "method", "path", "origin", "referer", "ua"];

/// 解析条数参数
///
/// 缺省或无法解析时使用 `default`，否则夹到 `[1, ceiling]`（含超出 i64 的整数）
pub fn parse_limit(raw: Option<&str>, default: usize, ceiling: usize) -> usize {
    let ceiling = ceiling.max(1);
    let requested = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => match s.parse::<i64>() {
            Ok(n) => n.clamp(1, ceiling as i64) as usize,
            // 合法整数但超出 i64 范围，同样按上下限夹取
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => ceiling,
            Err(e) if *e.kind() == IntErrorKind::NegOverflow => 1,
            Err(_) => {
                debug!("Invalid limit {:?}, falling back to {}", s, default);
                default
            }
        },
        None => default,
    };
    requested.clamp(1, ceiling)
}

/// `GET /geo` 的响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeoLookupResponse {
    pub ip: String,
    #[serde(flatten)]
    pub record: GeoRecord,
}

/// CSV 导出结果
#[derive(Debug, Clone)]
pub struct CsvExport {
    /// 夹取后的请求条数
    pub limit: usize,
    /// 实际数据行数（不含表头）
    pub rows: usize,
    pub body: Vec<u8>,
}

impl CsvExport {
    pub fn filename(&self) -> String {
        format!("logs_last_{}.csv", self.limit)
    }
}

pub struct QueryService {
    journal: Arc<VisitJournal>,
    geo: Arc<GeoCache>,
    display_limit: usize,
    export_ceiling: usize,
}

impl QueryService {
    pub fn new(journal: Arc<VisitJournal>, geo: Arc<GeoCache>) -> Self {
        Self {
            journal,
            geo,
            display_limit: DEFAULT_LIMIT,
            export_ceiling: EXPORT_CEILING,
        }
    }

    pub fn with_limits(mut self, display_limit: usize, export_ceiling: usize) -> Self {
        self.export_ceiling = export_ceiling.max(1);
        self.display_limit = display_limit.clamp(1, self.export_ceiling);
        self
    }

    pub fn display_limit(&self) -> usize {
        self.display_limit
    }

    pub fn export_ceiling(&self) -> usize {
        self.export_ceiling
    }

    /// 将原始参数转换为条数
    pub fn resolve_limit(&self, raw: Option<&str>) -> usize {
        parse_limit(raw, self.display_limit, self.export_ceiling)
    }

    /// 最近 `limit` 条记录，最新的在最后
    pub async fn recent_json(&self, limit: usize) -> Result<Vec<VisitEntry>> {
        let journal = Arc::clone(&self.journal);
        tokio::task::spawn_blocking(move || journal.tail(limit))
            .await
            .map_err(|e| VisitLogError::file_operation(format!("Journal read task failed: {}", e)))?
    }

    /// 最近 N 条记录的 CSV
    pub async fn recent_csv(&self, raw_limit: Option<&str>) -> Result<CsvExport> {
        let limit = self.resolve_limit(raw_limit);
        let journal = Arc::clone(&self.journal);

        let export = tokio::task::spawn_blocking(move || -> Result<CsvExport> {
            let entries = journal.tail(limit)?;
            let body = render_csv(&entries)?;
            Ok(CsvExport {
                limit,
                rows: entries.len(),
                body,
            })
        })
        .await
        .map_err(|e| VisitLogError::file_operation(format!("CSV export task failed: {}", e)))??;

        info!(
            "CSV export: {} rows (requested {}) -> {}",
            export.rows,
            limit,
            export.filename()
        );
        Ok(export)
    }

    /// 单个 IP 的地理信息
    pub async fn geo_for(&self, ip: Option<&str>) -> Result<GeoLookupResponse> {
        let ip = ip
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| VisitLogError::invalid_input("ip parameter is required"))?;

        let record = self.geo.resolve(ip).await;
        Ok(GeoLookupResponse {
            ip: ip.to_string(),
            record,
        })
    }
}

/// 序列化为带表头的 CSV
pub fn render_csv(entries: &[VisitEntry]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(vec![]);
    writer.write_record(CSV_HEADERS)?;
    for entry in entries {
        writer.write_record([
            entry.timestamp.as_str(),
            entry.ip.as_str(),
            entry.method.as_str(),
            entry.path.as_str(),
            entry.origin.as_str(),
            entry.referer.as_str(),
            entry.user_agent.as_str(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| VisitLogError::serialization(format!("Failed to finalize CSV: {}", e.error())))
}
