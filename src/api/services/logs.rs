//! 访问日志查询与导出

use std::sync::Arc;

use actix_web::{Responder, web};
use serde::Deserialize;
use tracing::trace;

use crate::api::helpers::{api_result, error_response};
use crate::services::QueryService;

#[derive(Debug, Deserialize)]
pub struct JsonQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CsvQuery {
    #[serde(alias = "limit")]
    pub n: Option<String>,
}

pub struct LogsService;

impl LogsService {
    /// 最近的访问记录（JSON 数组，最新的在最后）
    pub async fn logs_json(
        query: web::Query<JsonQuery>,
        service: web::Data<Arc<QueryService>>,
    ) -> impl Responder {
        let limit = service.resolve_limit(query.limit.as_deref());
        trace!("logs.json request, limit={}", limit);
        api_result(service.recent_json(limit).await)
    }

    /// 最近的访问记录（CSV 附件）
    pub async fn logs_csv(
        query: web::Query<CsvQuery>,
        service: web::Data<Arc<QueryService>>,
    ) -> impl Responder {
        match service.recent_csv(query.n.as_deref()).await {
            Ok(export) => actix_web::HttpResponse::Ok()
                .content_type("text/csv; charset=utf-8")
                .insert_header((
                    "Content-Disposition",
                    format!("attachment; filename=\"{}\"", export.filename()),
                ))
                .body(export.body),
            Err(e) => error_response(&e),
        }
    }
}
