//! API 帮助函数

use actix_web::HttpResponse;
use serde::Serialize;
use tracing::error;

use crate::errors::VisitLogError;

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub code: &'a str,
    pub message: &'a str,
}

/// 从 VisitLogError 构建错误响应（自动映射 HTTP 状态码）
pub fn error_response(err: &VisitLogError) -> HttpResponse {
    let status = err.http_status();
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ErrorBody {
            code: err.code(),
            message: err.message(),
        })
}

/// 构建 JSON 成功响应
pub fn json_ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok()
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(data)
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T: Serialize>(result: Result<T, VisitLogError>) -> HttpResponse {
    match result {
        Ok(data) => json_ok(data),
        Err(e) => error_response(&e),
    }
}
