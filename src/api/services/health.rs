use actix_web::{HttpResponse, Responder};
use serde_json::json;
use tracing::trace;

pub struct HealthService;

impl HealthService {
    // 简单的存活检查
    pub async fn health_check() -> impl Responder {
        trace!("Received health check request");
        HttpResponse::Ok().json(json!({ "ok": true }))
    }
}
