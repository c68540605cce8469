//! 单个 IP 的地理信息查询

use std::sync::Arc;

use actix_web::{Responder, web};
use serde::Deserialize;

use crate::api::helpers::api_result;
use crate::services::QueryService;

#[derive(Debug, Deserialize)]
pub struct GeoQuery {
    pub ip: Option<String>,
}

pub struct GeoService;

impl GeoService {
    /// `GET /geo?ip=` → `{ip, country, city, org}`
    pub async fn lookup(
        query: web::Query<GeoQuery>,
        service: web::Data<Arc<QueryService>>,
    ) -> impl Responder {
        api_result(service.geo_for(query.ip.as_deref()).await)
    }
}
