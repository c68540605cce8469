//! 访问记录入口

use std::sync::Arc;

use actix_web::{HttpRequest, Responder, web};
use serde::Serialize;
use tracing::{debug, error};

use crate::api::helpers::{error_response, json_ok};
use crate::errors::VisitLogError;
use crate::journal::{VisitEntry, VisitJournal};
use crate::utils::extract_client_ip;

/// `GET /get_ip` 的响应
#[derive(Debug, Serialize)]
pub struct VisitResponse {
    pub ip: String,
    pub ts: String,
}

/// 由请求构造访问记录
pub fn visit_from_request(req: &HttpRequest) -> VisitEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };

    VisitEntry::now(
        extract_client_ip(req),
        req.method().as_str(),
        req.path(),
        header("origin"),
        header("referer"),
        header("user-agent"),
    )
}

pub struct VisitService;

impl VisitService {
    /// 记录本次访问并返回客户端 IP
    pub async fn get_ip(
        req: HttpRequest,
        journal: web::Data<Arc<VisitJournal>>,
    ) -> impl Responder {
        let entry = visit_from_request(&req);
        let response = VisitResponse {
            ip: entry.ip.clone(),
            ts: entry.timestamp.clone(),
        };

        let journal = journal.get_ref().clone();
        match web::block(move || journal.append(&entry)).await {
            Ok(Ok(())) => {
                debug!("Visit recorded from {}", response.ip);
                json_ok(response)
            }
            Ok(Err(e)) => error_response(&e),
            Err(e) => {
                error!("Journal append task failed: {}", e);
                error_response(&VisitLogError::file_operation(format!(
                    "Journal append task failed: {}",
                    e
                )))
            }
        }
    }
}
