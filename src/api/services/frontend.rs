//! 页面服务
//!
//! `/` 与 `/logs` 使用编译期嵌入的页面；`/simulator` 从磁盘目录读取，
//! 文件不存在时返回嵌入的提示页。

use std::path::PathBuf;

use actix_web::{HttpResponse, Result, web};
use rust_embed::Embed;
use tracing::{debug, trace, warn};

/// 模拟器页面文件名
pub const SIMULATOR_FILE: &str = "attack_simulator_integrated_full.html";

// 使用 RustEmbed 嵌入静态页面
#[derive(Embed)]
#[folder = "assets/"]
struct PageAssets;

/// 页面相关的运行时设置
#[derive(Debug, Clone)]
pub struct PageSettings {
    /// 磁盘页面目录
    pub static_dir: PathBuf,
}

impl PageSettings {
    pub fn new(static_dir: impl Into<PathBuf>) -> Self {
        Self {
            static_dir: static_dir.into(),
        }
    }
}

pub struct FrontendService;

impl FrontendService {
    /// 首页
    pub async fn handle_index() -> Result<HttpResponse> {
        trace!("Serving index page");
        Ok(Self::serve_page("index.html"))
    }

    /// 访问记录页面（前端每 3 秒轮询 /logs.json）
    pub async fn handle_logs_page() -> Result<HttpResponse> {
        trace!("Serving logs page");
        Ok(Self::serve_page("logs.html"))
    }

    /// 攻击模拟器页面
    pub async fn handle_simulator(settings: web::Data<PageSettings>) -> Result<HttpResponse> {
        let path = settings.static_dir.join(SIMULATOR_FILE);
        match tokio::fs::read(&path).await {
            Ok(content) => {
                trace!("Serving simulator from {}", path.display());
                Ok(HttpResponse::Ok()
                    .content_type("text/html; charset=utf-8")
                    .body(content))
            }
            Err(e) => {
                debug!("Simulator page {} unavailable: {}", path.display(), e);
                Ok(Self::serve_page("simulator_missing.html"))
            }
        }
    }

    fn serve_page(name: &str) -> HttpResponse {
        match PageAssets::get(name) {
            Some(content) => {
                let html = String::from_utf8_lossy(&content.data)
                    .replace("%VISITLOG_VERSION%", env!("CARGO_PKG_VERSION"))
                    .replace("%SIMULATOR_FILE%", SIMULATOR_FILE);
                HttpResponse::Ok()
                    .content_type("text/html; charset=utf-8")
                    .body(html)
            }
            None => {
                warn!("Embedded page {} is missing", name);
                HttpResponse::NotFound().body("Page not found")
            }
        }
    }
}
