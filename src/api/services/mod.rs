pub mod frontend;
pub mod geo;
pub mod health;
pub mod logs;
pub mod visit;

use actix_web::web;

pub use frontend::{FrontendService, PageSettings};
pub use geo::GeoService;
pub use health::HealthService;
pub use logs::LogsService;
pub use visit::{VisitService, visit_from_request};

/// 注册全部路由
///
/// 需要的 app_data：`Arc<VisitJournal>`、`Arc<QueryService>`、`PageSettings`
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(FrontendService::handle_index))
        .route("/get_ip", web::get().to(VisitService::get_ip))
        .route("/logs", web::get().to(FrontendService::handle_logs_page))
        .route("/logs.json", web::get().to(LogsService::logs_json))
        .route("/logs.csv", web::get().to(LogsService::logs_csv))
        .route("/geo", web::get().to(GeoService::lookup))
        .route("/simulator", web::get().to(FrontendService::handle_simulator))
        .route("/health", web::get().to(HealthService::health_check))
        .route("/health", web::head().to(HealthService::health_check));
}
