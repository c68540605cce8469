//! 应用生命周期与运行模式
//!
//! - `lifetime`: 启动准备、优雅关闭
//! - `modes`: HTTP 服务器

pub mod lifetime;
pub mod modes;

pub use modes::server::run_server;
