mod r#impl;
mod structs;

pub use r#impl::{get_config, init_config, update_config};
pub use structs::*;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
