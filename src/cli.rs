//! Command-line argument parsing

use clap::Parser;

use crate::config::{DEFAULT_CONFIG_PATH, StaticConfig};

/// Visitor IP logger with GeoIP enrichment
#[derive(Parser, Debug)]
#[command(name = "visitlog")]
#[command(version)]
#[command(about = "Records inbound visits and enriches visitor IPs with GeoIP data", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Override listen host
    #[arg(long)]
    pub host: Option<String>,

    /// Override listen port
    #[arg(long, short = 'p', env = "PORT")]
    pub port: Option<u16>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// 将命令行覆盖项合并到已加载的配置上
    pub fn apply_overrides(&self, config: &mut StaticConfig) {
        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}
