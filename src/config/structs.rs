use serde::{Deserialize, Serialize};

/// 环境变量前缀，例如 `VISITLOG__GEOIP__ENABLED=false`
pub const ENV_PREFIX: &str = "VISITLOG";

/// 独立的 GeoIP 关闭开关（离线 / 隔离网络部署时使用）
pub const GEOIP_DISABLED_ENV: &str = "GEOIP_DISABLED";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - server: 监听地址、端口、worker 数量
/// - logging: 日志配置
/// - journal: 访问日志文件与读取上限
/// - geoip: 外部 GeoIP 服务与缓存文件
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub geoip: GeoIpConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：VISITLOG，分隔符：__
    pub fn load(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        let mut loaded = match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        };

        if geoip_disabled_by_env(std::env::var(GEOIP_DISABLED_ENV).ok().as_deref()) {
            loaded.geoip.enabled = false;
        }

        loaded
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// `GEOIP_DISABLED` 取值判断：1 / true / yes / on 视为关闭
pub fn geoip_disabled_by_env(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// 磁盘上的附加页面目录（`/simulator` 从这里读取）
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 访问日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    #[serde(default = "default_journal_path")]
    pub path: String,
    /// 每次追加后 fsync
    #[serde(default)]
    pub sync_on_append: bool,
    /// 页面展示 / JSON 查询的默认条数
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,
    /// CSV 导出条数上限
    #[serde(default = "default_export_ceiling")]
    pub export_ceiling: usize,
}

/// GeoIP 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// false 时不发起任何外部请求；公网 IP 返回空记录且不写入缓存文件，
    /// 重新开启后这些 IP 会正常查询
    #[serde(default = "default_geoip_enabled")]
    pub enabled: bool,
    /// 外部 GeoIP API URL，使用 {ip} 作为占位符
    #[serde(default = "default_geoip_api_url")]
    pub api_url: String,
    #[serde(default = "default_geoip_timeout_secs")]
    pub timeout_secs: u64,
    /// 缓存文件路径（整个 IP → 记录 映射的 JSON）
    #[serde(default = "default_geoip_cache_path")]
    pub cache_path: String,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    5000
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_static_dir() -> String {
    ".".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_journal_path() -> String {
    "ip_log.txt".to_string()
}

fn default_display_limit() -> usize {
    500
}

fn default_export_ceiling() -> usize {
    5000
}

fn default_geoip_enabled() -> bool {
    true
}

fn default_geoip_api_url() -> String {
    "http://ip-api.com/json/{ip}?fields=status,message,country,countryCode,city,org,as"
        .to_string()
}

fn default_geoip_timeout_secs() -> u64 {
    5
}

fn default_geoip_cache_path() -> String {
    "geo_cache.json".to_string()
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            workers: default_workers(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: default_journal_path(),
            sync_on_append: false,
            display_limit: default_display_limit(),
            export_ceiling: default_export_ceiling(),
        }
    }
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            enabled: default_geoip_enabled(),
            api_url: default_geoip_api_url(),
            timeout_secs: default_geoip_timeout_secs(),
            cache_path: default_geoip_cache_path(),
        }
    }
}
