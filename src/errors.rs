use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum VisitLogError {
    FileOperation(String),
    Serialization(String),
    InvalidInput(String),
    Config(String),
}

impl VisitLogError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            VisitLogError::FileOperation(_) => "E001",
            VisitLogError::Serialization(_) => "E002",
            VisitLogError::InvalidInput(_) => "E003",
            VisitLogError::Config(_) => "E004",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            VisitLogError::FileOperation(_) => "File Operation Error",
            VisitLogError::Serialization(_) => "Serialization Error",
            VisitLogError::InvalidInput(_) => "Invalid Input",
            VisitLogError::Config(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            VisitLogError::FileOperation(msg)
            | VisitLogError::Serialization(msg)
            | VisitLogError::InvalidInput(msg)
            | VisitLogError::Config(msg) => msg,
        }
    }

    /// 映射到 HTTP 状态码
    ///
    /// 只有输入错误算客户端错误，存储层和配置故障一律 500
    pub fn http_status(&self) -> StatusCode {
        match self {
            VisitLogError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于启动失败时打印到终端）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for VisitLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for VisitLogError {}

// 便捷的构造函数
impl VisitLogError {
    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        VisitLogError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        VisitLogError::Serialization(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        VisitLogError::InvalidInput(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        VisitLogError::Config(msg.into())
    }
}

impl From<std::io::Error> for VisitLogError {
    fn from(err: std::io::Error) -> Self {
        VisitLogError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for VisitLogError {
    fn from(err: serde_json::Error) -> Self {
        VisitLogError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for VisitLogError {
    fn from(err: csv::Error) -> Self {
        VisitLogError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VisitLogError>;
