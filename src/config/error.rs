// ==========================================
// 奶牛选配系统 - 配置层错误类型
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    FileNotFound(String),

    #[error("配置文件读取失败: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("配置文件格式错误: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
