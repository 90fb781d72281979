// ==========================================
// 奶牛选配系统 - API层错误类型
// ==========================================
// 职责: 将引擎/导入/仓储错误转换为用户可读的错误（阻断式对话框素材）
// ==========================================

use crate::config::error::ConfigError;
use crate::engine::error::AllocationError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 分配运行错误
    // ==========================================
    /// 上游数据缺失，附带操作提示
    #[error("数据不可用: {what}。{hint}")]
    DataUnavailable { what: String, hint: String },

    #[error("表结构错误 ({table}): {detail}")]
    SchemaError { table: String, detail: String },

    #[error("分配已取消，结果未保存")]
    Cancelled,

    #[error("分配配置无效: {0}")]
    InvalidConfig(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 导入/导出错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("文件导出失败: {0}")]
    ExportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否需要用户处理上游数据（阻断式提示）
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            ApiError::DataUnavailable { .. } | ApiError::SchemaError { .. }
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::SerializationError(msg) => ApiError::InternalError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::FileWriteError(msg) => ApiError::ExportError(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::MissingColumn {
                source_name,
                field,
                available,
            } => ApiError::SchemaError {
                table: source_name,
                detail: format!("缺少必需列 {}，可用列: {}", field, available),
            },
            ImportError::ColumnMapError(msg) => ApiError::InvalidConfig(msg),
            ImportError::Other(err) => ApiError::Other(err),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

// ==========================================
// 从 AllocationError 转换
// ==========================================
impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::DataUnavailable { what, hint } => {
                ApiError::DataUnavailable { what, hint }
            }
            AllocationError::SchemaError { table, detail } => ApiError::SchemaError { table, detail },
            AllocationError::Cancelled => ApiError::Cancelled,
            AllocationError::InvalidConfig(msg) => ApiError::InvalidConfig(msg),
            AllocationError::Import(e) => e.into(),
            AllocationError::Repository(e) => e.into(),
        }
    }
}

// ==========================================
// 从 ConfigError 转换
// ==========================================
impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::InvalidConfig(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
