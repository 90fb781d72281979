// ==========================================
// 奶牛选配系统 - 分配引擎错误类型
// ==========================================
// 致命错误: 在任何库存变动与结果落库之前中止本次运行
// 非致命问题: 见 domain::warning::AllocationWarning
// ==========================================

use crate::i18n::t;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocationError {
    /// 上游文件/表缺失（例如指数尚未计算）
    #[error("数据不可用: {what}（{hint}）")]
    DataUnavailable { what: String, hint: String },

    /// 必需列缺失或格式错误
    #[error("表结构错误 ({table}): {detail}")]
    SchemaError { table: String, detail: String },

    #[error("分配已取消")]
    Cancelled,

    #[error("分配配置无效: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 输入表种类（决定缺失时的提示）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    AnimalIndex,
    Inventory,
    Matrix,
}

impl InputKind {
    pub fn hint_key(&self) -> &'static str {
        match self {
            InputKind::AnimalIndex => "hint.run_index",
            InputKind::Inventory => "hint.import_inventory",
            InputKind::Matrix => "hint.run_matrix",
        }
    }
}

impl AllocationError {
    /// 将导入错误归入致命错误分类
    ///
    /// - 文件不存在 → DataUnavailable（附带操作提示）
    /// - 缺少必需列 → SchemaError
    pub fn from_import(kind: InputKind, err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => AllocationError::DataUnavailable {
                what: path,
                hint: t(kind.hint_key()),
            },
            ImportError::MissingColumn {
                source_name,
                field,
                available,
            } => AllocationError::SchemaError {
                table: source_name,
                detail: format!("缺少必需列 {}，可用列: {}", field, available),
            },
            other => AllocationError::Import(other),
        }
    }

    /// 是否为用户取消
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AllocationError::Cancelled)
    }
}

pub type AllocationResult<T> = Result<T, AllocationError>;
