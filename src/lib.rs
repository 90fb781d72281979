// ==========================================
// 奶牛选配系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 决策支持系统（冻精分配建议，人工最终确认）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 结果库与导出
pub mod repository;

// 引擎层 - 分配规则
pub mod engine;

// 导入层 - 外部表格
pub mod importer;

// 配置层 - 分配设置/列映射/配种策略
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 阶段耗时与 SQL 追踪
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CommitPass, DefectVerdict, InbreedingThreshold, SemenCategory};

// 领域实体
pub use domain::{
    AllocationSummary, AllocationWarning, Animal, AssignmentPick, AssignmentRow,
    CompatibilityRecord, SireUsage,
};

// 配置
pub use config::{AllocationConfig, ColumnMap, ConfigManager, GroupStrategy};

// 引擎
pub use engine::{
    AllocationEngine, AllocationError, AllocationInputs, AllocationOrchestrator,
    AllocationOutcome, CancellationToken, CompatibilityOracle, ProgressSink, SireInventory,
};

// 仓储
pub use repository::{AllocationResultWriter, CsvResultExporter, SqliteAllocationRepository};

// API
pub use api::{AllocationApi, ApiError};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "奶牛选配系统";
