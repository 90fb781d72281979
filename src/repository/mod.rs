// ==========================================
// 奶牛选配系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含分配逻辑
// ==========================================
// 职责: 分配结果持久化 / 历史查询 / CSV 导出
// 约束: 所有查询使用参数化
// ==========================================

pub mod allocation_repo;
pub mod error;
pub mod export;

// 重导出核心仓储
pub use allocation_repo::{
    AllocationResultWriter, RunListItem, RunRecord, SqliteAllocationRepository, StoredRun,
};
pub use error::{RepositoryError, RepositoryResult};
pub use export::CsvResultExporter;
