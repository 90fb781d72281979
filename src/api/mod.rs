// ==========================================
// 奶牛选配系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供命令行/界面调用
// ==========================================

pub mod allocation_api;
pub mod error;

// 重导出核心类型
pub use allocation_api::{AllocationApi, AllocationApiResponse};
pub use error::{ApiError, ApiResult};
