// ==========================================
// 奶牛选配系统 - 配置层
// ==========================================
// 职责: 分配设置、列映射、分组配种策略
// 存储: JSON 文件 / config_kv 表
// ==========================================

pub mod allocation_config;
pub mod column_map;
pub mod config_manager;
pub mod error;
pub mod strategy_profile;

// 重导出核心配置
pub use allocation_config::AllocationConfig;
pub use column_map::{CanonicalField, ColumnMap};
pub use config_manager::{config_keys, ConfigManager};
pub use error::{ConfigError, ConfigResult};
pub use strategy_profile::GroupStrategy;
