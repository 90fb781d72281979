// ==========================================
// 奶牛选配系统 - 引擎层
// ==========================================
// 职责: 冻精分配规则，不拼 SQL
// 红线: 引擎只通过 SireInventory 扣减库存，只通过 Oracle 读取相容性
// ==========================================

pub mod allocation;
pub mod breeding_method;
pub mod catalog;
pub mod error;
pub mod inventory;
pub mod oracle;
pub mod orchestrator;
pub mod progress;

// 重导出核心引擎
pub use allocation::{AllocationEngine, AllocationRun};
pub use breeding_method::{next_breeding_method, MethodSchedule, MAX_METHODS};
pub use catalog::AnimalCatalog;
pub use error::{AllocationError, AllocationResult, InputKind};
pub use inventory::SireInventory;
pub use oracle::{CompatibilityOracle, MatrixOracle};
pub use orchestrator::{AllocationInputs, AllocationOrchestrator, AllocationOutcome};
pub use progress::{CancellationToken, NoOpProgress, ProgressSink, TracingProgress};
