// ==========================================
// 奶牛选配系统 - 领域模型层
// ==========================================
// 职责: 定义母牛、冻精、选配评估与分配结果的强类型记录
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod animal;
pub mod assignment;
pub mod compatibility;
pub mod quality;
pub mod semen;
pub mod types;
pub mod warning;

// 重导出核心类型
pub use animal::{Animal, RawAnimalRecord};
pub use assignment::{
    AllocationSummary, AssignmentPick, AssignmentRow, RoundStats, SireUsage, MAX_ROUNDS,
};
pub use compatibility::{CompatibilityRecord, RawCompatibilityRecord};
pub use quality::DqSummary;
pub use semen::{BreedingMethod, LotKey, RawInventoryRecord, SemenLot};
pub use types::{CommitPass, DefectVerdict, InbreedingThreshold, SemenCategory};
pub use warning::AllocationWarning;
