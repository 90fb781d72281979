// ==========================================
// 奶牛选配系统 - 非致命告警
// ==========================================
// 数据质量问题不抛错，累计后随结果返回
// ==========================================

use crate::domain::types::SemenCategory;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationWarning {
    /// 未分组的母牛（不参与分配）
    UnlabeledAnimals { count: usize },
    /// 同一牛号重复出现，仅保留首行
    DuplicateAnimal { animal_id: String, row_number: usize },
    /// 育种指数缺失，排在组内最后
    MissingRankScore { animal_id: String },
    /// 母牛在推荐矩阵中完全没有记录，已排除
    AnimalWithoutCompatibility { animal_id: String },
    /// (母牛, 公牛) 无相容性数据，该组合视为不合格
    CompatibilityGap { animal_id: String, sire_id: String },
    /// 推荐矩阵中的公牛不在库存中
    UnknownSire { sire_id: String },
    /// 库存中的公牛在推荐矩阵中完全没有数据，视为不合格
    SireWithoutCompatibility { sire_id: String },
    /// 主键缺失，该行已跳过
    MissingKey { source_name: String, row_number: usize, field: String },
    /// 负库存已归零
    NegativeDosesClamped { sire_id: String, category: SemenCategory, raw: i64 },
    /// 无法识别的冻精类型
    UnknownCategory { row_number: usize, value: String },
    /// 数值字段解析失败，已按默认值处理
    FieldParseFallback { row_number: usize, field: String, value: String },
    /// 同一组合重复出现，以后出现者为准
    DuplicateCompatibility { animal_id: String, sire_id: String, row_number: usize },
    /// 配种方式列表超过4项或无法识别
    StrategyAdjusted { group_label: String, message: String },
}

impl AllocationWarning {
    /// 稳定的类型标识（与序列化 tag 一致）
    pub fn kind(&self) -> &'static str {
        match self {
            AllocationWarning::UnlabeledAnimals { .. } => "UNLABELED_ANIMALS",
            AllocationWarning::DuplicateAnimal { .. } => "DUPLICATE_ANIMAL",
            AllocationWarning::MissingRankScore { .. } => "MISSING_RANK_SCORE",
            AllocationWarning::AnimalWithoutCompatibility { .. } => "ANIMAL_WITHOUT_COMPATIBILITY",
            AllocationWarning::CompatibilityGap { .. } => "COMPATIBILITY_GAP",
            AllocationWarning::UnknownSire { .. } => "UNKNOWN_SIRE",
            AllocationWarning::SireWithoutCompatibility { .. } => "SIRE_WITHOUT_COMPATIBILITY",
            AllocationWarning::MissingKey { .. } => "MISSING_KEY",
            AllocationWarning::NegativeDosesClamped { .. } => "NEGATIVE_DOSES_CLAMPED",
            AllocationWarning::UnknownCategory { .. } => "UNKNOWN_CATEGORY",
            AllocationWarning::FieldParseFallback { .. } => "FIELD_PARSE_FALLBACK",
            AllocationWarning::DuplicateCompatibility { .. } => "DUPLICATE_COMPATIBILITY",
            AllocationWarning::StrategyAdjusted { .. } => "STRATEGY_ADJUSTED",
        }
    }
}

impl fmt::Display for AllocationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationWarning::UnlabeledAnimals { count } => {
                write!(f, "{} 头母牛未分组，已排除", count)
            }
            AllocationWarning::DuplicateAnimal { animal_id, row_number } => {
                write!(f, "牛号重复 (行 {}): {}，已忽略", row_number, animal_id)
            }
            AllocationWarning::MissingRankScore { animal_id } => {
                write!(f, "育种指数缺失: {}，排在组内最后", animal_id)
            }
            AllocationWarning::AnimalWithoutCompatibility { animal_id } => {
                write!(f, "推荐矩阵中无该母牛数据: {}，已排除", animal_id)
            }
            AllocationWarning::CompatibilityGap { animal_id, sire_id } => {
                write!(f, "缺少选配数据: 母牛 {} × 公牛 {}", animal_id, sire_id)
            }
            AllocationWarning::UnknownSire { sire_id } => {
                write!(f, "公牛不在库存中: {}", sire_id)
            }
            AllocationWarning::SireWithoutCompatibility { sire_id } => {
                write!(f, "推荐矩阵中无该公牛数据: {}，不参与分配", sire_id)
            }
            AllocationWarning::MissingKey { source_name, row_number, field } => {
                write!(f, "{} 第 {} 行缺少 {}，已跳过", source_name, row_number, field)
            }
            AllocationWarning::NegativeDosesClamped { sire_id, category, raw } => {
                write!(f, "库存为负 ({} {}: {})，已按 0 处理", sire_id, category.label_zh(), raw)
            }
            AllocationWarning::UnknownCategory { row_number, value } => {
                write!(f, "无法识别的冻精类型 (行 {}): {}", row_number, value)
            }
            AllocationWarning::FieldParseFallback { row_number, field, value } => {
                write!(f, "字段解析失败 (行 {}, 字段 {}): {}", row_number, field, value)
            }
            AllocationWarning::DuplicateCompatibility { animal_id, sire_id, row_number } => {
                write!(f, "选配数据重复 (行 {}): {} × {}", row_number, animal_id, sire_id)
            }
            AllocationWarning::StrategyAdjusted { group_label, message } => {
                write!(f, "配种方式调整 ({}): {}", group_label, message)
            }
        }
    }
}
