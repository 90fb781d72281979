// ==========================================
// 奶牛选配系统 - 冻精批次与配种方式
// ==========================================

use crate::domain::types::SemenCategory;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 库存键：(公牛号, 冻精类型)
pub type LotKey = (String, SemenCategory);

// ==========================================
// SemenLot - 冻精批次（库存快照中的一行）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemenLot {
    pub sire_id: String,
    pub semen_category: SemenCategory,
    pub remaining_doses: u32, // 不可为负
}

impl SemenLot {
    pub fn key(&self) -> LotKey {
        (self.sire_id.clone(), self.semen_category)
    }
}

// ==========================================
// RawInventoryRecord - 库存表中的一行（数量可能为负）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInventoryRecord {
    pub sire_id: String,
    pub semen_category: SemenCategory,
    pub doses: i64,
    pub row_number: usize,
}

// ==========================================
// BreedingMethod - 配种方式
// ==========================================
// 按配种次数排列（最多4项），决定下一次配种所用冻精类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreedingMethod {
    pub label: String,                       // 原始名称（如 "性控"、"肉牛"）
    pub category: Option<SemenCategory>,     // None 表示不使用奶牛冻精
    pub beef: bool,                          // 肉牛冻精
}

impl BreedingMethod {
    /// 从文本解析配种方式
    ///
    /// - "常规"/"性控" → 对应冻精类型
    /// - "肉牛"/"beef" → 肉牛冻精（不参与奶牛冻精分配）
    pub fn parse(raw: &str) -> Option<Self> {
        let label = raw.trim();
        if label.is_empty() {
            return None;
        }
        if let Some(category) = SemenCategory::normalize(label) {
            return Some(Self {
                label: label.to_string(),
                category: Some(category),
                beef: false,
            });
        }
        match label.to_lowercase().as_str() {
            "肉牛" | "肉牛冻精" | "beef" => Some(Self {
                label: label.to_string(),
                category: None,
                beef: true,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for BreedingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}
