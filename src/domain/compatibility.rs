// ==========================================
// 奶牛选配系统 - 选配相容性记录
// ==========================================
// 来源: 隐性基因筛查 + 近交系数计算（外部协作方）
// 引擎视为只读事实
// ==========================================

use crate::domain::types::DefectVerdict;
use serde::{Deserialize, Serialize};

// ==========================================
// CompatibilityRecord - (母牛, 公牛) 选配评估
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityRecord {
    pub offspring_score: f64,        // 后代预估得分
    pub inbreeding_coefficient: f64, // 近交系数 [0,1]
    pub defect_verdict: DefectVerdict,
}

impl CompatibilityRecord {
    pub fn defect_safe(&self) -> bool {
        self.defect_verdict.is_safe()
    }
}

// ==========================================
// RawCompatibilityRecord - 推荐矩阵中的一行
// ==========================================
#[derive(Debug, Clone)]
pub struct RawCompatibilityRecord {
    pub animal_id: String,
    pub sire_id: String,
    pub offspring_score: Option<f64>,
    pub inbreeding_coefficient: Option<f64>,
    pub defect_verdict: DefectVerdict,
    pub row_number: usize,
}
