// ==========================================
// 奶牛选配系统 - 母牛实体
// ==========================================
// 来源: 育种指数表（外部指数计算步骤产出）
// 生命周期: 每次分配运行时重新加载，引擎只读
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Animal - 参与分配的母牛
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub animal_id: String,             // 牛号（目录内唯一）
    pub group_label: String,           // 分组/情期标签（已过滤空值）
    pub rank_score: Option<f64>,       // 育种指数得分（空值排在组内最后）
    pub prior_service_count: u32,      // 已配次数
    pub row_number: usize,             // 源文件行号（稳定排序依据）
}

impl Animal {
    /// 组内排序：得分降序，空值最后，同分按源行号
    pub fn rank_cmp(a: &Animal, b: &Animal) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (a.rank_score, b.rank_score) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then(a.row_number.cmp(&b.row_number))
    }
}

// ==========================================
// RawAnimalRecord - 字段映射后的原始行
// ==========================================
// 用途: 映射/清洗阶段的中间结构，尚未过滤分组缺失
#[derive(Debug, Clone, Default)]
pub struct RawAnimalRecord {
    pub animal_id: Option<String>,
    pub group_label: Option<String>,
    pub rank_score: Option<f64>,
    pub prior_service_count: u32,
    pub row_number: usize,
}
