// ==========================================
// 奶牛选配系统 - 导入数据质量汇总
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// DqSummary - 单张输入表的导入汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DqSummary {
    pub source: String,     // 表名/文件名
    pub total_rows: usize,  // 非空行数
    pub accepted: usize,    // 进入引擎的行数
    pub dropped: usize,     // 丢弃的行数（主键缺失/未分组/类型无法识别）
    pub warning: usize,     // 产生告警的次数
}

impl DqSummary {
    pub fn new(source: &str, total_rows: usize) -> Self {
        Self {
            source: source.to_string(),
            total_rows,
            ..Default::default()
        }
    }
}
