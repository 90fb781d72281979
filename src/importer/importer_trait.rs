// ==========================================
// 奶牛选配系统 - 导入层接口
// ==========================================

use crate::importer::error::ImportResult;
use std::path::Path;

// ==========================================
// RawTable - 解析后的原始表
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub source_name: String,  // 文件名（用于报错）
    pub headers: Vec<String>, // 已去除首尾空白
    pub rows: Vec<RawRow>,    // 不含完全空白行
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub row_number: usize, // 源文件行号（表头为第1行）
    pub cells: Vec<String>,
}

impl RawRow {
    /// 按列序号取值，空白视为缺失
    pub fn get(&self, col: Option<usize>) -> Option<&str> {
        col.and_then(|c| self.cells.get(c))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser {
    /// 解析文件为原始表
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable>;
}
