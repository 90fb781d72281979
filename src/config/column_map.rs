// ==========================================
// 奶牛选配系统 - 列映射配置
// ==========================================
// 职责: 源表头 → 标准字段 的数据驱动映射
// 内置: 牧场管理软件导出的中文表头 + 英文表头
// 覆写: JSON（字段 → 别名列表，整体替换该字段的默认别名）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ==========================================
// CanonicalField - 标准字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    // 育种指数表
    AnimalId,
    GroupLabel,
    RankScore,
    PriorServiceCount,
    // 冻精库存表
    SireId,
    SemenCategory,
    Doses,
    // 推荐矩阵
    OffspringScore,
    InbreedingCoefficient,
    DefectVerdict,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::AnimalId => "animal_id",
            CanonicalField::GroupLabel => "group_label",
            CanonicalField::RankScore => "rank_score",
            CanonicalField::PriorServiceCount => "prior_service_count",
            CanonicalField::SireId => "sire_id",
            CanonicalField::SemenCategory => "semen_category",
            CanonicalField::Doses => "doses",
            CanonicalField::OffspringScore => "offspring_score",
            CanonicalField::InbreedingCoefficient => "inbreeding_coefficient",
            CanonicalField::DefectVerdict => "defect_verdict",
        }
    }

    fn default_aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::AnimalId => &["牛号", "母牛号", "耳号", "animal_id", "cow_id"],
            CanonicalField::GroupLabel => &["分组", "组别", "情期分组", "group", "group_label"],
            CanonicalField::RankScore => &["育种指数", "综合指数", "指数得分", "rank_score", "index_score"],
            CanonicalField::PriorServiceCount => {
                &["配次", "已配次数", "本胎次配次", "prior_service_count", "service_count"]
            }
            CanonicalField::SireId => &["公牛号", "冻精编号", "sire_id", "bull_id"],
            CanonicalField::SemenCategory => &["冻精类型", "类型", "semen_category", "category"],
            CanonicalField::Doses => &["数量", "剩余数量", "支数", "库存", "doses", "remaining_doses"],
            CanonicalField::OffspringScore => &["后代得分", "后代预估", "offspring_score", "score"],
            CanonicalField::InbreedingCoefficient => {
                &["近交系数", "后代近交系数", "inbreeding", "inbreeding_coefficient"]
            }
            CanonicalField::DefectVerdict => {
                &["隐性基因", "隐性基因情况", "defect", "defect_verdict"]
            }
        }
    }

    const ALL: [CanonicalField; 10] = [
        CanonicalField::AnimalId,
        CanonicalField::GroupLabel,
        CanonicalField::RankScore,
        CanonicalField::PriorServiceCount,
        CanonicalField::SireId,
        CanonicalField::SemenCategory,
        CanonicalField::Doses,
        CanonicalField::OffspringScore,
        CanonicalField::InbreedingCoefficient,
        CanonicalField::DefectVerdict,
    ];
}

// ==========================================
// ColumnMap - 列映射
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    aliases: BTreeMap<CanonicalField, Vec<String>>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        let aliases = CanonicalField::ALL
            .iter()
            .map(|f| {
                (
                    *f,
                    f.default_aliases().iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        Self { aliases }
    }
}

impl ColumnMap {
    /// 在默认映射上应用覆写（被覆写字段的别名整体替换）
    pub fn with_overrides(mut self, overrides: BTreeMap<CanonicalField, Vec<String>>) -> Self {
        for (field, list) in overrides {
            let cleaned: Vec<String> = list
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !cleaned.is_empty() {
                self.aliases.insert(field, cleaned);
            }
        }
        self
    }

    /// 从 JSON 字符串读取覆写
    pub fn from_json_str(raw: &str) -> ImportResult<Self> {
        let overrides: BTreeMap<CanonicalField, Vec<String>> = serde_json::from_str(raw)
            .map_err(|e| ImportError::ColumnMapError(e.to_string()))?;
        Ok(Self::default().with_overrides(overrides))
    }

    /// 从 JSON 文件读取覆写
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.aliases.get(&field).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// 在表头中定位字段所在列（按别名顺序优先）
    ///
    /// 比较时去除首尾空白，ASCII 大小写不敏感
    pub fn resolve(&self, headers: &[String], field: CanonicalField) -> Option<usize> {
        self.aliases(field).iter().find_map(|alias| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(alias.trim()))
        })
    }
}
