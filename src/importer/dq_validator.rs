// ==========================================
// 奶牛选配系统 - 数据质量校验器
// ==========================================
// 职责: 主键缺失/重复、分组缺失、选配组合重复 + DQ 汇总
// 输出: 通过校验的记录 + 告警 + DqSummary
// ==========================================

use crate::domain::animal::{Animal, RawAnimalRecord};
use crate::domain::compatibility::RawCompatibilityRecord;
use crate::domain::quality::DqSummary;
use crate::domain::semen::{LotKey, RawInventoryRecord};
use crate::domain::warning::AllocationWarning;
use std::collections::{BTreeMap, HashMap, HashSet};

/// 校验结果
#[derive(Debug, Clone)]
pub struct Validated<T> {
    pub records: T,
    pub warnings: Vec<AllocationWarning>,
    pub summary: DqSummary,
}

/// 育种指数表校验后的结果
#[derive(Debug, Clone, Default)]
pub struct AnimalRoster {
    pub animals: Vec<Animal>,
    pub unlabeled: usize, // 未分组母牛数（不参与分配）
}

pub struct DqValidator;

impl DqValidator {
    /// 校验育种指数表
    ///
    /// - 牛号缺失 → 跳过
    /// - 牛号重复 → 保留首行
    /// - 分组缺失 → 计数后排除
    /// - 育种指数缺失 → 保留，排在组内最后
    pub fn validate_animals(
        &self,
        source_name: &str,
        records: Vec<RawAnimalRecord>,
    ) -> Validated<AnimalRoster> {
        let mut summary = DqSummary::new(source_name, records.len());
        let mut warnings = Vec::new();
        let mut roster = AnimalRoster::default();
        let mut seen = HashSet::new();

        for record in records {
            let Some(animal_id) = record.animal_id else {
                warnings.push(AllocationWarning::MissingKey {
                    source_name: source_name.to_string(),
                    row_number: record.row_number,
                    field: "animal_id".to_string(),
                });
                summary.dropped += 1;
                continue;
            };

            if !seen.insert(animal_id.clone()) {
                warnings.push(AllocationWarning::DuplicateAnimal {
                    animal_id,
                    row_number: record.row_number,
                });
                summary.dropped += 1;
                continue;
            }

            let Some(group_label) = record
                .group_label
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
            else {
                roster.unlabeled += 1;
                summary.dropped += 1;
                continue;
            };

            if record.rank_score.is_none() {
                warnings.push(AllocationWarning::MissingRankScore {
                    animal_id: animal_id.clone(),
                });
            }

            roster.animals.push(Animal {
                animal_id,
                group_label,
                rank_score: record.rank_score,
                prior_service_count: record.prior_service_count,
                row_number: record.row_number,
            });
        }

        if roster.unlabeled > 0 {
            warnings.push(AllocationWarning::UnlabeledAnimals {
                count: roster.unlabeled,
            });
        }

        summary.accepted = roster.animals.len();
        summary.warning = warnings.len();
        Validated {
            records: roster,
            warnings,
            summary,
        }
    }

    /// 汇总库存：同一 (公牛, 类型) 多行累加
    ///
    /// 负数行先逐行归零再累加，累加饱和不溢出
    pub fn validate_inventory(
        &self,
        source_name: &str,
        records: Vec<RawInventoryRecord>,
    ) -> Validated<BTreeMap<LotKey, i64>> {
        let mut summary = DqSummary::new(source_name, records.len());
        let mut warnings = Vec::new();
        let mut counts: BTreeMap<LotKey, i64> = BTreeMap::new();

        for record in records {
            let doses = if record.doses < 0 {
                warnings.push(AllocationWarning::NegativeDosesClamped {
                    sire_id: record.sire_id.clone(),
                    category: record.semen_category,
                    raw: record.doses,
                });
                0
            } else {
                record.doses
            };
            let total = counts
                .entry((record.sire_id, record.semen_category))
                .or_insert(0);
            *total = total.saturating_add(doses);
        }

        summary.accepted = counts.len();
        summary.warning = warnings.len();
        Validated {
            records: counts,
            warnings,
            summary,
        }
    }

    /// 选配组合去重：同一 (母牛, 公牛) 以后出现者为准
    ///
    /// 输出保持首次出现的位置顺序
    pub fn validate_compatibility(
        &self,
        source_name: &str,
        records: Vec<RawCompatibilityRecord>,
    ) -> Validated<Vec<RawCompatibilityRecord>> {
        let mut summary = DqSummary::new(source_name, records.len());
        let mut warnings = Vec::new();
        let mut index: HashMap<(String, String), usize> = HashMap::new();
        let mut kept: Vec<RawCompatibilityRecord> = Vec::with_capacity(records.len());

        for record in records {
            let key = (record.animal_id.clone(), record.sire_id.clone());
            match index.get(&key) {
                Some(&pos) => {
                    warnings.push(AllocationWarning::DuplicateCompatibility {
                        animal_id: record.animal_id.clone(),
                        sire_id: record.sire_id.clone(),
                        row_number: record.row_number,
                    });
                    summary.dropped += 1;
                    kept[pos] = record;
                }
                None => {
                    index.insert(key, kept.len());
                    kept.push(record);
                }
            }
        }

        summary.accepted = kept.len();
        summary.warning = warnings.len();
        Validated {
            records: kept,
            warnings,
            summary,
        }
    }
}
