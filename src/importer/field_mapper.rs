// ==========================================
// 奶牛选配系统 - 字段映射器
// ==========================================
// 职责: RawTable → 强类型原始记录（列定位 + 清洗）
// 规则: 必需列在处理任何数据行前检查；解析回退记入告警
// ==========================================

use crate::config::column_map::{CanonicalField, ColumnMap};
use crate::domain::animal::RawAnimalRecord;
use crate::domain::compatibility::RawCompatibilityRecord;
use crate::domain::semen::RawInventoryRecord;
use crate::domain::types::SemenCategory;
use crate::domain::warning::AllocationWarning;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::{RawRow, RawTable};

/// 映射结果
#[derive(Debug, Clone)]
pub struct Mapped<T> {
    pub records: Vec<T>,
    pub warnings: Vec<AllocationWarning>,
    pub dropped: usize, // 映射阶段即丢弃的行
}

impl<T> Default for Mapped<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            warnings: Vec::new(),
            dropped: 0,
        }
    }
}

pub struct FieldMapper {
    column_map: ColumnMap,
    cleaner: DataCleaner,
}

impl FieldMapper {
    pub fn new(column_map: ColumnMap) -> Self {
        Self {
            column_map,
            cleaner: DataCleaner,
        }
    }

    pub fn column_map(&self) -> &ColumnMap {
        &self.column_map
    }

    /// 定位必需列，缺失即报错
    fn require(&self, table: &RawTable, field: CanonicalField) -> ImportResult<usize> {
        self.column_map
            .resolve(&table.headers, field)
            .ok_or_else(|| ImportError::MissingColumn {
                source_name: table.source_name.clone(),
                field: format!("{} ({})", field.as_str(), self.column_map.aliases(field).join("/")),
                available: table.headers.join(","),
            })
    }

    fn optional(&self, table: &RawTable, field: CanonicalField) -> Option<usize> {
        self.column_map.resolve(&table.headers, field)
    }

    fn fallback_warning(row: &RawRow, field: CanonicalField, col: Option<usize>) -> AllocationWarning {
        AllocationWarning::FieldParseFallback {
            row_number: row.row_number,
            field: field.as_str().to_string(),
            value: row.get(col).unwrap_or_default().to_string(),
        }
    }

    // ===== 育种指数表 =====

    /// 必需列: 牛号/分组/育种指数；配次可选
    pub fn map_animals(&self, table: &RawTable) -> ImportResult<Mapped<RawAnimalRecord>> {
        let id_col = self.require(table, CanonicalField::AnimalId)?;
        let group_col = self.require(table, CanonicalField::GroupLabel)?;
        let rank_col = self.require(table, CanonicalField::RankScore)?;
        let service_col = self.optional(table, CanonicalField::PriorServiceCount);

        let mut out = Mapped::default();
        for row in &table.rows {
            let rank = self.cleaner.parse_f64(row.get(Some(rank_col)));
            if rank.fell_back {
                out.warnings
                    .push(Self::fallback_warning(row, CanonicalField::RankScore, Some(rank_col)));
            }
            let services = self.cleaner.parse_service_count(row.get(service_col));
            if services.fell_back {
                out.warnings.push(Self::fallback_warning(
                    row,
                    CanonicalField::PriorServiceCount,
                    service_col,
                ));
            }

            out.records.push(RawAnimalRecord {
                animal_id: self.cleaner.clean_identifier(row.get(Some(id_col))),
                group_label: row.get(Some(group_col)).map(|g| g.to_string()),
                rank_score: rank.value,
                prior_service_count: services.value,
                row_number: row.row_number,
            });
        }
        Ok(out)
    }

    // ===== 冻精库存表 =====

    /// 必需列: 公牛号/冻精类型/数量
    ///
    /// 类型无法识别的行跳过；数量空白按 0，无法解析按 0 并告警
    pub fn map_inventory(&self, table: &RawTable) -> ImportResult<Mapped<RawInventoryRecord>> {
        let sire_col = self.require(table, CanonicalField::SireId)?;
        let category_col = self.require(table, CanonicalField::SemenCategory)?;
        let doses_col = self.require(table, CanonicalField::Doses)?;

        let mut out = Mapped::default();
        for row in &table.rows {
            let Some(sire_id) = self.cleaner.clean_identifier(row.get(Some(sire_col))) else {
                out.warnings.push(AllocationWarning::MissingKey {
                    source_name: table.source_name.clone(),
                    row_number: row.row_number,
                    field: CanonicalField::SireId.as_str().to_string(),
                });
                out.dropped += 1;
                continue;
            };

            let raw_category = row.get(Some(category_col)).unwrap_or_default();
            let Some(semen_category) = SemenCategory::normalize(raw_category) else {
                out.warnings.push(AllocationWarning::UnknownCategory {
                    row_number: row.row_number,
                    value: raw_category.to_string(),
                });
                out.dropped += 1;
                continue;
            };

            let doses = self.cleaner.parse_doses(row.get(Some(doses_col)));
            if doses.fell_back {
                out.warnings
                    .push(Self::fallback_warning(row, CanonicalField::Doses, Some(doses_col)));
            }

            out.records.push(RawInventoryRecord {
                sire_id,
                semen_category,
                doses: doses.value.unwrap_or(0),
                row_number: row.row_number,
            });
        }
        Ok(out)
    }

    // ===== 推荐矩阵 =====

    /// 必需列: 牛号/公牛号/后代得分/近交系数；隐性基因列可选（缺失即数据缺失）
    pub fn map_compatibility(
        &self,
        table: &RawTable,
    ) -> ImportResult<Mapped<RawCompatibilityRecord>> {
        let animal_col = self.require(table, CanonicalField::AnimalId)?;
        let sire_col = self.require(table, CanonicalField::SireId)?;
        let score_col = self.require(table, CanonicalField::OffspringScore)?;
        let inbreeding_col = self.require(table, CanonicalField::InbreedingCoefficient)?;
        let defect_col = self.optional(table, CanonicalField::DefectVerdict);

        let mut out = Mapped::default();
        for row in &table.rows {
            let animal_id = self.cleaner.clean_identifier(row.get(Some(animal_col)));
            let sire_id = self.cleaner.clean_identifier(row.get(Some(sire_col)));
            let (Some(animal_id), Some(sire_id)) = (animal_id.clone(), sire_id.clone()) else {
                let field = if animal_id.is_none() {
                    CanonicalField::AnimalId
                } else {
                    CanonicalField::SireId
                };
                out.warnings.push(AllocationWarning::MissingKey {
                    source_name: table.source_name.clone(),
                    row_number: row.row_number,
                    field: field.as_str().to_string(),
                });
                out.dropped += 1;
                continue;
            };

            let score = self.cleaner.parse_f64(row.get(Some(score_col)));
            if score.fell_back {
                out.warnings.push(Self::fallback_warning(
                    row,
                    CanonicalField::OffspringScore,
                    Some(score_col),
                ));
            }
            let inbreeding = self.cleaner.parse_fraction(row.get(Some(inbreeding_col)));
            if inbreeding.fell_back {
                out.warnings.push(Self::fallback_warning(
                    row,
                    CanonicalField::InbreedingCoefficient,
                    Some(inbreeding_col),
                ));
            }

            out.records.push(RawCompatibilityRecord {
                animal_id,
                sire_id,
                offspring_score: score.value,
                inbreeding_coefficient: inbreeding.value,
                defect_verdict: self.cleaner.parse_defect_verdict(row.get(defect_col)),
                row_number: row.row_number,
            });
        }
        Ok(out)
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new(ColumnMap::default())
    }
}
