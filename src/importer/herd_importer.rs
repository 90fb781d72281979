// ==========================================
// 奶牛选配系统 - 牛群数据导入器
// ==========================================
// 职责: 整合导入流程，从文件到强类型输入
// 流程: 解析 → 映射（含清洗） → 校验 → 汇总告警
// ==========================================

use crate::config::column_map::ColumnMap;
use crate::domain::compatibility::RawCompatibilityRecord;
use crate::domain::semen::LotKey;
use crate::importer::dq_validator::{AnimalRoster, DqValidator, Validated};
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::{FieldMapper, Mapped};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::RawTable;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument, warn};

pub struct HerdImporter {
    parser: UniversalFileParser,
    mapper: FieldMapper,
    validator: DqValidator,
}

impl HerdImporter {
    pub fn new(column_map: ColumnMap) -> Self {
        Self {
            parser: UniversalFileParser,
            mapper: FieldMapper::new(column_map),
            validator: DqValidator,
        }
    }

    // ===== 育种指数表 =====

    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_animals<P: AsRef<Path>>(&self, path: P) -> ImportResult<Validated<AnimalRoster>> {
        let table = self.parser.parse(path)?;
        self.animals_from_table(&table)
    }

    pub fn animals_from_table(&self, table: &RawTable) -> ImportResult<Validated<AnimalRoster>> {
        let mapped = self.mapper.map_animals(table)?;
        let Mapped {
            records,
            warnings: mut mapping_warnings,
            dropped,
        } = mapped;

        let mut validated = self.validator.validate_animals(&table.source_name, records);
        validated.summary.total_rows += dropped;
        validated.summary.dropped += dropped;
        mapping_warnings.append(&mut validated.warnings);
        validated.warnings = mapping_warnings;
        validated.summary.warning = validated.warnings.len();

        log_summary(&validated);
        Ok(validated)
    }

    // ===== 冻精库存表 =====

    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_inventory<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> ImportResult<Validated<BTreeMap<LotKey, i64>>> {
        let table = self.parser.parse(path)?;
        self.inventory_from_table(&table)
    }

    pub fn inventory_from_table(
        &self,
        table: &RawTable,
    ) -> ImportResult<Validated<BTreeMap<LotKey, i64>>> {
        let Mapped {
            records,
            warnings: mut mapping_warnings,
            dropped,
        } = self.mapper.map_inventory(table)?;

        let mut validated = self.validator.validate_inventory(&table.source_name, records);
        validated.summary.total_rows += dropped;
        validated.summary.dropped += dropped;
        mapping_warnings.append(&mut validated.warnings);
        validated.warnings = mapping_warnings;
        validated.summary.warning = validated.warnings.len();

        log_summary(&validated);
        Ok(validated)
    }

    // ===== 推荐矩阵 =====

    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_compatibility<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> ImportResult<Validated<Vec<RawCompatibilityRecord>>> {
        let table = self.parser.parse(path)?;
        self.compatibility_from_table(&table)
    }

    pub fn compatibility_from_table(
        &self,
        table: &RawTable,
    ) -> ImportResult<Validated<Vec<RawCompatibilityRecord>>> {
        let Mapped {
            records,
            warnings: mut mapping_warnings,
            dropped,
        } = self.mapper.map_compatibility(table)?;

        let mut validated = self.validator.validate_compatibility(&table.source_name, records);
        validated.summary.total_rows += dropped;
        validated.summary.dropped += dropped;
        mapping_warnings.append(&mut validated.warnings);
        validated.warnings = mapping_warnings;
        validated.summary.warning = validated.warnings.len();

        log_summary(&validated);
        Ok(validated)
    }
}

impl Default for HerdImporter {
    fn default() -> Self {
        Self::new(ColumnMap::default())
    }
}

fn log_summary<T>(validated: &Validated<T>) {
    let s = &validated.summary;
    info!(
        source = %s.source,
        total_rows = s.total_rows,
        accepted = s.accepted,
        dropped = s.dropped,
        warnings = s.warning,
        "导入完成"
    );
    for w in &validated.warnings {
        warn!(source = %s.source, kind = w.kind(), "{}", w);
    }
}
