// ==========================================
// 奶牛选配系统 - 母牛名册
// ==========================================
// 职责: 加载参与分配的母牛并按分组划分
// 排序: 组内育种指数降序，空值最后，同分按源行号（保证确定性）
// 构建后只读
// ==========================================

use crate::domain::animal::Animal;
use crate::domain::quality::DqSummary;
use crate::domain::warning::AllocationWarning;
use crate::engine::error::{AllocationError, AllocationResult, InputKind};
use crate::importer::herd_importer::HerdImporter;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct AnimalCatalog {
    animals: Vec<Animal>,
    unlabeled: usize,
    warnings: Vec<AllocationWarning>,
    summary: DqSummary,
}

impl AnimalCatalog {
    /// 从育种指数表加载
    ///
    /// - 文件不存在 → DataUnavailable（提示先运行指数计算）
    /// - 缺少 牛号/分组/育种指数 列 → SchemaError
    pub fn load<P: AsRef<Path>>(importer: &HerdImporter, index_source: P) -> AllocationResult<Self> {
        let validated = importer
            .load_animals(index_source)
            .map_err(|e| AllocationError::from_import(InputKind::AnimalIndex, e))?;

        let catalog = Self {
            animals: validated.records.animals,
            unlabeled: validated.records.unlabeled,
            warnings: validated.warnings,
            summary: validated.summary,
        };
        info!(
            animals = catalog.animals.len(),
            unlabeled = catalog.unlabeled,
            "母牛名册加载完成"
        );
        Ok(catalog)
    }

    /// 直接由母牛列表构建（测试/上游已完成校验）
    pub fn from_animals(animals: Vec<Animal>) -> Self {
        let summary = DqSummary {
            source: "memory".to_string(),
            total_rows: animals.len(),
            accepted: animals.len(),
            ..Default::default()
        };
        Self {
            animals,
            summary,
            ..Default::default()
        }
    }

    /// 按分组划分（仅保留所选分组），组内已排序
    pub fn partition_by_group(
        &self,
        selected_groups: &BTreeSet<String>,
    ) -> BTreeMap<String, Vec<&Animal>> {
        let mut groups: BTreeMap<String, Vec<&Animal>> = BTreeMap::new();
        for animal in &self.animals {
            if selected_groups.contains(&animal.group_label) {
                groups
                    .entry(animal.group_label.clone())
                    .or_default()
                    .push(animal);
            }
        }
        for members in groups.values_mut() {
            members.sort_by(|a, b| Animal::rank_cmp(a, b));
        }
        groups
    }

    /// 名册中出现的全部分组
    pub fn group_labels(&self) -> BTreeSet<String> {
        self.animals.iter().map(|a| a.group_label.clone()).collect()
    }

    pub fn get(&self, animal_id: &str) -> Option<&Animal> {
        self.animals.iter().find(|a| a.animal_id == animal_id)
    }

    pub fn animals(&self) -> &[Animal] {
        &self.animals
    }

    pub fn len(&self) -> usize {
        self.animals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animals.is_empty()
    }

    /// 未分组（已排除）的母牛数
    pub fn unlabeled_count(&self) -> usize {
        self.unlabeled
    }

    pub fn warnings(&self) -> &[AllocationWarning] {
        &self.warnings
    }

    pub fn summary(&self) -> &DqSummary {
        &self.summary
    }
}
