// ==========================================
// 奶牛选配系统 - 分配编排器
// ==========================================
// 流程: 母牛名册 → 冻精库存 → 推荐矩阵 → 逐组分配 → 结果落库
// 进度: 10% / 20% / 35% / 35%→90% / 95% / 100%
// 红线: 取消或任何致命错误时不落库（结果库保持运行前状态）
// ==========================================

use crate::config::allocation_config::AllocationConfig;
use crate::domain::assignment::{AllocationSummary, AssignmentRow};
use crate::domain::types::SemenCategory;
use crate::domain::warning::AllocationWarning;
use crate::engine::allocation::AllocationEngine;
use crate::engine::catalog::AnimalCatalog;
use crate::engine::error::{AllocationError, AllocationResult, InputKind};
use crate::engine::inventory::SireInventory;
use crate::engine::oracle::MatrixOracle;
use crate::engine::progress::{CancellationToken, ProgressSink};
use crate::i18n::{t, t_with_args};
use crate::importer::herd_importer::HerdImporter;
use crate::perf::PhaseTimer;
use crate::repository::allocation_repo::{AllocationResultWriter, RunRecord};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const PCT_CATALOG: u8 = 10;
const PCT_INVENTORY: u8 = 20;
const PCT_MATRIX: u8 = 35;
const PCT_GROUPS_END: u8 = 90;
const PCT_PERSIST: u8 = 95;

// ==========================================
// AllocationInputs - 三份输入表
// ==========================================
#[derive(Debug, Clone)]
pub struct AllocationInputs {
    pub animals_path: PathBuf,   // 育种指数表
    pub inventory_path: PathBuf, // 冻精库存表
    pub matrix_path: PathBuf,    // 选配推荐矩阵
}

// ==========================================
// AllocationOutcome - 运行结果
// ==========================================
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub run_id: String,
    pub rows: Vec<AssignmentRow>,
    pub summary: AllocationSummary,
    pub warnings: Vec<AllocationWarning>,
}

// ==========================================
// AllocationOrchestrator - 分配编排器
// ==========================================
pub struct AllocationOrchestrator<W>
where
    W: AllocationResultWriter,
{
    importer: HerdImporter,
    engine: AllocationEngine,
    writer: Arc<W>,
}

impl<W> AllocationOrchestrator<W>
where
    W: AllocationResultWriter,
{
    pub fn new(importer: HerdImporter, writer: Arc<W>) -> Self {
        Self {
            importer,
            engine: AllocationEngine::new(),
            writer,
        }
    }

    /// 执行一次完整分配
    ///
    /// # 参数
    /// - inputs: 三份输入表路径
    /// - config: 本次运行配置
    /// - progress: 进度回调
    /// - cancel: 取消令牌
    ///
    /// # 返回
    /// - Ok(AllocationOutcome): 已落库
    /// - Err(Cancelled): 已取消，未落库
    /// - Err(DataUnavailable / SchemaError): 输入缺失或结构错误
    #[instrument(skip_all, fields(groups = ?config.selected_groups))]
    pub fn run(
        &self,
        inputs: &AllocationInputs,
        config: &AllocationConfig,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> AllocationResult<AllocationOutcome> {
        config.validate().map_err(AllocationError::InvalidConfig)?;

        let mut warnings: Vec<AllocationWarning> = Vec::new();

        // ===== 加载阶段 =====
        let load_timer = PhaseTimer::new("load");

        progress.report(PCT_CATALOG, &t("progress.load_catalog"));
        let catalog = AnimalCatalog::load(&self.importer, &inputs.animals_path)?;
        if catalog.unlabeled_count() > 0 {
            let count = catalog.unlabeled_count().to_string();
            progress.report(
                PCT_CATALOG,
                &t_with_args("progress.unlabeled", &[("count", count.as_str())]),
            );
        }
        warnings.extend(catalog.warnings().iter().cloned());
        cancel_point(cancel)?;

        progress.report(PCT_INVENTORY, &t("progress.load_inventory"));
        let stock = self
            .importer
            .load_inventory(&inputs.inventory_path)
            .map_err(|e| AllocationError::from_import(InputKind::Inventory, e))?;
        warnings.extend(stock.warnings);
        let (mut inventory, inventory_warnings) = SireInventory::load(stock.records);
        warnings.extend(inventory_warnings);
        cancel_point(cancel)?;

        progress.report(PCT_MATRIX, &t("progress.load_matrix"));
        let matrix = self
            .importer
            .load_compatibility(&inputs.matrix_path)
            .map_err(|e| AllocationError::from_import(InputKind::Matrix, e))?;
        warnings.extend(matrix.warnings);
        let oracle = MatrixOracle::from_records(matrix.records);
        // 矩阵中有、库存中没有的公牛只提示
        for sire_id in oracle.sire_ids() {
            if !SemenCategory::ALL.iter().any(|c| inventory.contains(sire_id, *c)) {
                warnings.push(AllocationWarning::UnknownSire {
                    sire_id: sire_id.to_string(),
                });
            }
        }
        drop(load_timer);

        // ===== 分配阶段 =====
        let run = {
            let _timer = PhaseTimer::new("allocate");
            let mut on_group = |idx: usize, total: usize, label: &str| {
                let span = u32::from(PCT_GROUPS_END - PCT_MATRIX);
                let step = span * idx as u32 / total.max(1) as u32;
                progress.report(
                    PCT_MATRIX + step as u8,
                    &t_with_args("progress.allocate_group", &[("group", label)]),
                );
            };
            self.engine
                .perform_allocation(&catalog, &mut inventory, &oracle, config, cancel, &mut on_group)?
        };
        cancel_point(cancel)?;

        let sire_usage = run.sire_usage(&inventory);
        warnings.extend(run.warnings);

        let summary = AllocationSummary {
            run_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            groups: run.groups,
            animals_allocated: run.rows.len(),
            round_stats: run.round_stats,
            sire_usage,
            warning_count: warnings.len(),
        };

        // ===== 落库阶段 =====
        progress.report(PCT_PERSIST, &t("progress.persist"));
        {
            let _timer = PhaseTimer::new("persist");
            self.writer.write_run(&RunRecord {
                summary: &summary,
                rows: &run.rows,
                config,
                warnings: &warnings,
            })?;
        }

        info!(
            run_id = %summary.run_id,
            animals = summary.animals_allocated,
            strict = summary.strict_total(),
            advisory = summary.advisory_total(),
            warnings = summary.warning_count,
            "分配运行完成"
        );
        progress.report(100, &t("progress.done"));

        Ok(AllocationOutcome {
            run_id: summary.run_id.clone(),
            rows: run.rows,
            summary,
            warnings,
        })
    }
}

fn cancel_point(cancel: &CancellationToken) -> AllocationResult<()> {
    if cancel.is_cancelled() {
        info!("分配已取消，结果未保存");
        return Err(AllocationError::Cancelled);
    }
    Ok(())
}
