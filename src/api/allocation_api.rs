// ==========================================
// 奶牛选配系统 - 冻精分配 API
// ==========================================
// 职责: 供 GUI/命令行调用的门面
// 1. 请求校验（输入路径、分组选择）
// 2. 执行分配（编排器）并整理响应
// 3. 历史运行查询、结果导出、分配设置读写
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::allocation_config::AllocationConfig;
use crate::config::config_manager::ConfigManager;
use crate::db::open_result_store;
use crate::domain::assignment::{AssignmentRow, MAX_ROUNDS};
use crate::domain::types::SemenCategory;
use crate::domain::warning::AllocationWarning;
use crate::engine::orchestrator::{AllocationInputs, AllocationOrchestrator};
use crate::engine::progress::{CancellationToken, ProgressSink};
use crate::i18n::t_with_args;
use crate::importer::herd_importer::HerdImporter;
use crate::repository::allocation_repo::{RunListItem, SqliteAllocationRepository, StoredRun};
use crate::repository::export::CsvResultExporter;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::info;

/// 分配API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationApiResponse {
    pub run_id: String,
    /// 写入结果库的母牛数
    pub animals_allocated: usize,
    /// 有库存支撑的选择数
    pub strict_picks: usize,
    /// 兜底推荐数（未扣减库存）
    pub advisory_picks: usize,
    /// 每个 (类型, 轮次) 的未分配提示
    pub unassigned: Vec<String>,
    pub warnings: Vec<AllocationWarning>,
    pub rows: Vec<AssignmentRow>,
    pub elapsed_ms: i64,
}

/// 冻精分配API
pub struct AllocationApi {
    repo: Arc<SqliteAllocationRepository>,
    config_manager: Arc<ConfigManager>,
    exporter: CsvResultExporter,
}

impl AllocationApi {
    /// 打开结果库并创建 API 实例
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_result_store(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self::with_connection(Arc::new(Mutex::new(conn))))
    }

    /// 共享已有连接（仓储与配置管理器共用）
    pub fn with_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            repo: Arc::new(SqliteAllocationRepository::from_connection(conn.clone())),
            config_manager: Arc::new(ConfigManager::from_connection(conn)),
            exporter: CsvResultExporter,
        }
    }

    /// 执行分配
    ///
    /// # 参数
    /// - inputs: 三份输入表
    /// - config: 本次配置；None 时读取已保存的分配设置
    /// - progress: 进度回调
    /// - cancel: 取消令牌
    ///
    /// # 返回
    /// - Ok(AllocationApiResponse): 已落库
    /// - Err(ApiError::DataUnavailable / SchemaError): 阻断式提示
    /// - Err(ApiError::Cancelled): 已取消，结果库不变
    pub fn run_allocation(
        &self,
        inputs: &AllocationInputs,
        config: Option<AllocationConfig>,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ApiResult<AllocationApiResponse> {
        let start = Instant::now();
        validate_inputs(inputs)?;

        let config = match config {
            Some(cfg) => cfg,
            None => self.config_manager.load_allocation_config()?,
        };
        config.validate().map_err(ApiError::InvalidConfig)?;

        let column_map = self.config_manager.load_column_map()?;
        let orchestrator =
            AllocationOrchestrator::new(HerdImporter::new(column_map), self.repo.clone());
        let outcome = orchestrator.run(inputs, &config, progress, cancel)?;

        let mut unassigned = Vec::new();
        for category in SemenCategory::ALL {
            for round in 1..=config.effective_rounds().min(MAX_ROUNDS) {
                let count = outcome.summary.unassigned_total(category, round);
                if count > 0 {
                    let round = round.to_string();
                    let count = count.to_string();
                    unassigned.push(t_with_args(
                        "summary.unassigned",
                        &[
                            ("category", category.label_zh()),
                            ("round", round.as_str()),
                            ("count", count.as_str()),
                        ],
                    ));
                }
            }
        }

        let elapsed_ms = start.elapsed().as_millis() as i64;
        info!(run_id = %outcome.run_id, elapsed_ms, "分配请求完成");

        Ok(AllocationApiResponse {
            run_id: outcome.run_id,
            animals_allocated: outcome.summary.animals_allocated,
            strict_picks: outcome.summary.strict_total(),
            advisory_picks: outcome.summary.advisory_total(),
            unassigned,
            warnings: outcome.warnings,
            rows: outcome.rows,
            elapsed_ms,
        })
    }

    // ===== 历史查询 =====

    pub fn list_runs(&self) -> ApiResult<Vec<RunListItem>> {
        Ok(self.repo.list_runs()?)
    }

    pub fn get_run(&self, run_id: &str) -> ApiResult<StoredRun> {
        self.repo
            .load_run(run_id)?
            .ok_or_else(|| ApiError::NotFound(format!("分配运行(run_id={})不存在", run_id)))
    }

    /// 某分组当前结果；None 表示全部分组
    pub fn get_rows(&self, group_label: Option<&str>) -> ApiResult<Vec<AssignmentRow>> {
        match group_label {
            Some(group) => Ok(self.repo.load_rows(group.trim())?),
            None => Ok(self.repo.load_all_rows()?),
        }
    }

    // ===== 导出 =====

    /// 导出分配宽表
    pub fn export_rows<P: AsRef<Path>>(&self, group_label: Option<&str>, out: P) -> ApiResult<usize> {
        let rows = self.get_rows(group_label)?;
        if rows.is_empty() {
            return Err(ApiError::NotFound(match group_label {
                Some(g) => format!("分组 {} 暂无分配结果", g),
                None => "结果库暂无分配结果".to_string(),
            }));
        }
        Ok(self.exporter.export_assignments(out, &rows)?)
    }

    /// 导出某次运行的公牛使用表
    pub fn export_sire_usage<P: AsRef<Path>>(&self, run_id: &str, out: P) -> ApiResult<usize> {
        // 先确认运行存在
        self.get_run(run_id)?;
        let usage = self.repo.load_sire_usage(run_id)?;
        Ok(self.exporter.export_sire_usage(out, &usage)?)
    }

    // ===== 分配设置 =====

    pub fn load_config(&self) -> ApiResult<AllocationConfig> {
        Ok(self.config_manager.load_allocation_config()?)
    }

    pub fn save_config(&self, config: &AllocationConfig) -> ApiResult<()> {
        config.validate().map_err(ApiError::InvalidConfig)?;
        Ok(self.config_manager.save_allocation_config(config)?)
    }
}

fn validate_inputs(inputs: &AllocationInputs) -> ApiResult<()> {
    let checks = [
        ("育种指数表", &inputs.animals_path),
        ("冻精库存表", &inputs.inventory_path),
        ("选配推荐矩阵", &inputs.matrix_path),
    ];
    for (name, path) in checks {
        if path.as_os_str().is_empty() {
            return Err(ApiError::InvalidInput(format!("{}路径不能为空", name)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_store;
    use crate::engine::progress::NoOpProgress;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::{Builder, NamedTempFile, TempDir};

    fn api() -> AllocationApi {
        AllocationApi::with_connection(Arc::new(Mutex::new(open_in_memory_store().unwrap())))
    }

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    fn groups(labels: &[&str]) -> AllocationConfig {
        AllocationConfig {
            selected_groups: labels.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_path_rejected() {
        let inputs = AllocationInputs {
            animals_path: PathBuf::new(),
            inventory_path: PathBuf::from("inv.csv"),
            matrix_path: PathBuf::from("m.csv"),
        };
        let err = api()
            .run_allocation(&inputs, Some(groups(&["G1"])), &NoOpProgress, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_no_group_selected_rejected() {
        let inputs = AllocationInputs {
            animals_path: PathBuf::from("a.csv"),
            inventory_path: PathBuf::from("inv.csv"),
            matrix_path: PathBuf::from("m.csv"),
        };
        let err = api()
            .run_allocation(&inputs, None, &NoOpProgress, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_index_is_blocking() {
        let inventory = csv_file("公牛号,冻精类型,数量\nS1,常规,1\n");
        let matrix = csv_file("牛号,公牛号,后代得分,近交系数\nC1,S1,100,1%\n");
        let inputs = AllocationInputs {
            animals_path: PathBuf::from("no_such_index.csv"),
            inventory_path: inventory.path().to_path_buf(),
            matrix_path: matrix.path().to_path_buf(),
        };
        let err = api()
            .run_allocation(&inputs, Some(groups(&["G1"])), &NoOpProgress, &CancellationToken::new())
            .unwrap_err();
        assert!(err.is_blocking());
    }

    #[test]
    fn test_run_then_query_and_export() {
        let animals = csv_file("牛号,分组,育种指数\nC1,G1,95\nC2,G1,90\n");
        let inventory = csv_file("公牛号,冻精类型,数量\nS1,常规,1\n");
        let matrix = csv_file("牛号,公牛号,后代得分,近交系数\nC1,S1,100,1%\nC2,S1,100,1%\n");
        let inputs = AllocationInputs {
            animals_path: animals.path().to_path_buf(),
            inventory_path: inventory.path().to_path_buf(),
            matrix_path: matrix.path().to_path_buf(),
        };

        let api = api();
        let resp = api
            .run_allocation(&inputs, Some(groups(&["G1"])), &NoOpProgress, &CancellationToken::new())
            .unwrap();
        assert_eq!(resp.animals_allocated, 2);
        assert_eq!(resp.strict_picks, 1);
        assert_eq!(resp.advisory_picks, 1);
        // 性控无库存 → 每轮都有未分配提示
        assert!(!resp.unassigned.is_empty());

        let runs = api.list_runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, resp.run_id);
        assert_eq!(api.get_rows(Some("G1")).unwrap().len(), 2);

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("g1.csv");
        assert_eq!(api.export_rows(Some("G1"), &out).unwrap(), 2);
        let usage_out = dir.path().join("usage.csv");
        assert_eq!(api.export_sire_usage(&resp.run_id, &usage_out).unwrap(), 1);

        assert!(matches!(api.get_run("nope"), Err(ApiError::NotFound(_))));
        assert!(matches!(
            api.export_rows(Some("G9"), dir.path().join("g9.csv")),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_saved_config_used_when_none_given() {
        let api = api();
        api.save_config(&groups(&["G1"])).unwrap();
        assert_eq!(api.load_config().unwrap().selected_groups, vec!["G1".to_string()]);
        assert!(matches!(
            api.save_config(&AllocationConfig::default()),
            Err(ApiError::InvalidConfig(_))
        ));
    }
}
