// ==========================================
// 奶牛选配系统 - 分配结果仓储
// ==========================================
// 表: allocation_run / assignment_row / assignment_pick / sire_usage
// 幂等覆盖: 同一事务内先删除所选分组（及本次涉及母牛）的旧行，再写入
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::config::allocation_config::AllocationConfig;
use crate::db::open_result_store;
use crate::domain::assignment::{AllocationSummary, AssignmentPick, AssignmentRow, SireUsage};
use crate::domain::types::{CommitPass, SemenCategory};
use crate::domain::warning::AllocationWarning;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

// ==========================================
// 写入/读取结构
// ==========================================

/// 待落库的一次运行
#[derive(Debug, Clone, Copy)]
pub struct RunRecord<'a> {
    pub summary: &'a AllocationSummary,
    pub rows: &'a [AssignmentRow],
    pub config: &'a AllocationConfig,
    pub warnings: &'a [AllocationWarning],
}

/// 已落库的运行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRun {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub groups: Vec<String>,
    pub config: AllocationConfig,
    pub summary: AllocationSummary,
    pub warnings: Vec<AllocationWarning>,
}

/// 运行列表项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunListItem {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub groups: Vec<String>,
    pub animals_allocated: usize,
    pub warning_count: usize,
}

// ==========================================
// AllocationResultWriter Trait
// ==========================================
pub trait AllocationResultWriter {
    /// 写入一次运行，返回写入的分配行数
    fn write_run(&self, record: &RunRecord<'_>) -> RepositoryResult<usize>;
}

// ==========================================
// SqliteAllocationRepository
// ==========================================
pub struct SqliteAllocationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAllocationRepository {
    /// 打开结果库（确保表结构存在）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_result_store(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 读取 =====

    /// 某分组的分配行（按分配时的组内顺序）
    pub fn load_rows(&self, group_label: &str) -> RepositoryResult<Vec<AssignmentRow>> {
        self.query_rows(Some(group_label))
    }

    /// 全部分配行
    pub fn load_all_rows(&self) -> RepositoryResult<Vec<AssignmentRow>> {
        self.query_rows(None)
    }

    fn query_rows(&self, group_label: Option<&str>) -> RepositoryResult<Vec<AssignmentRow>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT animal_id, group_label, rank_score, planned_method
            FROM assignment_row
            WHERE (?1 IS NULL OR group_label = ?1)
            ORDER BY group_label, position
            "#,
        )?;
        let mut rows: Vec<AssignmentRow> = stmt
            .query_map(params![group_label], |row| {
                let mut r = AssignmentRow::new(
                    &row.get::<_, String>(0)?,
                    &row.get::<_, String>(1)?,
                    row.get(2)?,
                );
                r.planned_method = row.get(3)?;
                Ok(r)
            })?
            .collect::<Result<_, _>>()?;

        let index: HashMap<String, usize> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.animal_id.clone(), i))
            .collect();

        let mut stmt = conn.prepare(
            r#"
            SELECT p.animal_id, p.category, p.round, p.sire_id,
                   p.offspring_score, p.inbreeding_coefficient, p.pass
            FROM assignment_pick p
            JOIN assignment_row r ON r.animal_id = p.animal_id
            WHERE (?1 IS NULL OR r.group_label = ?1)
            ORDER BY p.animal_id, p.category, p.round
            "#,
        )?;
        let picks = stmt.query_map(params![group_label], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        for pick in picks {
            let (animal_id, category, round, sire_id, offspring_score, inbreeding_coefficient, pass) =
                pick?;
            let category: SemenCategory = category.parse().map_err(|message| {
                RepositoryError::FieldValueError {
                    field: "assignment_pick.category".to_string(),
                    message,
                }
            })?;
            let pass: CommitPass = pass.parse().map_err(|message| RepositoryError::FieldValueError {
                field: "assignment_pick.pass".to_string(),
                message,
            })?;
            let Some(&pos) = index.get(&animal_id) else {
                continue;
            };
            let committed = rows[pos].commit(
                category,
                usize::try_from(round).unwrap_or(0),
                AssignmentPick {
                    sire_id,
                    offspring_score,
                    inbreeding_coefficient,
                    pass,
                },
            );
            if !committed {
                return Err(RepositoryError::FieldValueError {
                    field: "assignment_pick.round".to_string(),
                    message: format!("无效或重复的选择: {} {} 第{}选", animal_id, category, round),
                });
            }
        }

        Ok(rows)
    }

    /// 按 run_id 读取运行记录
    pub fn load_run(&self, run_id: &str) -> RepositoryResult<Option<StoredRun>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"
                SELECT run_id, created_at, groups_json, config_json, summary_json, warnings_json
                FROM allocation_run WHERE run_id = ?1
                "#,
                params![run_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((run_id, created_at, groups, config, summary, warnings)) = raw else {
            return Ok(None);
        };
        Ok(Some(StoredRun {
            run_id,
            created_at: parse_timestamp(&created_at)?,
            groups: serde_json::from_str(&groups)?,
            config: serde_json::from_str(&config)?,
            summary: serde_json::from_str(&summary)?,
            warnings: serde_json::from_str(&warnings)?,
        }))
    }

    /// 运行列表（新的在前）
    pub fn list_runs(&self) -> RepositoryResult<Vec<RunListItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT run_id, created_at, groups_json, summary_json FROM allocation_run ORDER BY created_at DESC, run_id",
        )?;
        let raw = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut items = Vec::new();
        for entry in raw {
            let (run_id, created_at, groups, summary) = entry?;
            let summary: AllocationSummary = serde_json::from_str(&summary)?;
            items.push(RunListItem {
                run_id,
                created_at: parse_timestamp(&created_at)?,
                groups: serde_json::from_str(&groups)?,
                animals_allocated: summary.animals_allocated,
                warning_count: summary.warning_count,
            });
        }
        Ok(items)
    }

    /// 某次运行的公牛使用汇总
    pub fn load_sire_usage(&self, run_id: &str) -> RepositoryResult<Vec<SireUsage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sire_id, category, initial_doses, consumed, remaining, advisory_picks
            FROM sire_usage WHERE run_id = ?1
            ORDER BY sire_id, category
            "#,
        )?;
        let raw = stmt.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, u32>(5)?,
            ))
        })?;

        let mut usage = Vec::new();
        for entry in raw {
            let (sire_id, category, initial_doses, consumed, remaining, advisory_picks) = entry?;
            usage.push(SireUsage {
                sire_id,
                category: category.parse().map_err(|message| RepositoryError::FieldValueError {
                    field: "sire_usage.category".to_string(),
                    message,
                })?,
                initial_doses,
                consumed,
                remaining,
                advisory_picks,
            });
        }
        Ok(usage)
    }

    /// 结果库中的分配行数（按分组）
    pub fn count_rows(&self, group_label: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM assignment_row WHERE group_label = ?1",
            params![group_label],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

impl AllocationResultWriter for SqliteAllocationRepository {
    fn write_run(&self, record: &RunRecord<'_>) -> RepositoryResult<usize> {
        let summary = record.summary;
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO allocation_run (run_id, created_at, groups_json, config_json, summary_json, warnings_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                summary.run_id,
                summary.created_at.to_rfc3339(),
                serde_json::to_string(&summary.groups)?,
                serde_json::to_string(record.config)?,
                serde_json::to_string(summary)?,
                serde_json::to_string(record.warnings)?,
            ],
        )?;

        // 覆盖所选分组；换组的母牛按牛号清除旧行（assignment_pick 级联删除）
        let mut removed = 0;
        for group in &summary.groups {
            removed += tx.execute(
                "DELETE FROM assignment_row WHERE group_label = ?1",
                params![group],
            )?;
        }
        for row in record.rows {
            removed += tx.execute(
                "DELETE FROM assignment_row WHERE animal_id = ?1",
                params![row.animal_id],
            )?;
        }
        debug!(removed, "已清除旧分配行");

        {
            let mut insert_row = tx.prepare(
                r#"
                INSERT INTO assignment_row (animal_id, group_label, run_id, position, rank_score, planned_method)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            let mut insert_pick = tx.prepare(
                r#"
                INSERT INTO assignment_pick
                    (animal_id, category, round, sire_id, offspring_score, inbreeding_coefficient, pass)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;

            for (position, row) in record.rows.iter().enumerate() {
                insert_row.execute(params![
                    row.animal_id,
                    row.group_label,
                    summary.run_id,
                    position as i64,
                    row.rank_score,
                    row.planned_method,
                ])?;
                for (category, round, pick) in row.all_picks() {
                    insert_pick.execute(params![
                        row.animal_id,
                        category.to_string(),
                        round as i64,
                        pick.sire_id,
                        pick.offspring_score,
                        pick.inbreeding_coefficient,
                        pick.pass.to_string(),
                    ])?;
                }
            }

            let mut insert_usage = tx.prepare(
                r#"
                INSERT INTO sire_usage
                    (run_id, sire_id, category, initial_doses, consumed, remaining, advisory_picks)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for usage in &summary.sire_usage {
                insert_usage.execute(params![
                    summary.run_id,
                    usage.sire_id,
                    usage.category.to_string(),
                    usage.initial_doses,
                    usage.consumed,
                    usage.remaining,
                    usage.advisory_picks,
                ])?;
            }
        }

        tx.commit()?;
        info!(
            run_id = %summary.run_id,
            rows = record.rows.len(),
            groups = summary.groups.len(),
            "分配结果已保存"
        );
        Ok(record.rows.len())
    }
}

fn parse_timestamp(raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: "created_at".to_string(),
            message: e.to_string(),
        })
}
