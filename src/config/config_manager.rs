// ==========================================
// 奶牛选配系统 - 配置管理器
// ==========================================
// 职责: 分配设置/列映射/分组策略的持久化与快照
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::allocation_config::AllocationConfig;
use crate::config::column_map::ColumnMap;
use crate::config::strategy_profile::GroupStrategy;
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const INBREEDING_THRESHOLD: &str = "allocation/inbreeding_threshold";
    pub const CONTROL_DEFECT_GENES: &str = "allocation/control_defect_genes";
    pub const SELECTED_GROUPS: &str = "allocation/selected_groups";
    pub const ROUNDS: &str = "allocation/rounds";
    pub const ADVISORY_FALLBACK: &str = "allocation/advisory_fallback";
    pub const RESTRICT_TO_PLANNED_CATEGORY: &str = "allocation/restrict_to_planned_category";
    pub const COLUMN_MAP: &str = "column_map";
    pub const STRATEGY_PREFIX: &str = "strategy/";
}

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（确保表结构存在）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&config_map)?)
    }

    /// 从配置快照恢复（覆盖同名键）
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> RepositoryResult<usize> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3",
                params![GLOBAL_SCOPE, key, value],
            )?;
        }
        tx.commit()?;

        Ok(count)
    }

    // ===== 分配设置 =====

    /// 读取分配设置；缺失项使用默认值
    pub fn load_allocation_config(&self) -> RepositoryResult<AllocationConfig> {
        let mut cfg = AllocationConfig::default();

        if let Some(v) = self.get_global_config_value(config_keys::INBREEDING_THRESHOLD)? {
            cfg.inbreeding_threshold = v.parse().map_err(|message| RepositoryError::FieldValueError {
                field: config_keys::INBREEDING_THRESHOLD.to_string(),
                message,
            })?;
        }
        if let Some(v) = self.get_global_config_value(config_keys::CONTROL_DEFECT_GENES)? {
            cfg.control_defect_genes = parse_bool(&v);
        }
        if let Some(v) = self.get_global_config_value(config_keys::SELECTED_GROUPS)? {
            cfg.selected_groups = serde_json::from_str(&v)?;
        }
        if let Some(v) = self.get_global_config_value(config_keys::ROUNDS)? {
            cfg.rounds = v.trim().parse().map_err(|_| RepositoryError::FieldValueError {
                field: config_keys::ROUNDS.to_string(),
                message: format!("无法解析为整数: {}", v),
            })?;
        }
        if let Some(v) = self.get_global_config_value(config_keys::ADVISORY_FALLBACK)? {
            cfg.advisory_fallback = parse_bool(&v);
        }
        if let Some(v) = self.get_global_config_value(config_keys::RESTRICT_TO_PLANNED_CATEGORY)? {
            cfg.restrict_to_planned_category = parse_bool(&v);
        }
        cfg.strategies = self.list_strategies()?;

        Ok(cfg)
    }

    /// 保存分配设置（含分组策略）
    pub fn save_allocation_config(&self, cfg: &AllocationConfig) -> RepositoryResult<()> {
        self.set_global_config_value(
            config_keys::INBREEDING_THRESHOLD,
            &cfg.inbreeding_threshold.to_string(),
        )?;
        self.set_global_config_value(
            config_keys::CONTROL_DEFECT_GENES,
            &cfg.control_defect_genes.to_string(),
        )?;
        self.set_global_config_value(
            config_keys::SELECTED_GROUPS,
            &serde_json::to_string(&cfg.selected_groups)?,
        )?;
        self.set_global_config_value(config_keys::ROUNDS, &cfg.rounds.to_string())?;
        self.set_global_config_value(
            config_keys::ADVISORY_FALLBACK,
            &cfg.advisory_fallback.to_string(),
        )?;
        self.set_global_config_value(
            config_keys::RESTRICT_TO_PLANNED_CATEGORY,
            &cfg.restrict_to_planned_category.to_string(),
        )?;
        for strategy in &cfg.strategies {
            self.save_strategy(strategy)?;
        }
        Ok(())
    }

    // ===== 分组策略 =====

    pub fn save_strategy(&self, strategy: &GroupStrategy) -> RepositoryResult<()> {
        let key = format!("{}{}", config_keys::STRATEGY_PREFIX, strategy.group_label.trim());
        self.set_global_config_value(&key, &serde_json::to_string(strategy)?)
    }

    pub fn list_strategies(&self) -> RepositoryResult<Vec<GroupStrategy>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key LIKE ?2 ORDER BY key",
        )?;
        let pattern = format!("{}%", config_keys::STRATEGY_PREFIX);
        let rows = stmt.query_map(params![GLOBAL_SCOPE, pattern], |row| row.get::<_, String>(0))?;

        let mut strategies = Vec::new();
        for raw in rows {
            strategies.push(serde_json::from_str::<GroupStrategy>(&raw?)?);
        }
        Ok(strategies)
    }

    // ===== 列映射 =====

    /// 读取列映射（未配置时为内置默认）
    pub fn load_column_map(&self) -> RepositoryResult<ColumnMap> {
        match self.get_global_config_value(config_keys::COLUMN_MAP)? {
            Some(raw) => ColumnMap::from_json_str(&raw).map_err(|e| RepositoryError::FieldValueError {
                field: config_keys::COLUMN_MAP.to_string(),
                message: e.to_string(),
            }),
            None => Ok(ColumnMap::default()),
        }
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on" | "是"
    )
}
