// ==========================================
// 奶牛选配系统 - SQLite 连接初始化与结果库结构
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 幂等建表（结果库 + 配置表）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS allocation_run (
    run_id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    groups_json TEXT NOT NULL,
    config_json TEXT NOT NULL,
    summary_json TEXT NOT NULL,
    warnings_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assignment_row (
    animal_id TEXT PRIMARY KEY,
    group_label TEXT NOT NULL,
    run_id TEXT NOT NULL REFERENCES allocation_run(run_id),
    position INTEGER NOT NULL,
    rank_score REAL,
    planned_method TEXT
);

CREATE INDEX IF NOT EXISTS idx_assignment_row_group ON assignment_row(group_label);

CREATE TABLE IF NOT EXISTS assignment_pick (
    animal_id TEXT NOT NULL REFERENCES assignment_row(animal_id) ON DELETE CASCADE,
    category TEXT NOT NULL,
    round INTEGER NOT NULL,
    sire_id TEXT NOT NULL,
    offspring_score REAL NOT NULL,
    inbreeding_coefficient REAL NOT NULL,
    pass TEXT NOT NULL,
    PRIMARY KEY (animal_id, category, round),
    UNIQUE (animal_id, category, sire_id)
);

CREATE TABLE IF NOT EXISTS sire_usage (
    run_id TEXT NOT NULL REFERENCES allocation_run(run_id),
    sire_id TEXT NOT NULL,
    category TEXT NOT NULL,
    initial_doses INTEGER NOT NULL,
    consumed INTEGER NOT NULL,
    remaining INTEGER NOT NULL,
    advisory_picks INTEGER NOT NULL,
    PRIMARY KEY (run_id, sire_id, category)
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开连接并确保结果库结构存在
pub fn open_result_store(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = open_sqlite_connection(db_path)?;
    crate::perf::install_sqlite_tracing(&mut conn);
    init_schema(&conn)?;
    Ok(conn)
}

/// 内存库（测试/试算）
pub fn open_in_memory_store() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 幂等建表并记录 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    let version = read_schema_version(conn)?;
    if version != Some(CURRENT_SCHEMA_VERSION) {
        tracing::warn!(
            expected = CURRENT_SCHEMA_VERSION,
            actual = ?version,
            "结果库 schema_version 与程序不一致"
        );
    }
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 默认结果库路径
///
/// 优先级：环境变量 DAIRY_MATING_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("DAIRY_MATING_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./dairy_mating.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("dairy-mating");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("dairy_mating.db");
        }
    }
    path.to_string_lossy().to_string()
}
