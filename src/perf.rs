// ==========================================
// 奶牛选配系统 - 阶段耗时统计
// ==========================================
// PhaseTimer: 记录阶段耗时与该阶段内执行的 SQL 数（target = "perf"）
// install_sqlite_tracing: 结果库连接的 SQL 计数 + 慢查询日志
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static ACTIVE_TIMERS: Cell<u32> = const { Cell::new(0) };
    static SQL_COUNT: Cell<u64> = const { Cell::new(0) };
}

/// 安装 SQL 统计回调
///
/// - `DAIRY_MATING_PERF_SQL=1` 开启（Debug 构建默认开启）
/// - `DAIRY_MATING_SLOW_SQL_MS` 慢 SQL 阈值，默认 200ms
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = match std::env::var("DAIRY_MATING_PERF_SQL") {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => cfg!(debug_assertions),
    };

    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let slow_ms = std::env::var("DAIRY_MATING_SLOW_SQL_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(200);
    SLOW_SQL_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(on_sql));
    conn.profile(Some(on_sql_profile));
}

fn on_sql(_sql: &str) {
    if ACTIVE_TIMERS.with(|d| d.get() > 0) {
        SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
    }
}

fn on_sql_profile(sql: &str, duration: Duration) {
    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        let short: String = sql.trim().replace('\n', " ").chars().take(300).collect();
        tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %short, "slow sql");
    }
}

/// 阶段计时器，Drop 时输出
///
/// ```ignore
/// let _timer = dairy_mating::perf::PhaseTimer::new("persist");
/// ```
pub struct PhaseTimer {
    phase: &'static str,
    start: Instant,
    sql_start: u64,
}

impl PhaseTimer {
    pub fn new(phase: &'static str) -> Self {
        ACTIVE_TIMERS.with(|d| d.set(d.get().saturating_add(1)));
        Self {
            phase,
            start: Instant::now(),
            sql_start: SQL_COUNT.with(|c| c.get()),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        let sql_count = SQL_COUNT.with(|c| c.get()).saturating_sub(self.sql_start);
        tracing::info!(
            target: "perf",
            phase = self.phase,
            elapsed_ms = self.elapsed_ms(),
            sql_count,
            "phase done"
        );
        ACTIVE_TIMERS.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
