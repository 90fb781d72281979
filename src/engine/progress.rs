// ==========================================
// 奶牛选配系统 - 进度回调与取消
// ==========================================
// ProgressSink: 阶段边界回报 (百分比, 文本)，观察者模式，非并发执行
// CancellationToken: 协作式取消，引擎在两头母牛之间检查
// ==========================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 进度回调 Trait
pub trait ProgressSink {
    fn report(&self, percent: u8, message: &str);
}

/// 闭包直接作为回调
impl<F> ProgressSink for F
where
    F: Fn(u8, &str),
{
    fn report(&self, percent: u8, message: &str) {
        self(percent, message)
    }
}

/// 空操作回调（测试/批处理）
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressSink for NoOpProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

/// 输出到日志的回调（命令行）
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, percent: u8, message: &str) {
        tracing::info!(target: "progress", percent, "{}", message);
    }
}

// ==========================================
// CancellationToken
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
