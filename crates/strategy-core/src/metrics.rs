//! 控制循环指标
//!
//! 原子计数器，可以在任何线程安全地读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 控制循环实时指标
///
/// # 使用示例
///
/// ```rust
/// use strategy_core::LoopMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(LoopMetrics::default());
/// metrics.cycles.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.cycles, 1);
/// ```
#[derive(Debug, Default)]
pub struct LoopMetrics {
    /// 已完成的周期数
    pub cycles: AtomicU64,

    /// 状态发生变化的转移次数（不含自环）
    pub state_changes: AtomicU64,

    /// 被转移表拒绝的转移次数
    ///
    /// 正常运行时应恒为 0，非零说明守卫逻辑存在缺陷。
    pub invalid_transitions: AtomicU64,

    /// 进入动作失败次数（未知比赛状态、缺少感知）
    pub action_faults: AtomicU64,

    /// 强制回到 Idle 的次数（丢球、无感知、无指令）
    pub safe_stops: AtomicU64,

    /// 周期超时次数（实际周期超过标称周期 × dt 钳位倍数）
    pub overruns: AtomicU64,

    /// 发送给执行层的意图总数
    pub intents_forwarded: AtomicU64,
}

impl LoopMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            state_changes: self.state_changes.load(Ordering::Relaxed),
            invalid_transitions: self.invalid_transitions.load(Ordering::Relaxed),
            action_faults: self.action_faults.load(Ordering::Relaxed),
            safe_stops: self.safe_stops.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            intents_forwarded: self.intents_forwarded.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.cycles.store(0, Ordering::Relaxed);
        self.state_changes.store(0, Ordering::Relaxed);
        self.invalid_transitions.store(0, Ordering::Relaxed);
        self.action_faults.store(0, Ordering::Relaxed);
        self.safe_stops.store(0, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
        self.intents_forwarded.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub state_changes: u64,
    pub invalid_transitions: u64,
    pub action_faults: u64,
    pub safe_stops: u64,
    pub overruns: u64,
    pub intents_forwarded: u64,
}
