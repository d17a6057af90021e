//! 配置通道
//!
//! 异步配置更新与固定频率控制循环之间唯一的共享资源。
//!
//! # 同步机制
//!
//! - 已提交的快照存放在 `ArcSwap<ConfigSnapshot>` 中，读取无锁
//! - 写入方先构造完整的新快照并校验，再整体原子替换（Compare-and-Swap），
//!   从不原地修改已发布的快照
//! - 控制循环每周期只 `load` 一次，整个周期使用同一份快照；
//!   周期内发布的更新要到下一个周期边界才可见
//! - 校验失败的更新被拒绝，最后一次合法快照继续生效

use arc_swap::ArcSwap;
use std::sync::Arc;
use strategy_types::{ConfigError, ConfigSnapshot};
use tracing::{debug, info, warn};

/// 配置通道（读取端 + 回写入口）
///
/// 由控制循环持有。可以通过 [`ConfigChannel::updater`] 派生任意多个写入句柄。
#[derive(Debug, Clone)]
pub struct ConfigChannel {
    current: Arc<ArcSwap<ConfigSnapshot>>,
    writer: ConfigUpdater,
}

impl ConfigChannel {
    /// 以初始快照创建通道（初始快照的 `commit` 被重置为 0）
    ///
    /// # 错误
    ///
    /// 初始快照未通过校验时返回 `ConfigError`。
    pub fn new(initial: ConfigSnapshot) -> Result<Self, ConfigError> {
        initial.validate()?;
        let initial = ConfigSnapshot {
            commit: 0,
            ..initial
        };
        let current = Arc::new(ArcSwap::from_pointee(initial));
        Ok(Self {
            writer: ConfigUpdater {
                current: current.clone(),
            },
            current,
        })
    }

    /// 读取最新已提交的快照（无锁，不阻塞）
    pub fn load(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    /// 派生一个写入句柄（可跨线程发送）
    pub fn updater(&self) -> ConfigUpdater {
        self.writer.clone()
    }

    /// 到点后的回写：清除 `run_point`
    pub fn clear_run_point(&self) -> u64 {
        self.writer.clear_run_point()
    }
}

/// 配置写入句柄
///
/// `Clone + Send + Sync`，可以交给配置传输线程使用。
#[derive(Debug, Clone)]
pub struct ConfigUpdater {
    current: Arc<ArcSwap<ConfigSnapshot>>,
}

impl ConfigUpdater {
    /// 发布一份完整的替换快照
    ///
    /// # 返回
    ///
    /// - `Ok(commit)`: 新快照的发布序号
    /// - `Err(ConfigError)`: 校验失败，已提交的快照保持不变
    pub fn publish(&self, snapshot: ConfigSnapshot) -> Result<u64, ConfigError> {
        if let Err(e) = snapshot.validate() {
            warn!("Rejected configuration update: {}", e);
            return Err(e);
        }
        let commit = self.commit_with(|_| Ok(snapshot.clone()))?;
        info!("Configuration committed (commit {})", commit);
        Ok(commit)
    }

    /// 在当前快照基础上设置单个参数并发布
    pub fn apply(&self, key: &str, value: &str) -> Result<u64, ConfigError> {
        match self.commit_with(|current| current.with_param(key, value)) {
            Ok(commit) => {
                info!("Configuration {} = {} (commit {})", key, value, commit);
                Ok(commit)
            },
            Err(e) => {
                warn!("Rejected configuration update {} = {}: {}", key, value, e);
                Err(e)
            },
        }
    }

    /// 清除 `run_point`，其余字段保持最新值
    pub fn clear_run_point(&self) -> u64 {
        let result = self.commit_with(|current| {
            Ok(ConfigSnapshot {
                run_point: false,
                ..current.clone()
            })
        });
        match result {
            Ok(commit) => {
                debug!("run_point cleared (commit {})", commit);
                commit
            },
            // 只修改布尔标志，不会引入不一致；保底返回当前序号
            Err(_) => self.current.load().commit,
        }
    }

    /// 最新已提交的发布序号
    pub fn latest_commit(&self) -> u64 {
        self.current.load().commit
    }

    /// Compare-and-Swap 循环：基于最新快照构造新快照，序号 +1 后原子替换
    ///
    /// 与其他写入方竞争失败时基于新值重试，保证序号严格递增且不丢更新。
    fn commit_with<F>(&self, build: F) -> Result<u64, ConfigError>
    where
        F: Fn(&ConfigSnapshot) -> Result<ConfigSnapshot, ConfigError>,
    {
        loop {
            let current = self.current.load_full();
            let mut next = build(&current)?;
            next.commit = current.commit + 1;
            let commit = next.commit;

            let previous = self.current.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&previous, &current) {
                return Ok(commit);
            }
        }
    }
}
