//! 外部协作者接口
//!
//! - [`Perception`]: 感知层（目标、自身位姿、障碍扫描）
//! - [`Actuation`]: 执行层（速度指令、射门），发出即忘
//! - [`StatusSink`]: 每周期发布当前状态，仅用于外部观测
//!
//! 控制循环在单线程上调用这些接口，实现方必须是非阻塞或有界延迟的。

use crate::state::State;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use strategy_types::{ActuatorCommand, FieldObjects, MotionIntent, Pose, ScanData, Velocity};

/// 感知层
pub trait Perception {
    /// 本周期目标信息，`None` 表示没有任何检测
    fn objects(&mut self) -> Option<FieldObjects>;

    /// 自身位姿
    fn self_pose(&mut self) -> Pose;

    /// 障碍扫描
    fn obstacles(&mut self) -> ScanData;
}

/// 执行层
pub trait Actuation {
    /// 速度指令；`rotate_enable` 为绕转模式的旋转标志
    fn command_motion(&mut self, velocity: Velocity, rotate_enable: bool);

    /// 射门脉冲
    fn command_shoot(&mut self, power: u8, slot: u8);

    /// 把一个完整的运动意图转发给执行层
    fn apply(&mut self, intent: &MotionIntent) {
        self.command_motion(intent.velocity, intent.rotate_enable);
        if let Some(ActuatorCommand::Shoot { power, slot }) = intent.actuator {
            self.command_shoot(power, slot);
        }
    }
}

/// 状态输出
pub trait StatusSink {
    fn publish_state(&mut self, state: State);
}

/// 不发布状态
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn publish_state(&mut self, _state: State) {}
}

/// 基于有界通道的状态输出
///
/// 通道满时丢弃本次状态而不是阻塞控制循环。
#[derive(Debug, Clone)]
pub struct ChannelStatusSink {
    tx: Sender<State>,
    dropped: u64,
}

impl ChannelStatusSink {
    /// 创建容量为 `capacity` 的状态通道，返回发布端和接收端
    pub fn bounded(capacity: usize) -> (Self, Receiver<State>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx, dropped: 0 }, rx)
    }

    /// 因通道满或接收端关闭而丢弃的状态数
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl StatusSink for ChannelStatusSink {
    fn publish_state(&mut self, state: State) {
        match self.tx.try_send(state) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
            },
        }
    }
}
