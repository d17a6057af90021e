//! 策略核心错误类型定义

use crate::state::State;
use strategy_types::{ConfigError, GameState};
use thiserror::Error;

/// 非法状态转移
///
/// 转移表之外的请求属于逻辑错误：状态保持不变，调用方必须记录而不是忽略。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: State,
    pub to: State,
}

/// 策略核心错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    /// 转移表中不存在的转移
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// 点位行为遇到目标表之外的比赛状态
    #[error("Unknown game state for point target: {0}")]
    UnknownGameState(GameState),

    /// 本周期无感知数据（由控制循环回退到 Idle 处理）
    #[error("Perception snapshot missing")]
    MissingPerception,

    /// 配置被拒绝
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 控制循环参数无效
    #[error("Invalid loop config: {0}")]
    InvalidLoopConfig(String),

    /// 转移表自检失败
    #[error("Transition table invalid: {0}")]
    InvalidTable(String),
}
