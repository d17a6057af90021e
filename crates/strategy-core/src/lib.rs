//! # Strategy Core
//!
//! 足球机器人的行为仲裁核心：
//!
//! - **状态机** (`state`): 显式状态集合、合法转移表、进入动作调度
//! - **行为策略** (`policy`): 每个状态一个纯函数，产生 [`MotionIntent`]
//! - **配置通道** (`channel`): ArcSwap 原子发布的不可变配置快照
//! - **控制循环** (`control`): 固定频率调度，守卫逻辑，意图转发
//! - **外部接口** (`interfaces`): 感知、执行、状态输出
//!
//! # 数据流
//!
//! ```text
//! ConfigUpdater (异步写入)
//!     ↓ ArcSwap 发布
//! ControlLoop (每周期读取一次)
//!     ↓ 守卫逻辑
//! StateMachine::attempt_transition
//!     ↓ 进入动作
//! BehaviorPolicy::act → MotionIntent → Actuation
//! ```

pub mod channel;
pub mod control;
mod error;
pub mod interfaces;
pub mod metrics;
pub mod policy;
pub mod state;

pub use channel::{ConfigChannel, ConfigUpdater};
pub use control::{ControlLoop, CycleReport, Intents, LoopConfig};
pub use error::{InvalidTransition, StrategyError};
pub use interfaces::{Actuation, ChannelStatusSink, NoStatus, Perception, StatusSink};
pub use metrics::{LoopMetrics, MetricsSnapshot};
pub use policy::{ActionContext, ActionOutput, BehaviorPolicy, MotionPlanner, PointApproach};
pub use state::{State, StateMachine, Transition, TransitionTable};

// 值类型直接从核心 crate 重新导出，调用方无需额外依赖
pub use strategy_types::*;
