//! # Strategy Types
//!
//! 策略核心的快照值类型（无线程、无 IO 依赖）
//!
//! ## 模块
//!
//! - `config`: 配置快照（比赛状态、阵营、策略模式、阈值）
//! - `perception`: 感知快照（球/球门方位、障碍扫描、自身位姿）
//! - `intent`: 运动意图（速度三元组 + 执行器命令）
//!
//! ## 不变性约定
//!
//! 所有快照在发布后只读。需要修改时构造一个新的快照整体替换，
//! 从不原地修改已发布的字段。

pub mod config;
pub mod intent;
pub mod perception;

// 重新导出常用类型
pub use config::{ConfigError, ConfigSnapshot, GameState, Side, StrategyMode};
pub use intent::{ActuatorCommand, MotionIntent, Velocity};
pub use perception::{FieldObjects, NOT_FOUND_ANGLE, ObjectInfo, PerceptionSnapshot, Pose, ScanData};
