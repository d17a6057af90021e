//! # Strategy Tools - 参数文件、参考规划器与仿真
//!
//! **依赖原则**: 只依赖 `strategy-core` / `strategy-types`，不含任何硬件传输
//!
//! ## 包含模块
//!
//! - `params` - TOML 参数文件与 `key=value` 运行时补丁
//! - `planner` - 参考运动规划器（比例控制）
//! - `sim` - 运动学仿真场地（仿真模式下的感知 + 执行）

pub mod params;
pub mod planner;
pub mod sim;

// 重新导出常用类型
pub use params::{LoopSettings, StrategyParams, parse_assignment};
pub use planner::{PlannerGains, ReferencePlanner};
pub use sim::{SimActuation, SimField, SimPerception, SimWorld};
