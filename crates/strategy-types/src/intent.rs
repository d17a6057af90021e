//! 运动意图定义
//!
//! 每周期新构造并同步交给执行层，不缓存、不合并。

/// 机体坐标系速度指令
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity {
        x: 0.0,
        y: 0.0,
        yaw: 0.0,
    };

    pub const fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    /// 平移速度大小
    pub fn linear_speed(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.yaw == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.yaw.is_finite()
    }
}

/// 离散执行器命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActuatorCommand {
    /// 射门脉冲（力度、目标槽位原样透传）
    Shoot { power: u8, slot: u8 },
}

/// 运动意图
///
/// 速度三元组总是完整填充；`rotate_enable` 与 `actuator` 描述执行器状态。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionIntent {
    pub velocity: Velocity,
    /// 绕转模式下启用的旋转标志
    pub rotate_enable: bool,
    pub actuator: Option<ActuatorCommand>,
}

impl MotionIntent {
    /// 零速度、执行器全部释放
    pub const fn stop() -> Self {
        Self {
            velocity: Velocity::ZERO,
            rotate_enable: false,
            actuator: None,
        }
    }

    pub fn drive(velocity: Velocity) -> Self {
        Self {
            velocity,
            rotate_enable: false,
            actuator: None,
        }
    }

    pub fn rotate(velocity: Velocity) -> Self {
        Self {
            velocity,
            rotate_enable: true,
            actuator: None,
        }
    }

    /// 射门脉冲：不计算运动，速度为零
    pub fn shoot(power: u8, slot: u8) -> Self {
        Self {
            velocity: Velocity::ZERO,
            rotate_enable: false,
            actuator: Some(ActuatorCommand::Shoot { power, slot }),
        }
    }

    /// 是否为完全停止（零速度且执行器释放）
    pub fn is_stop(&self) -> bool {
        self.velocity.is_zero() && !self.rotate_enable && self.actuator.is_none()
    }
}

impl Default for MotionIntent {
    fn default() -> Self {
        Self::stop()
    }
}
