//! # 运动学仿真场地
//!
//! 仿真模式下代替真实感知层和执行层：
//!
//! - [`SimPerception`]: 每次读取目标时先按固定步长推进世界，再给出球和球门的极坐标观测
//! - [`SimActuation`]: 记录最后一次速度指令，射门时把持有的球踢出
//!
//! 两者共享同一个 [`SimWorld`]，由 [`SimField`] 创建。

use crate::planner::normalize_angle;
use parking_lot::Mutex;
use std::sync::Arc;
use strategy_core::{Actuation, Perception};
use strategy_types::{FieldObjects, ObjectInfo, Pose, ScanData, Velocity};
use tracing::{debug, trace};

/// 球门中心位置（场地坐标）
pub const YELLOW_GOAL: (f64, f64) = (-300.0, 0.0);
pub const BLUE_GOAL: (f64, f64) = (300.0, 0.0);

/// 场地半长、半宽（厘米）
pub const FIELD_HALF_LENGTH: f64 = 330.0;
pub const FIELD_HALF_WIDTH: f64 = 230.0;

/// 仿真世界状态
#[derive(Debug, Clone, PartialEq)]
pub struct SimWorld {
    /// 机器人位姿
    pub pose: Pose,
    /// 球的位置
    pub ball: (f64, f64),
    /// 球的速度（场地坐标，厘米/秒）
    pub ball_velocity: (f64, f64),
    /// 每次推进的时长（秒）
    pub step_secs: f64,
    /// 可视距离，超出时目标报告为未找到
    pub vision_range: f64,
    /// 控球半径：球在此距离内且位于正前方时随车移动
    pub dribble_radius: f64,
    /// 每步球速衰减系数
    pub ball_friction: f64,
    /// 障碍扫描射线数
    pub scan_rays: usize,
    /// 最后一次速度指令（机体坐标）
    pub command: Velocity,
    pub rotate_enable: bool,
    /// 累计射门次数
    pub kicks: u32,
    /// 累计推进步数
    pub steps: u64,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self {
            pose: Pose::default(),
            ball: (100.0, 0.0),
            ball_velocity: (0.0, 0.0),
            step_secs: 0.01,
            vision_range: 500.0,
            dribble_radius: 15.0,
            ball_friction: 0.98,
            scan_rays: 36,
            command: Velocity::ZERO,
            rotate_enable: false,
            kicks: 0,
            steps: 0,
        }
    }
}

impl SimWorld {
    pub fn new(pose: Pose, ball: (f64, f64)) -> Self {
        Self {
            pose,
            ball,
            ..Self::default()
        }
    }

    /// 按最后一次指令推进一个步长
    pub fn step(&mut self) {
        let dt = self.step_secs;
        let (sin, cos) = self.pose.yaw.to_radians().sin_cos();
        let vx = self.command.x * cos - self.command.y * sin;
        let vy = self.command.x * sin + self.command.y * cos;

        self.pose.x = (self.pose.x + vx * dt).clamp(-FIELD_HALF_LENGTH, FIELD_HALF_LENGTH);
        self.pose.y = (self.pose.y + vy * dt).clamp(-FIELD_HALF_WIDTH, FIELD_HALF_WIDTH);
        self.pose.yaw = normalize_angle(self.pose.yaw + self.command.yaw * dt);

        if self.holding_ball() {
            let (sin, cos) = self.pose.yaw.to_radians().sin_cos();
            self.ball = (
                self.pose.x + self.dribble_radius * 0.5 * cos,
                self.pose.y + self.dribble_radius * 0.5 * sin,
            );
            self.ball_velocity = (0.0, 0.0);
        } else {
            self.ball.0 += self.ball_velocity.0 * dt;
            self.ball.1 += self.ball_velocity.1 * dt;
            self.ball_velocity.0 *= self.ball_friction;
            self.ball_velocity.1 *= self.ball_friction;
            self.ball.0 = self.ball.0.clamp(-FIELD_HALF_LENGTH, FIELD_HALF_LENGTH);
            self.ball.1 = self.ball.1.clamp(-FIELD_HALF_WIDTH, FIELD_HALF_WIDTH);
        }

        self.steps += 1;
    }

    /// 球是否在车头前方的控球区内
    pub fn holding_ball(&self) -> bool {
        let ball = self.observe(self.ball);
        ball.distance <= self.dribble_radius && ball.angle.abs() <= 30.0
    }

    /// 场地上一点相对机器人的极坐标观测
    pub fn observe(&self, point: (f64, f64)) -> ObjectInfo {
        let dx = point.0 - self.pose.x;
        let dy = point.1 - self.pose.y;
        let distance = dx.hypot(dy);
        if distance > self.vision_range {
            return ObjectInfo::not_found();
        }
        let bearing = if distance > 0.0 {
            normalize_angle(dy.atan2(dx).to_degrees() - self.pose.yaw)
        } else {
            0.0
        };
        ObjectInfo::new(distance, bearing)
    }

    pub fn field_objects(&self) -> FieldObjects {
        FieldObjects {
            ball: self.observe(self.ball),
            yellow_goal: self.observe(YELLOW_GOAL),
            blue_goal: self.observe(BLUE_GOAL),
        }
    }

    /// 到场地边界的射线距离，第 0 条射线为车头正前方
    pub fn scan(&self) -> ScanData {
        let rays = self.scan_rays.max(1);
        let increment = 360.0 / rays as f64;
        let ranges = (0..rays)
            .map(|i| {
                let heading = (self.pose.yaw + i as f64 * increment).to_radians();
                wall_distance(self.pose.x, self.pose.y, heading.cos(), heading.sin())
            })
            .collect();
        ScanData {
            ranges,
            angle_increment: increment,
        }
    }

    /// 射门：持球时沿车头方向踢出
    pub fn kick(&mut self, power: u8) {
        self.kicks += 1;
        if self.holding_ball() {
            let speed = 100.0 * f64::from(power);
            let (sin, cos) = self.pose.yaw.to_radians().sin_cos();
            self.ball_velocity = (speed * cos, speed * sin);
            // 踢出后脱离控球区，避免下一步被重新吸附
            self.ball.0 += self.dribble_radius * cos;
            self.ball.1 += self.dribble_radius * sin;
            debug!("Ball kicked at {:.0} cm/s", speed);
        }
    }
}

fn wall_distance(x: f64, y: f64, dx: f64, dy: f64) -> f64 {
    let mut t = f64::INFINITY;
    if dx > 1e-12 {
        t = t.min((FIELD_HALF_LENGTH - x) / dx);
    } else if dx < -1e-12 {
        t = t.min((-FIELD_HALF_LENGTH - x) / dx);
    }
    if dy > 1e-12 {
        t = t.min((FIELD_HALF_WIDTH - y) / dy);
    } else if dy < -1e-12 {
        t = t.min((-FIELD_HALF_WIDTH - y) / dy);
    }
    t.max(0.0)
}

// ==================== 共享句柄 ====================

/// 仿真场地
///
/// 使用 parking_lot::Mutex 共享世界状态，不会 Poison
#[derive(Debug, Clone)]
pub struct SimField {
    world: Arc<Mutex<SimWorld>>,
}

impl SimField {
    pub fn new(world: SimWorld) -> Self {
        Self {
            world: Arc::new(Mutex::new(world)),
        }
    }

    pub fn perception(&self) -> SimPerception {
        SimPerception {
            world: self.world.clone(),
        }
    }

    pub fn actuation(&self) -> SimActuation {
        SimActuation {
            world: self.world.clone(),
        }
    }

    /// 当前世界状态的副本
    pub fn snapshot(&self) -> SimWorld {
        self.world.lock().clone()
    }
}

/// 仿真感知
#[derive(Debug, Clone)]
pub struct SimPerception {
    world: Arc<Mutex<SimWorld>>,
}

impl Perception for SimPerception {
    fn objects(&mut self) -> Option<FieldObjects> {
        let mut world = self.world.lock();
        world.step();
        let objects = world.field_objects();
        trace!(
            "sim step {}: ball {:.1}cm @ {:.1}°",
            world.steps, objects.ball.distance, objects.ball.angle
        );
        Some(objects)
    }

    fn self_pose(&mut self) -> Pose {
        self.world.lock().pose
    }

    fn obstacles(&mut self) -> ScanData {
        self.world.lock().scan()
    }
}

/// 仿真执行
#[derive(Debug, Clone)]
pub struct SimActuation {
    world: Arc<Mutex<SimWorld>>,
}

impl Actuation for SimActuation {
    fn command_motion(&mut self, velocity: Velocity, rotate_enable: bool) {
        let mut world = self.world.lock();
        world.command = velocity;
        world.rotate_enable = rotate_enable;
    }

    fn command_shoot(&mut self, power: u8, _slot: u8) {
        self.world.lock().kick(power);
    }
}
