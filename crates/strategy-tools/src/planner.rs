//! 参考运动规划器
//!
//! 比例控制实现的 [`MotionPlanner`]，用于仿真模式和集成测试。
//!
//! # 坐标约定
//!
//! - 机体坐标系：x 向前，y 向左，yaw 逆时针为正
//! - 方位角单位为度，范围 `(-180, 180]`，正值表示目标在左侧
//! - 速度单位为厘米/秒，角速度为度/秒
//!
//! 输出只是"原始"速度，边界钳位与加速斜坡由行为策略负责。

use strategy_core::{MotionPlanner, PointApproach};
use strategy_types::{ObjectInfo, Pose, ScanData, Velocity};

/// 比例控制增益
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerGains {
    /// 平移比例增益（1/秒）
    pub linear_kp: f64,
    /// 转向比例增益（1/秒）
    pub angular_kp: f64,
    /// 巡航速度上限（厘米/秒）
    pub cruise_speed: f64,
    /// 转向角速度上限（度/秒）
    pub max_yaw_rate: f64,
    /// 绕球拦截开始生效的距离（厘米）
    pub rounding_distance: f64,
    /// 绕球偏置角上限（度）
    pub max_rounding_offset: f64,
    /// 持球绕转半径（厘米）
    pub orbit_radius: f64,
    /// 障碍避让距离（厘米）
    pub avoid_distance: f64,
    /// 目标丢失时的原地搜索角速度（度/秒）
    pub search_yaw_rate: f64,
}

impl Default for PlannerGains {
    fn default() -> Self {
        Self {
            linear_kp: 1.5,
            angular_kp: 2.0,
            cruise_speed: 100.0,
            max_yaw_rate: 144.0,
            rounding_distance: 60.0,
            max_rounding_offset: 60.0,
            orbit_radius: 20.0,
            avoid_distance: 40.0,
            search_yaw_rate: 60.0,
        }
    }
}

/// 参考规划器
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferencePlanner {
    gains: PlannerGains,
}

impl ReferencePlanner {
    pub fn new(gains: PlannerGains) -> Self {
        Self { gains }
    }

    pub fn gains(&self) -> &PlannerGains {
        &self.gains
    }

    /// 沿方位 `heading` 以比例速度驶向 `distance` 处的目标，同时把车头转向 `face`
    fn steer(&self, heading: f64, distance: f64, face: f64) -> Velocity {
        let speed = (self.gains.linear_kp * distance.max(0.0)).min(self.gains.cruise_speed);
        let rad = heading.to_radians();
        Velocity::new(speed * rad.cos(), speed * rad.sin(), self.turn(face))
    }

    fn turn(&self, bearing: f64) -> f64 {
        let limit = self.gains.max_yaw_rate;
        (self.gains.angular_kp * normalize_angle(bearing)).clamp(-limit, limit)
    }

    fn search(&self) -> Velocity {
        Velocity::new(0.0, 0.0, self.gains.search_yaw_rate)
    }
}

impl MotionPlanner for ReferencePlanner {
    /// 靠近球时沿切向偏置，绕到球与对方球门连线的后方
    fn classic_rounding(&self, opponent_bearing: f64, ball: ObjectInfo) -> Velocity {
        if !ball.is_found() {
            return self.search();
        }
        if !ObjectInfo::new(0.0, opponent_bearing).is_found() {
            return self.straight_forward(ball);
        }

        let misalignment = normalize_angle(ball.angle - opponent_bearing);
        let weight = if ball.distance > 0.0 {
            (self.gains.rounding_distance / ball.distance).min(1.0)
        } else {
            1.0
        };
        let limit = self.gains.max_rounding_offset;
        let offset = weight * misalignment.clamp(-limit, limit);

        self.steer(ball.angle + offset, ball.distance, ball.angle)
    }

    fn straight_forward(&self, ball: ObjectInfo) -> Velocity {
        if !ball.is_found() {
            return self.search();
        }
        self.steer(ball.angle, ball.distance, ball.angle)
    }

    /// 向球门逼近，附加来自近距离障碍的斥力
    fn classic_attacking(&self, goal: ObjectInfo, obstacles: &ScanData) -> Velocity {
        if !goal.is_found() {
            return self.search();
        }

        let base = self.steer(goal.angle, goal.distance, goal.angle);
        let (mut push_x, mut push_y) = (0.0, 0.0);
        for (i, range) in obstacles.ranges.iter().enumerate() {
            if !range.is_finite() || *range <= 0.0 || *range >= self.gains.avoid_distance {
                continue;
            }
            let bearing = normalize_angle(i as f64 * obstacles.angle_increment);
            // 只避让行进方向前方的障碍
            if normalize_angle(bearing - goal.angle).abs() > 90.0 {
                continue;
            }
            let strength =
                self.gains.cruise_speed * (self.gains.avoid_distance - range) / self.gains.avoid_distance;
            let rad = bearing.to_radians();
            push_x -= strength * rad.cos();
            push_y -= strength * rad.sin();
        }

        Velocity::new(base.x + push_x, base.y + push_y, base.yaw)
    }

    /// 以球为圆心侧移，使车头转向对方球门
    fn orbit(&self, opponent_bearing: f64) -> Velocity {
        if !ObjectInfo::new(0.0, opponent_bearing).is_found() {
            return self.search();
        }
        let yaw = self.turn(opponent_bearing);
        // 车头左转时车体向右侧移，保持球在正前方
        let lateral = -self.gains.orbit_radius * yaw.to_radians();
        Velocity::new(0.0, lateral, yaw)
    }

    fn go_to_point(&self, pose: Pose, target: Pose) -> PointApproach {
        let dx = target.x - pose.x;
        let dy = target.y - pose.y;
        let distance = dx.hypot(dy);
        let remaining_yaw = normalize_angle(target.yaw - pose.yaw);

        // 场地坐标 → 机体坐标
        let (sin, cos) = pose.yaw.to_radians().sin_cos();
        let local_x = dx * cos + dy * sin;
        let local_y = -dx * sin + dy * cos;

        let velocity = if distance > 0.0 {
            let speed = (self.gains.linear_kp * distance).min(self.gains.cruise_speed);
            Velocity::new(
                speed * local_x / distance,
                speed * local_y / distance,
                self.turn(remaining_yaw),
            )
        } else {
            Velocity::new(0.0, 0.0, self.turn(remaining_yaw))
        };

        PointApproach {
            velocity,
            remaining_distance: distance,
            remaining_yaw,
        }
    }
}

/// 角度归一化到 `(-180, 180]`
pub fn normalize_angle(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return degrees;
    }
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}
