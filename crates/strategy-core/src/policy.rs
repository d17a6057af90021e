//! 行为策略
//!
//! 每个状态对应一个进入动作：给定感知快照、配置快照和辅助状态，产生一个
//! [`MotionIntent`]。具体轨迹数学（追球、进攻逼近、绕转、跑点）由外部
//! [`MotionPlanner`] 提供，本模块只负责选择算法、整形速度和判定到点。
//!
//! # 速度整形
//!
//! 运动状态的规划输出依次经过：
//!
//! 1. **加速斜坡**：离开 `Idle` 后第一个运动周期设置锚点，平移速度按
//!    `min(1, elapsed / accel_ramp_secs)` 缩放；`Idle` 动作清除锚点
//! 2. **速度边界**：非零平移速度大小钳位到 `[min_velocity, max_velocity]`，
//!    非零角速度绝对值钳位到 `[min_angular_velocity, max_angular_velocity]`

use crate::error::StrategyError;
use crate::state::State;
use std::time::Duration;
use strategy_types::{
    ConfigSnapshot, GameState, MotionIntent, ObjectInfo, PerceptionSnapshot, Pose, ScanData, Side,
    StrategyMode, Velocity,
};

// ==================== 外部规划接口 ====================

/// 跑点规划结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointApproach {
    pub velocity: Velocity,
    /// 剩余平移距离（厘米）
    pub remaining_distance: f64,
    /// 剩余朝向误差（度，带符号）
    pub remaining_yaw: f64,
}

/// 运动规划器（外部协作者）
///
/// 每个方法都是纯函数：同样的输入得到同样的速度三元组。
/// 角度单位为度，距离单位为厘米。
pub trait MotionPlanner {
    /// 防守追球：利用对方球门方位绕到球后方拦截
    fn classic_rounding(&self, opponent_bearing: f64, ball: ObjectInfo) -> Velocity;

    /// 进攻追球：只依据球的距离和方位直线逼近
    fn straight_forward(&self, ball: ObjectInfo) -> Velocity;

    /// 持球向对方球门逼近，可利用障碍扫描避让
    fn classic_attacking(&self, goal: ObjectInfo, obstacles: &ScanData) -> Velocity;

    /// 持球绕转，使对方球门进入正前方
    fn orbit(&self, opponent_bearing: f64) -> Velocity;

    /// 从当前位姿驶向目标位姿
    fn go_to_point(&self, pose: Pose, target: Pose) -> PointApproach;
}

impl<T: MotionPlanner + ?Sized> MotionPlanner for Box<T> {
    fn classic_rounding(&self, opponent_bearing: f64, ball: ObjectInfo) -> Velocity {
        (**self).classic_rounding(opponent_bearing, ball)
    }

    fn straight_forward(&self, ball: ObjectInfo) -> Velocity {
        (**self).straight_forward(ball)
    }

    fn classic_attacking(&self, goal: ObjectInfo, obstacles: &ScanData) -> Velocity {
        (**self).classic_attacking(goal, obstacles)
    }

    fn orbit(&self, opponent_bearing: f64) -> Velocity {
        (**self).orbit(opponent_bearing)
    }

    fn go_to_point(&self, pose: Pose, target: Pose) -> PointApproach {
        (**self).go_to_point(pose, target)
    }
}

// ==================== 动作上下文与输出 ====================

/// 进入动作的输入
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    /// 本周期感知快照（可能缺席）
    pub perception: Option<&'a PerceptionSnapshot>,
    /// 本周期配置快照
    pub config: &'a ConfigSnapshot,
    /// 控制循环启动以来的单调时间
    pub now: Duration,
}

impl<'a> ActionContext<'a> {
    pub fn new(
        perception: Option<&'a PerceptionSnapshot>,
        config: &'a ConfigSnapshot,
        now: Duration,
    ) -> Self {
        Self {
            perception,
            config,
            now,
        }
    }

    fn require_perception(&self) -> Result<&'a PerceptionSnapshot, StrategyError> {
        self.perception.ok_or(StrategyError::MissingPerception)
    }

    /// 对方球门观测
    fn opponent_goal(&self, perception: &PerceptionSnapshot) -> ObjectInfo {
        perception.objects.goal(self.config.opponent_side())
    }
}

/// 进入动作的输出
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionOutput {
    pub intent: MotionIntent,
    /// 仅 `Point` 动作使用：是否已在容差内到达目标位姿
    pub arrived: bool,
}

impl ActionOutput {
    pub fn motion(intent: MotionIntent) -> Self {
        Self {
            intent,
            arrived: false,
        }
    }
}

// ==================== 行为策略 ====================

/// 行为策略
///
/// 持有外部规划器和跨周期辅助状态（加速斜坡锚点），由控制循环独占。
#[derive(Debug, Clone)]
pub struct BehaviorPolicy<P> {
    planner: P,
    ramp_anchor: Option<Duration>,
}

impl<P: MotionPlanner> BehaviorPolicy<P> {
    pub fn new(planner: P) -> Self {
        Self {
            planner,
            ramp_anchor: None,
        }
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    /// 当前加速斜坡锚点（`None` 表示处于停止后未起步）
    pub fn ramp_anchor(&self) -> Option<Duration> {
        self.ramp_anchor
    }

    /// 按状态分发进入动作
    pub fn act(&mut self, state: State, ctx: &ActionContext<'_>) -> Result<ActionOutput, StrategyError> {
        match state {
            State::Idle => Ok(ActionOutput::motion(self.idle())),
            State::Chase => self.chase(ctx).map(ActionOutput::motion),
            State::Attack => self.attack(ctx).map(ActionOutput::motion),
            State::Shoot => Ok(ActionOutput::motion(Self::shoot(ctx.config))),
            State::Orbit => self.orbit(ctx).map(ActionOutput::motion),
            State::Point => self.point(ctx),
        }
    }

    /// 停止：零速度、执行器释放，并清除加速斜坡锚点（幂等）
    pub fn idle(&mut self) -> MotionIntent {
        self.ramp_anchor = None;
        MotionIntent::stop()
    }

    /// 追球：算法只由策略模式决定
    pub fn chase(&mut self, ctx: &ActionContext<'_>) -> Result<MotionIntent, StrategyError> {
        let perception = ctx.require_perception()?;
        let ball = perception.ball();
        let raw = match ctx.config.strategy_mode {
            StrategyMode::Defense => {
                let opponent = ctx.opponent_goal(perception);
                self.planner.classic_rounding(opponent.angle, ball)
            },
            StrategyMode::Attack => self.planner.straight_forward(ball),
        };
        Ok(MotionIntent::drive(self.shape(raw, ctx)))
    }

    /// 进攻：向对方球门逼近
    pub fn attack(&mut self, ctx: &ActionContext<'_>) -> Result<MotionIntent, StrategyError> {
        let perception = ctx.require_perception()?;
        let goal = ctx.opponent_goal(perception);
        let raw = self.planner.classic_attacking(goal, &perception.obstacles);
        Ok(MotionIntent::drive(self.shape(raw, ctx)))
    }

    /// 射门：力度和槽位原样透传，不计算运动
    pub fn shoot(config: &ConfigSnapshot) -> MotionIntent {
        MotionIntent::shoot(config.shoot_power, config.shoot_slot)
    }

    /// 绕转：只用对方球门方位，始终启用旋转标志
    pub fn orbit(&mut self, ctx: &ActionContext<'_>) -> Result<MotionIntent, StrategyError> {
        let perception = ctx.require_perception()?;
        let goal = ctx.opponent_goal(perception);
        let raw = self.planner.orbit(goal.angle);
        Ok(MotionIntent::rotate(self.shape(raw, ctx)))
    }

    /// 跑点：按比赛状态查目标位姿，并报告是否到达
    pub fn point(&mut self, ctx: &ActionContext<'_>) -> Result<ActionOutput, StrategyError> {
        let target = point_target(ctx.config)?;
        let perception = ctx.require_perception()?;
        let approach = self.planner.go_to_point(perception.pose, target);

        let arrived = approach.remaining_distance.abs() <= ctx.config.point_tolerance_distance
            && approach.remaining_yaw.abs() <= ctx.config.point_tolerance_yaw;

        Ok(ActionOutput {
            intent: MotionIntent::drive(self.shape(approach.velocity, ctx)),
            arrived,
        })
    }

    fn shape(&mut self, raw: Velocity, ctx: &ActionContext<'_>) -> Velocity {
        let anchor = *self.ramp_anchor.get_or_insert(ctx.now);
        let factor = ramp_factor(anchor, ctx.now, ctx.config.accel_ramp_secs);
        let ramped = Velocity::new(raw.x * factor, raw.y * factor, raw.yaw);
        bound_velocity(ramped, ctx.config)
    }
}

// ==================== 纯函数 ====================

/// 比赛状态 → 目标位姿
///
/// | 比赛状态                   | 目标 `(x, y, yaw)`             |
/// |----------------------------|--------------------------------|
/// | KickOff（本方 Yellow）      | (-60, 0, 0)                    |
/// | KickOff（本方 Blue）        | (60, 0, 180)                   |
/// | FreeKick                   | (100, 100, 90)                 |
/// | FreeBall                   | (-100, -100, 180)              |
/// | ThrowIn                    | (-100, -100, 270)              |
/// | CornerKick                 | (300, 200, 45)                 |
/// | PenaltyKick                | (-100, 100, 135)               |
/// | RunSpecificPoint           | (run_x, run_y, run_yaw)        |
pub fn point_target(config: &ConfigSnapshot) -> Result<Pose, StrategyError> {
    match config.game_state {
        GameState::KickOff => match config.our_side {
            Side::Yellow => Ok(Pose::new(-60.0, 0.0, 0.0)),
            Side::Blue => Ok(Pose::new(60.0, 0.0, 180.0)),
        },
        GameState::FreeKick => Ok(Pose::new(100.0, 100.0, 90.0)),
        GameState::FreeBall => Ok(Pose::new(-100.0, -100.0, 180.0)),
        GameState::ThrowIn => Ok(Pose::new(-100.0, -100.0, 270.0)),
        GameState::CornerKick => Ok(Pose::new(300.0, 200.0, 45.0)),
        GameState::PenaltyKick => Ok(Pose::new(-100.0, 100.0, 135.0)),
        GameState::RunSpecificPoint => Ok(Pose::new(config.run_x, config.run_y, config.run_yaw)),
        GameState::Unknown => Err(StrategyError::UnknownGameState(config.game_state)),
    }
}

/// 持球判定：球可见，且距离、方位都在阈值内
pub fn ball_handle(perception: &PerceptionSnapshot, config: &ConfigSnapshot) -> bool {
    let ball = perception.ball();
    ball.is_found()
        && ball.distance <= config.ball_handle_distance
        && ball.angle.abs() <= config.ball_handle_angle
}

/// 加速斜坡系数，范围 `[0, 1]`
pub fn ramp_factor(anchor: Duration, now: Duration, ramp_secs: f64) -> f64 {
    if ramp_secs <= 0.0 {
        return 1.0;
    }
    let elapsed = now.saturating_sub(anchor).as_secs_f64();
    (elapsed / ramp_secs).min(1.0)
}

/// 速度边界钳位（零保持为零，方向不变）
pub fn bound_velocity(velocity: Velocity, config: &ConfigSnapshot) -> Velocity {
    let mut bounded = velocity;

    let speed = velocity.linear_speed();
    if speed > 0.0 && speed.is_finite() {
        let target = speed.clamp(config.min_velocity, config.max_velocity);
        let scale = target / speed;
        bounded.x = velocity.x * scale;
        bounded.y = velocity.y * scale;
    } else if !speed.is_finite() {
        bounded.x = 0.0;
        bounded.y = 0.0;
    }

    if velocity.yaw.is_finite() {
        if velocity.yaw != 0.0 {
            let magnitude = velocity
                .yaw
                .abs()
                .clamp(config.min_angular_velocity, config.max_angular_velocity);
            bounded.yaw = magnitude.copysign(velocity.yaw);
        }
    } else {
        bounded.yaw = 0.0;
    }

    bounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy_types::{FieldObjects, NOT_FOUND_ANGLE};

    /// 把输入编码进输出的规划器，便于断言调用了哪个算法
    struct EchoPlanner;

    impl MotionPlanner for EchoPlanner {
        fn classic_rounding(&self, opponent_bearing: f64, ball: ObjectInfo) -> Velocity {
            Velocity::new(1.0, opponent_bearing, ball.angle)
        }

        fn straight_forward(&self, ball: ObjectInfo) -> Velocity {
            Velocity::new(2.0, ball.distance, ball.angle)
        }

        fn classic_attacking(&self, goal: ObjectInfo, obstacles: &ScanData) -> Velocity {
            Velocity::new(3.0, goal.distance, obstacles.ranges.len() as f64)
        }

        fn orbit(&self, opponent_bearing: f64) -> Velocity {
            Velocity::new(4.0, 0.0, opponent_bearing)
        }

        fn go_to_point(&self, pose: Pose, target: Pose) -> PointApproach {
            let dx = target.x - pose.x;
            let dy = target.y - pose.y;
            PointApproach {
                velocity: Velocity::new(dx, dy, target.yaw - pose.yaw),
                remaining_distance: dx.hypot(dy),
                remaining_yaw: target.yaw - pose.yaw,
            }
        }
    }

    fn unbounded_config() -> ConfigSnapshot {
        ConfigSnapshot {
            max_velocity: 1e6,
            max_angular_velocity: 1e6,
            accel_ramp_secs: 0.0,
            ..ConfigSnapshot::default()
        }
    }

    fn perception() -> PerceptionSnapshot {
        PerceptionSnapshot {
            objects: FieldObjects {
                ball: ObjectInfo::new(80.0, 12.0),
                yellow_goal: ObjectInfo::new(400.0, 170.0),
                blue_goal: ObjectInfo::new(250.0, -30.0),
            },
            pose: Pose::new(-60.0, 0.0, 0.0),
            obstacles: ScanData {
                ranges: vec![1.0; 8],
                angle_increment: 45.0,
            },
        }
    }

    #[test]
    fn test_idle_is_idempotent_zero_intent() {
        let mut policy = BehaviorPolicy::new(EchoPlanner);
        let first = policy.idle();
        for _ in 0..10 {
            assert_eq!(policy.idle(), first);
        }
        assert!(first.is_stop());
        assert_eq!(policy.ramp_anchor(), None);
    }

    #[test]
    fn test_chase_algorithm_follows_strategy_mode() {
        let p = perception();
        let mut config = unbounded_config();
        let mut policy = BehaviorPolicy::new(EchoPlanner);

        config.strategy_mode = StrategyMode::Defense;
        let ctx = ActionContext::new(Some(&p), &config, Duration::ZERO);
        let intent = policy.chase(&ctx).unwrap();
        // Defense → classic_rounding，使用对方（Blue）球门方位
        assert_eq!(intent.velocity.y, -30.0);
        assert_eq!(intent.velocity.yaw, 12.0);

        config.strategy_mode = StrategyMode::Attack;
        let ctx = ActionContext::new(Some(&p), &config, Duration::ZERO);
        let intent = policy.chase(&ctx).unwrap();
        assert_eq!(intent.velocity.y, 80.0);
    }

    #[test]
    fn test_attack_uses_opponent_goal_and_obstacles() {
        let p = perception();
        let mut config = unbounded_config();
        config.our_side = Side::Blue;
        let mut policy = BehaviorPolicy::new(EchoPlanner);

        let ctx = ActionContext::new(Some(&p), &config, Duration::ZERO);
        let intent = policy.attack(&ctx).unwrap();
        assert_eq!(intent.velocity.y, 400.0); // Yellow 球门
        assert_eq!(intent.velocity.yaw, 8.0);
        assert!(!intent.rotate_enable);
    }

    #[test]
    fn test_orbit_sets_rotate_flag() {
        let p = perception();
        let config = unbounded_config();
        let mut policy = BehaviorPolicy::new(EchoPlanner);
        let ctx = ActionContext::new(Some(&p), &config, Duration::ZERO);
        let intent = policy.orbit(&ctx).unwrap();
        assert!(intent.rotate_enable);
        assert_eq!(intent.velocity.yaw, -30.0);
    }

    #[test]
    fn test_shoot_passes_command_through() {
        let config = ConfigSnapshot {
            shoot_power: 7,
            shoot_slot: 2,
            ..ConfigSnapshot::default()
        };
        let mut policy = BehaviorPolicy::new(EchoPlanner);
        let ctx = ActionContext::new(None, &config, Duration::ZERO);
        let output = policy.act(State::Shoot, &ctx).unwrap();
        assert_eq!(output.intent, MotionIntent::shoot(7, 2));
    }

    #[test]
    fn test_moving_actions_require_perception() {
        let config = unbounded_config();
        let mut policy = BehaviorPolicy::new(EchoPlanner);
        let ctx = ActionContext::new(None, &config, Duration::ZERO);
        for state in [State::Chase, State::Attack, State::Orbit, State::Point] {
            assert_eq!(policy.act(state, &ctx), Err(StrategyError::MissingPerception));
        }
        assert!(policy.act(State::Idle, &ctx).is_ok());
    }

    #[test]
    fn test_point_targets() {
        let mut config = ConfigSnapshot::default();
        assert_eq!(point_target(&config).unwrap(), Pose::new(-60.0, 0.0, 0.0));

        config.our_side = Side::Blue;
        assert_eq!(point_target(&config).unwrap(), Pose::new(60.0, 0.0, 180.0));

        let expected = [
            (GameState::FreeKick, Pose::new(100.0, 100.0, 90.0)),
            (GameState::FreeBall, Pose::new(-100.0, -100.0, 180.0)),
            (GameState::ThrowIn, Pose::new(-100.0, -100.0, 270.0)),
            (GameState::CornerKick, Pose::new(300.0, 200.0, 45.0)),
            (GameState::PenaltyKick, Pose::new(-100.0, 100.0, 135.0)),
        ];
        for (state, pose) in expected {
            config.game_state = state;
            assert_eq!(point_target(&config).unwrap(), pose, "{state}");
        }

        config.game_state = GameState::RunSpecificPoint;
        config.run_x = 12.0;
        config.run_y = -34.0;
        config.run_yaw = 56.0;
        assert_eq!(point_target(&config).unwrap(), Pose::new(12.0, -34.0, 56.0));

        config.game_state = GameState::Unknown;
        assert_eq!(
            point_target(&config),
            Err(StrategyError::UnknownGameState(GameState::Unknown))
        );
    }

    #[test]
    fn test_point_reports_arrival_within_tolerance() {
        let mut p = perception();
        let config = unbounded_config();
        let mut policy = BehaviorPolicy::new(EchoPlanner);

        // 已位于 KickOff 目标点
        let ctx = ActionContext::new(Some(&p), &config, Duration::ZERO);
        assert!(policy.point(&ctx).unwrap().arrived);

        // 偏离 3cm，仍在默认 5cm 容差内
        p.pose = Pose::new(-57.0, 0.0, 2.0);
        let ctx = ActionContext::new(Some(&p), &config, Duration::ZERO);
        assert!(policy.point(&ctx).unwrap().arrived);

        p.pose = Pose::new(0.0, 0.0, 0.0);
        let ctx = ActionContext::new(Some(&p), &config, Duration::ZERO);
        assert!(!policy.point(&ctx).unwrap().arrived);
    }

    #[test]
    fn test_ball_handle_condition() {
        let mut p = perception();
        let config = ConfigSnapshot::default();
        assert!(!ball_handle(&p, &config));

        p.objects.ball = ObjectInfo::new(20.0, -10.0);
        assert!(ball_handle(&p, &config));

        p.objects.ball = ObjectInfo::new(0.0, NOT_FOUND_ANGLE);
        assert!(!ball_handle(&p, &config));
    }

    #[test]
    fn test_ramp_anchor_lifecycle() {
        let p = perception();
        let config = ConfigSnapshot {
            accel_ramp_secs: 1.0,
            max_velocity: 1e6,
            ..ConfigSnapshot::default()
        };
        let mut policy = BehaviorPolicy::new(EchoPlanner);

        let ctx = ActionContext::new(Some(&p), &config, Duration::from_secs(10));
        let first = policy.attack(&ctx).unwrap();
        assert_eq!(policy.ramp_anchor(), Some(Duration::from_secs(10)));
        assert_eq!(first.velocity.x, 0.0);

        let ctx = ActionContext::new(Some(&p), &config, Duration::from_millis(10_500));
        let half = policy.attack(&ctx).unwrap();
        assert!((half.velocity.x - 1.5).abs() < 1e-9);

        policy.idle();
        assert_eq!(policy.ramp_anchor(), None);
    }

    #[test]
    fn test_bound_velocity() {
        let config = ConfigSnapshot {
            min_velocity: 10.0,
            max_velocity: 50.0,
            min_angular_velocity: 5.0,
            max_angular_velocity: 90.0,
            ..ConfigSnapshot::default()
        };

        let v = bound_velocity(Velocity::new(60.0, 80.0, -200.0), &config);
        assert!((v.linear_speed() - 50.0).abs() < 1e-9);
        assert!((v.x / v.y - 0.75).abs() < 1e-9);
        assert_eq!(v.yaw, -90.0);

        let v = bound_velocity(Velocity::new(1.0, 0.0, 1.0), &config);
        assert_eq!(v, Velocity::new(10.0, 0.0, 5.0));

        assert_eq!(bound_velocity(Velocity::ZERO, &config), Velocity::ZERO);
        assert_eq!(
            bound_velocity(Velocity::new(f64::NAN, 0.0, f64::INFINITY), &config),
            Velocity::ZERO
        );
    }

    proptest::proptest! {
        #[test]
        fn prop_bound_velocity_stays_in_bounds(
            x in -1000.0..1000.0f64,
            y in -1000.0..1000.0f64,
            yaw in -1000.0..1000.0f64,
            min in 0.0..50.0f64,
            span in 0.0..200.0f64,
        ) {
            let config = ConfigSnapshot {
                min_velocity: min,
                max_velocity: min + span,
                min_angular_velocity: min,
                max_angular_velocity: min + span,
                ..ConfigSnapshot::default()
            };
            let v = bound_velocity(Velocity::new(x, y, yaw), &config);
            let speed = v.linear_speed();

            if x == 0.0 && y == 0.0 {
                proptest::prop_assert_eq!(speed, 0.0);
            } else {
                proptest::prop_assert!(speed >= min - 1e-9 && speed <= min + span + 1e-9);
                // 方向不变
                proptest::prop_assert!(v.x * x >= 0.0 && v.y * y >= 0.0);
            }
            if yaw != 0.0 {
                proptest::prop_assert!(v.yaw.abs() >= min && v.yaw.abs() <= min + span);
                proptest::prop_assert_eq!(v.yaw.signum(), yaw.signum());
            }
        }
    }
}
