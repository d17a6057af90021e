//! 控制循环
//!
//! 固定频率调度器。每个周期：
//!
//! 1. 读取一次最新配置快照（整个周期使用同一份）
//! 2. 发布当前状态（仅用于外部观测）
//! 3. 组装感知快照（无检测时整份缺席）
//! 4. 执行守卫逻辑，驱动状态机
//! 5. 按顺序把本周期产生的全部意图转发给执行层
//!
//! # 守卫顺序
//!
//! 1. 无感知，或比赛已开始但球未找到 → 强制 `Idle`，跳过本周期其余决策
//! 2. 非 `Idle` 且既没有比赛开始也没有跑点请求 → 强制 `Idle`
//! 3. `Idle`: 比赛开始 → `Chase`；否则跑点请求 → `Point`；否则保持 `Idle`
//! 4. `Chase`: 持球 → `Attack`（Defense）/ `Orbit`（Attack）；否则重新追球
//! 5. `Orbit`: 对方球门方位 < 绕转进攻角 → `Attack`；丢球 → `Chase`；否则继续绕转
//! 6. `Attack`: 丢球 → `Chase`；方位 < 射门角且距离 < 射门距离 → `Shoot`；否则继续进攻
//! 7. `Shoot`: 下一周期无条件回到 `Attack`
//! 8. `Point`: 执行跑点动作，到达后清除跑点请求并回到 `Idle`
//!
//! 每个周期从周期开始时的状态出发，只评估当前状态对应的一个分支。

use crate::channel::ConfigChannel;
use crate::error::StrategyError;
use crate::interfaces::{Actuation, NoStatus, Perception, StatusSink};
use crate::metrics::{LoopMetrics, MetricsSnapshot};
use crate::policy::{ActionContext, ActionOutput, BehaviorPolicy, MotionPlanner, ball_handle};
use crate::state::{State, StateMachine, Transition};
use smallvec::SmallVec;
use spin_sleep::SpinSleeper;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use strategy_types::{ConfigSnapshot, MotionIntent, PerceptionSnapshot, StrategyMode};
use tracing::{debug, error, info, warn};

/// 单周期产生的意图序列（通常 1 个，到点时 2 个）
pub type Intents = SmallVec<[MotionIntent; 4]>;

// ==================== 循环配置 ====================

/// 控制循环配置
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// 控制频率（Hz）
    pub frequency_hz: f64,

    /// dt 钳位倍数
    ///
    /// 实际周期超过 `标称周期 × 倍数` 时记为一次超时，并重新对齐下一个截止时间，
    /// 不追赶错过的周期。
    pub dt_clamp_multiplier: f64,

    /// 最大迭代次数（None 表示一直运行到关闭信号）
    pub max_iterations: Option<usize>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            frequency_hz: 1000.0,
            dt_clamp_multiplier: 2.0,
            max_iterations: None,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if !(self.frequency_hz > 0.0) || !self.frequency_hz.is_finite() {
            return Err(StrategyError::InvalidLoopConfig(format!(
                "Invalid frequency_hz: {} (must be > 0)",
                self.frequency_hz
            )));
        }
        if self.frequency_hz > 10000.0 {
            warn!(
                "Very high control frequency: {} Hz. This may cause performance issues.",
                self.frequency_hz
            );
        }
        if !(self.dt_clamp_multiplier >= 1.0) || !self.dt_clamp_multiplier.is_finite() {
            return Err(StrategyError::InvalidLoopConfig(format!(
                "Invalid dt_clamp_multiplier: {} (must be finite and >= 1)",
                self.dt_clamp_multiplier
            )));
        }
        self.period()?;
        self.clamped_period()?;
        Ok(())
    }

    /// 标称周期
    ///
    /// 频率过低（周期超出 `Duration` 范围）或过高（周期为 0）时返回错误。
    pub fn period(&self) -> Result<Duration, StrategyError> {
        match Duration::try_from_secs_f64(1.0 / self.frequency_hz) {
            Ok(period) if !period.is_zero() => Ok(period),
            Ok(_) => Err(StrategyError::InvalidLoopConfig(format!(
                "Invalid frequency_hz: {} (period rounds to zero)",
                self.frequency_hz
            ))),
            Err(e) => Err(StrategyError::InvalidLoopConfig(format!(
                "Invalid frequency_hz: {} ({e})",
                self.frequency_hz
            ))),
        }
    }

    /// 超时判定阈值：`标称周期 × dt_clamp_multiplier`
    pub fn clamped_period(&self) -> Result<Duration, StrategyError> {
        let secs = self.period()?.as_secs_f64() * self.dt_clamp_multiplier;
        Duration::try_from_secs_f64(secs).map_err(|e| {
            StrategyError::InvalidLoopConfig(format!(
                "Invalid dt_clamp_multiplier: {} for {} Hz ({e})",
                self.dt_clamp_multiplier, self.frequency_hz
            ))
        })
    }
}

// ==================== 周期报告 ====================

/// 单周期执行结果
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// 周期序号（从 0 开始）
    pub cycle: u64,
    /// 本周期使用的配置发布序号
    pub commit: u64,
    pub state_before: State,
    pub state_after: State,
    /// 按顺序转发给执行层的意图
    pub intents: Intents,
}

impl CycleReport {
    /// 本周期最后一个意图（执行层最终保持的指令）
    pub fn final_intent(&self) -> Option<&MotionIntent> {
        self.intents.last()
    }
}

// ==================== 控制循环 ====================

/// 控制循环
///
/// 独占状态机、行为策略（含辅助累加器）和外部协作者，单线程运行。
/// 唯一的跨线程共享资源是配置通道。
pub struct ControlLoop<P, Pe, A, S = NoStatus> {
    machine: StateMachine,
    policy: BehaviorPolicy<P>,
    config: ConfigChannel,
    perception: Pe,
    actuation: A,
    status: S,
    metrics: Arc<LoopMetrics>,
    cycle: u64,
}

impl<P, Pe, A> ControlLoop<P, Pe, A, NoStatus>
where
    P: MotionPlanner,
    Pe: Perception,
    A: Actuation,
{
    /// 创建控制循环（状态机使用标准转移表，初始状态 `Idle`）
    pub fn new(
        planner: P,
        perception: Pe,
        actuation: A,
        config: ConfigChannel,
    ) -> Result<Self, StrategyError> {
        Ok(Self {
            machine: StateMachine::new()?,
            policy: BehaviorPolicy::new(planner),
            config,
            perception,
            actuation,
            status: NoStatus,
            metrics: Arc::new(LoopMetrics::new()),
            cycle: 0,
        })
    }
}

impl<P, Pe, A, S> ControlLoop<P, Pe, A, S>
where
    P: MotionPlanner,
    Pe: Perception,
    A: Actuation,
    S: StatusSink,
{
    /// 替换状态输出
    pub fn with_status_sink<S2: StatusSink>(self, status: S2) -> ControlLoop<P, Pe, A, S2> {
        ControlLoop {
            machine: self.machine,
            policy: self.policy,
            config: self.config,
            perception: self.perception,
            actuation: self.actuation,
            status,
            metrics: self.metrics,
            cycle: self.cycle,
        }
    }

    pub fn current_state(&self) -> State {
        self.machine.current_state()
    }

    pub fn metrics(&self) -> Arc<LoopMetrics> {
        self.metrics.clone()
    }

    pub fn config(&self) -> &ConfigChannel {
        &self.config
    }

    pub fn policy(&self) -> &BehaviorPolicy<P> {
        &self.policy
    }

    pub fn perception(&self) -> &Pe {
        &self.perception
    }

    pub fn perception_mut(&mut self) -> &mut Pe {
        &mut self.perception
    }

    pub fn actuation(&self) -> &A {
        &self.actuation
    }

    pub fn status(&self) -> &S {
        &self.status
    }

    /// 执行一个控制周期
    ///
    /// `now` 为循环启动以来的单调时间，用于加速斜坡。
    ///
    /// # Panics
    ///
    /// 周期结束时没有产生任何意图（守卫逻辑缺陷）时立即失败，不会跳过执行。
    pub fn cycle(&mut self, now: Duration) -> CycleReport {
        let config = self.config.load();
        let state_before = self.machine.current_state();
        self.status.publish_state(state_before);

        let perception = self.sense();

        let mut intents = Intents::new();
        self.decide(perception.as_ref(), &config, now, &mut intents);

        assert!(
            !intents.is_empty(),
            "control cycle {} produced no motion intent (state {})",
            self.cycle,
            state_before
        );

        for intent in &intents {
            self.actuation.apply(intent);
        }

        self.metrics.cycles.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .intents_forwarded
            .fetch_add(intents.len() as u64, Ordering::Relaxed);

        let report = CycleReport {
            cycle: self.cycle,
            commit: config.commit,
            state_before,
            state_after: self.machine.current_state(),
            intents,
        };
        self.cycle += 1;
        report
    }

    /// 停止：强制回到 `Idle` 并发送最后一个零速度意图
    pub fn shutdown(&mut self, now: Duration) -> MotionIntent {
        let config = self.config.load();
        let ctx = ActionContext::new(None, &config, now);
        if let Err(e) = self.machine.force_idle(&mut self.policy, &ctx) {
            error!("Shutdown could not reach Idle: {}", e);
            self.metrics.invalid_transitions.fetch_add(1, Ordering::Relaxed);
        }

        let intent = MotionIntent::stop();
        self.actuation.apply(&intent);
        self.metrics.intents_forwarded.fetch_add(1, Ordering::Relaxed);
        self.status.publish_state(self.machine.current_state());
        info!("Control loop stopped in {}", self.machine.current_state());
        intent
    }

    /// 以固定频率运行，直到 `running` 被清除或达到 `max_iterations`
    ///
    /// 退出前总会调用 [`shutdown`](Self::shutdown)。
    ///
    /// # 错误
    ///
    /// 只有循环配置无效时返回错误（此时不会执行任何周期）。
    pub fn run(
        &mut self,
        loop_config: &LoopConfig,
        running: &AtomicBool,
    ) -> Result<MetricsSnapshot, StrategyError> {
        loop_config.validate()?;

        let period = loop_config.period()?;
        let max_dt = loop_config.clamped_period()?;
        let sleeper = SpinSleeper::default();

        let start = Instant::now();
        let mut last = start;
        let mut deadline = start + period;
        let mut iteration = 0usize;

        info!("Control loop started at {} Hz", loop_config.frequency_hz);

        while running.load(Ordering::Acquire) {
            if let Some(max_iter) = loop_config.max_iterations
                && iteration >= max_iter
            {
                break;
            }

            let now = Instant::now();
            let real_dt = now - last;
            if iteration > 0 && real_dt > max_dt {
                self.metrics.overruns.fetch_add(1, Ordering::Relaxed);
                debug!("Cycle overrun: {:?} (nominal {:?})", real_dt, period);
                deadline = now + period;
            }
            last = now;

            self.cycle(now - start);
            iteration += 1;

            let after = Instant::now();
            if deadline > after {
                sleeper.sleep(deadline - after);
            }
            deadline += period;
        }

        self.shutdown(start.elapsed());
        Ok(self.metrics.snapshot())
    }

    fn sense(&mut self) -> Option<PerceptionSnapshot> {
        let objects = self.perception.objects()?;
        Some(PerceptionSnapshot {
            objects,
            pose: self.perception.self_pose(),
            obstacles: self.perception.obstacles(),
        })
    }

    fn decide(
        &mut self,
        perception: Option<&PerceptionSnapshot>,
        config: &ConfigSnapshot,
        now: Duration,
        out: &mut Intents,
    ) {
        let ctx = ActionContext::new(perception, config, now);

        let Some(perception) = perception else {
            self.safe_stop(&ctx, "no detection", out);
            return;
        };
        if perception.ball_missing() && config.game_start {
            self.safe_stop(&ctx, "ball not found", out);
            return;
        }

        let state = self.machine.current_state();
        if state != State::Idle && !config.has_directive() {
            self.safe_stop(&ctx, "no active directive", out);
            return;
        }

        let opponent = perception.objects.goal(config.opponent_side());
        match state {
            State::Idle => {
                if config.game_start {
                    self.transition(State::Chase, &ctx, out);
                } else if config.run_point {
                    self.run_point(&ctx, out);
                } else {
                    self.transition(State::Idle, &ctx, out);
                }
            },
            State::Chase => {
                let target = if ball_handle(perception, config) {
                    match config.strategy_mode {
                        StrategyMode::Defense => State::Attack,
                        StrategyMode::Attack => State::Orbit,
                    }
                } else {
                    State::Chase
                };
                self.transition(target, &ctx, out);
            },
            State::Orbit => {
                let target = if opponent.angle.abs() < config.orbit_to_attack_angle {
                    State::Attack
                } else if !ball_handle(perception, config) {
                    State::Chase
                } else {
                    State::Orbit
                };
                self.transition(target, &ctx, out);
            },
            State::Attack => {
                let target = if !ball_handle(perception, config) {
                    State::Chase
                } else if opponent.angle.abs() < config.attack_to_shoot_angle
                    && opponent.distance < config.shoot_range
                {
                    State::Shoot
                } else {
                    State::Attack
                };
                self.transition(target, &ctx, out);
            },
            State::Shoot => {
                self.transition(State::Attack, &ctx, out);
            },
            State::Point => self.run_point(&ctx, out),
        }
    }

    /// 执行跑点动作；到达后清除跑点请求并回到 `Idle`
    fn run_point(&mut self, ctx: &ActionContext<'_>, out: &mut Intents) {
        if let Some(output) = self.transition(State::Point, ctx, out)
            && output.arrived
        {
            let commit = self.config.clear_run_point();
            info!("Point target reached, run_point cleared (commit {})", commit);
            self.transition(State::Idle, ctx, out);
        }
    }

    fn safe_stop(&mut self, ctx: &ActionContext<'_>, reason: &str, out: &mut Intents) {
        let from = self.machine.current_state();
        if from != State::Idle {
            warn!("Stopping from {}: {}", from, reason);
            self.metrics.safe_stops.fetch_add(1, Ordering::Relaxed);
        }

        match self.machine.force_idle(&mut self.policy, ctx) {
            Ok(transition) => {
                self.record(transition, out);
            },
            Err(e) => {
                error!("{}", e);
                self.metrics.invalid_transitions.fetch_add(1, Ordering::Relaxed);
                out.push(MotionIntent::stop());
            },
        }
    }

    fn transition(
        &mut self,
        target: State,
        ctx: &ActionContext<'_>,
        out: &mut Intents,
    ) -> Option<ActionOutput> {
        match self.machine.attempt_transition(target, &mut self.policy, ctx) {
            Ok(transition) => self.record(transition, out),
            Err(e) => {
                error!("{}", e);
                self.metrics.invalid_transitions.fetch_add(1, Ordering::Relaxed);
                out.push(MotionIntent::stop());
                None
            },
        }
    }

    fn record(&mut self, transition: Transition, out: &mut Intents) -> Option<ActionOutput> {
        if transition.changed() {
            self.metrics.state_changes.fetch_add(1, Ordering::Relaxed);
        }
        match transition.outcome {
            Ok(output) => {
                out.push(output.intent);
                Some(output)
            },
            Err(e) => {
                warn!("{} action failed: {}", transition.to, e);
                self.metrics.action_faults.fetch_add(1, Ordering::Relaxed);
                out.push(MotionIntent::stop());
                None
            },
        }
    }
}
