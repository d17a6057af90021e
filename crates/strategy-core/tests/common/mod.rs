//! 集成测试共享工具：脚本化感知、记录型执行层、可识别输出的规划器

#![allow(dead_code)]

use std::time::Duration;
use strategy_core::{
    ActuatorCommand, Actuation, ConfigChannel, ConfigSnapshot, ControlLoop, CycleReport, FieldObjects,
    MotionIntent, MotionPlanner, ObjectInfo, Perception, PointApproach, Pose, ScanData, Velocity,
};

// ==================== 规划器 ====================

/// 每个算法输出一个可识别的固定速度，跑点按误差比例输出
#[derive(Debug, Clone, Copy, Default)]
pub struct TestPlanner;

pub const ROUNDING: Velocity = Velocity::new(10.0, 0.0, 1.0);
pub const STRAIGHT: Velocity = Velocity::new(20.0, 0.0, 2.0);
pub const ATTACKING: Velocity = Velocity::new(30.0, 0.0, 3.0);
pub const ORBIT: Velocity = Velocity::new(0.0, 5.0, 4.0);

impl MotionPlanner for TestPlanner {
    fn classic_rounding(&self, _opponent_bearing: f64, _ball: ObjectInfo) -> Velocity {
        ROUNDING
    }

    fn straight_forward(&self, _ball: ObjectInfo) -> Velocity {
        STRAIGHT
    }

    fn classic_attacking(&self, _goal: ObjectInfo, _obstacles: &ScanData) -> Velocity {
        ATTACKING
    }

    fn orbit(&self, _opponent_bearing: f64) -> Velocity {
        ORBIT
    }

    fn go_to_point(&self, pose: Pose, target: Pose) -> PointApproach {
        let dx = target.x - pose.x;
        let dy = target.y - pose.y;
        let dyaw = target.yaw - pose.yaw;
        PointApproach {
            velocity: Velocity::new(dx, dy, dyaw),
            remaining_distance: dx.hypot(dy),
            remaining_yaw: dyaw,
        }
    }
}

// ==================== 感知 ====================

/// 由测试直接设置的感知层
pub struct ScriptedPerception {
    pub objects: Option<FieldObjects>,
    pub pose: Pose,
    pub obstacles: ScanData,
    /// 每次读取目标时调用（用于在周期中途触发配置发布）
    pub on_sense: Option<Box<dyn FnMut() + Send>>,
    pub reads: usize,
}

impl ScriptedPerception {
    pub fn new(objects: Option<FieldObjects>) -> Self {
        Self {
            objects,
            pose: Pose::default(),
            obstacles: ScanData::default(),
            on_sense: None,
            reads: 0,
        }
    }
}

impl Perception for ScriptedPerception {
    fn objects(&mut self) -> Option<FieldObjects> {
        self.reads += 1;
        if let Some(hook) = self.on_sense.as_mut() {
            hook();
        }
        self.objects
    }

    fn self_pose(&mut self) -> Pose {
        self.pose
    }

    fn obstacles(&mut self) -> ScanData {
        self.obstacles.clone()
    }
}

// ==================== 执行 ====================

/// 按顺序记录收到的全部意图
#[derive(Debug, Default)]
pub struct RecordingActuation {
    pub intents: Vec<MotionIntent>,
    pub motions: Vec<(Velocity, bool)>,
    pub shots: Vec<(u8, u8)>,
}

impl RecordingActuation {
    pub fn last(&self) -> Option<&MotionIntent> {
        self.intents.last()
    }
}

impl Actuation for RecordingActuation {
    fn command_motion(&mut self, velocity: Velocity, rotate_enable: bool) {
        self.motions.push((velocity, rotate_enable));
    }

    fn command_shoot(&mut self, power: u8, slot: u8) {
        self.shots.push((power, slot));
    }

    fn apply(&mut self, intent: &MotionIntent) {
        self.intents.push(*intent);
        self.command_motion(intent.velocity, intent.rotate_enable);
        if let Some(ActuatorCommand::Shoot { power, slot }) = intent.actuator {
            self.command_shoot(power, slot);
        }
    }
}

// ==================== 场景构造 ====================

pub type TestLoop = ControlLoop<TestPlanner, ScriptedPerception, RecordingActuation>;

/// 远处可见、未持有的球
pub fn far_ball() -> ObjectInfo {
    ObjectInfo::new(120.0, 30.0)
}

/// 位于持球区内的球
pub fn held_ball() -> ObjectInfo {
    ObjectInfo::new(20.0, 0.0)
}

/// 场上目标（本方默认 Yellow，对方球门为蓝门）
pub fn field(ball: ObjectInfo, blue_goal: ObjectInfo) -> FieldObjects {
    FieldObjects {
        ball,
        yellow_goal: ObjectInfo::new(450.0, 175.0),
        blue_goal,
    }
}

/// 对方球门在侧方，不满足绕转或射门条件
pub fn side_goal() -> ObjectInfo {
    ObjectInfo::new(300.0, 60.0)
}

/// 对方球门在正前方射程内
pub fn open_goal() -> ObjectInfo {
    ObjectInfo::new(150.0, 2.0)
}

/// 默认配置，关闭加速斜坡以便直接断言速度
pub fn config(edit: impl FnOnce(&mut ConfigSnapshot)) -> ConfigSnapshot {
    let mut config = ConfigSnapshot {
        accel_ramp_secs: 0.0,
        ..ConfigSnapshot::default()
    };
    edit(&mut config);
    config
}

pub fn make_loop(config: ConfigSnapshot, objects: Option<FieldObjects>) -> TestLoop {
    let channel = ConfigChannel::new(config).expect("valid test configuration");
    ControlLoop::new(
        TestPlanner,
        ScriptedPerception::new(objects),
        RecordingActuation::default(),
        channel,
    )
    .expect("standard transition table")
}

/// 执行一个周期，时间按周期序号以毫秒递增
pub fn tick(control: &mut TestLoop) -> CycleReport {
    let cycles = control.metrics().snapshot().cycles;
    control.cycle(Duration::from_millis(cycles))
}

pub fn set_objects(control: &mut TestLoop, objects: Option<FieldObjects>) {
    control.perception_mut().objects = objects;
}

pub fn publish(control: &TestLoop, key: &str, value: &str) {
    control
        .config()
        .updater()
        .apply(key, value)
        .expect("valid configuration update");
}
