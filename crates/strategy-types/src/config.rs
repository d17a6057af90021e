//! 配置快照定义
//!
//! 包含一个控制周期内使用的全部可调参数和模式标志。
//! 快照由配置通道整体发布，控制循环每周期读取一次。

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// 错误类型
// ============================================================================

/// 配置错误
///
/// 在配置边界（参数文件、运行时补丁、通道发布）被拒绝，
/// 不会部分应用到已发布的快照上。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 配置内部不一致（如双方阵营相同、上下界颠倒）
    #[error("Configuration inconsistent: {reason}")]
    Inconsistent { reason: String },

    /// 未知参数名
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// 参数值无法解析
    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: String, value: String },
}

impl ConfigError {
    fn inconsistent(reason: impl Into<String>) -> Self {
        ConfigError::Inconsistent {
            reason: reason.into(),
        }
    }

    fn invalid(field: &str, value: &str) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

// ============================================================================
// 枚举参数
// ============================================================================

/// 场地阵营（以球门颜色区分）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    /// 黄方（开球点位于负 x 半场）
    #[default]
    Yellow,
    /// 蓝方
    Blue,
}

impl Side {
    /// 对方阵营
    ///
    /// 对方阵营永远由本方阵营推导，不能单独设置。
    pub fn opposite(self) -> Self {
        match self {
            Side::Yellow => Side::Blue,
            Side::Blue => Side::Yellow,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Yellow => "Yellow",
            Side::Blue => "Blue",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yellow" => Ok(Side::Yellow),
            "blue" => Ok(Side::Blue),
            _ => Err(ConfigError::invalid("side", s)),
        }
    }
}

/// 比赛状态（裁判盒下发的定位球类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GameState {
    #[default]
    KickOff,
    FreeKick,
    FreeBall,
    ThrowIn,
    CornerKick,
    PenaltyKick,
    /// 跑到配置中指定的点 `(run_x, run_y, run_yaw)`
    RunSpecificPoint,
    /// 未识别的比赛状态，点位行为中视为错误
    Unknown,
}

impl GameState {
    pub const ALL: [GameState; 8] = [
        GameState::KickOff,
        GameState::FreeKick,
        GameState::FreeBall,
        GameState::ThrowIn,
        GameState::CornerKick,
        GameState::PenaltyKick,
        GameState::RunSpecificPoint,
        GameState::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GameState::KickOff => "Kick_Off",
            GameState::FreeKick => "Free_Kick",
            GameState::FreeBall => "Free_Ball",
            GameState::ThrowIn => "Throw_In",
            GameState::CornerKick => "Corner_Kick",
            GameState::PenaltyKick => "Penalty_Kick",
            GameState::RunSpecificPoint => "Run_Specific_Point",
            GameState::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameState {
    type Err = ConfigError;

    /// 接受 `Kick_Off` / `KickOff` / `kick-off` 等写法（忽略大小写和分隔符）
    ///
    /// 裁判盒历史上使用的拼写 `Coner_Kick` 也被接受。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "kickoff" => Ok(GameState::KickOff),
            "freekick" => Ok(GameState::FreeKick),
            "freeball" => Ok(GameState::FreeBall),
            "throwin" => Ok(GameState::ThrowIn),
            "cornerkick" | "conerkick" => Ok(GameState::CornerKick),
            "penaltykick" => Ok(GameState::PenaltyKick),
            "runspecificpoint" => Ok(GameState::RunSpecificPoint),
            "unknown" => Ok(GameState::Unknown),
            _ => Err(ConfigError::invalid("game_state", s)),
        }
    }
}

/// 策略模式
///
/// 决定追球子算法，以及持球后进入 `Attack` 还是 `Orbit`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrategyMode {
    /// 防守：绕球拦截轨迹，持球后直接进攻
    #[default]
    Defense,
    /// 进攻：直线逼近，持球后先绕转对准球门
    Attack,
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyMode::Defense => f.write_str("Defense"),
            StrategyMode::Attack => f.write_str("Attack"),
        }
    }
}

impl FromStr for StrategyMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "defense" => Ok(StrategyMode::Defense),
            "attack" => Ok(StrategyMode::Attack),
            _ => Err(ConfigError::invalid("strategy_mode", s)),
        }
    }
}

// ============================================================================
// 配置快照
// ============================================================================

/// 配置快照（单周期内的全部可调参数）
///
/// 角度单位为度，距离单位为厘米，与感知层一致。
///
/// # 不变性
///
/// - 发布后只读，更新时构造新快照整体替换（见 [`ConfigSnapshot::with_param`]）
/// - 对方阵营不存储，始终由 [`ConfigSnapshot::opponent_side`] 推导
/// - `commit` 由配置通道在发布时分配
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigSnapshot {
    /// 发布序号（初始快照为 0）
    pub commit: u64,

    // === 模式标志 ===
    pub game_start: bool,
    pub run_point: bool,
    pub game_state: GameState,
    pub our_side: Side,
    pub strategy_mode: StrategyMode,

    // === 指定点位（RunSpecificPoint） ===
    pub run_x: f64,
    pub run_y: f64,
    pub run_yaw: f64,

    // === 状态切换阈值 ===
    /// 绕转 → 进攻：对方球门方位绝对值小于此角度（度）
    pub orbit_to_attack_angle: f64,
    /// 进攻 → 射门：对方球门方位绝对值小于此角度（度）
    pub attack_to_shoot_angle: f64,
    /// 进攻 → 射门：对方球门距离小于此值（厘米）
    pub shoot_range: f64,

    // === 射门参数（原样透传给执行器） ===
    pub shoot_power: u8,
    pub shoot_slot: u8,

    // === 速度边界 ===
    pub min_velocity: f64,
    pub max_velocity: f64,
    pub min_angular_velocity: f64,
    pub max_angular_velocity: f64,

    // === 持球判定 ===
    pub ball_handle_distance: f64,
    pub ball_handle_angle: f64,

    // === 到点容差 ===
    pub point_tolerance_distance: f64,
    pub point_tolerance_yaw: f64,

    /// 加速斜坡时长（秒），0 表示不做斜坡
    pub accel_ramp_secs: f64,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            commit: 0,
            game_start: false,
            run_point: false,
            game_state: GameState::KickOff,
            our_side: Side::Yellow,
            strategy_mode: StrategyMode::Defense,
            run_x: 0.0,
            run_y: 0.0,
            run_yaw: 0.0,
            orbit_to_attack_angle: 10.0,
            attack_to_shoot_angle: 5.0,
            shoot_range: 200.0,
            shoot_power: 3,
            shoot_slot: 1,
            min_velocity: 0.0,
            max_velocity: 100.0,
            min_angular_velocity: 0.0,
            max_angular_velocity: 144.0,
            ball_handle_distance: 37.0,
            ball_handle_angle: 15.0,
            point_tolerance_distance: 5.0,
            point_tolerance_yaw: 5.0,
            accel_ramp_secs: 0.5,
        }
    }
}

impl ConfigSnapshot {
    /// 全部可通过 [`ConfigSnapshot::with_param`] 设置的参数名
    pub const PARAMETERS: &'static [&'static str] = &[
        "game_start",
        "run_point",
        "game_state",
        "our_side",
        "opponent_side",
        "strategy_mode",
        "run_x",
        "run_y",
        "run_yaw",
        "orbit_to_attack_angle",
        "attack_to_shoot_angle",
        "shoot_range",
        "shoot_power",
        "shoot_slot",
        "min_velocity",
        "max_velocity",
        "min_angular_velocity",
        "max_angular_velocity",
        "ball_handle_distance",
        "ball_handle_angle",
        "point_tolerance_distance",
        "point_tolerance_yaw",
        "accel_ramp_secs",
    ];

    /// 对方阵营（由本方阵营推导）
    pub fn opponent_side(&self) -> Side {
        self.our_side.opposite()
    }

    /// 是否有任何指令处于激活状态（比赛开始或跑点请求）
    pub fn has_directive(&self) -> bool {
        self.game_start || self.run_point
    }

    /// 校验快照的一致性
    ///
    /// # 错误
    ///
    /// - `ConfigError::Inconsistent`: 数值非有限、阈值为负、速度上下界颠倒
    pub fn validate(&self) -> Result<(), ConfigError> {
        let numeric = [
            ("run_x", self.run_x),
            ("run_y", self.run_y),
            ("run_yaw", self.run_yaw),
            ("orbit_to_attack_angle", self.orbit_to_attack_angle),
            ("attack_to_shoot_angle", self.attack_to_shoot_angle),
            ("shoot_range", self.shoot_range),
            ("min_velocity", self.min_velocity),
            ("max_velocity", self.max_velocity),
            ("min_angular_velocity", self.min_angular_velocity),
            ("max_angular_velocity", self.max_angular_velocity),
            ("ball_handle_distance", self.ball_handle_distance),
            ("ball_handle_angle", self.ball_handle_angle),
            ("point_tolerance_distance", self.point_tolerance_distance),
            ("point_tolerance_yaw", self.point_tolerance_yaw),
            ("accel_ramp_secs", self.accel_ramp_secs),
        ];

        for (name, value) in numeric {
            if !value.is_finite() {
                return Err(ConfigError::inconsistent(format!("{name} is not finite ({value})")));
            }
        }

        // 坐标允许为负，其余参数均为非负量
        for (name, value) in numeric.iter().skip(3) {
            if *value < 0.0 {
                return Err(ConfigError::inconsistent(format!("{name} is negative ({value})")));
            }
        }

        if self.min_velocity > self.max_velocity {
            return Err(ConfigError::inconsistent(format!(
                "min_velocity ({}) > max_velocity ({})",
                self.min_velocity, self.max_velocity
            )));
        }
        if self.min_angular_velocity > self.max_angular_velocity {
            return Err(ConfigError::inconsistent(format!(
                "min_angular_velocity ({}) > max_angular_velocity ({})",
                self.min_angular_velocity, self.max_angular_velocity
            )));
        }

        Ok(())
    }

    /// 检查显式给出的对方阵营是否与本方阵营互补
    pub fn check_opponent_side(&self, opponent: Side) -> Result<(), ConfigError> {
        if opponent == self.our_side {
            return Err(ConfigError::inconsistent(format!(
                "opponent_side ({opponent}) must differ from our_side ({})",
                self.our_side
            )));
        }
        Ok(())
    }

    /// 设置单个参数，返回新的快照（原快照不变）
    ///
    /// 新快照经过 [`validate`](Self::validate) 校验；任何错误都意味着整个更新被拒绝。
    /// `commit` 不变，由配置通道在发布时重新分配。
    ///
    /// # 示例
    ///
    /// ```
    /// use strategy_types::{ConfigSnapshot, Side};
    ///
    /// let base = ConfigSnapshot::default();
    /// let next = base.with_param("our_side", "Blue").unwrap();
    /// assert_eq!(next.opponent_side(), Side::Yellow);
    /// assert_eq!(base.our_side, Side::Yellow);
    /// ```
    pub fn with_param(&self, key: &str, value: &str) -> Result<ConfigSnapshot, ConfigError> {
        let mut next = self.clone();
        let value = value.trim();

        match key.trim() {
            "game_start" => next.game_start = parse_bool(key, value)?,
            "run_point" => next.run_point = parse_bool(key, value)?,
            "game_state" => next.game_state = value.parse()?,
            "our_side" => next.our_side = value.parse()?,
            "opponent_side" => {
                // 只接受与当前本方阵营互补的值
                let opponent: Side = value.parse()?;
                next.check_opponent_side(opponent)?;
            },
            "strategy_mode" => next.strategy_mode = value.parse()?,
            "run_x" => next.run_x = parse_f64(key, value)?,
            "run_y" => next.run_y = parse_f64(key, value)?,
            "run_yaw" => next.run_yaw = parse_f64(key, value)?,
            "orbit_to_attack_angle" => next.orbit_to_attack_angle = parse_f64(key, value)?,
            "attack_to_shoot_angle" => next.attack_to_shoot_angle = parse_f64(key, value)?,
            "shoot_range" => next.shoot_range = parse_f64(key, value)?,
            "shoot_power" => next.shoot_power = parse_u8(key, value)?,
            "shoot_slot" => next.shoot_slot = parse_u8(key, value)?,
            "min_velocity" => next.min_velocity = parse_f64(key, value)?,
            "max_velocity" => next.max_velocity = parse_f64(key, value)?,
            "min_angular_velocity" => next.min_angular_velocity = parse_f64(key, value)?,
            "max_angular_velocity" => next.max_angular_velocity = parse_f64(key, value)?,
            "ball_handle_distance" => next.ball_handle_distance = parse_f64(key, value)?,
            "ball_handle_angle" => next.ball_handle_angle = parse_f64(key, value)?,
            "point_tolerance_distance" => next.point_tolerance_distance = parse_f64(key, value)?,
            "point_tolerance_yaw" => next.point_tolerance_yaw = parse_f64(key, value)?,
            "accel_ramp_secs" => next.accel_ramp_secs = parse_f64(key, value)?,
            other => return Err(ConfigError::UnknownParameter(other.to_string())),
        }

        next.validate()?;
        Ok(next)
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(field, value)),
    }
}

fn parse_f64(field: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::invalid(field, value))
}

fn parse_u8(field: &str, value: &str) -> Result<u8, ConfigError> {
    value.parse::<u8>().map_err(|_| ConfigError::invalid(field, value))
}
