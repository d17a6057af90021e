//! # 策略参数文件
//!
//! TOML 格式的参数文件，对应一份初始配置快照和控制循环设置：
//!
//! ```toml
//! [mode]
//! game_start = false
//! run_point = true
//! game_state = "Kick_Off"
//! our_side = "Yellow"
//! strategy_mode = "Defense"
//!
//! [thresholds]
//! orbit_to_attack_angle = 10.0
//! attack_to_shoot_angle = 5.0
//! shoot_range = 200.0
//!
//! [loop]
//! frequency_hz = 1000.0
//! ```
//!
//! 缺省的段和字段取 [`ConfigSnapshot::default`] 的值。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use strategy_core::LoopConfig;
use strategy_types::{ConfigError, ConfigSnapshot, GameState, Side, StrategyMode};

/// 策略参数文件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub mode: ModeParams,
    pub point: PointParams,
    pub thresholds: ThresholdParams,
    pub shoot: ShootParams,
    pub velocity: VelocityParams,
    pub ball_handle: BallHandleParams,
    #[serde(rename = "loop")]
    pub loop_settings: LoopSettings,
}

/// 模式标志
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeParams {
    pub game_start: bool,
    pub run_point: bool,
    pub game_state: String,
    pub our_side: String,
    /// 可选；给出时必须与 `our_side` 互补
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent_side: Option<String>,
    pub strategy_mode: String,
}

/// 跑点目标与容差
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointParams {
    pub run_x: f64,
    pub run_y: f64,
    pub run_yaw: f64,
    pub tolerance_distance: f64,
    pub tolerance_yaw: f64,
}

/// 状态切换阈值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    pub orbit_to_attack_angle: f64,
    pub attack_to_shoot_angle: f64,
    pub shoot_range: f64,
}

/// 射门参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShootParams {
    pub power: u8,
    pub slot: u8,
}

/// 速度边界与加速斜坡
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityParams {
    pub min: f64,
    pub max: f64,
    pub min_angular: f64,
    pub max_angular: f64,
    pub accel_ramp_secs: f64,
}

/// 持球判定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallHandleParams {
    pub distance: f64,
    pub angle: f64,
}

/// 控制循环设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    pub frequency_hz: f64,
    pub dt_clamp_multiplier: f64,
}

impl Default for ModeParams {
    fn default() -> Self {
        let d = ConfigSnapshot::default();
        Self {
            game_start: d.game_start,
            run_point: d.run_point,
            game_state: d.game_state.as_str().to_string(),
            our_side: d.our_side.as_str().to_string(),
            opponent_side: None,
            strategy_mode: d.strategy_mode.to_string(),
        }
    }
}

impl Default for PointParams {
    fn default() -> Self {
        let d = ConfigSnapshot::default();
        Self {
            run_x: d.run_x,
            run_y: d.run_y,
            run_yaw: d.run_yaw,
            tolerance_distance: d.point_tolerance_distance,
            tolerance_yaw: d.point_tolerance_yaw,
        }
    }
}

impl Default for ThresholdParams {
    fn default() -> Self {
        let d = ConfigSnapshot::default();
        Self {
            orbit_to_attack_angle: d.orbit_to_attack_angle,
            attack_to_shoot_angle: d.attack_to_shoot_angle,
            shoot_range: d.shoot_range,
        }
    }
}

impl Default for ShootParams {
    fn default() -> Self {
        let d = ConfigSnapshot::default();
        Self {
            power: d.shoot_power,
            slot: d.shoot_slot,
        }
    }
}

impl Default for VelocityParams {
    fn default() -> Self {
        let d = ConfigSnapshot::default();
        Self {
            min: d.min_velocity,
            max: d.max_velocity,
            min_angular: d.min_angular_velocity,
            max_angular: d.max_angular_velocity,
            accel_ramp_secs: d.accel_ramp_secs,
        }
    }
}

impl Default for BallHandleParams {
    fn default() -> Self {
        let d = ConfigSnapshot::default();
        Self {
            distance: d.ball_handle_distance,
            angle: d.ball_handle_angle,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        let d = LoopConfig::default();
        Self {
            frequency_hz: d.frequency_hz,
            dt_clamp_multiplier: d.dt_clamp_multiplier,
        }
    }
}

impl LoopSettings {
    pub fn to_loop_config(&self, max_iterations: Option<usize>) -> LoopConfig {
        LoopConfig {
            frequency_hz: self.frequency_hz,
            dt_clamp_multiplier: self.dt_clamp_multiplier,
            max_iterations,
        }
    }
}

impl StrategyParams {
    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse strategy parameters")
    }

    /// 从文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameter file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid parameter file {}", path.display()))
    }

    /// 保存到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("Failed to write parameter file {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize strategy parameters")
    }

    /// 由配置快照反向生成参数
    pub fn from_snapshot(config: &ConfigSnapshot, loop_config: &LoopConfig) -> Self {
        Self {
            mode: ModeParams {
                game_start: config.game_start,
                run_point: config.run_point,
                game_state: config.game_state.as_str().to_string(),
                our_side: config.our_side.as_str().to_string(),
                opponent_side: None,
                strategy_mode: config.strategy_mode.to_string(),
            },
            point: PointParams {
                run_x: config.run_x,
                run_y: config.run_y,
                run_yaw: config.run_yaw,
                tolerance_distance: config.point_tolerance_distance,
                tolerance_yaw: config.point_tolerance_yaw,
            },
            thresholds: ThresholdParams {
                orbit_to_attack_angle: config.orbit_to_attack_angle,
                attack_to_shoot_angle: config.attack_to_shoot_angle,
                shoot_range: config.shoot_range,
            },
            shoot: ShootParams {
                power: config.shoot_power,
                slot: config.shoot_slot,
            },
            velocity: VelocityParams {
                min: config.min_velocity,
                max: config.max_velocity,
                min_angular: config.min_angular_velocity,
                max_angular: config.max_angular_velocity,
                accel_ramp_secs: config.accel_ramp_secs,
            },
            ball_handle: BallHandleParams {
                distance: config.ball_handle_distance,
                angle: config.ball_handle_angle,
            },
            loop_settings: LoopSettings {
                frequency_hz: loop_config.frequency_hz,
                dt_clamp_multiplier: loop_config.dt_clamp_multiplier,
            },
        }
    }

    /// 转换为经过校验的配置快照（`commit` 为 0）
    ///
    /// # 错误
    ///
    /// - `ConfigError::InvalidValue`: 枚举字段无法识别
    /// - `ConfigError::Inconsistent`: 阵营冲突、数值越界
    pub fn to_snapshot(&self) -> Result<ConfigSnapshot, ConfigError> {
        let our_side: Side = self.mode.our_side.parse()?;
        let game_state: GameState = self.mode.game_state.parse()?;
        let strategy_mode: StrategyMode = self.mode.strategy_mode.parse()?;

        let config = ConfigSnapshot {
            commit: 0,
            game_start: self.mode.game_start,
            run_point: self.mode.run_point,
            game_state,
            our_side,
            strategy_mode,
            run_x: self.point.run_x,
            run_y: self.point.run_y,
            run_yaw: self.point.run_yaw,
            orbit_to_attack_angle: self.thresholds.orbit_to_attack_angle,
            attack_to_shoot_angle: self.thresholds.attack_to_shoot_angle,
            shoot_range: self.thresholds.shoot_range,
            shoot_power: self.shoot.power,
            shoot_slot: self.shoot.slot,
            min_velocity: self.velocity.min,
            max_velocity: self.velocity.max,
            min_angular_velocity: self.velocity.min_angular,
            max_angular_velocity: self.velocity.max_angular,
            ball_handle_distance: self.ball_handle.distance,
            ball_handle_angle: self.ball_handle.angle,
            point_tolerance_distance: self.point.tolerance_distance,
            point_tolerance_yaw: self.point.tolerance_yaw,
            accel_ramp_secs: self.velocity.accel_ramp_secs,
        };

        if let Some(opponent) = &self.mode.opponent_side {
            config.check_opponent_side(opponent.parse()?)?;
        }
        config.validate()?;
        Ok(config)
    }
}

/// 解析一条运行时补丁 `key=value`（也接受 `key value`）
///
/// 空行和 `#` 开头的注释返回 `Ok(None)`。
pub fn parse_assignment(line: &str) -> Result<Option<(String, String)>, ConfigError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (key, value) = line
        .split_once('=')
        .or_else(|| line.split_once(char::is_whitespace))
        .ok_or_else(|| ConfigError::InvalidValue {
            field: line.to_string(),
            value: String::new(),
        })?;

    let key = key.trim();
    if !ConfigSnapshot::PARAMETERS.contains(&key) {
        return Err(ConfigError::UnknownParameter(key.to_string()));
    }
    Ok(Some((key.to_string(), value.trim().to_string())))
}
