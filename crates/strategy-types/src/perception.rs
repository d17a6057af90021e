//! 感知快照定义
//!
//! 每个控制周期由感知层新产生一份，当周期内消费，不跨周期保留。

use crate::config::Side;

/// 目标未找到时的哨兵角度（度）
pub const NOT_FOUND_ANGLE: f64 = 999.0;

/// 单个目标的极坐标观测（相对机器人朝向）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectInfo {
    /// 距离（厘米）
    pub distance: f64,
    /// 方位角（度），`NOT_FOUND_ANGLE` 表示本周期未检测到
    pub angle: f64,
}

impl ObjectInfo {
    pub fn new(distance: f64, angle: f64) -> Self {
        Self { distance, angle }
    }

    /// 未检测到的目标
    pub fn not_found() -> Self {
        Self {
            distance: 0.0,
            angle: NOT_FOUND_ANGLE,
        }
    }

    pub fn is_found(&self) -> bool {
        self.angle != NOT_FOUND_ANGLE
    }
}

/// 场上目标集合：球 + 双方球门
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldObjects {
    pub ball: ObjectInfo,
    pub yellow_goal: ObjectInfo,
    pub blue_goal: ObjectInfo,
}

impl FieldObjects {
    /// 指定阵营的球门
    pub fn goal(&self, side: Side) -> ObjectInfo {
        match side {
            Side::Yellow => self.yellow_goal,
            Side::Blue => self.blue_goal,
        }
    }
}

/// 机器人自身位姿（场地坐标系，yaw 单位为度）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }
}

/// 障碍扫描（激光/全向视觉的距离环）
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanData {
    /// 各方向的距离读数
    pub ranges: Vec<f64>,
    /// 相邻读数之间的角度增量（度）
    pub angle_increment: f64,
}

/// 单周期感知快照
///
/// 控制循环在感知层返回目标信息时组装，否则整份快照缺席（`Option::None`）。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerceptionSnapshot {
    pub objects: FieldObjects,
    pub pose: Pose,
    pub obstacles: ScanData,
}

impl PerceptionSnapshot {
    pub fn ball(&self) -> ObjectInfo {
        self.objects.ball
    }

    /// 球是否被标记为未找到
    pub fn ball_missing(&self) -> bool {
        !self.objects.ball.is_found()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_sentinel() {
        let info = ObjectInfo::not_found();
        assert!(!info.is_found());
        assert_eq!(info.angle, NOT_FOUND_ANGLE);
        assert!(ObjectInfo::new(10.0, -30.0).is_found());
    }

    #[test]
    fn test_goal_lookup_by_side() {
        let objects = FieldObjects {
            ball: ObjectInfo::new(50.0, 0.0),
            yellow_goal: ObjectInfo::new(300.0, 10.0),
            blue_goal: ObjectInfo::new(150.0, -20.0),
        };
        assert_eq!(objects.goal(Side::Yellow).distance, 300.0);
        assert_eq!(objects.goal(Side::Blue).angle, -20.0);
    }
}
