//! 行为状态机
//!
//! 显式枚举的状态 + 固定转移表。每次转移都查表校验，
//! 成功后同步执行目标状态的进入动作并把结果返回给调用方。

use crate::error::{InvalidTransition, StrategyError};
use crate::policy::{ActionContext, ActionOutput, BehaviorPolicy, MotionPlanner};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, trace};

// ==================== 状态 ====================

/// 行为状态
///
/// 任一时刻恰好一个状态为当前状态，初始状态为 `Idle`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum State {
    /// 停止：零速度、执行器释放
    #[default]
    Idle,
    /// 追球
    Chase,
    /// 持球进攻
    Attack,
    /// 射门（单周期脉冲）
    Shoot,
    /// 持球绕转对准球门（也称 Movement）
    Orbit,
    /// 跑点
    Point,
}

impl State {
    pub const COUNT: usize = 6;

    pub const ALL: [State; State::COUNT] = [
        State::Idle,
        State::Chase,
        State::Attack,
        State::Shoot,
        State::Orbit,
        State::Point,
    ];

    /// 状态标识（对外发布的状态名）
    pub fn as_str(self) -> &'static str {
        match self {
            State::Idle => "Idle",
            State::Chase => "Chase",
            State::Attack => "Attack",
            State::Shoot => "Shoot",
            State::Orbit => "Orbit",
            State::Point => "Point",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" => Ok(State::Idle),
            "chase" => Ok(State::Chase),
            "attack" => Ok(State::Attack),
            "shoot" => Ok(State::Shoot),
            "orbit" | "movement" => Ok(State::Orbit),
            "point" => Ok(State::Point),
            _ => Err(format!("unknown state: {s}")),
        }
    }
}

// ==================== 转移表 ====================

/// 合法转移表
///
/// 以 `(from, to)` 为键的布尔矩阵。标准表：
///
/// | from   | to                                   |
/// |--------|--------------------------------------|
/// | Idle   | Idle, Chase, Point                   |
/// | Chase  | Chase, Idle, Attack, Orbit           |
/// | Attack | Attack, Idle, Chase, Orbit, Shoot    |
/// | Shoot  | Attack                               |
/// | Orbit  | Orbit, Idle, Chase, Attack           |
/// | Point  | Point, Idle                          |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    legal: [[bool; State::COUNT]; State::COUNT],
}

impl TransitionTable {
    const STANDARD_EDGES: &'static [(State, &'static [State])] = &[
        (State::Idle, &[State::Idle, State::Chase, State::Point]),
        (
            State::Chase,
            &[State::Chase, State::Idle, State::Attack, State::Orbit],
        ),
        (
            State::Attack,
            &[
                State::Attack,
                State::Idle,
                State::Chase,
                State::Orbit,
                State::Shoot,
            ],
        ),
        (State::Shoot, &[State::Attack]),
        (
            State::Orbit,
            &[State::Orbit, State::Idle, State::Chase, State::Attack],
        ),
        (State::Point, &[State::Point, State::Idle]),
    ];

    /// 空表（没有任何合法转移）
    pub fn empty() -> Self {
        Self {
            legal: [[false; State::COUNT]; State::COUNT],
        }
    }

    /// 标准转移表
    pub fn standard() -> Self {
        Self::from_edges(Self::STANDARD_EDGES)
    }

    pub fn from_edges(edges: &[(State, &[State])]) -> Self {
        let mut table = Self::empty();
        for (from, targets) in edges {
            for to in *targets {
                table.legal[from.index()][to.index()] = true;
            }
        }
        table
    }

    pub fn is_legal(&self, from: State, to: State) -> bool {
        self.legal[from.index()][to.index()]
    }

    /// 从 `from` 出发的全部合法目标
    pub fn targets(&self, from: State) -> impl Iterator<Item = State> + '_ {
        State::ALL.into_iter().filter(move |to| self.is_legal(from, *to))
    }

    /// 最短合法路径（广度优先），包含起点和终点
    pub fn path(&self, from: State, to: State) -> Option<SmallVec<[State; State::COUNT]>> {
        let mut previous: [Option<State>; State::COUNT] = [None; State::COUNT];
        let mut visited = [false; State::COUNT];
        let mut queue = VecDeque::with_capacity(State::COUNT);

        visited[from.index()] = true;
        queue.push_back(from);

        while let Some(state) = queue.pop_front() {
            if state == to {
                let mut path = SmallVec::new();
                let mut cursor = Some(to);
                while let Some(s) = cursor {
                    path.push(s);
                    cursor = if s == from { None } else { previous[s.index()] };
                }
                path.reverse();
                return Some(path);
            }
            for next in self.targets(state) {
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    previous[next.index()] = Some(state);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// 启动时自检
    ///
    /// - `Idle → Idle` 必须合法（停止动作可重复进入）
    /// - 每个状态都能沿合法转移回到 `Idle`
    /// - 每个状态都能从 `Idle` 到达
    pub fn validate(&self) -> Result<(), StrategyError> {
        if !self.is_legal(State::Idle, State::Idle) {
            return Err(StrategyError::InvalidTable(
                "Idle must be re-enterable".to_string(),
            ));
        }
        for state in State::ALL {
            if self.path(state, State::Idle).is_none() {
                return Err(StrategyError::InvalidTable(format!(
                    "{state} cannot reach Idle"
                )));
            }
            if self.path(State::Idle, state).is_none() {
                return Err(StrategyError::InvalidTable(format!(
                    "{state} is unreachable from Idle"
                )));
            }
        }
        Ok(())
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}

// ==================== 状态机 ====================

/// 一次成功转移的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: State,
    pub to: State,
    /// 目标状态进入动作的结果
    pub outcome: Result<ActionOutput, StrategyError>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// 行为状态机
///
/// 只由控制循环线程持有和修改。
#[derive(Debug, Clone)]
pub struct StateMachine {
    current: State,
    table: TransitionTable,
}

impl StateMachine {
    /// 使用标准转移表创建状态机（初始状态 `Idle`）
    pub fn new() -> Result<Self, StrategyError> {
        Self::with_table(TransitionTable::standard())
    }

    /// 使用自定义转移表创建状态机，创建前做自检
    pub fn with_table(table: TransitionTable) -> Result<Self, StrategyError> {
        table.validate()?;
        Ok(Self {
            current: State::Idle,
            table,
        })
    }

    pub fn current_state(&self) -> State {
        self.current
    }

    pub fn is(&self, state: State) -> bool {
        self.current == state
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// 尝试转移到 `target`
    ///
    /// # 返回
    ///
    /// - `Ok(Transition)`: 转移已提交，`outcome` 为目标状态进入动作的结果
    /// - `Err(InvalidTransition)`: 不在转移表中，状态保持不变
    pub fn attempt_transition<P: MotionPlanner>(
        &mut self,
        target: State,
        policy: &mut BehaviorPolicy<P>,
        ctx: &ActionContext<'_>,
    ) -> Result<Transition, InvalidTransition> {
        let from = self.current;
        if !self.table.is_legal(from, target) {
            return Err(InvalidTransition { from, to: target });
        }

        self.current = target;
        if from != target {
            info!("State: {} -> {}", from, target);
        } else {
            trace!("State: re-enter {}", target);
        }

        let outcome = policy.act(target, ctx);
        Ok(Transition {
            from,
            to: target,
            outcome,
        })
    }

    /// 强制回到 `Idle`
    ///
    /// 当前状态不能直接转到 `Idle` 时（如 `Shoot`），沿最短合法路径逐跳提交，
    /// 中间跳不执行进入动作，只有最终的 `Idle` 进入动作产生意图。
    pub fn force_idle<P: MotionPlanner>(
        &mut self,
        policy: &mut BehaviorPolicy<P>,
        ctx: &ActionContext<'_>,
    ) -> Result<Transition, InvalidTransition> {
        let origin = self.current;
        if !self.table.is_legal(origin, State::Idle) {
            let path = self.table.path(origin, State::Idle).ok_or(InvalidTransition {
                from: origin,
                to: State::Idle,
            })?;
            // path = [origin, hop.., Idle]，最后一跳交给 attempt_transition
            for hop in &path[1..path.len() - 1] {
                debug!("State: {} -> {} (passing through to Idle)", self.current, hop);
                self.current = *hop;
            }
        }

        let mut transition = self.attempt_transition(State::Idle, policy, ctx)?;
        transition.from = origin;
        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_is_valid() {
        assert!(TransitionTable::standard().validate().is_ok());
    }

    #[test]
    fn test_standard_table_edges() {
        let table = TransitionTable::standard();
        let expect = |from: State, targets: &[State]| {
            let actual: Vec<State> = table.targets(from).collect();
            let mut expected = targets.to_vec();
            expected.sort_by_key(|s| s.index());
            assert_eq!(actual, expected, "targets of {from}");
        };

        expect(State::Idle, &[State::Idle, State::Chase, State::Point]);
        expect(State::Chase, &[State::Idle, State::Chase, State::Attack, State::Orbit]);
        expect(
            State::Attack,
            &[State::Idle, State::Chase, State::Attack, State::Shoot, State::Orbit],
        );
        expect(State::Shoot, &[State::Attack]);
        expect(State::Orbit, &[State::Idle, State::Chase, State::Attack, State::Orbit]);
        expect(State::Point, &[State::Idle, State::Point]);
    }

    #[test]
    fn test_shortest_path_from_shoot() {
        let table = TransitionTable::standard();
        let path = table.path(State::Shoot, State::Idle).unwrap();
        assert_eq!(path.as_slice(), &[State::Shoot, State::Attack, State::Idle]);

        let path = table.path(State::Idle, State::Idle).unwrap();
        assert_eq!(path.as_slice(), &[State::Idle]);
    }

    #[test]
    fn test_validate_rejects_dead_end() {
        // Point 无法回到 Idle
        let table = TransitionTable::from_edges(&[
            (State::Idle, &[State::Idle, State::Chase, State::Point]),
            (State::Chase, &[State::Idle, State::Attack, State::Orbit]),
            (State::Attack, &[State::Idle, State::Shoot]),
            (State::Shoot, &[State::Attack]),
            (State::Orbit, &[State::Idle]),
            (State::Point, &[State::Point]),
        ]);
        assert!(matches!(
            table.validate(),
            Err(StrategyError::InvalidTable(msg)) if msg.contains("Point")
        ));
        assert!(StateMachine::with_table(table).is_err());
    }

    #[test]
    fn test_validate_rejects_non_reenterable_idle() {
        let table = TransitionTable::from_edges(&[(State::Idle, &[State::Chase])]);
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_state_parsing() {
        assert_eq!("movement".parse::<State>().unwrap(), State::Orbit);
        assert_eq!("Orbit".parse::<State>().unwrap(), State::Orbit);
        for state in State::ALL {
            assert_eq!(state.as_str().parse::<State>().unwrap(), state);
        }
        assert!("dance".parse::<State>().is_err());
    }

    #[test]
    fn test_initial_state_is_idle() {
        let machine = StateMachine::new().unwrap();
        assert_eq!(machine.current_state(), State::Idle);
        assert!(machine.is(State::Idle));
    }
}
