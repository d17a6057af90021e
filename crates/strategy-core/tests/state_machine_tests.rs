//! 状态机与转移表集成测试

mod common;

use common::TestPlanner;
use proptest::prelude::*;
use std::time::Duration;
use strategy_core::{
    ActionContext, BehaviorPolicy, ConfigSnapshot, FieldObjects, InvalidTransition, ObjectInfo,
    PerceptionSnapshot, Pose, ScanData, State, StateMachine, TransitionTable,
};

fn perception() -> PerceptionSnapshot {
    PerceptionSnapshot {
        objects: FieldObjects {
            ball: ObjectInfo::new(40.0, 5.0),
            yellow_goal: ObjectInfo::new(400.0, 170.0),
            blue_goal: ObjectInfo::new(200.0, 10.0),
        },
        pose: Pose::default(),
        obstacles: ScanData::default(),
    }
}

/// 沿最短合法路径把状态机推到 `target`
fn walk_to(
    machine: &mut StateMachine,
    policy: &mut BehaviorPolicy<TestPlanner>,
    ctx: &ActionContext<'_>,
    target: State,
) {
    let path = machine
        .table()
        .path(machine.current_state(), target)
        .expect("every state is reachable from Idle");
    for hop in path.iter().skip(1) {
        machine.attempt_transition(*hop, policy, ctx).unwrap();
    }
    assert_eq!(machine.current_state(), target);
}

#[test]
fn test_every_illegal_pair_is_rejected_without_state_change() {
    let p = perception();
    let config = ConfigSnapshot::default();
    let ctx = ActionContext::new(Some(&p), &config, Duration::ZERO);
    let table = TransitionTable::standard();

    let mut rejected = 0;
    for from in State::ALL {
        for to in State::ALL {
            if table.is_legal(from, to) {
                continue;
            }
            let mut machine = StateMachine::new().unwrap();
            let mut policy = BehaviorPolicy::new(TestPlanner);
            walk_to(&mut machine, &mut policy, &ctx, from);

            let err = machine.attempt_transition(to, &mut policy, &ctx).unwrap_err();
            assert_eq!(err, InvalidTransition { from, to });
            assert_eq!(machine.current_state(), from, "{from} -> {to} changed state");
            rejected += 1;
        }
    }
    // 36 个有序对中 19 个合法
    assert_eq!(rejected, 17);
}

#[test]
fn test_shoot_only_returns_to_attack() {
    let p = perception();
    let config = ConfigSnapshot::default();
    let ctx = ActionContext::new(Some(&p), &config, Duration::ZERO);
    let mut machine = StateMachine::new().unwrap();
    let mut policy = BehaviorPolicy::new(TestPlanner);
    walk_to(&mut machine, &mut policy, &ctx, State::Shoot);

    for target in [State::Idle, State::Chase, State::Orbit, State::Point, State::Shoot] {
        assert!(machine.attempt_transition(target, &mut policy, &ctx).is_err());
    }
    let transition = machine.attempt_transition(State::Attack, &mut policy, &ctx).unwrap();
    assert!(transition.changed());
    assert!(transition.outcome.is_ok());
}

#[test]
fn test_force_idle_reports_origin() {
    let p = perception();
    let config = ConfigSnapshot::default();
    let ctx = ActionContext::new(Some(&p), &config, Duration::ZERO);

    for origin in State::ALL {
        let mut machine = StateMachine::new().unwrap();
        let mut policy = BehaviorPolicy::new(TestPlanner);
        walk_to(&mut machine, &mut policy, &ctx, origin);

        let transition = machine.force_idle(&mut policy, &ctx).unwrap();
        assert_eq!(transition.from, origin);
        assert_eq!(transition.to, State::Idle);
        assert!(transition.outcome.unwrap().intent.is_stop());
        assert!(machine.is(State::Idle));
        assert_eq!(policy.ramp_anchor(), None);
    }
}

#[test]
fn test_state_names_roundtrip() {
    for state in State::ALL {
        assert_eq!(state.to_string().parse::<State>().unwrap(), state);
    }
    assert_eq!("movement".parse::<State>().unwrap(), State::Orbit);
    assert!("dribble".parse::<State>().is_err());
}

fn state() -> impl Strategy<Value = State> {
    (0..State::COUNT).prop_map(|i| State::ALL[i])
}

proptest! {
    /// 任意请求序列下，状态只沿转移表移动，被拒绝的请求不改变状态
    #[test]
    fn prop_machine_follows_table(targets in prop::collection::vec(state(), 1..64)) {
        let p = perception();
        let config = ConfigSnapshot::default();
        let ctx = ActionContext::new(Some(&p), &config, Duration::ZERO);
        let table = TransitionTable::standard();
        let mut machine = StateMachine::new().unwrap();
        let mut policy = BehaviorPolicy::new(TestPlanner);

        for target in targets {
            let before = machine.current_state();
            match machine.attempt_transition(target, &mut policy, &ctx) {
                Ok(transition) => {
                    prop_assert!(table.is_legal(before, target));
                    prop_assert_eq!(transition.from, before);
                    prop_assert_eq!(machine.current_state(), target);
                },
                Err(err) => {
                    prop_assert!(!table.is_legal(before, target));
                    prop_assert_eq!(err, InvalidTransition { from: before, to: target });
                    prop_assert_eq!(machine.current_state(), before);
                },
            }
        }

        // 从任何位置都能回到 Idle
        let transition = machine.force_idle(&mut policy, &ctx).unwrap();
        prop_assert_eq!(transition.to, State::Idle);
    }

    /// 任意两个状态之间的最短路径每一跳都合法
    #[test]
    fn prop_paths_use_legal_edges(from in state(), to in state()) {
        let table = TransitionTable::standard();
        let path = table.path(from, to).unwrap();
        prop_assert_eq!(path.first().copied(), Some(from));
        prop_assert_eq!(path.last().copied(), Some(to));
        for pair in path.windows(2) {
            prop_assert!(table.is_legal(pair[0], pair[1]));
        }
    }
}
