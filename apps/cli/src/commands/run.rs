//! run 命令
//!
//! 在仿真场地上以固定频率运行控制循环。
//!
//! 线程划分：
//!
//! - 主线程：控制循环（唯一持有状态机和行为策略）
//! - 配置线程：从 stdin 逐行读取 `key=value`，经 [`ConfigUpdater`] 发布
//! - 监视线程：从有界状态通道读取当前状态，记录状态变化

use anyhow::{Context, Result};
use clap::Args;
use crossbeam_channel::Receiver;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use strategy_core::{ChannelStatusSink, ConfigChannel, ConfigUpdater, ControlLoop, Pose, State};
use strategy_tools::{ReferencePlanner, SimField, SimWorld, parse_assignment};
use tracing::{debug, info, warn};

use super::{apply_overrides, load_params};

/// 状态通道容量
const STATUS_CAPACITY: usize = 256;

/// 运行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 参数文件路径（缺省使用默认参数）
    #[arg(short, long)]
    pub params: Option<PathBuf>,

    /// 启动前的参数覆盖（可重复）
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// 控制频率（Hz，覆盖参数文件）
    #[arg(short, long)]
    pub frequency: Option<f64>,

    /// 运行的周期数（缺省一直运行到 Ctrl+C）
    #[arg(short, long)]
    pub cycles: Option<usize>,

    /// 不从 stdin 读取运行时补丁
    #[arg(long)]
    pub no_stdin: bool,

    /// 机器人初始位姿 x,y,yaw
    #[arg(long, value_parser = parse_triple, default_value = "0,0,0")]
    pub start: (f64, f64, f64),

    /// 球的初始位置 x,y
    #[arg(long, value_parser = parse_pair, default_value = "100,0")]
    pub ball: (f64, f64),
}

impl RunCommand {
    pub fn execute(&self) -> Result<()> {
        let params = load_params(self.params.as_deref())?;
        let config = params
            .to_snapshot()
            .context("Parameter file is inconsistent")?;
        let config = apply_overrides(config, &self.overrides)?;

        let mut loop_config = params.loop_settings.to_loop_config(self.cycles);
        if let Some(frequency) = self.frequency {
            loop_config.frequency_hz = frequency;
        }

        let channel = ConfigChannel::new(config)?;
        let updater = channel.updater();

        let (x, y, yaw) = self.start;
        let field = SimField::new(SimWorld::new(Pose::new(x, y, yaw), self.ball));

        let (status, status_rx) = ChannelStatusSink::bounded(STATUS_CAPACITY);
        let mut control = ControlLoop::new(
            ReferencePlanner::default(),
            field.perception(),
            field.actuation(),
            channel,
        )?
        .with_status_sink(status);

        // Ctrl+C → 停止标志
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::Release);
        })
        .context("Failed to install Ctrl+C handler")?;

        let monitor = thread::Builder::new()
            .name("strategy-monitor".to_string())
            .spawn(move || monitor_states(status_rx))
            .context("Failed to spawn monitor thread")?;

        if !self.no_stdin {
            // stdin 读取会阻塞，线程随进程退出
            thread::Builder::new()
                .name("strategy-config".to_string())
                .spawn(move || {
                    read_patches(std::io::stdin().lock(), updater);
                })
                .context("Failed to spawn config thread")?;
            println!("💡 输入 key=value 修改参数，按 Ctrl+C 停止");
        }

        let metrics = control.run(&loop_config, &running)?;
        let final_state = control.current_state();
        drop(control);

        let state_changes = monitor.join().unwrap_or(0);
        let world = field.snapshot();

        println!();
        println!("📊 运行结果:");
        println!("  周期数: {}", metrics.cycles);
        println!("  状态切换: {} (监视线程观测到 {})", metrics.state_changes, state_changes);
        println!("  强制停止: {}", metrics.safe_stops);
        println!("  动作失败: {}", metrics.action_faults);
        println!("  非法转移: {}", metrics.invalid_transitions);
        println!("  周期超时: {}", metrics.overruns);
        println!("  最终状态: {}", final_state);
        println!(
            "  机器人位姿: ({:.1}, {:.1}, {:.1}°)，射门 {} 次",
            world.pose.x, world.pose.y, world.pose.yaw, world.kicks
        );

        if metrics.invalid_transitions > 0 {
            warn!("Guard logic requested {} illegal transitions", metrics.invalid_transitions);
        }
        Ok(())
    }
}

/// 记录状态变化，返回观测到的变化次数；发布端关闭后退出
fn monitor_states(rx: Receiver<State>) -> u64 {
    let mut last = None;
    let mut changes = 0;
    for state in rx.iter() {
        if last != Some(state) {
            if let Some(previous) = last {
                info!("State {} -> {}", previous, state);
                changes += 1;
            }
            last = Some(state);
        }
    }
    changes
}

/// 逐行读取 `key=value` 补丁并发布，返回被接受的补丁数
fn read_patches(input: impl BufRead, updater: ConfigUpdater) -> usize {
    let mut accepted = 0;
    for line in input.lines() {
        let Ok(line) = line else {
            break;
        };
        match parse_assignment(&line) {
            Ok(Some((key, value))) => {
                // 拒绝原因已由 ConfigUpdater 以 warn 级别记录
                if let Err(e) = updater.apply(&key, &value) {
                    debug!("Patch {}={} rejected: {}", key, value, e);
                } else {
                    accepted += 1;
                }
            },
            Ok(None) => {},
            Err(e) => warn!("Ignored input {:?}: {}", line, e),
        }
    }
    accepted
}

fn parse_numbers(s: &str, expected: usize) -> Result<Vec<f64>, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{:?}: {}", v, e)))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != expected {
        return Err(format!("expected {} comma-separated numbers, got {}", expected, values.len()));
    }
    Ok(values)
}

fn parse_triple(s: &str) -> Result<(f64, f64, f64), String> {
    let v = parse_numbers(s, 3)?;
    Ok((v[0], v[1], v[2]))
}

fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let v = parse_numbers(s, 2)?;
    Ok((v[0], v[1]))
}
