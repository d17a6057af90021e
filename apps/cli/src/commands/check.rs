//! check 命令
//!
//! 校验参数文件和状态转移表，不启动控制循环

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use strategy_core::{State, TransitionTable};
use tracing::info;

use super::{apply_overrides, load_params};

/// 校验命令参数
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// 参数文件路径（缺省使用默认参数）
    #[arg(short, long)]
    pub params: Option<PathBuf>,

    /// 额外的参数覆盖（可重复）
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
}

impl CheckCommand {
    pub fn execute(&self) -> Result<()> {
        let params = load_params(self.params.as_deref())?;
        let config = params
            .to_snapshot()
            .context("Parameter file is inconsistent")?;
        let config = apply_overrides(config, &self.overrides)?;

        let loop_config = params.loop_settings.to_loop_config(None);
        loop_config.validate()?;

        let table = TransitionTable::standard();
        table.validate()?;

        info!("Configuration OK");
        println!("game_state     : {}", config.game_state);
        println!("our_side       : {} (opponent {})", config.our_side, config.opponent_side());
        println!("strategy_mode  : {}", config.strategy_mode);
        println!(
            "shoot          : range {} cm, angle {}°, power {}, slot {}",
            config.shoot_range, config.attack_to_shoot_angle, config.shoot_power, config.shoot_slot
        );
        println!("loop           : {} Hz", loop_config.frequency_hz);
        println!();
        println!("Transitions:");
        for from in State::ALL {
            let targets: Vec<&str> = table.targets(from).map(State::as_str).collect();
            println!("  {:<6} -> {}", from.as_str(), targets.join(", "));
        }
        Ok(())
    }
}
