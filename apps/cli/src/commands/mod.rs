//! 命令模块

pub mod check;
pub mod defaults;
pub mod run;

pub use check::CheckCommand;
pub use defaults::DefaultsCommand;
pub use run::RunCommand;

use anyhow::{Context, Result};
use std::path::Path;
use strategy_core::ConfigSnapshot;
use strategy_tools::{StrategyParams, parse_assignment};

/// 加载参数文件（未给出时使用默认值）
pub fn load_params(path: Option<&Path>) -> Result<StrategyParams> {
    match path {
        Some(path) => StrategyParams::load_from_file(path),
        None => Ok(StrategyParams::default()),
    }
}

/// 在快照上依次应用命令行 `--set key=value`
pub fn apply_overrides(mut config: ConfigSnapshot, overrides: &[String]) -> Result<ConfigSnapshot> {
    for line in overrides {
        let Some((key, value)) =
            parse_assignment(line).with_context(|| format!("Invalid override {:?}", line))?
        else {
            continue;
        };
        config = config
            .with_param(&key, &value)
            .with_context(|| format!("Rejected override {}={}", key, value))?;
    }
    Ok(config)
}
