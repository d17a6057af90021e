//! defaults 命令

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use strategy_tools::StrategyParams;

/// 输出默认参数文件
#[derive(Args, Debug)]
pub struct DefaultsCommand {
    /// 写入文件（缺省输出到 stdout）
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl DefaultsCommand {
    pub fn execute(&self) -> Result<()> {
        let params = StrategyParams::default();
        match &self.output {
            Some(path) => {
                params.save_to_file(path)?;
                println!("✅ 默认参数已写入 {}", path.display());
            },
            None => print!("{}", params.to_toml_string()?),
        }
        Ok(())
    }
}
