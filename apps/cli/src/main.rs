//! # Strategy CLI
//!
//! 足球机器人策略核心的命令行入口。
//!
//! ```bash
//! # 生成默认参数文件
//! strategy-cli defaults --output strategy.toml
//!
//! # 检查参数文件与转移表
//! strategy-cli check --params strategy.toml
//!
//! # 在仿真场地上运行控制循环，stdin 逐行接受 key=value 补丁
//! strategy-cli run --params strategy.toml --set game_start=true
//! ```
//!
//! 日志级别由 `RUST_LOG` 控制，默认 `strategy_cli=info,strategy_core=info`。

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{CheckCommand, DefaultsCommand, RunCommand};

/// Strategy CLI - 行为仲裁核心命令行工具
#[derive(Parser, Debug)]
#[command(name = "strategy-cli")]
#[command(about = "Run and inspect the soccer robot strategy core", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 在仿真场地上运行控制循环
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 校验参数文件和转移表
    Check {
        #[command(flatten)]
        args: CheckCommand,
    },

    /// 输出默认参数文件
    Defaults {
        #[command(flatten)]
        args: DefaultsCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("strategy_cli=info,strategy_core=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { args } => args.execute(),
        Commands::Check { args } => args.execute(),
        Commands::Defaults { args } => args.execute(),
    }
}
