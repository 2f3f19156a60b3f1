// apps/bt_cli/src/main.rs

//! BoxTracer 命令行界面
//!
//! `run` 推进输运模拟并输出质量收支，`validate` 只校验配置与几何文件。
//!
//! 日志过滤优先取 `RUST_LOG`，否则使用 `--log` 给出的过滤指令，
//! 例如 `info,bt_physics=debug`。内核库经 `log` 门面输出，同样受其控制。

mod commands;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// 默认日志过滤指令
const DEFAULT_FILTER: &str = "info";

/// BoxTracer 箱式分层示踪剂输运命令行工具
#[derive(Parser)]
#[command(name = "bt_cli", version, about = "Box-and-layer tracer transport engine")]
struct Cli {
    /// 日志过滤指令，RUST_LOG 已设置时忽略
    #[arg(short, long = "log", global = true, default_value = DEFAULT_FILTER)]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行输运模拟
    Run(commands::run::RunArgs),
    /// 校验配置与几何文件
    Validate(commands::validate::ValidateArgs),
}

/// 构造日志过滤器，指令无法解析时退回默认值
fn log_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn init_logging(directive: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directive))
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("日志初始化失败: {e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    }
}
