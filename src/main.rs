use anyhow::Result;
use clap::Parser;
use rust_qingli_lib::commands;
use rust_qingli_lib::modules::common::{config::AppConfig, logging};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "rust-qingli")]
#[command(about = "安全清理命令行工具", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// 配置文件路径
    #[arg(short, long, global = true, env = "RUST_QINGLI_CONFIG")]
    config: Option<PathBuf>,

    /// 详细输出模式
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // guard 存活到进程结束，文件日志才能完整写出
    let guard = logging::init_logging(cli.verbose);

    let result = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => cli.command.execute(&config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        if cli.verbose {
            tracing::error!("错误: {:#}", e);
        } else {
            eprintln!("错误: {:#}", e);
        }
        drop(guard);
        process::exit(1);
    }

    Ok(())
}
