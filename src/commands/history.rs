use crate::modules::common::config::AppConfig;
use crate::modules::common::utils::format_size;
use crate::modules::session::retention;
use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct HistoryCommand {
    /// 显示指定会话的完整日志
    #[arg(long)]
    pub show: Option<String>,
}

pub async fn execute(cmd: HistoryCommand, config: &AppConfig) -> Result<()> {
    let dir = &config.log_dir;

    if !dir.exists() {
        println!("暂无会话日志 ({})", dir.display());
        return Ok(());
    }

    let logs = retention::list_logs(dir)?;

    if let Some(id) = cmd.show {
        let Some(log) = logs.iter().find(|l| l.session_id == id) else {
            anyhow::bail!("未找到会话: {}", id);
        };
        print!("{}", std::fs::read_to_string(&log.path)?);
        return Ok(());
    }

    println!("会话日志目录: {}\n", dir.display());
    for log in &logs {
        println!("  {}  ({})", log.session_id, format_size(log.size));
    }
    println!("\n共 {} 个会话 (保留 {} 天)", logs.len(), config.retention_days);

    Ok(())
}
