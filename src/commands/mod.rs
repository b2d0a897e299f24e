pub mod clean;
pub mod history;
pub mod preview;
pub mod validate;

use crate::modules::common::clock::SystemClock;
use crate::modules::common::config::AppConfig;
use crate::modules::common::filesystem::NativeFs;
use crate::modules::orchestrator::{OrchestratorOptions, ScanOrchestrator};
use crate::modules::scanner;
use clap::Subcommand;
use std::sync::Arc;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 预览各类别可清理的数量与大小
    Preview(preview::PreviewCommand),

    /// 清理指定类别
    Clean(clean::CleanCommand),

    /// 查看清理会话日志
    History(history::HistoryCommand),

    /// 检查单个路径能否被安全删除
    Validate(validate::ValidateCommand),
}

impl Command {
    pub async fn execute(self, config: &AppConfig) -> anyhow::Result<()> {
        match self {
            Command::Preview(cmd) => preview::execute(cmd, config).await,
            Command::Clean(cmd) => clean::execute(cmd, config).await,
            Command::History(cmd) => history::execute(cmd, config).await,
            Command::Validate(cmd) => validate::execute(cmd).await,
        }
    }
}

/// 由配置构建编排器（真实文件系统与系统时钟）
pub fn build_orchestrator(config: &AppConfig) -> ScanOrchestrator {
    ScanOrchestrator::new(
        scanner::categories_from_config(config),
        OrchestratorOptions::from_config(config),
        Arc::new(NativeFs),
        Arc::new(SystemClock),
    )
}
