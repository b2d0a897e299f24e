use crate::modules::common::clock::{Clock, SystemClock};
use crate::modules::common::config::AppConfig;
use crate::modules::orchestrator::clean::CleanRequest;
use crate::modules::orchestrator::models::ProgressEvent;
use crate::modules::reporter::{self, models::CleanReport};
use crate::modules::session::{SessionLog, SessionOptions};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct CleanCommand {
    /// 要清理的类别 ID
    #[arg(required = true)]
    pub categories: Vec<String>,

    /// 确认删除 (不指定则预览)
    #[arg(long)]
    pub confirm: bool,

    /// 允许删除的根目录 (可多次指定，默认使用配置)
    #[arg(long)]
    pub root: Vec<PathBuf>,

    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(cmd: CleanCommand, config: &AppConfig) -> Result<()> {
    if let Some(root) = cmd.root.iter().find(|r| !r.is_absolute()) {
        anyhow::bail!("--root 必须是绝对路径: {}", root.display());
    }

    let mut orchestrator = super::build_orchestrator(config);
    for id in &cmd.categories {
        orchestrator.category(id)?;
    }

    // 预览模式
    if !cmd.confirm {
        let report = orchestrator.preview_all(Some(cmd.categories.as_slice())).await?;
        if cmd.json {
            println!("{}", reporter::to_json(&report)?);
        } else {
            println!("=== 预览模式 ===");
            println!("使用 --confirm 确认删除\n");
            print!("{}", reporter::text::render_preview(&report));
        }
        return Ok(());
    }

    if !cmd.json {
        orchestrator = orchestrator.with_progress(Arc::new(|event: &ProgressEvent| match event {
            ProgressEvent::CleanStarted {
                category_id,
                candidates,
            } => println!("正在清理 {} ({} 项)...", category_id, candidates),
            ProgressEvent::EntryProcessed { path, deleted, .. } => {
                tracing::debug!("{} {}", if *deleted { "已删除" } else { "未删除" }, path.display());
            }
            _ => {}
        }));
    }

    let requests = cmd
        .categories
        .iter()
        .map(|id| {
            let allowed_roots = if cmd.root.is_empty() {
                orchestrator.category(id).map(|c| c.allowed_roots.clone())
            } else {
                Ok(cmd.root.clone())
            }?;
            Ok(CleanRequest {
                category_id: id.clone(),
                allowed_roots,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let log = Arc::new(SessionLog::create(
        &config.log_dir,
        SessionOptions::from_config(config),
        clock.clone(),
    )?);

    let mut outcomes = Vec::new();
    let mut failures = Vec::new();
    for (request, outcome) in cmd
        .categories
        .iter()
        .zip(orchestrator.clean_many(requests, &log).await)
    {
        match outcome {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::error!("类别 {} 清理异常: {}", request, e);
                failures.push(format!("{}: {}", request, e));
            }
        }
    }

    let finalized = log.finalize()?;
    let mut report = CleanReport::new(log.session_id(), clock.now(), finalized).with_outcomes(outcomes);
    for failure in failures {
        report.add_warning(failure);
    }

    if cmd.json {
        println!("{}", reporter::to_json(&report)?);
    } else {
        print!("{}", reporter::text::render_clean(&report));
    }

    Ok(())
}
