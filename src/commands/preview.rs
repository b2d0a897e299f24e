use crate::modules::common::config::AppConfig;
use crate::modules::reporter;
use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct PreviewCommand {
    /// 只预览指定类别 (可多次指定)
    #[arg(short, long)]
    pub category: Vec<String>,

    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(cmd: PreviewCommand, config: &AppConfig) -> Result<()> {
    let orchestrator = super::build_orchestrator(config);
    let ids = (!cmd.category.is_empty()).then_some(cmd.category.as_slice());

    if !cmd.json {
        println!("正在扫描...\n");
    }
    let report = orchestrator.preview_all(ids).await?;

    if cmd.json {
        println!("{}", reporter::to_json(&report)?);
    } else {
        print!("{}", reporter::text::render_preview(&report));
        println!("\n带 * 的类别默认可安全清理");
    }

    Ok(())
}
