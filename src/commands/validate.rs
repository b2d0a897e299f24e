use crate::modules::common::filesystem::NativeFs;
use crate::modules::reporter;
use crate::modules::validator::PathValidator;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct ValidateCommand {
    /// 待检查的路径
    pub path: PathBuf,

    /// 允许删除的根目录 (可多次指定)
    #[arg(long, required = true)]
    pub root: Vec<PathBuf>,

    /// 按目录检查
    #[arg(long)]
    pub dir: bool,
}

pub async fn execute(cmd: ValidateCommand) -> Result<()> {
    if let Some(root) = cmd.root.iter().find(|r| !r.is_absolute()) {
        anyhow::bail!("--root 必须是绝对路径: {}", root.display());
    }

    let validator = PathValidator::new(Arc::new(NativeFs));
    let result = validator.validate(&cmd.path, &cmd.root, cmd.dir);
    println!("{}", reporter::text::render_validation(&cmd.path, &result));

    if result.is_err() {
        anyhow::bail!("路径未通过安全校验");
    }
    Ok(())
}
