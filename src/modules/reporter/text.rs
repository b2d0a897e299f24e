use super::models::CleanReport;
use crate::modules::common::utils::{format_duration, format_size};
use crate::modules::orchestrator::models::{CleanOutcome, PreviewReport, ScanOutcome};
use crate::modules::validator::models::Accepted;
use std::fmt::Write;
use std::path::Path;

/// 终端预览表格
pub fn render_preview(report: &PreviewReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== 可清理项目 ===\n");

    for category in &report.categories {
        let marker = if category.safe_by_default { "*" } else { " " };
        let cached = if category.from_cache { " (缓存)" } else { "" };

        match &category.outcome {
            ScanOutcome::Available { count, size_bytes } => {
                let _ = writeln!(
                    out,
                    " {} {:<20} {:>8} 项  {:>12}{}",
                    marker,
                    category.label,
                    count,
                    format_size(*size_bytes),
                    cached
                );
            }
            ScanOutcome::Unavailable { reason, last_known } => {
                let _ = writeln!(out, " {} {:<20} 不可用: {}", marker, category.label, reason);
                if let Some(last) = last_known {
                    let _ = writeln!(
                        out,
                        "     上次结果: {} 项, {} (不计入总量)",
                        last.count,
                        format_size(last.size_bytes)
                    );
                }
            }
        }

        if let Some(warning) = &category.warning {
            let _ = writeln!(out, "     注意: {}", warning);
        }
    }

    let _ = writeln!(
        out,
        "\n共 {} 项, {}",
        report.total_count,
        format_size(report.total_size)
    );
    out
}

/// 终端清理结果
pub fn render_clean(report: &CleanReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== 清理结果 ===\n");

    for outcome in &report.outcomes {
        match outcome {
            CleanOutcome::Finished(result) => {
                let _ = writeln!(
                    out,
                    "  [{}] {}: 删除 {} 项, 释放 {}, 跳过 {}, 失败 {}",
                    result.status,
                    result.label,
                    result.files_deleted,
                    format_size(result.space_freed),
                    result.skipped.len(),
                    result.errors.len()
                );
                for skipped in &result.skipped {
                    let _ = writeln!(out, "      跳过 {}: {}", skipped.path.display(), skipped.reason);
                }
                for error in &result.errors {
                    let _ = writeln!(out, "      错误: {}", error);
                }
            }
            CleanOutcome::CoolingDown {
                category_id,
                remaining_secs,
            } => {
                let _ = writeln!(
                    out,
                    "  [cooling_down] {}: 操作过于频繁, 请 {} 秒后重试",
                    category_id, remaining_secs
                );
            }
        }
    }

    let summary = &report.summary;
    let _ = writeln!(out, "\n--- 会话 {} ---", report.session_id);
    let _ = writeln!(out, "  删除: {} 项", summary.total_files_deleted);
    let _ = writeln!(out, "  释放空间: {}", format_size(summary.total_space_freed));
    let _ = writeln!(
        out,
        "  成功: {}  失败: {}",
        summary.operations_completed, summary.operations_failed
    );
    let _ = writeln!(
        out,
        "  耗时: {}",
        format_duration(chrono::Duration::milliseconds(report.duration_ms))
    );
    let _ = writeln!(out, "  日志: {}", report.log_path.display());

    if report.history_incomplete() {
        let _ = writeln!(out, "\n警告: 历史记录可能不完整");
        for warning in &report.warnings {
            let _ = writeln!(out, "  - {}", warning);
        }
    }

    out
}

/// 单个路径的校验结果
pub fn render_validation(path: &Path, result: &Result<Accepted, crate::modules::validator::models::Rejection>) -> String {
    match result {
        Ok(accepted) => format!(
            "允许删除: {} ({}) -> {}",
            path.display(),
            accepted.entry.kind,
            accepted.target.display()
        ),
        Err(rejection) => format!("拒绝删除: {}\n  原因: {}", path.display(), rejection),
    }
}
