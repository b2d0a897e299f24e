use crate::modules::cache::CachedResult;
use crate::modules::session::models::OperationStatus;
use crate::modules::validator::models::Rejection;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// 单个类别的预览结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanOutcome {
    Available {
        count: u64,
        size_bytes: u64,
    },
    /// 超时或失败；附带缓存中的旧数值（不计入总量）
    Unavailable {
        reason: String,
        last_known: Option<CachedResult>,
    },
}

impl ScanOutcome {
    pub fn totals(&self) -> Option<(u64, u64)> {
        match self {
            ScanOutcome::Available { count, size_bytes } => Some((*count, *size_bytes)),
            ScanOutcome::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub id: String,
    pub label: String,
    pub outcome: ScanOutcome,
    /// 结果来自缓存而非本次扫描
    pub from_cache: bool,
    pub safe_by_default: bool,
    pub warning: Option<String>,
}

/// 提供给展示层的预览报告
#[derive(Debug, Clone, Serialize)]
pub struct PreviewReport {
    pub generated_at: DateTime<Utc>,
    pub total_count: u64,
    pub total_size: u64,
    pub categories: Vec<CategoryReport>,
}

impl PreviewReport {
    pub fn new(generated_at: DateTime<Utc>, categories: Vec<CategoryReport>) -> Self {
        let (total_count, total_size) = categories
            .iter()
            .filter_map(|c| c.outcome.totals())
            .fold((0, 0), |(n, s), (count, size)| (n + count, s + size));

        Self {
            generated_at,
            total_count,
            total_size,
            categories,
        }
    }

    pub fn category(&self, id: &str) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.id == id)
    }
}

/// 条目被跳过的原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    Rejected { rejection: Rejection },
    /// 与本次已删除的条目解析到同一目标
    DuplicateAlias { target: PathBuf },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Rejected { rejection } => write!(f, "{}", rejection),
            SkipReason::DuplicateAlias { target } => {
                write!(f, "DuplicateAlias: 与已处理条目指向同一目标 {}", target.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// 单个类别清理的结果
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    pub category_id: String,
    pub label: String,
    pub status: OperationStatus,
    pub files_deleted: u64,
    pub space_freed: u64,
    pub skipped: Vec<SkippedEntry>,
    pub errors: Vec<String>,
    /// 会话日志写入失败的提示（清理本身不受影响）
    pub log_warnings: Vec<String>,
}

impl OperationResult {
    pub fn new(category_id: String, label: String) -> Self {
        Self {
            category_id,
            label,
            status: OperationStatus::InProgress,
            files_deleted: 0,
            space_freed: 0,
            skipped: Vec::new(),
            errors: Vec::new(),
            log_warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CleanOutcome {
    Finished(OperationResult),
    CoolingDown { category_id: String, remaining_secs: i64 },
}

/// 进度事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    ScanStarted { category_id: String },
    ScanFinished { category_id: String, ok: bool },
    CleanStarted { category_id: String, candidates: usize },
    EntryProcessed { category_id: String, path: PathBuf, deleted: bool },
    CleanFinished { category_id: String },
}

pub type ProgressFn = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;
