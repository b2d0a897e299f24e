use crate::modules::common::error::CleanerError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// 扫描发现的候选条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub path: PathBuf,
    pub is_dir: bool,
}

impl Candidate {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }

    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }
}

/// 一次类别扫描的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutput {
    pub count: u64,
    pub total_size: u64,
    pub candidates: Vec<Candidate>,
}

pub type ScanFn = Arc<dyn Fn() -> Result<ScanOutput, CleanerError> + Send + Sync>;

/// 一个清理类别（启动时注册，进程内不删除）
#[derive(Clone)]
pub struct ScanCategory {
    pub id: String,
    pub label: String,
    pub refresh_interval: Duration,
    /// 界面批量勾选时是否默认选中
    pub safe_by_default: bool,
    pub warning: Option<String>,
    /// 该类别默认的允许根目录
    pub allowed_roots: Vec<PathBuf>,
    pub scan: ScanFn,
}

impl std::fmt::Debug for ScanCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCategory")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("refresh_interval", &self.refresh_interval)
            .field("safe_by_default", &self.safe_by_default)
            .finish()
    }
}

impl ScanCategory {
    pub fn new(id: impl Into<String>, label: impl Into<String>, scan: ScanFn) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            refresh_interval: Duration::seconds(crate::modules::common::config::DEFAULT_REFRESH_INTERVAL_SECONDS),
            safe_by_default: false,
            warning: None,
            allowed_roots: Vec::new(),
            scan,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_allowed_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.allowed_roots = roots;
        self
    }

    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }

    pub fn with_safe_by_default(mut self, safe: bool) -> Self {
        self.safe_by_default = safe;
        self
    }
}
