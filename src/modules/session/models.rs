use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 操作状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    InProgress,
    Completed,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationStatus::InProgress)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::InProgress => write!(f, "in_progress"),
            OperationStatus::Completed => write!(f, "completed"),
            OperationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 会话内的一次操作
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub description: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: OperationStatus,
    pub files_deleted: u64,
    pub space_freed: u64,
    pub details: Vec<String>,
    pub errors: Vec<String>,
}

impl Operation {
    pub fn new(name: String, description: String, started_at: DateTime<Utc>) -> Self {
        Self {
            name,
            description,
            started_at,
            ended_at: None,
            status: OperationStatus::InProgress,
            files_deleted: 0,
            space_freed: 0,
            details: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|end| end - self.started_at)
    }
}

/// 会话汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_files_deleted: u64,
    pub total_space_freed: u64,
    pub operations_completed: u64,
    pub operations_failed: u64,
}

/// 一次清理会话
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub operations: Vec<Operation>,
    pub summary: SessionSummary,
}

impl Session {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            id: session_id(started_at),
            started_at,
            ended_at: None,
            operations: Vec::new(),
            summary: SessionSummary::default(),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// 由开始时间生成会话 ID
pub fn session_id(started_at: DateTime<Utc>) -> String {
    started_at.format("%Y%m%d_%H%M%S_%3f").to_string()
}

/// 操作句柄（会话内下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationHandle(pub(crate) usize);

impl OperationHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// 一次日志落盘的结果
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogWrite {
    Persisted,
    /// 已回滚，内存状态仍已更新
    Failed(String),
}

impl LogWrite {
    pub fn is_persisted(&self) -> bool {
        matches!(self, LogWrite::Persisted)
    }

    pub fn warning(self) -> Option<String> {
        match self {
            LogWrite::Persisted => None,
            LogWrite::Failed(reason) => Some(reason),
        }
    }
}

/// `finalize` 的结果
#[derive(Debug, Clone)]
pub struct Finalized {
    pub log_path: std::path::PathBuf,
    pub summary: SessionSummary,
    pub duration: chrono::Duration,
    pub write: LogWrite,
}
