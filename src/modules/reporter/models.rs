use crate::modules::orchestrator::models::CleanOutcome;
use crate::modules::session::models::{Finalized, SessionSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// 一次清理命令的完整报告
#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
    pub log_path: PathBuf,
    pub outcomes: Vec<CleanOutcome>,
    pub summary: SessionSummary,
    pub duration_ms: i64,
    /// 会话日志未完整写入时的提示
    pub warnings: Vec<String>,
}

impl CleanReport {
    pub fn new(session_id: String, generated_at: DateTime<Utc>, finalized: Finalized) -> Self {
        let mut warnings = Vec::new();
        if let Some(warning) = finalized.write.warning() {
            warnings.push(warning);
        }

        Self {
            session_id,
            generated_at,
            log_path: finalized.log_path,
            outcomes: Vec::new(),
            summary: finalized.summary,
            duration_ms: finalized.duration.num_milliseconds(),
            warnings,
        }
    }

    pub fn with_outcomes(mut self, outcomes: Vec<CleanOutcome>) -> Self {
        for outcome in &outcomes {
            if let CleanOutcome::Finished(result) = outcome {
                self.warnings.extend(result.log_warnings.iter().cloned());
            }
        }
        self.outcomes = outcomes;
        self
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// 历史记录可能不完整
    pub fn history_incomplete(&self) -> bool {
        !self.warnings.is_empty()
    }
}
