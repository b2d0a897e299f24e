pub mod clean;
pub mod models;
pub mod preview;

use crate::modules::cache::CategoryCache;
use crate::modules::common::clock::Clock;
use crate::modules::common::config::{
    AppConfig, DEFAULT_COOLDOWN_SECONDS, DEFAULT_REFRESH_INTERVAL_SECONDS, DEFAULT_SCAN_TIMEOUT_SECONDS,
    DEFAULT_WORKERS,
};
use crate::modules::common::error::CleanerError;
use crate::modules::common::filesystem::FileSystem;
use crate::modules::cooldown::CooldownGate;
use crate::modules::scanner::models::{ScanCategory, ScanOutput};
use crate::modules::validator::PathValidator;
use models::{ProgressEvent, ProgressFn};
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorOptions {
    pub workers: usize,
    pub scan_timeout: std::time::Duration,
    pub cooldown: chrono::Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            scan_timeout: std::time::Duration::from_secs(DEFAULT_SCAN_TIMEOUT_SECONDS),
            cooldown: chrono::Duration::seconds(DEFAULT_COOLDOWN_SECONDS),
        }
    }
}

impl OrchestratorOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            scan_timeout: std::time::Duration::from_secs(config.scan_timeout_seconds),
            cooldown: chrono::Duration::seconds(config.cooldown_seconds.max(0)),
        }
    }
}

/// 编排器；内部全部为共享引用，克隆代价很小
#[derive(Clone)]
pub struct ScanOrchestrator {
    categories: Arc<Vec<ScanCategory>>,
    cache: Arc<CategoryCache>,
    gate: Arc<CooldownGate>,
    validator: Arc<PathValidator>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    workers: Arc<Semaphore>,
    scan_timeout: std::time::Duration,
    progress: Option<ProgressFn>,
}

impl std::fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("categories", &self.categories)
            .field("scan_timeout", &self.scan_timeout)
            .finish()
    }
}

impl ScanOrchestrator {
    pub fn new(
        categories: Vec<ScanCategory>,
        options: OrchestratorOptions,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = CategoryCache::new(chrono::Duration::seconds(DEFAULT_REFRESH_INTERVAL_SECONDS));
        for category in &categories {
            cache.register(&category.id, category.refresh_interval);
        }

        Self {
            categories: Arc::new(categories),
            cache: Arc::new(cache),
            gate: Arc::new(CooldownGate::new(options.cooldown)),
            validator: Arc::new(PathValidator::new(fs.clone())),
            fs,
            clock,
            workers: Arc::new(Semaphore::new(options.workers.max(1))),
            scan_timeout: options.scan_timeout,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_validator(mut self, validator: PathValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn categories(&self) -> &[ScanCategory] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Result<&ScanCategory, CleanerError> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| CleanerError::UnknownCategory(id.to_string()))
    }

    pub fn cache(&self) -> &CategoryCache {
        &self.cache
    }

    pub fn validator(&self) -> &PathValidator {
        &self.validator
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress(&event);
        }
    }

    /// 在工作池中执行一个类别的扫描，超时即放弃等待
    async fn run_scan(&self, category: &ScanCategory) -> Result<ScanOutput, CleanerError> {
        let _permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| CleanerError::Task(e.to_string()))?;

        self.emit(ProgressEvent::ScanStarted {
            category_id: category.id.clone(),
        });

        let scan = category.scan.clone();
        let handle = tokio::task::spawn_blocking(move || scan());

        let result = match tokio::time::timeout(self.scan_timeout, handle).await {
            Ok(joined) => joined.map_err(CleanerError::from).and_then(|r| r),
            Err(_) => {
                tracing::warn!("类别 {} 扫描超时 ({:?})", category.id, self.scan_timeout);
                Err(CleanerError::Timeout(format!(
                    "类别 {} 扫描超过 {:?}",
                    category.id, self.scan_timeout
                )))
            }
        };

        self.emit(ProgressEvent::ScanFinished {
            category_id: category.id.clone(),
            ok: result.is_ok(),
        });

        result
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::modules::scanner::models::{Candidate, ScanFn};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 返回固定结果并统计调用次数的扫描函数
    pub fn counting_scan(output: ScanOutput) -> (ScanFn, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let scan: ScanFn = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(output.clone())
        });
        (scan, calls)
    }

    pub fn output_of(candidates: Vec<Candidate>, size: u64) -> ScanOutput {
        ScanOutput {
            count: candidates.len() as u64,
            total_size: size,
            candidates,
        }
    }
}
