use super::models::{CleanOutcome, OperationResult, ProgressEvent, SkipReason, SkippedEntry};
use super::ScanOrchestrator;
use crate::modules::common::error::CleanerError;
use crate::modules::cooldown::CooldownDecision;
use crate::modules::scanner::models::Candidate;
use crate::modules::session::models::{LogWrite, OperationHandle, OperationStatus};
use crate::modules::session::SessionLog;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// 一个类别清理请求
#[derive(Debug, Clone)]
pub struct CleanRequest {
    pub category_id: String,
    pub allowed_roots: Vec<PathBuf>,
}

impl ScanOrchestrator {
    /// 清理单个类别
    ///
    /// 同一类别在冷却窗口内重复触发时返回 [`CleanOutcome::CoolingDown`]。单个条目的
    /// 校验拒绝与删除失败只计入结果，不会中断该类别；只有扫描本身失败时该操作才记为失败。
    pub async fn clean_one(
        &self,
        category_id: &str,
        allowed_roots: &[PathBuf],
        log: &Arc<SessionLog>,
    ) -> Result<CleanOutcome, CleanerError> {
        let category = self.category(category_id)?.clone();

        let decision = self
            .gate
            .try_acquire(&format!("clean:{}", category.id), self.clock.now());
        if let CooldownDecision::Rejected { .. } = decision {
            tracing::info!("类别 {} 冷却中, 忽略本次清理请求", category.id);
            return Ok(CleanOutcome::CoolingDown {
                category_id: category.id.clone(),
                remaining_secs: decision.remaining_secs(),
            });
        }

        let mut result = OperationResult::new(category.id.clone(), category.label.clone());
        let (handle, write) =
            log.start_operation(&category.id, &format!("清理类别: {}", category.label))?;
        note(&mut result, write);

        let output = match self.run_scan(&category).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("类别 {} 扫描失败, 放弃清理: {}", category.id, e);
                let error = e.to_string();
                let write = log.end_operation(handle, 0, 0, false, Some(&error))?;
                note(&mut result, write);
                result.status = OperationStatus::Failed;
                result.errors.push(error);
                return Ok(CleanOutcome::Finished(result));
            }
        };

        self.emit(ProgressEvent::CleanStarted {
            category_id: category.id.clone(),
            candidates: output.candidates.len(),
        });

        let orchestrator = self.clone();
        let roots = allowed_roots.to_vec();
        let task_log = log.clone();
        let candidates = output.candidates;
        let joined = tokio::task::spawn_blocking(move || {
            orchestrator.process_candidates(result, &candidates, &roots, &task_log, handle)
        })
        .await;

        let mut result = match joined {
            Ok(result) => result,
            Err(e) => {
                // 已删除的条目数未知，按失败结束并让缓存重新扫描
                let error = format!("清理任务异常: {}", e);
                tracing::error!("类别 {} {}", category.id, error);
                let mut failed = OperationResult::new(category.id.clone(), category.label.clone());
                let write = log.end_operation(handle, 0, 0, false, Some(&error))?;
                note(&mut failed, write);
                failed.status = OperationStatus::Failed;
                failed.errors.push(error);
                self.cache.invalidate(&category.id);
                self.emit(ProgressEvent::CleanFinished {
                    category_id: category.id.clone(),
                });
                return Ok(CleanOutcome::Finished(failed));
            }
        };

        let error = result.errors.first().map(|first| {
            format!("{} 个条目删除失败, 首个错误: {}", result.errors.len(), first)
        });
        let write = log.end_operation(
            handle,
            result.files_deleted,
            result.space_freed,
            true,
            error.as_deref(),
        )?;
        note(&mut result, write);
        result.status = OperationStatus::Completed;

        // 下一次预览只重新扫描这个类别
        self.cache.invalidate(&category.id);

        self.emit(ProgressEvent::CleanFinished {
            category_id: category.id.clone(),
        });

        tracing::info!(
            "类别 {} 清理完成: 删除 {}, 跳过 {}, 失败 {}",
            category.id,
            result.files_deleted,
            result.skipped.len(),
            result.errors.len()
        );

        Ok(CleanOutcome::Finished(result))
    }

    /// 并行清理多个类别，共用同一个会话日志
    pub async fn clean_many(
        &self,
        requests: Vec<CleanRequest>,
        log: &Arc<SessionLog>,
    ) -> Vec<Result<CleanOutcome, CleanerError>> {
        let mut handles = Vec::with_capacity(requests.len());

        for request in requests {
            let orchestrator = self.clone();
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                orchestrator
                    .clean_one(&request.category_id, &request.allowed_roots, &log)
                    .await
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(CleanerError::from(e)),
            });
        }
        outcomes
    }

    /// 先逐条校验并去重，再删除通过校验的目标（在阻塞线程上执行）
    fn process_candidates(
        &self,
        mut result: OperationResult,
        candidates: &[Candidate],
        allowed_roots: &[PathBuf],
        log: &SessionLog,
        handle: OperationHandle,
    ) -> OperationResult {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut accepted = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let reason = match self
                .validator
                .validate(&candidate.path, allowed_roots, candidate.is_dir)
            {
                Ok(entry) if seen.insert(entry.target.clone()) => {
                    accepted.push((candidate, entry.target));
                    continue;
                }
                Ok(entry) => SkipReason::DuplicateAlias {
                    target: entry.target,
                },
                Err(rejection) => SkipReason::Rejected { rejection },
            };

            let text = format!("跳过 {}: {}", candidate.path.display(), reason);
            tracing::debug!("{}", text);
            self.detail(&mut result, log, handle, &text);
            result.skipped.push(SkippedEntry {
                path: candidate.path.clone(),
                reason,
            });
            self.emit(ProgressEvent::EntryProcessed {
                category_id: result.category_id.clone(),
                path: candidate.path.clone(),
                deleted: false,
            });
        }

        for (candidate, target) in accepted {
            let deleted = match self.fs.remove(&target) {
                Ok(bytes) => {
                    result.files_deleted += 1;
                    result.space_freed += bytes;
                    tracing::debug!("已删除: {}", target.display());
                    true
                }
                Err(e) => {
                    let error = format!("删除失败 {}: {}", target.display(), e);
                    tracing::warn!("{}", error);
                    self.detail(&mut result, log, handle, &error);
                    result.errors.push(error);
                    false
                }
            };
            self.emit(ProgressEvent::EntryProcessed {
                category_id: result.category_id.clone(),
                path: candidate.path.clone(),
                deleted,
            });
        }

        result
    }

    fn detail(&self, result: &mut OperationResult, log: &SessionLog, handle: OperationHandle, text: &str) {
        match log.add_detail(handle, text) {
            Ok(write) => note(result, write),
            Err(e) => result.log_warnings.push(e.to_string()),
        }
    }
}

/// 记录日志写入失败，清理继续
fn note(result: &mut OperationResult, write: LogWrite) {
    if let Some(warning) = write.warning() {
        tracing::warn!("会话日志可能不完整: {}", warning);
        result.log_warnings.push(warning);
    }
}
