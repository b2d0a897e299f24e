//! 防崩溃的清理会话日志
//!
//! 一个 [`SessionLog`] 对应一次清理运行。所有修改（内存中的 [`Session`] 与磁盘追加）
//! 都在同一把锁内完成，多个工作线程同时结束不同操作时日志按字节不交错。
//! 调用方只拿到 [`OperationHandle`]，拿不到 `Session` 的可变引用。

pub mod anonymize;
pub mod format;
pub mod models;
pub mod persist;
pub mod retention;

use crate::modules::common::clock::Clock;
use crate::modules::common::config::{DEFAULT_MIN_FREE_BYTES, DEFAULT_RETENTION_DAYS};
use crate::modules::common::error::CleanerError;
use anonymize::Anonymizer;
use chrono::Duration;
use models::{Finalized, LogWrite, Operation, OperationHandle, OperationStatus, Session};
use persist::LogFile;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// 会话日志选项
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub retention: Duration,
    pub min_free_bytes: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            retention: Duration::days(DEFAULT_RETENTION_DAYS),
            min_free_bytes: DEFAULT_MIN_FREE_BYTES,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &crate::modules::common::config::AppConfig) -> Self {
        Self {
            retention: Duration::days(config.retention_days.max(1)),
            min_free_bytes: config.min_free_bytes,
        }
    }
}

struct SessionState {
    session: Session,
    file: LogFile,
    header: String,
    header_persisted: bool,
    finalized: Option<Finalized>,
}

pub struct SessionLog {
    state: Mutex<SessionState>,
    anonymizer: Anonymizer,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLog")
            .field("log_path", &self.log_path())
            .finish()
    }
}

impl SessionLog {
    /// 在 `dir` 下创建新会话；目录无法创建时返回错误
    pub fn create(dir: &Path, options: SessionOptions, clock: Arc<dyn Clock>) -> Result<Self, CleanerError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| CleanerError::LogDirectory(format!("{}: {}", dir.display(), e)))?;

        let now = clock.now();
        retention::purge_expired(dir, options.retention, now);

        let mut session = Session::new(now);
        let mut path = log_file_path(dir, &session.id);
        let mut suffix = 1;
        while path.exists() {
            let id = format!("{}_{}", models::session_id(now), suffix);
            path = log_file_path(dir, &id);
            session.id = id;
            suffix += 1;
        }

        let anonymizer = Anonymizer::new(dir);
        let header = format::header(
            &session,
            &anonymizer.token("host", &anonymize::host_name()),
            &anonymizer.token("user", &anonymize::user_name()),
        );

        let file = LogFile::new(path, options.min_free_bytes);
        let header_persisted = match file.write(&header, false) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("会话日志头写入失败, 将在下一次写入时重试: {}", e);
                false
            }
        };

        tracing::info!("开始清理会话 {}: {}", session.id, file.path().display());

        Ok(Self {
            state: Mutex::new(SessionState {
                session,
                file,
                header,
                header_persisted,
                finalized: None,
            }),
            anonymizer,
            clock,
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn session_id(&self) -> String {
        self.lock().session.id.clone()
    }

    pub fn log_path(&self) -> PathBuf {
        self.lock().file.path().to_path_buf()
    }

    /// 当前会话的只读快照
    pub fn snapshot(&self) -> Session {
        self.lock().session.clone()
    }

    /// 追加一段记录；头部尚未落盘时一并补写
    fn persist(state: &mut SessionState, record: &str) -> LogWrite {
        let content = if state.header_persisted {
            record.to_string()
        } else {
            format!("{}{}", state.header, record)
        };

        match state.file.write(&content, true) {
            Ok(()) => {
                state.header_persisted = true;
                LogWrite::Persisted
            }
            Err(e) => LogWrite::Failed(e.to_string()),
        }
    }

    fn open_operation<'a>(
        state: &'a mut SessionState,
        handle: OperationHandle,
    ) -> Result<&'a mut Operation, CleanerError> {
        if state.finalized.is_some() {
            return Err(CleanerError::SessionFinalized);
        }
        let op = state
            .session
            .operations
            .get_mut(handle.0)
            .ok_or(CleanerError::UnknownOperation(handle.0))?;
        if op.status.is_terminal() {
            return Err(CleanerError::OperationClosed(handle.0));
        }
        Ok(op)
    }

    pub fn start_operation(
        &self,
        name: &str,
        description: &str,
    ) -> Result<(OperationHandle, LogWrite), CleanerError> {
        let name = self.anonymizer.mask(name);
        let description = self.anonymizer.mask(description);

        let mut state = self.lock();
        if state.finalized.is_some() {
            return Err(CleanerError::SessionFinalized);
        }

        let op = Operation::new(name, description, self.clock.now());
        let index = state.session.operations.len();
        let record = format::start_record(index, &op);
        state.session.operations.push(op);

        let write = Self::persist(&mut state, &record);
        tracing::debug!("操作 #{} 开始: {}", index, state.session.operations[index].name);
        Ok((OperationHandle(index), write))
    }

    pub fn add_detail(&self, handle: OperationHandle, text: &str) -> Result<LogWrite, CleanerError> {
        let text = self.anonymizer.mask(text);
        let now = self.clock.now();

        let mut state = self.lock();
        let op = Self::open_operation(&mut state, handle)?;
        op.details.push(text.clone());

        let record = format::detail_record(handle.0, now, &text);
        Ok(Self::persist(&mut state, &record))
    }

    pub fn end_operation(
        &self,
        handle: OperationHandle,
        files_deleted: u64,
        space_freed: u64,
        success: bool,
        error: Option<&str>,
    ) -> Result<LogWrite, CleanerError> {
        let error = error.map(|e| self.anonymizer.mask(e));
        let now = self.clock.now();

        let mut state = self.lock();
        let op = Self::open_operation(&mut state, handle)?;
        op.ended_at = Some(now);
        op.status = if success {
            OperationStatus::Completed
        } else {
            OperationStatus::Failed
        };
        op.files_deleted = files_deleted;
        op.space_freed = space_freed;
        if let Some(error) = error {
            op.errors.push(error);
        }
        let record = format::end_record(handle.0, op);

        let summary = &mut state.session.summary;
        summary.total_files_deleted += files_deleted;
        summary.total_space_freed += space_freed;
        if success {
            summary.operations_completed += 1;
        } else {
            summary.operations_failed += 1;
        }

        Ok(Self::persist(&mut state, &record))
    }

    /// 写出汇总块并结束会话；重复调用返回第一次的结果
    pub fn finalize(&self) -> Result<Finalized, CleanerError> {
        let mut state = self.lock();
        if let Some(done) = &state.finalized {
            return Ok(done.clone());
        }

        let now = self.clock.now();

        // 仍未结束的操作按失败处理
        let mut interrupted = 0;
        for op in state.session.operations.iter_mut() {
            if !op.status.is_terminal() {
                op.status = OperationStatus::Failed;
                op.ended_at = Some(now);
                op.errors.push("会话结束时操作仍未完成".to_string());
                interrupted += 1;
            }
        }
        state.session.summary.operations_failed += interrupted;
        state.session.ended_at = Some(now);

        let record = format::summary(&state.session);
        let write = Self::persist(&mut state, &record);

        let summary = state.session.summary;
        let finalized = Finalized {
            log_path: state.file.path().to_path_buf(),
            summary,
            duration: now - state.session.started_at,
            write,
        };
        state.finalized = Some(finalized.clone());

        tracing::info!(
            "会话 {} 结束: 删除 {} 个条目, 释放 {} 字节, 成功 {} / 失败 {}",
            state.session.id,
            summary.total_files_deleted,
            summary.total_space_freed,
            summary.operations_completed,
            summary.operations_failed
        );

        Ok(finalized)
    }
}

fn log_file_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}{}.{}", retention::LOG_PREFIX, id, retention::LOG_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::common::clock::{ManualClock, SystemClock};
    use chrono::Utc;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rust-qingli-session-{}-{}", name, uuid::Uuid::new_v4()))
    }

    fn open(dir: &Path) -> SessionLog {
        let options = SessionOptions {
            min_free_bytes: 0,
            ..SessionOptions::default()
        };
        SessionLog::create(dir, options, Arc::new(SystemClock)).unwrap()
    }

    fn summary_value(content: &str, key: &str) -> u64 {
        let summary = content.split(format::SUMMARY_MARKER).nth(1).unwrap();
        summary
            .lines()
            .find_map(|line| line.strip_prefix(&format!("{}: ", key)))
            .unwrap()
            .trim()
            .parse()
            .unwrap()
    }

    #[test]
    fn header_is_written_on_creation() {
        let dir = temp_dir("header");
        let log = open(&dir);

        let content = fs::read_to_string(log.log_path()).unwrap();
        assert!(content.starts_with(format::HEADER_TITLE));
        assert!(content.contains(&format!("session_id: {}", log.session_id())));
        assert!(content.contains("host: host-"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn summary_totals_equal_sum_of_operations() {
        for n in [0u64, 1, 5] {
            let dir = temp_dir("roundtrip");
            let log = open(&dir);

            let mut expected_files = 0;
            let mut expected_bytes = 0;
            for i in 0..n {
                let (handle, write) = log.start_operation(&format!("op{}", i), "desc").unwrap();
                assert!(write.is_persisted());
                let _ = log.add_detail(handle, "working").unwrap();
                let files = i + 1;
                let bytes = (i + 1) * 100;
                let success = i % 2 == 0;
                let _ = log.end_operation(handle, files, bytes, success, None).unwrap();
                expected_files += files;
                expected_bytes += bytes;
            }

            let finalized = log.finalize().unwrap();
            assert!(finalized.write.is_persisted());
            assert_eq!(finalized.summary.total_files_deleted, expected_files);

            let content = fs::read_to_string(&finalized.log_path).unwrap();
            assert_eq!(summary_value(&content, "total_files_deleted"), expected_files);
            assert_eq!(summary_value(&content, "total_space_freed"), expected_bytes);
            assert_eq!(
                summary_value(&content, "operations_completed") + summary_value(&content, "operations_failed"),
                n
            );

            let _ = fs::remove_dir_all(&dir);
        }
    }

    #[test]
    fn concurrent_operations_never_interleave() {
        let dir = temp_dir("concurrent");
        let log = Arc::new(open(&dir));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = log.clone();
                std::thread::spawn(move || {
                    let (handle, _) = log.start_operation(&format!("worker{}", i), "parallel").unwrap();
                    for j in 0..3 {
                        let _ = log.add_detail(handle, &format!("step {}", j)).unwrap();
                    }
                    let _ = log.end_operation(handle, 1, 10, true, None).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let finalized = log.finalize().unwrap();
        let content = fs::read_to_string(&finalized.log_path).unwrap();

        let records: Vec<&str> = content.lines().filter(|l| l.starts_with('[')).collect();
        assert_eq!(records.iter().filter(|l| l.contains("] start #")).count(), 8);
        assert_eq!(records.iter().filter(|l| l.contains("] detail #")).count(), 24);
        assert_eq!(records.iter().filter(|l| l.contains("] end #")).count(), 8);
        assert_eq!(summary_value(&content, "total_files_deleted"), 8);

        // 每条操作的记录按 start → detail → end 的顺序出现
        for i in 0..8 {
            let tag = format!("#{} ", i);
            let lines: Vec<&&str> = records.iter().filter(|l| l.contains(&tag)).collect();
            assert!(lines.first().unwrap().contains("start"));
            assert!(lines.last().unwrap().contains("end"));
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn free_text_is_anonymized_before_persisting() {
        let dir = temp_dir("anon");
        let log = open(&dir);

        let (handle, _) = log.start_operation("temp", "cleaning for carol@example.org").unwrap();
        let _ = log.add_detail(handle, "/home/carol/.cache/thumbs failed").unwrap();
        let _ = log.end_operation(handle, 0, 0, false, Some("10.0.0.7 unreachable")).unwrap();
        let finalized = log.finalize().unwrap();

        let content = fs::read_to_string(&finalized.log_path).unwrap();
        assert!(!content.contains("carol"));
        assert!(!content.contains("10.0.0.7"));
        assert!(content.contains("/home/user-"));
        assert!(content.contains("first_error=ip-"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn misuse_is_reported_as_errors() {
        let dir = temp_dir("misuse");
        let log = open(&dir);

        assert!(matches!(
            log.add_detail(OperationHandle(3), "x"),
            Err(CleanerError::UnknownOperation(3))
        ));

        let (handle, _) = log.start_operation("a", "b").unwrap();
        let _ = log.end_operation(handle, 1, 1, true, None).unwrap();
        assert!(matches!(
            log.end_operation(handle, 1, 1, true, None),
            Err(CleanerError::OperationClosed(0))
        ));

        let first = log.finalize().unwrap();
        let second = log.finalize().unwrap();
        assert_eq!(first.summary, second.summary);
        assert_eq!(first.log_path, second.log_path);
        assert!(matches!(log.start_operation("c", "d"), Err(CleanerError::SessionFinalized)));

        // 汇总块只写一次
        let content = fs::read_to_string(&first.log_path).unwrap();
        assert_eq!(content.matches(format::SUMMARY_MARKER).count(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unfinished_operations_are_failed_on_finalize() {
        let dir = temp_dir("unfinished");
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let options = SessionOptions {
            min_free_bytes: 0,
            ..SessionOptions::default()
        };
        let log = SessionLog::create(&dir, options, clock.clone()).unwrap();

        let _ = log.start_operation("hanging", "never ends").unwrap();
        clock.advance(Duration::seconds(4));
        let finalized = log.finalize().unwrap();

        assert_eq!(finalized.summary.operations_failed, 1);
        assert_eq!(finalized.duration, Duration::seconds(4));
        let snapshot = log.snapshot();
        assert_eq!(snapshot.operations[0].status, OperationStatus::Failed);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn persistence_failure_is_soft_and_state_still_updates() {
        let dir = temp_dir("soft");
        let options = SessionOptions {
            min_free_bytes: u64::MAX,
            ..SessionOptions::default()
        };
        let log = SessionLog::create(&dir, options, Arc::new(SystemClock)).unwrap();

        let (handle, write) = log.start_operation("temp", "x").unwrap();
        assert!(matches!(write, LogWrite::Failed(_)));
        let write = log.end_operation(handle, 2, 20, true, None).unwrap();
        assert!(write.warning().is_some());

        let snapshot = log.snapshot();
        assert_eq!(snapshot.summary.total_files_deleted, 2);
        assert!(!log.log_path().exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unusable_log_directory_is_a_hard_failure() {
        let base = temp_dir("blocked");
        fs::create_dir_all(&base).unwrap();
        let blocker = base.join("file");
        fs::write(&blocker, b"not a dir").unwrap();

        let result = SessionLog::create(&blocker.join("logs"), SessionOptions::default(), Arc::new(SystemClock));
        assert!(matches!(result, Err(CleanerError::LogDirectory(_))));

        let _ = fs::remove_dir_all(&base);
    }
}
