use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};

pub const LOG_PREFIX: &str = "session_";
pub const LOG_EXTENSION: &str = "log";

/// 是否为会话日志文件名
pub fn is_session_log(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    name.starts_with(LOG_PREFIX) && path.extension().map(|e| e == LOG_EXTENSION).unwrap_or(false)
}

/// 会话日志文件的概要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub session_id: String,
    pub path: PathBuf,
    pub size: u64,
}

/// 列出目录中的会话日志，按会话 ID（即开始时间）排序
pub fn list_logs(dir: &Path) -> std::io::Result<Vec<LogEntry>> {
    let mut logs = Vec::new();

    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if !is_session_log(&path) {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            continue;
        };
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        logs.push(LogEntry {
            session_id: stem.trim_start_matches(LOG_PREFIX).to_string(),
            path,
            size,
        });
    }

    logs.sort_by(|a, b| a.session_id.cmp(&b.session_id));
    Ok(logs)
}

/// 删除超过保留期的会话日志，返回删除数量（尽力而为）
pub fn purge_expired(dir: &Path, retention: Duration, now: DateTime<Utc>) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("无法读取会话日志目录 {}: {}", dir.display(), e);
            return 0;
        }
    };

    let cutoff = now - retention;
    let mut removed = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        if !is_session_log(&path) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };

        // 部分文件系统不提供创建时间
        let Ok(created) = metadata.created().or_else(|_| metadata.modified()) else {
            continue;
        };

        if DateTime::<Utc>::from(created) < cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    removed += 1;
                    tracing::debug!("已删除过期会话日志: {}", path.display());
                }
                Err(e) => tracing::warn!("删除过期会话日志失败 {}: {}", path.display(), e),
            }
        }
    }

    if removed > 0 {
        tracing::info!("已清理 {} 个过期会话日志", removed);
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn only_expired_session_logs_are_removed() {
        let dir = std::env::temp_dir().join(format!("rust-qingli-retention-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("session_1.log"), "x").unwrap();
        fs::write(dir.join("notes.txt"), "x").unwrap();

        // 保留期内不删除
        assert_eq!(purge_expired(&dir, Duration::days(30), Utc::now()), 0);
        assert!(dir.join("session_1.log").exists());

        // 把“现在”推到 31 天后
        let later = Utc::now() + Duration::days(31);
        assert_eq!(purge_expired(&dir, Duration::days(30), later), 1);
        assert!(!dir.join("session_1.log").exists());
        assert!(dir.join("notes.txt").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn list_logs_sorts_by_session_id_and_ignores_temp_files() {
        let dir = std::env::temp_dir().join(format!("rust-qingli-list-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("session_20260102_000000_000.log"), "b").unwrap();
        fs::write(dir.join("session_20260101_000000_000.log"), "aa").unwrap();
        fs::write(dir.join(".session_20260103_000000_000.log.tmp"), "c").unwrap();

        let logs = list_logs(&dir).unwrap();
        let ids: Vec<_> = logs.iter().map(|l| l.session_id.as_str()).collect();
        assert_eq!(ids, vec!["20260101_000000_000", "20260102_000000_000"]);
        assert_eq!(logs[0].size, 2);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn recognises_session_log_names() {
        assert!(is_session_log(Path::new("/x/session_20260101_000000_000.log")));
        assert!(!is_session_log(Path::new("/x/.session_1.log.tmp")));
        assert!(!is_session_log(Path::new("/x/other.log")));
    }
}
