//! 会话日志的落盘协议
//!
//! 每次写入：检查剩余空间 → （追加时）备份 → 旧内容 + 新内容写入临时文件并 fsync
//! → 校验临时文件 → 替换正式文件 → 删除备份。任何一步失败都删除临时文件、
//! 从备份恢复正式文件，再把错误返回给调用者。

use crate::modules::common::error::CleanerError;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// 已写好、尚未替换的临时文件
#[derive(Debug)]
pub(crate) struct Staged {
    expected_len: u64,
    has_backup: bool,
}

#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
    min_free_bytes: u64,
}

impl LogFile {
    pub fn new(path: PathBuf, min_free_bytes: u64) -> Self {
        Self {
            path,
            min_free_bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "session.log".to_string());
        self.path.with_file_name(format!(".{}.{}", name, suffix))
    }

    pub fn temp_path(&self) -> PathBuf {
        self.sibling("tmp")
    }

    pub fn backup_path(&self) -> PathBuf {
        self.sibling("bak")
    }

    /// 完整执行一次写入
    pub fn write(&self, content: &str, append: bool) -> Result<(), CleanerError> {
        self.recover();
        self.check_free_space()?;

        let result = self.stage(content, append).and_then(|staged| self.commit(&staged));

        if let Err(e) = &result {
            tracing::warn!("会话日志写入失败, 回滚: {}: {}", self.path.display(), e);
            self.rollback();
        }

        result
    }

    /// 上次替换中途崩溃（正式文件已删、临时文件未改名）时从备份恢复
    fn recover(&self) {
        let backup = self.backup_path();
        if !self.path.exists() && backup.exists() {
            match replace(&backup, &self.path) {
                Ok(()) => tracing::warn!("已从备份恢复会话日志: {}", self.path.display()),
                Err(e) => tracing::error!("从备份恢复会话日志失败: {}", e),
            }
        }
    }

    fn check_free_space(&self) -> Result<(), CleanerError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));

        match fs2::available_space(dir) {
            Ok(available) if available < self.min_free_bytes => Err(CleanerError::LowDiskSpace {
                available,
                required: self.min_free_bytes,
            }),
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::debug!("无法获取剩余空间 {}: {}", dir.display(), e);
                Ok(())
            }
        }
    }

    /// 备份并写出临时文件（正式文件保持不变）
    pub(crate) fn stage(&self, content: &str, append: bool) -> Result<Staged, CleanerError> {
        let append = append && self.path.exists();
        let temp = self.temp_path();

        let existing = if append {
            fs::copy(&self.path, self.backup_path())?;
            fs::read(&self.path)?
        } else {
            Vec::new()
        };

        let mut file = File::create(&temp)?;
        file.write_all(&existing)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        file.sync_all()?;
        drop(file);

        let expected_len = (existing.len() + content.len()) as u64;
        let actual_len = fs::metadata(&temp)?.len();
        if actual_len != expected_len || (expected_len > 0 && actual_len == 0) {
            return Err(CleanerError::LogWrite(format!(
                "临时文件大小不一致: 期望 {} 字节, 实际 {} 字节",
                expected_len, actual_len
            )));
        }

        Ok(Staged {
            expected_len,
            has_backup: append,
        })
    }

    /// 用临时文件替换正式文件
    pub(crate) fn commit(&self, staged: &Staged) -> Result<(), CleanerError> {
        let temp = self.temp_path();

        if !temp.exists() {
            return Err(CleanerError::LogWrite("临时文件不存在".to_string()));
        }

        replace(&temp, &self.path)?;
        sync_parent(&self.path);

        if staged.has_backup {
            let _ = fs::remove_file(self.backup_path());
        }

        tracing::trace!(
            "会话日志已写入 {} ({} 字节)",
            self.path.display(),
            staged.expected_len
        );
        Ok(())
    }

    fn rollback(&self) {
        let temp = self.temp_path();
        if temp.exists() {
            let _ = fs::remove_file(&temp);
        }

        let backup = self.backup_path();
        if backup.exists() {
            if let Err(e) = replace(&backup, &self.path) {
                tracing::error!("从备份恢复会话日志失败: {}", e);
            }
        }
    }
}

/// 部分平台不允许改名覆盖已有文件，需先删除
fn replace(from: &Path, to: &Path) -> std::io::Result<()> {
    #[cfg(windows)]
    {
        if to.exists() {
            fs::remove_file(to)?;
        }
    }

    fs::rename(from, to)
}

fn sync_parent(path: &Path) {
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }
}
