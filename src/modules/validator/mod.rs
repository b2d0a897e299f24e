//! 删除前的路径安全校验
//!
//! 检查顺序固定：联接点、硬链接在任何解析之前拒绝；只有符号链接会被解析，
//! 最终用解析后的路径与允许根目录做前缀比较。

pub mod models;

use crate::modules::common::filesystem::{EntryKind, FileSystem};
use crate::modules::common::utils;
use models::{Accepted, FilesystemEntry, Rejection};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct PathValidator {
    fs: Arc<dyn FileSystem>,
    case_insensitive: bool,
}

impl std::fmt::Debug for PathValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathValidator")
            .field("case_insensitive", &self.case_insensitive)
            .finish()
    }
}

impl PathValidator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            case_insensitive: utils::CASE_INSENSITIVE_FS,
        }
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// 校验单个条目
    pub fn validate(
        &self,
        path: &Path,
        allowed_roots: &[PathBuf],
        is_directory_hint: bool,
    ) -> Result<Accepted, Rejection> {
        let info = match self.fs.inspect(path) {
            Ok(info) => info,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Rejection::Missing),
            Err(e) => return Err(Rejection::Inaccessible(e.to_string())),
        };

        // 1. 联接点无条件拒绝；Windows 上目录提示的符号链接同样是目录重解析点
        if info.kind == EntryKind::Junction
            || (is_directory_hint && cfg!(windows) && info.kind == EntryKind::Symlink)
        {
            return Err(Rejection::JunctionPoint);
        }

        // 2. 硬链接
        if info.kind == EntryKind::File && info.link_count > 1 {
            return Err(Rejection::HardLink(info.link_count));
        }

        // 3. 符号链接解析为真实目标
        let resolved = if info.kind == EntryKind::Symlink {
            match self.fs.resolve(path) {
                Ok(target) => Some(target),
                Err(e) => return Err(Rejection::UnresolvableLink(e.to_string())),
            }
        } else {
            None
        };

        // 4. 与允许根目录比较（根目录本身也可能是链接）
        let target = match &resolved {
            Some(target) => utils::normalize_path(target),
            None => self.fs.normalize(path),
        };

        let inside = allowed_roots.iter().any(|root| {
            let root = self.resolve_root(root);
            utils::path_within(&target, &root, self.case_insensitive)
        });

        if !inside {
            tracing::debug!("拒绝越界路径: {} -> {}", path.display(), target.display());
            return Err(Rejection::OutsideAllowedScope(target));
        }

        // 5. 链接目标同样不能是硬链接
        let target_kind = if resolved.is_some() {
            let target_info = self
                .fs
                .inspect(&target)
                .map_err(|e| Rejection::UnresolvableLink(e.to_string()))?;
            if target_info.kind == EntryKind::File && target_info.link_count > 1 {
                return Err(Rejection::HardLink(target_info.link_count));
            }
            target_info.kind
        } else {
            info.kind
        };

        // 6. 目录整体删除，子孙条目中不能有联接点或硬链接
        if target_kind == EntryKind::Directory {
            self.check_descendants(&target)?;
        }

        Ok(Accepted {
            entry: FilesystemEntry {
                path: path.to_path_buf(),
                kind: info.kind,
                resolved,
            },
            target,
        })
    }
}

impl PathValidator {
    fn resolve_root(&self, root: &Path) -> PathBuf {
        match self.fs.resolve(root) {
            Ok(resolved) => utils::normalize_path(&resolved),
            Err(_) => self.fs.normalize(root),
        }
    }

    fn check_descendants(&self, dir: &Path) -> Result<(), Rejection> {
        let entries = self
            .fs
            .descendants(dir)
            .map_err(|e| Rejection::Inaccessible(e.to_string()))?;

        for (path, info) in entries {
            let reason = match info.kind {
                EntryKind::Junction => Rejection::JunctionPoint,
                EntryKind::File if info.link_count > 1 => Rejection::HardLink(info.link_count),
                _ => continue,
            };
            tracing::debug!("目录 {} 含有不安全条目: {}", dir.display(), path.display());
            return Err(Rejection::UnsafeDescendant {
                path,
                reason: Box::new(reason),
            });
        }

        Ok(())
    }
}
