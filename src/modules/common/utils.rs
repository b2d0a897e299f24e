use std::path::{Component, Path, PathBuf};

/// 当前平台的文件系统是否默认大小写不敏感
pub const CASE_INSENSITIVE_FS: bool = cfg!(any(windows, target_os = "macos"));

/// 词法规范化路径（去掉 `.`，折叠 `..`，不访问文件系统）
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // 根目录之上没有父目录
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}

/// 尽量解析为真实路径；失败时退回词法规范化
pub fn canonical_or_normalized(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| normalize_path(path))
}

/// 按路径组件判断 `path` 是否位于 `root` 之内（含 `root` 本身）
pub fn path_within(path: &Path, root: &Path, case_insensitive: bool) -> bool {
    let mut path_components = path.components();

    for root_component in root.components() {
        let Some(path_component) = path_components.next() else {
            return false;
        };

        let a = path_component.as_os_str().to_string_lossy();
        let b = root_component.as_os_str().to_string_lossy();

        let same = if case_insensitive {
            a.to_lowercase() == b.to_lowercase()
        } else {
            a == b
        };

        if !same {
            return false;
        }
    }

    true
}

/// 计算目录大小
pub fn calculate_dir_size(path: &Path) -> std::io::Result<u64> {
    let mut size = 0u64;

    if path.is_file() {
        return path.metadata().map(|m| m.len());
    }

    for entry in walkdir::WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() {
            if let Ok(metadata) = entry.metadata() {
                size += metadata.len();
            }
        }
    }

    Ok(size)
}

/// 格式化文件大小
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// 格式化时长（秒，保留两位小数）
pub fn format_duration(duration: chrono::Duration) -> String {
    let millis = duration.num_milliseconds().max(0);
    format!("{:.2}s", millis as f64 / 1000.0)
}
