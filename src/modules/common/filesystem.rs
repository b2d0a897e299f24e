use super::utils;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 条目类型（不跟随链接）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// 目录联接点 / 重解析点
    Junction,
    Other,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
            EntryKind::Symlink => write!(f, "symlink"),
            EntryKind::Junction => write!(f, "junction"),
            EntryKind::Other => write!(f, "other"),
        }
    }
}

/// 单个条目的元信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    pub kind: EntryKind,
    pub link_count: u64,
    pub len: u64,
}

/// 校验与删除只通过此接口访问文件系统
pub trait FileSystem: Send + Sync {
    /// 读取条目信息，不跟随链接
    fn inspect(&self, path: &Path) -> io::Result<EntryInfo>;

    /// 解析链接的最终真实目标
    fn resolve(&self, path: &Path) -> io::Result<PathBuf>;

    /// 规范化路径（解析父目录中的别名，不解析条目本身）
    fn normalize(&self, path: &Path) -> PathBuf;

    /// 列出目录下的全部子孙条目，不跟随链接
    fn descendants(&self, dir: &Path) -> io::Result<Vec<(PathBuf, EntryInfo)>>;

    /// 删除条目，返回释放的字节数；条目已不存在视为成功
    fn remove(&self, path: &Path) -> io::Result<u64>;
}

/// 真实文件系统
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFs;

impl FileSystem for NativeFs {
    fn inspect(&self, path: &Path) -> io::Result<EntryInfo> {
        let meta = std::fs::symlink_metadata(path)?;
        let kind = classify(&meta);
        let link_count = if kind == EntryKind::File {
            link_count(path, &meta)?
        } else {
            1
        };

        Ok(EntryInfo {
            kind,
            link_count,
            len: meta.len(),
        })
    }

    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        let lexical = utils::normalize_path(path);

        match (lexical.parent(), lexical.file_name()) {
            (Some(parent), Some(name)) => match std::fs::canonicalize(parent) {
                Ok(parent) => parent.join(name),
                Err(_) => lexical,
            },
            _ => utils::canonical_or_normalized(&lexical),
        }
    }

    fn descendants(&self, dir: &Path) -> io::Result<Vec<(PathBuf, EntryInfo)>> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).follow_links(false) {
            let entry = entry?;
            let meta = std::fs::symlink_metadata(entry.path())?;
            let kind = classify(&meta);
            let link_count = if kind == EntryKind::File {
                link_count(entry.path(), &meta)?
            } else {
                1
            };
            entries.push((
                entry.into_path(),
                EntryInfo {
                    kind,
                    link_count,
                    len: meta.len(),
                },
            ));
        }

        Ok(entries)
    }

    fn remove(&self, path: &Path) -> io::Result<u64> {
        let meta = match std::fs::symlink_metadata(path) {
            Ok(meta) => meta,
            // 目标已不存在，视为成功
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        if meta.is_dir() {
            let bytes_freed = utils::calculate_dir_size(path).unwrap_or(0);
            std::fs::remove_dir_all(path)?;
            Ok(bytes_freed)
        } else {
            let bytes_freed = meta.len();
            std::fs::remove_file(path)?;
            Ok(bytes_freed)
        }
    }
}

#[cfg(unix)]
fn classify(meta: &std::fs::Metadata) -> EntryKind {
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

#[cfg(windows)]
fn classify(meta: &std::fs::Metadata) -> EntryKind {
    use std::os::windows::fs::MetadataExt;
    use windows::Win32::Storage::FileSystem::{FILE_ATTRIBUTE_DIRECTORY, FILE_ATTRIBUTE_REPARSE_POINT};

    let attributes = meta.file_attributes();
    let is_reparse = attributes & FILE_ATTRIBUTE_REPARSE_POINT.0 != 0;
    let is_dir = attributes & FILE_ATTRIBUTE_DIRECTORY.0 != 0;

    // 目录型重解析点（联接点、目录符号链接）一律按联接点处理
    if is_reparse && is_dir {
        EntryKind::Junction
    } else if meta.file_type().is_symlink() {
        EntryKind::Symlink
    } else if is_dir {
        EntryKind::Directory
    } else if meta.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

#[cfg(not(any(unix, windows)))]
fn classify(meta: &std::fs::Metadata) -> EntryKind {
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

#[cfg(unix)]
fn link_count(_path: &Path, meta: &std::fs::Metadata) -> io::Result<u64> {
    use std::os::unix::fs::MetadataExt;
    Ok(meta.nlink())
}

#[cfg(windows)]
#[allow(unsafe_code)]
fn link_count(path: &Path, _meta: &std::fs::Metadata) -> io::Result<u64> {
    use std::os::windows::io::AsRawHandle;
    use windows::Win32::Foundation::HANDLE;
    use windows::Win32::Storage::FileSystem::{GetFileInformationByHandle, BY_HANDLE_FILE_INFORMATION};

    let file = std::fs::File::open(path)?;
    let mut info = BY_HANDLE_FILE_INFORMATION::default();

    // SAFETY: 句柄在 file 存活期间有效，info 为本地可写结构体
    unsafe { GetFileInformationByHandle(HANDLE(file.as_raw_handle()), &mut info) }
        .map_err(|e| io::Error::other(e.to_string()))?;

    Ok(u64::from(info.nNumberOfLinks))
}

#[cfg(not(any(unix, windows)))]
fn link_count(_path: &Path, _meta: &std::fs::Metadata) -> io::Result<u64> {
    Ok(1)
}

#[cfg(test)]
pub(crate) mod testing {
    //! 内存中的假文件系统

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    struct FakeEntry {
        info: EntryInfo,
        target: Option<PathBuf>,
        remove_error: Option<io::ErrorKind>,
    }

    #[derive(Debug, Default)]
    pub struct FakeFs {
        entries: Mutex<HashMap<PathBuf, FakeEntry>>,
        removed: Mutex<Vec<PathBuf>>,
    }

    impl FakeFs {
        pub fn new() -> Self {
            Self::default()
        }

        fn insert(&self, path: &Path, kind: EntryKind, link_count: u64, len: u64, target: Option<PathBuf>) {
            self.entries.lock().unwrap().insert(
                path.to_path_buf(),
                FakeEntry {
                    info: EntryInfo {
                        kind,
                        link_count,
                        len,
                    },
                    target,
                    remove_error: None,
                },
            );
        }

        pub fn add_file(&self, path: impl AsRef<Path>, len: u64) {
            self.insert(path.as_ref(), EntryKind::File, 1, len, None);
        }

        pub fn add_dir(&self, path: impl AsRef<Path>) {
            self.insert(path.as_ref(), EntryKind::Directory, 1, 0, None);
        }

        pub fn add_hard_link(&self, path: impl AsRef<Path>, links: u64, len: u64) {
            self.insert(path.as_ref(), EntryKind::File, links, len, None);
        }

        pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
            self.insert(path.as_ref(), EntryKind::Symlink, 1, 0, Some(target.as_ref().to_path_buf()));
        }

        pub fn add_junction(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
            self.insert(path.as_ref(), EntryKind::Junction, 1, 0, Some(target.as_ref().to_path_buf()));
        }

        pub fn fail_removal(&self, path: impl AsRef<Path>, kind: io::ErrorKind) {
            if let Some(entry) = self.entries.lock().unwrap().get_mut(path.as_ref()) {
                entry.remove_error = Some(kind);
            }
        }

        pub fn exists(&self, path: impl AsRef<Path>) -> bool {
            self.entries.lock().unwrap().contains_key(path.as_ref())
        }

        pub fn removed(&self) -> Vec<PathBuf> {
            self.removed.lock().unwrap().clone()
        }
    }

    impl FileSystem for FakeFs {
        fn inspect(&self, path: &Path) -> io::Result<EntryInfo> {
            self.entries
                .lock()
                .unwrap()
                .get(path)
                .map(|e| e.info)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }

        fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
            let entries = self.entries.lock().unwrap();
            let mut current = path.to_path_buf();

            // 最多跟随 32 层，防止链接环
            for _ in 0..32 {
                let entry = entries
                    .get(&current)
                    .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
                match &entry.target {
                    Some(target) => current = target.clone(),
                    None => return Ok(current),
                }
            }

            Err(io::Error::other("too many levels of symbolic links"))
        }

        fn normalize(&self, path: &Path) -> PathBuf {
            utils::normalize_path(path)
        }

        fn descendants(&self, dir: &Path) -> io::Result<Vec<(PathBuf, EntryInfo)>> {
            let entries = self.entries.lock().unwrap();
            let mut nested: Vec<_> = entries
                .iter()
                .filter(|(path, _)| path.starts_with(dir) && path.as_path() != dir)
                .map(|(path, entry)| (path.clone(), entry.info))
                .collect();
            nested.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(nested)
        }

        fn remove(&self, path: &Path) -> io::Result<u64> {
            let mut entries = self.entries.lock().unwrap();
            let Some(entry) = entries.get(path) else {
                return Ok(0);
            };
            if let Some(kind) = entry.remove_error {
                return Err(io::Error::from(kind));
            }
            let len = entry.info.len;
            entries.remove(path);
            self.removed.lock().unwrap().push(path.to_path_buf());
            Ok(len)
        }
    }
}
