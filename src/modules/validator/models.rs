use crate::modules::common::filesystem::EntryKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 一个待删除的候选条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// 链接解析后的真实目标
    pub resolved: Option<PathBuf>,
}

/// 通过校验的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub entry: FilesystemEntry,
    /// 实际删除时必须使用的路径
    pub target: PathBuf,
}

/// 拒绝原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Rejection {
    /// 联接点 / 目录重解析点
    JunctionPoint,
    /// 硬链接数大于 1
    HardLink(u64),
    /// 链接无法解析（断链、无权限）
    UnresolvableLink(String),
    /// 解析后的路径不在任何允许根目录内
    OutsideAllowedScope(PathBuf),
    /// 条目已不存在
    Missing,
    /// 条目无法读取
    Inaccessible(String),
    /// 目录内含有联接点或硬链接
    UnsafeDescendant { path: PathBuf, reason: Box<Rejection> },
}

impl Rejection {
    /// 稳定的原因代码
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::JunctionPoint => "JunctionPoint",
            Rejection::HardLink(_) => "HardLink",
            Rejection::UnresolvableLink(_) => "UnresolvableLink",
            Rejection::OutsideAllowedScope(_) => "OutsideAllowedScope",
            Rejection::Missing => "Missing",
            Rejection::Inaccessible(_) => "Inaccessible",
            Rejection::UnsafeDescendant { .. } => "UnsafeDescendant",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::JunctionPoint => write!(f, "JunctionPoint: 联接点不允许删除"),
            Rejection::HardLink(n) => write!(f, "HardLink: 文件有 {} 个硬链接", n),
            Rejection::UnresolvableLink(e) => write!(f, "UnresolvableLink: {}", e),
            Rejection::OutsideAllowedScope(p) => {
                write!(f, "OutsideAllowedScope: {} 不在允许范围内", p.display())
            }
            Rejection::Missing => write!(f, "Missing: 条目已不存在"),
            Rejection::Inaccessible(e) => write!(f, "Inaccessible: {}", e),
            Rejection::UnsafeDescendant { path, reason } => {
                write!(f, "UnsafeDescendant: {} ({})", path.display(), reason)
            }
        }
    }
}
