use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const KEY_FILE_NAME: &str = ".anonymize.key";
const FALLBACK_MASK: &str = "***";

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
    })
}

fn ipv4_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b")
            .expect("valid ipv4 regex")
    })
}

fn user_dir_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(/home/|/Users/|[A-Z]:\\Users\\|[A-Z]:\\Documents and Settings\\)([^/\\\s]+)")
            .expect("valid user dir regex")
    })
}

#[derive(Debug)]
pub struct Anonymizer {
    key_path: PathBuf,
    key: OnceLock<Option<String>>,
}

impl Anonymizer {
    /// 密钥文件位于 `dir` 下，首次使用时才读取或创建
    pub fn new(dir: &Path) -> Self {
        Self {
            key_path: dir.join(KEY_FILE_NAME),
            key: OnceLock::new(),
        }
    }

    fn key(&self) -> Option<&str> {
        self.key
            .get_or_init(|| match load_or_create_key(&self.key_path) {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::warn!("脱敏密钥不可用, 使用固定掩码: {}", e);
                    None
                }
            })
            .as_deref()
    }

    /// 生成某个值的替代标记
    pub fn token(&self, kind: &str, value: &str) -> String {
        match self.key() {
            Some(key) => {
                let mut hasher = Sha256::new();
                hasher.update(key.as_bytes());
                hasher.update(b":");
                hasher.update(value.as_bytes());
                let digest = hex::encode(hasher.finalize());
                format!("{}-{}", kind, &digest[..10])
            }
            None => format!("{}-{}", kind, FALLBACK_MASK),
        }
    }

    /// 脱敏一段自由文本
    pub fn mask(&self, text: &str) -> String {
        let text = email_regex().replace_all(text, |caps: &Captures| self.token("email", &caps[0]));
        let text = ipv4_regex().replace_all(&text, |caps: &Captures| self.token("ip", &caps[0]));
        let text = user_dir_regex().replace_all(&text, |caps: &Captures| {
            format!("{}{}", &caps[1], self.token("user", &caps[2]))
        });
        text.into_owned()
    }
}

fn load_or_create_key(path: &Path) -> std::io::Result<String> {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let existing = existing.trim();
        if !existing.is_empty() {
            return Ok(existing.to_string());
        }
    }

    let key = format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    std::fs::write(path, &key)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }

    tracing::debug!("已创建脱敏密钥: {}", path.display());
    Ok(key)
}

/// 当前主机名（未脱敏）
pub fn host_name() -> String {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .ok()
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 当前用户名（未脱敏）
pub fn user_name() -> String {
    std::env::var("USERNAME")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "unknown".to_string())
}
