use super::error::CleanerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_COOLDOWN_SECONDS: i64 = 5;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_SCAN_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_REFRESH_INTERVAL_SECONDS: i64 = 2;
pub const DEFAULT_MIN_FREE_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 会话日志目录
    pub log_dir: PathBuf,
    pub retention_days: i64,
    pub cooldown_seconds: i64,
    pub workers: usize,
    pub scan_timeout_seconds: u64,
    /// 全局允许删除的根目录；为空时使用各类别自己的 roots
    pub allowed_roots: Vec<PathBuf>,
    /// 写会话日志前日志卷至少需要的剩余空间
    pub min_free_bytes: u64,
    pub categories: Vec<CategoryConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_dir: default_session_dir(),
            retention_days: DEFAULT_RETENTION_DAYS,
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            workers: DEFAULT_WORKERS,
            scan_timeout_seconds: DEFAULT_SCAN_TIMEOUT_SECONDS,
            allowed_roots: Vec::new(),
            min_free_bytes: DEFAULT_MIN_FREE_BYTES,
            categories: vec![CategoryConfig::temp_files()],
        }
    }
}

/// 单个清理类别的配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub id: String,
    pub label: String,
    pub roots: Vec<PathBuf>,
    /// 匹配文件名的 glob 模式
    pub patterns: Vec<String>,
    /// 排除的文件名 glob 模式
    pub exclude: Vec<String>,
    pub min_age_hours: Option<u64>,
    pub max_depth: Option<usize>,
    pub refresh_interval_seconds: i64,
    /// 界面批量勾选时是否默认选中
    pub safe_by_default: bool,
    pub warning: Option<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            label: String::new(),
            roots: Vec::new(),
            patterns: vec!["*".to_string()],
            exclude: Vec::new(),
            min_age_hours: None,
            max_depth: None,
            refresh_interval_seconds: DEFAULT_REFRESH_INTERVAL_SECONDS,
            safe_by_default: false,
            warning: None,
        }
    }
}

impl CategoryConfig {
    /// 内置的临时文件类别
    pub fn temp_files() -> Self {
        Self {
            id: "temp_files".to_string(),
            label: "临时文件".to_string(),
            roots: vec![std::env::temp_dir()],
            min_age_hours: Some(24),
            max_depth: Some(1),
            safe_by_default: true,
            ..Self::default()
        }
    }
}

impl AppConfig {
    /// 加载配置
    pub fn load(path: Option<&Path>) -> Result<Self, CleanerError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(CleanerError::Config(format!(
                    "配置文件不存在: {}",
                    path.display()
                )));
            }
            tracing::debug!("未找到配置文件 {}, 使用默认配置", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!("已加载配置: {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, CleanerError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CleanerError> {
        if self.workers == 0 {
            return Err(CleanerError::Config("workers 必须大于 0".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for category in &self.categories {
            if category.id.trim().is_empty() {
                return Err(CleanerError::Config("类别 id 不能为空".to_string()));
            }
            if !seen.insert(category.id.as_str()) {
                return Err(CleanerError::Config(format!(
                    "类别 id 重复: {}",
                    category.id
                )));
            }
            for root in &category.roots {
                if !root.is_absolute() {
                    return Err(CleanerError::Config(format!(
                        "类别 {} 的根目录必须是绝对路径: {}",
                        category.id,
                        root.display()
                    )));
                }
            }
            for pattern in category.patterns.iter().chain(&category.exclude) {
                glob::Pattern::new(pattern).map_err(|e| {
                    CleanerError::Config(format!("无效的 glob 模式 {}: {}", pattern, e))
                })?;
            }
        }

        for root in &self.allowed_roots {
            if !root.is_absolute() {
                return Err(CleanerError::Config(format!(
                    "allowed_roots 必须是绝对路径: {}",
                    root.display()
                )));
            }
        }

        Ok(())
    }

    /// 某个类别实际生效的允许根目录
    pub fn allowed_roots_for(&self, category: &CategoryConfig) -> Vec<PathBuf> {
        if self.allowed_roots.is_empty() {
            category.roots.clone()
        } else {
            self.allowed_roots.clone()
        }
    }

    pub fn find_category(&self, id: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.id == id)
    }
}

/// 默认配置文件路径
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rust-qingli")
        .join("config.toml")
}

/// 默认会话日志目录
pub fn default_session_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rust-qingli")
        .join("sessions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_falls_back_to_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.retention_days, DEFAULT_RETENTION_DAYS);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.categories.len(), 1);
        assert_eq!(config.categories[0].id, "temp_files");
    }

    #[test]
    fn categories_are_parsed_with_per_field_defaults() {
        let root = if cfg!(windows) { r"C:\cache" } else { "/var/cache/app" };
        let content = format!(
            r#"
workers = 2
cooldown_seconds = 10

[[categories]]
id = "app_cache"
label = "应用缓存"
roots = ['{}']
patterns = ["*.cache"]
"#,
            root
        );

        let config = AppConfig::from_toml(&content).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.cooldown_seconds, 10);
        let category = config.find_category("app_cache").unwrap();
        assert_eq!(category.refresh_interval_seconds, DEFAULT_REFRESH_INTERVAL_SECONDS);
        assert!(!category.safe_by_default);
        assert_eq!(config.allowed_roots_for(category), vec![PathBuf::from(root)]);
    }

    #[test]
    fn duplicate_ids_and_relative_roots_are_rejected() {
        let duplicate = r#"
[[categories]]
id = "a"
[[categories]]
id = "a"
"#;
        assert!(matches!(
            AppConfig::from_toml(duplicate),
            Err(CleanerError::Config(_))
        ));

        let relative = r#"
[[categories]]
id = "a"
roots = ["relative/dir"]
"#;
        assert!(matches!(
            AppConfig::from_toml(relative),
            Err(CleanerError::Config(_))
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let missing = std::env::temp_dir().join(format!(
            "rust-qingli-missing-{}.toml",
            uuid::Uuid::new_v4()
        ));
        assert!(AppConfig::load(Some(&missing)).is_err());
    }
}
