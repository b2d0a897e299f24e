pub mod filesystem;
pub mod models;

use crate::modules::common::config::{AppConfig, CategoryConfig};
use chrono::Duration;
use models::ScanCategory;
use std::sync::Arc;

/// 由配置构建一个文件系统类别
pub fn category_from_config(config: &CategoryConfig, allowed_roots: Vec<std::path::PathBuf>) -> ScanCategory {
    let scan_config = config.clone();
    let label = if config.label.is_empty() {
        config.id.clone()
    } else {
        config.label.clone()
    };

    ScanCategory::new(
        config.id.clone(),
        label,
        Arc::new(move || filesystem::scan_category(&scan_config)),
    )
    .with_refresh_interval(Duration::seconds(config.refresh_interval_seconds.max(0)))
    .with_allowed_roots(allowed_roots)
    .with_safe_by_default(config.safe_by_default)
    .with_warning(config.warning.clone())
}

/// 注册配置中的全部类别
pub fn categories_from_config(config: &AppConfig) -> Vec<ScanCategory> {
    config
        .categories
        .iter()
        .map(|c| category_from_config(c, config.allowed_roots_for(c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn categories_inherit_config_fields() {
        let mut config = AppConfig::default();
        config.categories[0].refresh_interval_seconds = 7;
        config.categories[0].warning = Some("可能正在使用".to_string());
        config.allowed_roots = vec![std::env::temp_dir()];

        let categories = categories_from_config(&config);
        assert_eq!(categories.len(), 1);
        let category = &categories[0];
        assert_eq!(category.id, "temp_files");
        assert_eq!(category.refresh_interval, Duration::seconds(7));
        assert!(category.safe_by_default);
        assert_eq!(category.allowed_roots, vec![std::env::temp_dir()]);
        assert_eq!(category.warning.as_deref(), Some("可能正在使用"));
    }

    #[test]
    fn empty_label_falls_back_to_id() {
        let config = CategoryConfig {
            id: "dns".to_string(),
            ..CategoryConfig::default()
        };
        let category = category_from_config(&config, vec![PathBuf::from("/")]);
        assert_eq!(category.label, "dns");
    }
}
