use super::models::{Candidate, ScanOutput};
use crate::modules::common::config::CategoryConfig;
use crate::modules::common::error::CleanerError;
use crate::modules::common::utils;
use glob::Pattern;
use std::path::Path;
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

/// 按配置扫描文件系统类别
pub fn scan_category(config: &CategoryConfig) -> Result<ScanOutput, CleanerError> {
    let patterns = compile(&config.patterns)?;
    let excludes = compile(&config.exclude)?;
    let min_age = config
        .min_age_hours
        .map(|h| Duration::from_secs(h.saturating_mul(3600)));

    let mut output = ScanOutput::default();

    for root in &config.roots {
        if !root.exists() {
            tracing::debug!("类别 {} 的根目录不存在: {}", config.id, root.display());
            continue;
        }

        tracing::debug!("扫描目录: {}", root.display());
        scan_directory(root, config.max_depth, &patterns, &excludes, min_age, &mut output);
    }

    output.count = output.candidates.len() as u64;
    Ok(output)
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, CleanerError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| CleanerError::Config(format!("无效的 glob 模式 {}: {}", p, e)))
        })
        .collect()
}

fn scan_directory(
    root: &Path,
    max_depth: Option<usize>,
    patterns: &[Pattern],
    excludes: &[Pattern],
    min_age: Option<Duration>,
    output: &mut ScanOutput,
) {
    let mut walker = WalkDir::new(root).min_depth(1).follow_links(false);
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    let now = SystemTime::now();
    let mut iter = walker.into_iter();

    while let Some(entry) = iter.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("跳过无法访问的条目: {}", e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().to_string();
        let is_dir = entry.file_type().is_dir();

        if excludes.iter().any(|p| p.matches(&name)) {
            if is_dir {
                iter.skip_current_dir();
            }
            continue;
        }

        if !patterns.iter().any(|p| p.matches(&name)) {
            continue;
        }

        if let Some(min_age) = min_age {
            let young = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|modified| now.duration_since(modified).ok())
                .map(|age| age < min_age)
                .unwrap_or(false);
            if young {
                continue;
            }
        }

        let size = if is_dir {
            utils::calculate_dir_size(entry.path()).unwrap_or(0)
        } else {
            entry.metadata().map(|m| m.len()).unwrap_or(0)
        };

        output.total_size += size;
        output.candidates.push(Candidate {
            path: entry.path().to_path_buf(),
            is_dir,
        });

        // 目录整体作为一个候选，子项不再重复计入
        if is_dir {
            iter.skip_current_dir();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("rust-qingli-scan-{}-{}", name, uuid::Uuid::new_v4()));
        fs::create_dir_all(&root).unwrap();
        root
    }

    fn config(root: &Path) -> CategoryConfig {
        CategoryConfig {
            id: "test".to_string(),
            label: "test".to_string(),
            roots: vec![root.to_path_buf()],
            ..CategoryConfig::default()
        }
    }

    #[test]
    fn matched_directories_are_single_candidates() {
        let root = temp_root("dirs");
        fs::create_dir_all(root.join("cache").join("deep")).unwrap();
        fs::write(root.join("cache").join("deep").join("x.bin"), vec![0u8; 7]).unwrap();
        fs::write(root.join("a.tmp"), vec![0u8; 3]).unwrap();

        let output = scan_category(&config(&root)).unwrap();

        assert_eq!(output.count, 2);
        assert_eq!(output.total_size, 10);
        assert!(output.candidates.contains(&Candidate::dir(root.join("cache"))));
        assert!(output.candidates.contains(&Candidate::file(root.join("a.tmp"))));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn patterns_and_excludes_filter_names() {
        let root = temp_root("patterns");
        fs::write(root.join("a.tmp"), b"1").unwrap();
        fs::write(root.join("b.log"), b"22").unwrap();
        fs::write(root.join("keep.tmp"), b"333").unwrap();

        let mut cfg = config(&root);
        cfg.patterns = vec!["*.tmp".to_string()];
        cfg.exclude = vec!["keep*".to_string()];

        let output = scan_category(&cfg).unwrap();
        assert_eq!(output.candidates, vec![Candidate::file(root.join("a.tmp"))]);
        assert_eq!(output.total_size, 1);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn young_entries_are_skipped_when_min_age_is_set() {
        let root = temp_root("age");
        fs::write(root.join("fresh.tmp"), b"1").unwrap();

        let mut cfg = config(&root);
        cfg.min_age_hours = Some(24);

        let output = scan_category(&cfg).unwrap();
        assert_eq!(output.count, 0);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_root_yields_empty_output() {
        let mut cfg = config(Path::new("/"));
        cfg.roots = vec![std::env::temp_dir().join(format!("rust-qingli-none-{}", uuid::Uuid::new_v4()))];

        assert_eq!(scan_category(&cfg).unwrap(), ScanOutput::default());
    }
}
