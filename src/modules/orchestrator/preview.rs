use super::models::{CategoryReport, PreviewReport, ScanOutcome};
use super::ScanOrchestrator;
use crate::modules::common::error::CleanerError;
use crate::modules::scanner::models::ScanCategory;

impl ScanOrchestrator {
    /// 预览所有（或指定）类别
    ///
    /// `ids` 为 `None` 时预览全部已注册类别。过期类别并行重新扫描，其余直接复用缓存；
    /// 未知类别 ID 返回错误，单个类别的扫描失败只影响该类别。
    pub async fn preview_all(&self, ids: Option<&[String]>) -> Result<PreviewReport, CleanerError> {
        let selected: Vec<ScanCategory> = match ids {
            Some(ids) => ids
                .iter()
                .map(|id| self.category(id).cloned())
                .collect::<Result<_, _>>()?,
            None => self.categories().to_vec(),
        };

        let now = self.clock.now();
        let mut slots: Vec<Option<CategoryReport>> = Vec::with_capacity(selected.len());
        let mut handles = Vec::new();

        for (index, category) in selected.iter().enumerate() {
            if !self.cache.needs_refresh(&category.id, now) {
                if let Some(last) = self.cache.get_last(&category.id, now) {
                    tracing::debug!("类别 {} 使用缓存结果", category.id);
                    slots.push(Some(report(
                        category,
                        ScanOutcome::Available {
                            count: last.count,
                            size_bytes: last.size_bytes,
                        },
                        true,
                    )));
                    continue;
                }
            }

            slots.push(None);
            let orchestrator = self.clone();
            let category = category.clone();
            handles.push((
                index,
                tokio::spawn(async move {
                    let result = orchestrator.run_scan(&category).await;
                    orchestrator.settle(&category, result)
                }),
            ));
        }

        tracing::debug!("预览: {} 个类别需要重新扫描", handles.len());

        // 每个扫描都有超时，这里不会无限等待
        for (index, handle) in handles {
            let category_report = match handle.await {
                Ok(category_report) => category_report,
                Err(e) => {
                    let category = &selected[index];
                    tracing::error!("类别 {} 的扫描任务异常: {}", category.id, e);
                    self.settle(category, Err(CleanerError::from(e)))
                }
            };
            slots[index] = Some(category_report);
        }

        let categories = slots.into_iter().flatten().collect();
        Ok(PreviewReport::new(self.clock.now(), categories))
    }

    /// 记录扫描结果并生成该类别的报告
    fn settle(
        &self,
        category: &ScanCategory,
        result: Result<crate::modules::scanner::models::ScanOutput, CleanerError>,
    ) -> CategoryReport {
        match result {
            Ok(output) => {
                self.cache
                    .record_result(&category.id, output.count, output.total_size, self.clock.now());
                report(
                    category,
                    ScanOutcome::Available {
                        count: output.count,
                        size_bytes: output.total_size,
                    },
                    false,
                )
            }
            Err(e) => {
                tracing::warn!("类别 {} 扫描失败: {}", category.id, e);
                let last_known = self.cache.get_last(&category.id, self.clock.now());
                report(
                    category,
                    ScanOutcome::Unavailable {
                        reason: e.to_string(),
                        last_known,
                    },
                    false,
                )
            }
        }
    }
}

fn report(category: &ScanCategory, outcome: ScanOutcome, from_cache: bool) -> CategoryReport {
    CategoryReport {
        id: category.id.clone(),
        label: category.label.clone(),
        outcome,
        from_cache,
        safe_by_default: category.safe_by_default,
        warning: category.warning.clone(),
    }
}
