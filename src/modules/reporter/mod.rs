pub mod models;
pub mod text;

use crate::modules::common::error::CleanerError;
use serde::Serialize;

/// 以格式化 JSON 输出任意报告
pub fn to_json<T: Serialize>(report: &T) -> Result<String, CleanerError> {
    Ok(serde_json::to_string_pretty(report)?)
}
