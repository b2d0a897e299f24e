use super::models::{Operation, Session};
use crate::modules::common::utils;
use chrono::{DateTime, SecondsFormat, Utc};

pub const HEADER_TITLE: &str = "# rust-qingli 清理会话日志";
pub const SUMMARY_MARKER: &str = "=== summary ===";

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 单行化，保证一条记录只占一行
pub fn single_line(text: &str) -> String {
    text.replace(|c: char| c == '\r' || c == '\n', " ")
}

pub fn header(session: &Session, host_token: &str, user_token: &str) -> String {
    format!(
        "{}\nsession_id: {}\nstarted_at: {}\nhost: {}\nuser: {}\nos: {}\n---\n",
        HEADER_TITLE,
        session.id,
        ts(session.started_at),
        host_token,
        user_token,
        std::env::consts::OS,
    )
}

pub fn start_record(index: usize, op: &Operation) -> String {
    format!(
        "[{}] start #{} {} | {}\n",
        ts(op.started_at),
        index,
        single_line(&op.name),
        single_line(&op.description)
    )
}

pub fn detail_record(index: usize, at: DateTime<Utc>, text: &str) -> String {
    format!("[{}] detail #{} {}\n", ts(at), index, single_line(text))
}

pub fn end_record(index: usize, op: &Operation) -> String {
    let ended_at = op.ended_at.unwrap_or(op.started_at);
    let mut line = format!(
        "[{}] end #{} status={} files={} freed={} duration={}",
        ts(ended_at),
        index,
        op.status,
        op.files_deleted,
        op.space_freed,
        utils::format_duration(ended_at - op.started_at),
    );
    if let Some(error) = op.errors.last() {
        line.push_str(&format!(" error={}", single_line(error)));
    }
    line.push('\n');
    line
}

pub fn summary(session: &Session) -> String {
    let ended_at = session.ended_at.unwrap_or(session.started_at);
    let s = &session.summary;

    let mut out = format!(
        "{}\nended_at: {}\nduration: {}\ntotal_files_deleted: {}\ntotal_space_freed: {}\nspace_freed_human: {}\noperations_completed: {}\noperations_failed: {}\noperations:\n",
        SUMMARY_MARKER,
        ts(ended_at),
        utils::format_duration(ended_at - session.started_at),
        s.total_files_deleted,
        s.total_space_freed,
        utils::format_size(s.total_space_freed),
        s.operations_completed,
        s.operations_failed,
    );

    for (index, op) in session.operations.iter().enumerate() {
        out.push_str(&format!(
            "  #{} {} status={} files={} freed={} duration={}",
            index,
            single_line(&op.name),
            op.status,
            op.files_deleted,
            op.space_freed,
            op.duration()
                .map(utils::format_duration)
                .unwrap_or_else(|| "-".to_string()),
        ));
        if let Some(first) = op.errors.first() {
            out.push_str(&format!(" first_error={}", single_line(first)));
        }
        out.push('\n');
    }

    out
}
