use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 初始化诊断日志（stderr + 按天滚动的文件）
///
/// 返回的 guard 必须在进程结束前保持存活，否则文件日志可能丢失末尾内容。
pub fn init_logging(verbose: bool) -> Option<WorkerGuard> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("rust_qingli={},rust_qingli_lib={},warn", level, level))
    });

    let log_dir = get_log_dir();

    // 日志目录创建失败时只输出到 stderr
    if std::fs::create_dir_all(&log_dir).is_err() {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "rust-qingli.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let _ = subscriber.try_init();

    Some(guard)
}

/// 诊断日志目录（与会话日志分开存放）
pub fn get_log_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("rust-qingli")
        .join("logs")
}
