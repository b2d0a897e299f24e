use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("文件系统错误: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("未知类别: {0}")]
    UnknownCategory(String),

    #[error("扫描失败: {0}")]
    Scan(String),

    #[error("超时: {0}")]
    Timeout(String),

    #[error("日志目录不可用: {0}")]
    LogDirectory(String),

    #[error("磁盘空间不足: 剩余 {available} 字节, 至少需要 {required} 字节")]
    LowDiskSpace { available: u64, required: u64 },

    #[error("日志写入失败: {0}")]
    LogWrite(String),

    #[error("未知操作句柄: {0}")]
    UnknownOperation(usize),

    #[error("操作已结束: {0}")]
    OperationClosed(usize),

    #[error("会话已结束, 不可再修改")]
    SessionFinalized,

    #[error("任务执行失败: {0}")]
    Task(String),

    #[error("序列化错误: {0}")]
    Serde(String),
}

impl serde::Serialize for CleanerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<tokio::task::JoinError> for CleanerError {
    fn from(e: tokio::task::JoinError) -> Self {
        CleanerError::Task(e.to_string())
    }
}

impl From<toml::de::Error> for CleanerError {
    fn from(e: toml::de::Error) -> Self {
        CleanerError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for CleanerError {
    fn from(e: serde_json::Error) -> Self {
        CleanerError::Serde(e.to_string())
    }
}
