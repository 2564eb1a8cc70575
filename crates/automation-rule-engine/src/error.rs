//! 规则引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("历史回溯查询失败: {0}")]
    LookbackFailed(String),

    #[error("历史回溯查询超时（{0} 毫秒）")]
    LookbackTimeout(u64),

    #[error("动作执行失败: {0}")]
    ActionFailed(String),

    #[error("动作执行超时（{0} 毫秒）")]
    ActionTimeout(u64),

    #[error("无效的窗口配置: {0}")]
    InvalidWindow(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
