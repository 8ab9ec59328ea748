//! 中介层统一错误定义
//!
//! 处理器的业务错误在扇出边界被捕获为值（见 `HandlerOutcome`），
//! 只有缺失请求处理器与类型不匹配这类编程错误才会直接返回给调用方。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediatorError {
    // --- 处理器解析 ---
    #[error("handler not found: {message}")]
    HandlerNotFound { message: &'static str },
    #[error("handler already registered: request={request}, response={response}")]
    AlreadyRegistered {
        request: &'static str,
        response: &'static str,
    },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    // --- 本地订阅 ---
    #[error("duplicate subscription: event={event}")]
    DuplicateSubscription { event: &'static str },
    #[error("no subscription for event type: {event}")]
    NoSubscriptionForType { event: &'static str },

    // --- 处理器执行 ---
    #[error("event handler error: handler={handler}, reason={reason}")]
    HandlerFailed { handler: String, reason: String },

    // --- 队列与处理循环 ---
    #[error("event queue closed")]
    QueueClosed,
    #[error("operation cancelled")]
    Cancelled,
    #[error("event processor already running")]
    ProcessorRunning,

    // --- 审计与配置 ---
    #[error("audit error: {reason}")]
    Audit { reason: String },
    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl MediatorError {
    pub(crate) fn handler_failed(handler: &str, err: anyhow::Error) -> Self {
        Self::HandlerFailed {
            handler: handler.to_string(),
            reason: format!("{err:#}"),
        }
    }

    /// 是否属于不可恢复的编程错误（注册缺失、类型不匹配）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::HandlerNotFound { .. } | Self::TypeMismatch { .. }
        )
    }
}

/// 统一 Result 类型别名
pub type MediatorResult<T> = Result<T, MediatorError>;

impl From<serde_json::Error> for MediatorError {
    fn from(err: serde_json::Error) -> Self {
        MediatorError::Audit {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for MediatorError {
    fn from(err: std::io::Error) -> Self {
        MediatorError::Audit {
            reason: err.to_string(),
        }
    }
}
