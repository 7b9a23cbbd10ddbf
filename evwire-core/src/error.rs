//! 事件装配统一错误定义
//!
//! 按关注点分组：解析（resolve）、激活（activate）、分发（dispatch）与配置，
//! 便于上层（例如 `evwire-scope`）统一包装为自身的错误类型。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventBindingError {
    // --- 解析 ---
    #[error("ambiguous publisher: payload={payload}, candidates={candidates:?}")]
    AmbiguousPublisher {
        payload: &'static str,
        candidates: Vec<&'static str>,
    },
    #[error("unbound handler: subscriber={subscriber}, method={method}, payload={payload}")]
    UnboundHandler {
        subscriber: &'static str,
        method: &'static str,
        payload: &'static str,
    },

    // --- 激活 ---
    #[error("instance mismatch: role={role}, expected={expected}")]
    InstanceMismatch {
        role: &'static str,
        expected: &'static str,
    },
    #[error("event bus unavailable: binding={binding} requires an in-memory event bus")]
    BusUnavailable { binding: String },

    // --- 分发 ---
    #[error("event handler error: handler={handler}, reason={source}")]
    Handler {
        handler: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("event bus closed")]
    BusClosed,
    #[error("no tokio runtime: {reason}")]
    NoRuntime { reason: String },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    // --- 配置 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },
}

/// 统一 Result 类型别名
pub type BindingResult<T> = Result<T, EventBindingError>;
