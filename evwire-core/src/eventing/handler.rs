//! 事件处理器（handler）返回值约定
//!
//! 处理方法既可以返回 `()`，也可以返回 `Result<(), E>`（`E: Into<anyhow::Error>`），
//! 在装配层统一归一为 [`HandlerResult`]。
//!
use std::any::Any;
use std::sync::Arc;

/// 处理结果（类型擦除后统一为 anyhow）
pub type HandlerResult = anyhow::Result<()>;

/// 类型擦除后的回调：入参为 `&dyn Any` 形式的载荷
pub(crate) type ErasedCallback = Arc<dyn Fn(&dyn Any) -> HandlerResult + Send + Sync>;

/// 将处理方法的返回值归一为 [`HandlerResult`]
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HandlerResult {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(Into::into)
    }
}
