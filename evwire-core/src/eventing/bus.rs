//! 事件总线（EventBus）协议
//!
//! 排队分发模式只依赖这两个操作。两者都不阻塞调用方：
//! `publish` 入队即返回（无界队列），`subscribe` 启动后台消费者后立即返回。
//!
use super::bus_inmemory::ConsumerHandle;
use super::handler::IntoHandlerResult;
use crate::descriptor::Payload;
use crate::error::BindingResult;

/// 事件总线：按载荷类型路由
///
/// 该 trait 带有泛型方法，通常以具体实现类型注入使用。
pub trait EventBus: Send + Sync {
    /// 将事件放入其类型对应的队列
    fn publish<T: Payload>(&self, event: T) -> BindingResult<()>;

    /// 为类型 `T` 的队列注册一个消费者，每次调用启动一个独立的消费任务
    fn subscribe<T, F, R>(&self, handler: F) -> BindingResult<ConsumerHandle>
    where
        T: Payload,
        F: Fn(T) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static;
}
