//! 事件子系统（eventing）
//!
//! 排队分发模式所需的基础设施：
//! - `EventBus`：`publish` / `subscribe` 协议（排队模式对总线的全部要求）；
//! - `InMemoryEventBus`：按载荷类型分队列的进程内总线，每次 `subscribe` 启动一个消费任务，
//!   同一队列上的多个消费者相互竞争（每个事件只投递给其中一个）；
//! - `handler`：处理方法返回值的归一约定。
//!
pub mod bus;
pub mod bus_inmemory;
pub mod handler;

pub use bus::EventBus;
pub use bus_inmemory::{
    BusStats, ConsumerHandle, ConsumerId, EventBusConfig, InMemoryEventBus, ShutdownPolicy,
};
pub use handler::{HandlerResult, IntoHandlerResult};
