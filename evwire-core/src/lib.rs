//! 事件自动装配核心库（evwire-core）
//!
//! 把发布者暴露的具名事件与订阅者的处理方法按载荷类型自动连接起来，无需手写订阅代码：
//! - 描述模型（`descriptor`）：发布者事件 / 订阅者处理方法的类型化描述；
//! - 多播事件（`event`）：发布者持有的 `Event<T>`；
//! - 类型目录（`catalog`）与解析器（`resolver`）：按载荷类型相等计算绑定集合；
//! - 绑定（`binding`）：在实例上激活，直连或经由进程内总线排队分发；
//! - 事件系统（`eventing`）：按载荷类型分队列的内存总线与竞争消费者；
//! - 配置（`config`）与错误（`error`）。
//!
//! 典型用法：
//! 1. 用 `evwire-macros` 的 `#[publisher]` / `#[subscriber]` 标注类型（或手工构造描述符）；
//! 2. 把类型注册进 `TypeCatalog`，用 `BindingResolver` 解析一次得到 `BindingSet`；
//! 3. 每个工作单元开始时对 `BindingSet` 中的每个绑定调用 `activate`，持有返回的
//!    `ActiveBinding` 直到工作单元结束（`evwire-scope` 封装了这一步）。
//!
pub mod binding;
pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod eventing;
pub mod resolver;

// 允许在本 crate 内部通过 ::evwire_core 进行自引用，
// 以便过程宏在本 crate 的测试中也能解析到 ::evwire_core 路径。
extern crate self as evwire_core;

pub use binding::{ActiveBinding, Binding, BindingSet, EventRoute};
pub use catalog::{CatalogUnit, PublisherEntry, SubscriberEntry, TypeCatalog};
pub use config::{AmbiguityPolicy, DispatchMode, UnboundHandlerPolicy, WiringConfig};
pub use descriptor::{
    EventDescriptor, HandlerDescriptor, Instance, Payload, PayloadType, Publisher, Subscriber,
    TypeKey,
};
pub use error::{BindingResult, EventBindingError};
pub use event::{Event, Subscription};
pub use eventing::{
    BusStats, ConsumerHandle, ConsumerId, EventBus, EventBusConfig, HandlerResult,
    InMemoryEventBus, IntoHandlerResult, ShutdownPolicy,
};
pub use resolver::BindingResolver;
