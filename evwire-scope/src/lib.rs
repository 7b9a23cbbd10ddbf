//! 事件绑定作用域（evwire-scope）
//!
//! 把 `evwire-core` 的解析与激活接入“每个工作单元一个作用域”的生命周期：
//! - `ScopedInstances`：作用域内按类型登记的实例表（实现 `InstanceProvider`）；
//! - `ScopeInitializer`：为每个绑定取出实例并激活，失败时回滚；
//! - `EventBindingScope`：开始时激活、结束时解除的守卫；
//! - `EventWiring`：按配置一次性解析并（排队模式下）持有事件总线。
//!
pub mod error;
pub mod initializer;
pub mod instances;
pub mod scope;
pub mod wiring;

pub use error::{ScopeError, ScopeResult};
pub use initializer::ScopeInitializer;
pub use instances::{InstanceProvider, ScopedInstances};
pub use scope::{EventBindingScope, ScopeId};
pub use wiring::EventWiring;
