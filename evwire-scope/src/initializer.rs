//! 作用域初始化器
//!
//! 工作单元开始时，为每个已解析的绑定从实例提供者取出发布者与订阅者实例并激活。
//! 任一绑定失败时，已激活的绑定随返回的错误一并释放（全部解除）。
//!
use crate::error::{ScopeError, ScopeResult};
use crate::instances::InstanceProvider;
use evwire_core::{ActiveBinding, BindingSet, InMemoryEventBus};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct ScopeInitializer {
    bindings: BindingSet,
    bus: Option<InMemoryEventBus>,
}

impl ScopeInitializer {
    pub fn new(bindings: BindingSet, bus: Option<InMemoryEventBus>) -> Self {
        Self { bindings, bus }
    }

    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    pub fn initialize(&self, provider: &dyn InstanceProvider) -> ScopeResult<Vec<ActiveBinding>> {
        let mut active = Vec::with_capacity(self.bindings.len());

        for binding in &self.bindings {
            let publisher = provider.instance(binding.publisher()).ok_or(
                ScopeError::InstanceNotFound {
                    role: "publisher",
                    type_name: binding.publisher().name(),
                },
            )?;
            let subscriber = provider.instance(binding.subscriber()).ok_or(
                ScopeError::InstanceNotFound {
                    role: "subscriber",
                    type_name: binding.subscriber().name(),
                },
            )?;
            active.push(binding.activate(&publisher, &subscriber, self.bus.as_ref())?);
        }

        debug!(bindings = active.len(), "event bindings initialized");
        Ok(active)
    }
}
