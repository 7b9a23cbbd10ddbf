//! 装配入口（EventWiring）
//!
//! 进程启动时构造一次：
//! - 按 `WiringConfig` 解析类型目录，得到不可变的绑定集合；
//! - 排队模式下创建进程内事件总线；
//! - 之后为每个工作单元开启 [`EventBindingScope`]，最后 `shutdown` 关闭总线。
//!
use crate::error::ScopeResult;
use crate::initializer::ScopeInitializer;
use crate::instances::ScopedInstances;
use crate::scope::EventBindingScope;
use evwire_core::{
    BindingResolver, BindingSet, DispatchMode, InMemoryEventBus, TypeCatalog, WiringConfig,
};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct EventWiring {
    config: WiringConfig,
    bindings: BindingSet,
    bus: Option<InMemoryEventBus>,
}

impl EventWiring {
    /// 解析目录；排队模式下在当前 tokio 运行时上创建总线
    pub fn new(catalog: &TypeCatalog, config: WiringConfig) -> ScopeResult<Self> {
        let bus = match config.mode {
            DispatchMode::Direct => None,
            DispatchMode::InMemoryQueue => {
                Some(InMemoryEventBus::with_config(config.bus.clone())?)
            }
        };
        Self::assemble(catalog, config, bus)
    }

    /// 使用外部提供的总线（例如以指定运行时句柄创建的总线）
    pub fn with_bus(
        catalog: &TypeCatalog,
        config: WiringConfig,
        bus: InMemoryEventBus,
    ) -> ScopeResult<Self> {
        Self::assemble(catalog, config, Some(bus))
    }

    fn assemble(
        catalog: &TypeCatalog,
        config: WiringConfig,
        bus: Option<InMemoryEventBus>,
    ) -> ScopeResult<Self> {
        let bindings = BindingResolver::from_config(&config).resolve(catalog)?;
        debug!(
            mode = %config.mode,
            bindings = bindings.len(),
            bus = bus.is_some(),
            "event wiring ready"
        );
        Ok(Self {
            config,
            bindings,
            bus,
        })
    }

    pub fn mode(&self) -> DispatchMode {
        self.config.mode
    }

    pub fn config(&self) -> &WiringConfig {
        &self.config
    }

    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    pub fn bus(&self) -> Option<&InMemoryEventBus> {
        self.bus.as_ref()
    }

    pub fn initializer(&self) -> ScopeInitializer {
        ScopeInitializer::new(self.bindings.clone(), self.bus.clone())
    }

    pub fn begin_scope(&self, instances: Arc<ScopedInstances>) -> ScopeResult<EventBindingScope> {
        EventBindingScope::begin(&self.initializer(), instances)
    }

    /// 关闭总线并等待消费者结束；直连模式下无操作
    pub async fn shutdown(&self) {
        if let Some(bus) = &self.bus {
            bus.shutdown().await;
        }
    }
}
