//! 绑定（Binding）与激活
//!
//! 一个 [`Binding`] 对应一对（发布者类型, 订阅者类型），包含该订阅者所有匹配到
//! 该发布者事件的处理方法（[`EventRoute`]）。激活后得到 [`ActiveBinding`]，
//! 由激活它的作用域独占持有，drop 即解除订阅、取消消费者。
//!
//! - 直连模式：在发布者事件上挂载直接调用处理方法的回调；
//! - 排队模式：在发布者事件上挂载转发回调（每个总线上每个发布者实例的每个事件只挂一个，
//!   由所有需要它的激活绑定共享），并为每个处理方法在总线上注册一个消费者。
//!
use crate::config::DispatchMode;
use crate::descriptor::{EventDescriptor, HandlerDescriptor, Instance, PayloadType, TypeKey};
use crate::error::{BindingResult, EventBindingError};
use crate::event::Subscription;
use crate::eventing::bus_inmemory::WeakEventBus;
use crate::eventing::handler::ErasedCallback;
use crate::eventing::{ConsumerHandle, HandlerResult, InMemoryEventBus};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 一条路由：发布者事件 → 订阅者处理方法
#[derive(Clone, Debug)]
pub struct EventRoute {
    event: EventDescriptor,
    handler: HandlerDescriptor,
}

impl EventRoute {
    pub(crate) fn new(event: EventDescriptor, handler: HandlerDescriptor) -> Self {
        Self { event, handler }
    }

    pub fn event(&self) -> &EventDescriptor {
        &self.event
    }

    pub fn handler(&self) -> &HandlerDescriptor {
        &self.handler
    }

    pub fn payload(&self) -> PayloadType {
        self.handler.payload()
    }
}

/// 发布者类型与订阅者类型之间的绑定单元
#[derive(Clone, Debug)]
pub struct Binding {
    publisher: TypeKey,
    subscriber: TypeKey,
    mode: DispatchMode,
    routes: Vec<EventRoute>,
}

impl Binding {
    pub(crate) fn new(
        publisher: TypeKey,
        subscriber: TypeKey,
        mode: DispatchMode,
        routes: Vec<EventRoute>,
    ) -> Self {
        Self {
            publisher,
            subscriber,
            mode,
            routes,
        }
    }

    /// `Publisher->Subscriber`
    pub fn name(&self) -> String {
        format!(
            "{}->{}",
            self.publisher.short_name(),
            self.subscriber.short_name()
        )
    }

    pub fn publisher(&self) -> TypeKey {
        self.publisher
    }

    pub fn subscriber(&self) -> TypeKey {
        self.subscriber
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn routes(&self) -> &[EventRoute] {
        &self.routes
    }

    /// 覆盖该绑定的分发模式
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// 在给定实例上建立订阅
    ///
    /// 实例的具体类型必须与绑定的发布者/订阅者类型一致；排队模式必须提供总线。
    /// 中途失败时已建立的部分会随返回前的清理一并解除。
    pub fn activate(
        &self,
        publisher: &Instance,
        subscriber: &Instance,
        bus: Option<&InMemoryEventBus>,
    ) -> BindingResult<ActiveBinding> {
        if !self.publisher.matches(publisher) {
            return Err(EventBindingError::InstanceMismatch {
                role: "publisher",
                expected: self.publisher.name(),
            });
        }
        if !self.subscriber.matches(subscriber) {
            return Err(EventBindingError::InstanceMismatch {
                role: "subscriber",
                expected: self.subscriber.name(),
            });
        }

        let mut active = ActiveBinding {
            name: self.name(),
            mode: self.mode,
            subscriptions: Vec::new(),
            forwarders: Vec::new(),
            consumers: Vec::new(),
        };

        match self.mode {
            DispatchMode::Direct => {
                for route in &self.routes {
                    let callback = route.handler.bind(subscriber.clone());
                    let subscription = route
                        .event
                        .attach(publisher, Arc::from(route.handler.label()), callback)
                        .ok_or(EventBindingError::InstanceMismatch {
                            role: "publisher",
                            expected: self.publisher.name(),
                        })?;
                    active.subscriptions.push(subscription);
                }
            }
            DispatchMode::InMemoryQueue => {
                let bus = bus.ok_or_else(|| EventBindingError::BusUnavailable {
                    binding: self.name(),
                })?;
                for route in &self.routes {
                    let key = ForwardKey::new(publisher, &route.event);
                    let forwarder = bus
                        .shared_forwarder(key, || {
                            Forwarder::attach(key, publisher, &route.event, bus)
                        })
                        .ok_or(EventBindingError::InstanceMismatch {
                            role: "publisher",
                            expected: self.publisher.name(),
                        })?;
                    active.forwarders.push(forwarder);

                    let callback = route.handler.bind(subscriber.clone());
                    active.consumers.push(route.handler.consume(bus, callback)?);
                }
            }
        }

        debug!(
            binding = %active.name,
            mode = %self.mode,
            routes = self.routes.len(),
            "event binding activated"
        );
        Ok(active)
    }
}

/// 已激活的绑定
pub struct ActiveBinding {
    name: String,
    mode: DispatchMode,
    subscriptions: Vec<Subscription>,
    forwarders: Vec<Arc<Forwarder>>,
    consumers: Vec<ConsumerHandle>,
}

impl ActiveBinding {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// 排队模式下注册的消费者
    pub fn consumers(&self) -> &[ConsumerHandle] {
        &self.consumers
    }

    /// 显式解除（等价于 drop）
    pub fn deactivate(self) {}
}

impl Drop for ActiveBinding {
    fn drop(&mut self) {
        for consumer in &self.consumers {
            consumer.cancel();
        }
        self.subscriptions.clear();
        self.forwarders.clear();
        debug!(binding = %self.name, "event binding deactivated");
    }
}

impl fmt::Debug for ActiveBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveBinding")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("subscriptions", &self.subscriptions.len())
            .field("forwarders", &self.forwarders.len())
            .field("consumers", &self.consumers.len())
            .finish()
    }
}

/// 转发回调的共享键：发布者实例地址 + 发布者类型 + 事件名
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ForwardKey {
    instance: usize,
    publisher: TypeId,
    event: &'static str,
}

impl ForwardKey {
    fn new(publisher: &Instance, event: &EventDescriptor) -> Self {
        Self {
            instance: Arc::as_ptr(publisher) as *const () as usize,
            publisher: event.publisher().id(),
            event: event.name(),
        }
    }
}

/// 挂在发布者事件上、把载荷转入总线的回调
///
/// 持有发布者实例，保证键中的地址在转发回调存活期间不会被复用。
/// 最后一个共享者释放时从总线的登记表中移除自身。
pub(crate) struct Forwarder {
    key: ForwardKey,
    registry: WeakEventBus,
    _subscription: Subscription,
    _publisher: Instance,
}

impl Forwarder {
    fn attach(
        key: ForwardKey,
        publisher: &Instance,
        event: &EventDescriptor,
        bus: &InMemoryEventBus,
    ) -> Option<Self> {
        let target = bus.clone();
        let descriptor = event.clone();
        let label: Arc<str> = Arc::from(format!(
            "{}::{}->bus",
            event.publisher().short_name(),
            event.name()
        ));
        let callback: ErasedCallback = Arc::new(move |payload: &dyn Any| -> HandlerResult {
            descriptor.forward(&target, payload)?;
            Ok(())
        });

        let subscription = event.attach(publisher, label, callback)?;
        debug!(
            publisher = event.publisher().name(),
            event = event.name(),
            "queue forwarder attached"
        );
        Some(Self {
            key,
            registry: bus.downgrade(),
            _subscription: subscription,
            _publisher: publisher.clone(),
        })
    }
}

impl Drop for Forwarder {
    fn drop(&mut self) {
        self.registry.release_forwarder(&self.key);
    }
}

/// 解析结果：不可变的绑定集合
#[derive(Clone, Debug, Default)]
pub struct BindingSet {
    bindings: Arc<[Binding]>,
}

impl BindingSet {
    pub(crate) fn new(bindings: Vec<Binding>) -> Self {
        Self {
            bindings: bindings.into(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Binding> {
        self.bindings.get(index)
    }

    /// 按（发布者, 订阅者）查找
    pub fn find(&self, publisher: TypeKey, subscriber: TypeKey) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|b| b.publisher == publisher && b.subscriber == subscriber)
    }

    /// 全部路由数
    pub fn route_count(&self) -> usize {
        self.bindings.iter().map(|b| b.routes.len()).sum()
    }
}

impl<'a> IntoIterator for &'a BindingSet {
    type Item = &'a Binding;
    type IntoIter = std::slice::Iter<'a, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}
