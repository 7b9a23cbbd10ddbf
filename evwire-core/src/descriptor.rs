//! 事件描述模型（Descriptor）
//!
//! - [`TypeKey`]：名义类型身份（`TypeId` + 类型名），相等性只看 `TypeId`；
//! - [`EventDescriptor`]：发布者类型上某个 `Event<T>` 字段的描述；
//! - [`HandlerDescriptor`]：订阅者类型上某个单参数处理方法的描述；
//! - [`Publisher`] / [`Subscriber`]：由 `evwire-macros` 生成，也可以手写。
//!
//! 描述符在构造时携带单态化的擦除函数（attach / forward / invoke / consume），
//! 解析与激活阶段只面对 `TypeKey` 与 `dyn Any`，无需再知道具体类型。
//!
use crate::error::{BindingResult, EventBindingError};
use crate::event::{Event, Subscription};
use crate::eventing::handler::{ErasedCallback, IntoHandlerResult};
use crate::eventing::{ConsumerHandle, EventBus, HandlerResult, InMemoryEventBus};
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 作用域内共享的实例（发布者/订阅者）
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 事件载荷约束
///
/// 排队模式需要从 `&T` 取得一份自有副本并跨任务传递，因此要求 `Clone + Send + Sync`。
pub trait Payload: Any + Clone + Send + Sync {}

impl<T> Payload for T where T: Any + Clone + Send + Sync {}

/// 名义类型身份
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

/// 载荷类型：匹配的唯一依据
pub type PayloadType = TypeKey;

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 完整类型路径
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 去掉模块路径后的类型名（仅用于日志与命名）
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        let start = base.rfind("::").map(|i| i + 2).unwrap_or(0);
        &self.name[start..]
    }

    /// 判断实例的具体类型是否为该类型
    pub fn matches(&self, instance: &Instance) -> bool {
        (**instance).type_id() == self.id
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

type AttachFn = Arc<dyn Fn(&Instance, Arc<str>, ErasedCallback) -> Option<Subscription> + Send + Sync>;
type ForwardFn = fn(&InMemoryEventBus, &dyn Any) -> BindingResult<()>;
type InvokeFn = Arc<dyn Fn(&Instance, &dyn Any) -> HandlerResult + Send + Sync>;
type ConsumeFn = fn(&InMemoryEventBus, ErasedCallback) -> BindingResult<ConsumerHandle>;

/// 发布者事件描述
#[derive(Clone)]
pub struct EventDescriptor {
    publisher: TypeKey,
    name: &'static str,
    payload: PayloadType,
    attach: AttachFn,
    forward: ForwardFn,
}

impl EventDescriptor {
    /// 以字段访问器描述发布者 `P` 上载荷为 `T` 的事件
    ///
    /// ```
    /// use evwire_core::{Event, EventDescriptor};
    ///
    /// #[derive(Clone)]
    /// struct Deposited(u64);
    ///
    /// #[derive(Default)]
    /// struct Ledger {
    ///     deposited: Event<Deposited>,
    /// }
    ///
    /// let descriptor = EventDescriptor::new::<Ledger, Deposited>("deposited", |l| &l.deposited);
    /// assert_eq!(descriptor.name(), "deposited");
    /// ```
    pub fn new<P, T>(name: &'static str, accessor: fn(&P) -> &Event<T>) -> Self
    where
        P: Any + Send + Sync,
        T: Payload,
    {
        let attach: AttachFn = Arc::new(
            move |publisher: &Instance, label: Arc<str>, callback: ErasedCallback| {
                let publisher = (**publisher).downcast_ref::<P>()?;
                Some(accessor(publisher).attach_erased(label, callback))
            },
        );

        Self {
            publisher: TypeKey::of::<P>(),
            name,
            payload: TypeKey::of::<T>(),
            attach,
            forward: forward_to_bus::<T>,
        }
    }

    pub fn publisher(&self) -> TypeKey {
        self.publisher
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn payload(&self) -> PayloadType {
        self.payload
    }

    /// 在发布者实例的事件上挂载擦除回调；实例类型不符时返回 `None`
    pub(crate) fn attach(
        &self,
        publisher: &Instance,
        label: Arc<str>,
        callback: ErasedCallback,
    ) -> Option<Subscription> {
        (self.attach)(publisher, label, callback)
    }

    pub(crate) fn forward(&self, bus: &InMemoryEventBus, payload: &dyn Any) -> BindingResult<()> {
        (self.forward)(bus, payload)
    }
}

impl fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("publisher", &self.publisher)
            .field("name", &self.name)
            .field("payload", &self.payload)
            .finish()
    }
}

fn forward_to_bus<T: Payload>(bus: &InMemoryEventBus, payload: &dyn Any) -> BindingResult<()> {
    let payload = payload
        .downcast_ref::<T>()
        .ok_or(EventBindingError::TypeMismatch {
            expected: type_name::<T>(),
            found: "unknown",
        })?;
    bus.publish(payload.clone())
}

/// 订阅者处理方法描述
#[derive(Clone)]
pub struct HandlerDescriptor {
    subscriber: TypeKey,
    method: &'static str,
    payload: PayloadType,
    invoke: InvokeFn,
    consume: ConsumeFn,
}

impl HandlerDescriptor {
    /// 描述订阅者 `S` 上接收 `T` 的处理方法
    pub fn new<S, T, R, F>(method: &'static str, handler: F) -> Self
    where
        S: Any + Send + Sync,
        T: Payload,
        R: IntoHandlerResult,
        F: Fn(&S, &T) -> R + Send + Sync + 'static,
    {
        let invoke: InvokeFn = Arc::new(move |subscriber: &Instance, payload: &dyn Any| -> HandlerResult {
            let Some(subscriber) = (**subscriber).downcast_ref::<S>() else {
                return Err(EventBindingError::TypeMismatch {
                    expected: type_name::<S>(),
                    found: "unknown",
                }
                .into());
            };
            let Some(payload) = payload.downcast_ref::<T>() else {
                return Err(EventBindingError::TypeMismatch {
                    expected: type_name::<T>(),
                    found: "unknown",
                }
                .into());
            };
            handler(subscriber, payload).into_handler_result()
        });

        Self {
            subscriber: TypeKey::of::<S>(),
            method,
            payload: TypeKey::of::<T>(),
            invoke,
            consume: consume_from_bus::<T>,
        }
    }

    pub fn subscriber(&self) -> TypeKey {
        self.subscriber
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn payload(&self) -> PayloadType {
        self.payload
    }

    /// `Subscriber::method` 形式的标签
    pub fn label(&self) -> String {
        format!("{}::{}", self.subscriber.short_name(), self.method)
    }

    /// 绑定订阅者实例，得到只接收载荷的擦除回调
    pub(crate) fn bind(&self, subscriber: Instance) -> ErasedCallback {
        let invoke = self.invoke.clone();
        Arc::new(move |payload: &dyn Any| invoke(&subscriber, payload))
    }

    pub(crate) fn consume(
        &self,
        bus: &InMemoryEventBus,
        callback: ErasedCallback,
    ) -> BindingResult<ConsumerHandle> {
        (self.consume)(bus, callback)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("subscriber", &self.subscriber)
            .field("method", &self.method)
            .field("payload", &self.payload)
            .finish()
    }
}

fn consume_from_bus<T: Payload>(
    bus: &InMemoryEventBus,
    callback: ErasedCallback,
) -> BindingResult<ConsumerHandle> {
    bus.subscribe(move |event: T| callback(&event as &dyn Any))
}

/// 发布者：枚举自身暴露的事件
pub trait Publisher: Any + Send + Sync {
    fn events() -> Vec<EventDescriptor>;
}

/// 订阅者：枚举自身的处理方法
pub trait Subscriber: Any + Send + Sync {
    fn handlers() -> Vec<HandlerDescriptor>;
}
