//! 类型目录（TypeCatalog）
//!
//! 解析器的输入：按“单元”（unit）分组的发布者/订阅者类型。
//! 遍历顺序固定：先按添加顺序遍历被引用单元，最后遍历根单元；
//! 单元内按注册顺序，发布者内按事件声明顺序。
//! 同一类型重复注册（同一单元或跨单元）时只保留遍历顺序中的第一个。
//!
use crate::descriptor::{EventDescriptor, HandlerDescriptor, Publisher, Subscriber, TypeKey};
use std::collections::HashSet;

/// 已注册的发布者类型及其事件
#[derive(Clone, Debug)]
pub struct PublisherEntry {
    ty: TypeKey,
    events: Vec<EventDescriptor>,
}

impl PublisherEntry {
    pub fn ty(&self) -> TypeKey {
        self.ty
    }

    pub fn events(&self) -> &[EventDescriptor] {
        &self.events
    }

    /// 按声明顺序查找载荷类型匹配的第一个事件
    pub fn event_for(&self, payload: TypeKey) -> Option<&EventDescriptor> {
        self.events.iter().find(|e| e.payload() == payload)
    }
}

/// 已注册的订阅者类型及其处理方法
#[derive(Clone, Debug)]
pub struct SubscriberEntry {
    ty: TypeKey,
    handlers: Vec<HandlerDescriptor>,
}

impl SubscriberEntry {
    pub fn ty(&self) -> TypeKey {
        self.ty
    }

    pub fn handlers(&self) -> &[HandlerDescriptor] {
        &self.handlers
    }
}

/// 目录单元：一组一起发现的类型
#[derive(Clone, Debug)]
pub struct CatalogUnit {
    name: String,
    publishers: Vec<PublisherEntry>,
    subscribers: Vec<SubscriberEntry>,
}

impl CatalogUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            publishers: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn publisher<P: Publisher>(self) -> Self {
        self.publisher_with(TypeKey::of::<P>(), P::events())
    }

    pub fn subscriber<S: Subscriber>(self) -> Self {
        self.subscriber_with(TypeKey::of::<S>(), S::handlers())
    }

    /// 手工注册发布者；不属于 `ty` 的描述符会被忽略
    pub fn publisher_with(
        mut self,
        ty: TypeKey,
        events: impl IntoIterator<Item = EventDescriptor>,
    ) -> Self {
        if self.publishers.iter().any(|p| p.ty == ty) {
            return self;
        }
        let events = events.into_iter().filter(|e| e.publisher() == ty).collect();
        self.publishers.push(PublisherEntry { ty, events });
        self
    }

    /// 手工注册订阅者；不属于 `ty` 的描述符会被忽略
    pub fn subscriber_with(
        mut self,
        ty: TypeKey,
        handlers: impl IntoIterator<Item = HandlerDescriptor>,
    ) -> Self {
        if self.subscribers.iter().any(|s| s.ty == ty) {
            return self;
        }
        let handlers = handlers
            .into_iter()
            .filter(|h| h.subscriber() == ty)
            .collect();
        self.subscribers.push(SubscriberEntry { ty, handlers });
        self
    }

    pub fn publishers(&self) -> &[PublisherEntry] {
        &self.publishers
    }

    pub fn subscribers(&self) -> &[SubscriberEntry] {
        &self.subscribers
    }
}

/// 根单元 + 被引用单元
#[derive(Clone, Debug)]
pub struct TypeCatalog {
    root: CatalogUnit,
    references: Vec<CatalogUnit>,
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new("root")
    }
}

impl TypeCatalog {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: CatalogUnit::new(root),
            references: Vec::new(),
        }
    }

    /// 在根单元注册发布者
    pub fn publisher<P: Publisher>(mut self) -> Self {
        self.root = self.root.publisher::<P>();
        self
    }

    /// 在根单元注册订阅者
    pub fn subscriber<S: Subscriber>(mut self) -> Self {
        self.root = self.root.subscriber::<S>();
        self
    }

    /// 替换根单元
    pub fn with_root(mut self, root: CatalogUnit) -> Self {
        self.root = root;
        self
    }

    /// 追加被引用单元，它会先于根单元被遍历
    pub fn with_unit(mut self, unit: CatalogUnit) -> Self {
        self.references.push(unit);
        self
    }

    pub fn root(&self) -> &CatalogUnit {
        &self.root
    }

    /// 按遍历顺序返回全部单元
    pub fn units(&self) -> impl Iterator<Item = &CatalogUnit> {
        self.references.iter().chain(std::iter::once(&self.root))
    }

    /// 按遍历顺序返回去重后的发布者
    pub fn publishers(&self) -> Vec<&PublisherEntry> {
        let mut seen = HashSet::new();
        self.units()
            .flat_map(|unit| unit.publishers.iter())
            .filter(|entry| seen.insert(entry.ty))
            .collect()
    }

    /// 按遍历顺序返回去重后的订阅者
    pub fn subscribers(&self) -> Vec<&SubscriberEntry> {
        let mut seen = HashSet::new();
        self.units()
            .flat_map(|unit| unit.subscribers.iter())
            .filter(|entry| seen.insert(entry.ty))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    #[derive(Clone)]
    struct Ping;

    #[derive(Default)]
    struct Local {
        ping: Event<Ping>,
    }

    #[derive(Default)]
    struct Remote {
        ping: Event<Ping>,
    }

    fn local_events() -> Vec<EventDescriptor> {
        vec![EventDescriptor::new::<Local, Ping>("ping", |p| &p.ping)]
    }

    fn remote_events() -> Vec<EventDescriptor> {
        vec![EventDescriptor::new::<Remote, Ping>("ping", |p| &p.ping)]
    }

    #[test]
    fn references_are_traversed_before_root() {
        let catalog = TypeCatalog::new("app")
            .with_root(CatalogUnit::new("app").publisher_with(TypeKey::of::<Local>(), local_events()))
            .with_unit(
                CatalogUnit::new("shared").publisher_with(TypeKey::of::<Remote>(), remote_events()),
            );

        let names: Vec<&str> = catalog.units().map(CatalogUnit::name).collect();
        assert_eq!(names, vec!["shared", "app"]);

        let order: Vec<TypeKey> = catalog.publishers().iter().map(|p| p.ty()).collect();
        assert_eq!(order, vec![TypeKey::of::<Remote>(), TypeKey::of::<Local>()]);
    }

    #[test]
    fn duplicate_registration_keeps_the_first() {
        let catalog = TypeCatalog::default()
            .with_root(
                CatalogUnit::new("root")
                    .publisher_with(TypeKey::of::<Local>(), local_events())
                    .publisher_with(TypeKey::of::<Local>(), Vec::new()),
            )
            .with_unit(CatalogUnit::new("again").publisher_with(TypeKey::of::<Local>(), Vec::new()));

        let publishers = catalog.publishers();
        assert_eq!(publishers.len(), 1);
        // 被引用单元先遍历，所以保留的是其中的空注册
        assert!(publishers[0].events().is_empty());
        assert_eq!(catalog.root().publishers()[0].events().len(), 1);
    }

    #[test]
    fn foreign_descriptors_are_filtered() {
        let unit = CatalogUnit::new("x").publisher_with(TypeKey::of::<Local>(), remote_events());
        assert!(unit.publishers()[0].events().is_empty());
        assert!(unit.publishers()[0].event_for(TypeKey::of::<Ping>()).is_none());
    }
}
