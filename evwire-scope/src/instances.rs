//! 作用域实例表
//!
//! 在一个工作单元内按具体类型登记发布者/订阅者实例，每个类型至多一个实例，
//! 供 [`ScopeInitializer`](crate::ScopeInitializer) 在激活绑定时查找。
//!
use crate::error::{ScopeError, ScopeResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use evwire_core::{Instance, TypeKey};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 按类型提供实例
pub trait InstanceProvider: Send + Sync {
    fn instance(&self, ty: TypeKey) -> Option<Instance>;
}

impl<P: InstanceProvider + ?Sized> InstanceProvider for Arc<P> {
    fn instance(&self, ty: TypeKey) -> Option<Instance> {
        (**self).instance(ty)
    }
}

/// 基于 `DashMap` 的实例表
#[derive(Default)]
pub struct ScopedInstances {
    instances: DashMap<TypeId, (TypeKey, Instance)>,
}

impl ScopedInstances {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记实例；同一类型重复登记返回 `AlreadyRegistered`
    pub fn register<T: Any + Send + Sync>(&self, value: T) -> ScopeResult<Arc<T>> {
        self.register_arc(Arc::new(value))
    }

    pub fn register_arc<T: Any + Send + Sync>(&self, value: Arc<T>) -> ScopeResult<Arc<T>> {
        let key = TypeKey::of::<T>();
        match self.instances.entry(key.id()) {
            Entry::Occupied(_) => Err(ScopeError::AlreadyRegistered {
                type_name: key.name(),
            }),
            Entry::Vacant(slot) => {
                let instance: Instance = value.clone();
                slot.insert((key, instance));
                Ok(value)
            }
        }
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let instance = self.instances.get(&TypeId::of::<T>())?.1.clone();
        instance.downcast::<T>().ok()
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.instances.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl InstanceProvider for ScopedInstances {
    fn instance(&self, ty: TypeKey) -> Option<Instance> {
        self.instances.get(&ty.id()).map(|entry| entry.1.clone())
    }
}

impl fmt::Debug for ScopedInstances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<&'static str> = self.instances.iter().map(|e| e.0.name()).collect();
        f.debug_struct("ScopedInstances")
            .field("types", &types)
            .finish()
    }
}
