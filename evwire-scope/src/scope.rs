//! 自动绑定作用域
//!
//! `begin` 时激活全部绑定，`end` 或 drop 时全部解除：直连回调从发布者事件上移除，
//! 排队模式的消费者被取消、转发回调在最后一个使用者离开时移除。
//!
use crate::error::ScopeResult;
use crate::initializer::ScopeInitializer;
use crate::instances::ScopedInstances;
use evwire_core::ActiveBinding;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

/// 作用域 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

pub struct EventBindingScope {
    id: ScopeId,
    instances: Arc<ScopedInstances>,
    active: Vec<ActiveBinding>,
}

impl EventBindingScope {
    pub fn begin(
        initializer: &ScopeInitializer,
        instances: Arc<ScopedInstances>,
    ) -> ScopeResult<Self> {
        let id = ScopeId(NEXT_SCOPE.fetch_add(1, Ordering::Relaxed));
        let active = initializer.initialize(instances.as_ref())?;
        debug!(scope = %id, bindings = active.len(), "event binding scope started");
        Ok(Self {
            id,
            instances,
            active,
        })
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn instances(&self) -> &ScopedInstances {
        &self.instances
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instances.get::<T>()
    }

    pub fn active_bindings(&self) -> &[ActiveBinding] {
        &self.active
    }

    /// 结束作用域（等价于 drop）
    pub fn end(self) {}
}

impl Drop for EventBindingScope {
    fn drop(&mut self) {
        let released = self.active.len();
        self.active.clear();
        debug!(scope = %self.id, bindings = released, "event binding scope ended");
    }
}

impl fmt::Debug for EventBindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBindingScope")
            .field("id", &self.id)
            .field("instances", &self.instances)
            .field("active", &self.active.len())
            .finish()
    }
}
