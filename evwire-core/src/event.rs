//! 多播事件（Event）
//!
//! 发布者以 `Event<T>` 字段对外暴露具名事件：
//! - `attach`：追加回调，返回 [`Subscription`]（drop 即解除）；
//! - `raise`：在调用线程上按追加顺序同步调用全部回调；
//! - 任一回调失败时立即返回错误，后续回调不再调用（直连模式不做隔离）。
//!
use crate::error::{BindingResult, EventBindingError};
use crate::eventing::handler::{ErasedCallback, IntoHandlerResult};
use crate::eventing::HandlerResult;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Callback<T> = Arc<dyn Fn(&T) -> HandlerResult + Send + Sync>;

struct Slot<T> {
    id: u64,
    label: Arc<str>,
    callback: Callback<T>,
}

struct Slots<T> {
    entries: RwLock<Vec<Slot<T>>>,
    next_id: AtomicU64,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;
    fn contains(&self, id: u64) -> bool;
}

impl<T: 'static> Detach for Slots<T> {
    fn detach(&self, id: u64) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|slot| slot.id != id);
        entries.len() != before
    }

    fn contains(&self, id: u64) -> bool {
        self.entries.read().iter().any(|slot| slot.id == id)
    }
}

/// 发布者持有的多播事件
pub struct Event<T> {
    slots: Arc<Slots<T>>,
}

impl<T: 'static> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Event<T> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Slots {
                entries: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// 追加回调（匿名）
    pub fn attach<F, R>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.attach_named("anonymous", callback)
    }

    /// 追加回调，`label` 用于错误报告
    pub fn attach_named<F, R>(&self, label: impl Into<Arc<str>>, callback: F) -> Subscription
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        let wrapped: Callback<T> =
            Arc::new(move |payload: &T| callback(payload).into_handler_result());
        self.push(label.into(), wrapped)
    }

    pub(crate) fn attach_erased(&self, label: Arc<str>, callback: ErasedCallback) -> Subscription {
        self.push(label, Arc::new(move |payload: &T| callback(payload as &dyn Any)))
    }

    fn push(&self, label: Arc<str>, callback: Callback<T>) -> Subscription {
        let id = self.slots.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.entries.write().push(Slot {
            id,
            label,
            callback,
        });

        let slots: Arc<dyn Detach> = self.slots.clone();
        Subscription {
            id,
            slots: Some(Arc::downgrade(&slots)),
        }
    }

    /// 触发事件
    ///
    /// 回调在快照上执行，回调内部再次 attach/detach 不会死锁，
    /// 但只对下一次触发生效。
    pub fn raise(&self, payload: &T) -> BindingResult<()> {
        let snapshot: Vec<(Arc<str>, Callback<T>)> = self
            .slots
            .entries
            .read()
            .iter()
            .map(|slot| (slot.label.clone(), slot.callback.clone()))
            .collect();

        for (label, callback) in snapshot {
            callback(payload).map_err(|source| EventBindingError::Handler {
                handler: label.to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// 当前回调数量
    pub fn subscriber_count(&self) -> usize {
        self.slots.entries.read().len()
    }

    /// 清空全部回调
    pub fn clear(&self) {
        self.slots.entries.write().clear();
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("payload", &std::any::type_name::<T>())
            .field("subscribers", &self.slots.entries.read().len())
            .finish()
    }
}

/// 回调订阅句柄：drop 时自动从事件上解除
#[must_use = "dropping a Subscription detaches its callback"]
pub struct Subscription {
    id: u64,
    slots: Option<Weak<dyn Detach>>,
}

impl Subscription {
    /// 显式解除，返回回调此前是否仍挂在事件上
    pub fn detach(mut self) -> bool {
        self.take_and_detach()
    }

    /// 放弃句柄但保持回调常驻（直到事件本身被释放）
    pub fn forget(mut self) {
        self.slots = None;
    }

    pub fn is_attached(&self) -> bool {
        self.slots
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|slots| slots.contains(self.id))
    }

    fn take_and_detach(&mut self) -> bool {
        match self.slots.take().and_then(|weak| weak.upgrade()) {
            Some(slots) => slots.detach(self.id),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.take_and_detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    struct Ping(u32);

    #[test]
    fn raise_invokes_callbacks_in_attach_order() {
        let event = Event::<Ping>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = {
            let seen = seen.clone();
            event.attach(move |p: &Ping| seen.lock().unwrap().push(("a", p.0)))
        };
        let s2 = {
            let seen = seen.clone();
            event.attach(move |p: &Ping| seen.lock().unwrap().push(("b", p.0)))
        };

        event.raise(&Ping(7)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
        assert_eq!(event.subscriber_count(), 2);

        drop(s1);
        drop(s2);
        assert_eq!(event.subscriber_count(), 0);
    }

    #[test]
    fn failure_stops_multicast_and_propagates() {
        let event = Event::<Ping>::new();
        let reached = Arc::new(Mutex::new(false));

        let _fail = event.attach_named("failing", |_: &Ping| -> anyhow::Result<()> {
            anyhow::bail!("nope")
        });
        let _after = {
            let reached = reached.clone();
            event.attach(move |_: &Ping| *reached.lock().unwrap() = true)
        };

        let err = event.raise(&Ping(1)).unwrap_err();
        match err {
            EventBindingError::Handler { handler, source } => {
                assert_eq!(handler, "failing");
                assert_eq!(source.to_string(), "nope");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn detach_and_forget() {
        let event = Event::<Ping>::new();
        let sub = event.attach(|_: &Ping| ());
        assert!(sub.detach());
        assert_eq!(event.subscriber_count(), 0);

        event.attach(|_: &Ping| ()).forget();
        assert_eq!(event.subscriber_count(), 1);
        event.clear();
        assert_eq!(event.subscriber_count(), 0);
    }

    #[test]
    fn subscription_outliving_event_is_harmless() {
        let event = Event::<Ping>::new();
        let sub = event.attach(|_: &Ping| ());
        drop(event);
        assert!(!sub.is_attached());
        assert!(!sub.detach());
    }

    #[test]
    fn reentrant_attach_during_raise_does_not_deadlock() {
        let event = Arc::new(Event::<Ping>::new());
        let late = Arc::new(Mutex::new(Vec::new()));

        let _outer = {
            let inner = event.clone();
            let late = late.clone();
            event.attach(move |_: &Ping| {
                let sub = inner.attach(|_: &Ping| ());
                late.lock().unwrap().push(sub);
            })
        };

        event.raise(&Ping(1)).unwrap();
        assert_eq!(event.subscriber_count(), 2);
    }
}
