//! 内存版事件总线（InMemoryEventBus）
//!
//! 按载荷类型（`TypeId`）懒创建无界 FIFO 队列：
//! - 首次 `publish` 或 `subscribe` 触及某类型时创建队列，并发首访也只会创建一个；
//! - 每次 `subscribe` 启动一个 tokio 消费任务，同一队列上的消费者相互竞争，
//!   每个事件只会被其中一个消费者处理（工作队列，而非广播）；
//! - 处理失败（返回错误或 panic）只记录日志并丢弃该事件，消费循环继续；
//! - `shutdown`：关闭全部队列，按 [`ShutdownPolicy`] 排空或放弃剩余事件，并等待消费任务结束。
//!
//! 注意：与直连模式的多播语义不同，这里是单次投递。

use super::bus::EventBus;
use super::handler::IntoHandlerResult;
use crate::binding::{ForwardKey, Forwarder};
use crate::descriptor::{Payload, TypeKey};
use crate::error::{BindingResult, EventBindingError};
use bon::Builder;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

/// 关闭策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// 消费者处理完已入队的事件后退出
    #[default]
    Drain,
    /// 消费者在下一个等待点退出，剩余事件丢弃
    Abandon,
}

/// 内存总线配置
#[derive(Builder, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    #[builder(default)]
    pub shutdown: ShutdownPolicy,
}

/// 消费者 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(u64);

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer-{}", self.0)
    }
}

/// `subscribe` 返回的消费者句柄
///
/// drop 句柄不会停止消费者；需要提前停止时调用 [`ConsumerHandle::cancel`]。
/// 取消只在等待下一个事件时生效，不会打断正在执行的处理方法。
#[derive(Clone, Debug)]
pub struct ConsumerHandle {
    id: ConsumerId,
    payload: TypeKey,
    token: CancellationToken,
}

impl ConsumerHandle {
    pub fn id(&self) -> ConsumerId {
        self.id
    }

    pub fn payload(&self) -> TypeKey {
        self.payload
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// 总线计数（只用于观测）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusStats {
    pub queues_created: u64,
    pub events_published: u64,
    pub consumers_started: u64,
}

struct Queue<T> {
    tx: mpsc::UnboundedSender<T>,
    rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<T>>>,
}

struct QueueEntry {
    payload: TypeKey,
    queue: Arc<dyn Any + Send + Sync>,
}

struct BusInner {
    config: EventBusConfig,
    runtime: Handle,
    queues: DashMap<TypeId, QueueEntry>,
    // 读锁：publish/subscribe；写锁：close
    closed: RwLock<bool>,
    token: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
    next_consumer: AtomicU64,
    queues_created: AtomicU64,
    events_published: AtomicU64,
    consumers_started: AtomicU64,
    forwarders: DashMap<ForwardKey, Weak<Forwarder>>,
}

/// 进程内事件总线（可廉价克隆的句柄）
#[derive(Clone)]
pub struct InMemoryEventBus {
    inner: Arc<BusInner>,
}

impl InMemoryEventBus {
    /// 使用默认配置，并绑定当前 tokio 运行时
    pub fn new() -> BindingResult<Self> {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> BindingResult<Self> {
        let runtime = Handle::try_current().map_err(|e| EventBindingError::NoRuntime {
            reason: e.to_string(),
        })?;
        Ok(Self::with_runtime(runtime, config))
    }

    /// 显式指定运行时；之后可在任意线程（包括非运行时线程）调用 `subscribe`
    pub fn with_runtime(runtime: Handle, config: EventBusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                config,
                runtime,
                queues: DashMap::new(),
                closed: RwLock::new(false),
                token: CancellationToken::new(),
                workers: Mutex::new(Vec::new()),
                next_consumer: AtomicU64::new(0),
                queues_created: AtomicU64::new(0),
                events_published: AtomicU64::new(0),
                consumers_started: AtomicU64::new(0),
                forwarders: DashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.inner.config
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.read()
    }

    pub fn queue_count(&self) -> usize {
        self.inner.queues.len()
    }

    /// 当前登记的共享转发回调数
    pub fn forwarder_count(&self) -> usize {
        self.inner.forwarders.len()
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            queues_created: self.inner.queues_created.load(Ordering::Acquire),
            events_published: self.inner.events_published.load(Ordering::Acquire),
            consumers_started: self.inner.consumers_started.load(Ordering::Acquire),
        }
    }

    /// 关闭总线但不等待消费任务；重复调用返回 `false`
    pub fn close(&self) -> bool {
        let mut closed = self.inner.closed.write();
        if *closed {
            return false;
        }
        *closed = true;

        if self.inner.config.shutdown == ShutdownPolicy::Abandon {
            self.inner.token.cancel();
        }

        // 移除队列即释放唯一的发送端，排空后消费者会观察到通道关闭
        let released: Vec<&'static str> = self
            .inner
            .queues
            .iter()
            .map(|entry| entry.payload.name())
            .collect();
        self.inner.queues.clear();

        debug!(
            queues = released.len(),
            payloads = ?released,
            policy = ?self.inner.config.shutdown,
            "in-memory event bus closed"
        );
        true
    }

    /// 关闭总线并等待全部消费任务结束
    pub async fn shutdown(&self) {
        self.close();

        let workers = std::mem::take(&mut *self.inner.workers.lock());
        for result in join_all(workers).await {
            if let Err(err) = result {
                warn!(error = %err, "consumer task ended abnormally");
            }
        }
    }

    fn queue<T: Payload>(&self) -> BindingResult<Arc<Queue<T>>> {
        let erased = self
            .inner
            .queues
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel::<T>();
                self.inner.queues_created.fetch_add(1, Ordering::AcqRel);
                debug!(payload = type_name::<T>(), "in-memory queue created");
                QueueEntry {
                    payload: TypeKey::of::<T>(),
                    queue: Arc::new(Queue {
                        tx,
                        rx: Arc::new(AsyncMutex::new(rx)),
                    }),
                }
            })
            .queue
            .clone();

        erased
            .downcast::<Queue<T>>()
            .map_err(|_| EventBindingError::TypeMismatch {
                expected: type_name::<Queue<T>>(),
                found: "unknown",
            })
    }

    /// 取得（或创建）某发布者实例上某事件的共享转发回调
    pub(crate) fn shared_forwarder(
        &self,
        key: ForwardKey,
        create: impl FnOnce() -> Option<Forwarder>,
    ) -> Option<Arc<Forwarder>> {
        match self.inner.forwarders.entry(key) {
            Entry::Occupied(mut slot) => {
                if let Some(existing) = slot.get().upgrade() {
                    return Some(existing);
                }
                match create() {
                    Some(forwarder) => {
                        let fresh = Arc::new(forwarder);
                        slot.insert(Arc::downgrade(&fresh));
                        Some(fresh)
                    }
                    None => {
                        slot.remove();
                        None
                    }
                }
            }
            Entry::Vacant(slot) => {
                let fresh = Arc::new(create()?);
                slot.insert(Arc::downgrade(&fresh));
                Some(fresh)
            }
        }
    }

    pub(crate) fn downgrade(&self) -> WeakEventBus {
        WeakEventBus {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// 不延长总线生命周期的弱句柄
#[derive(Clone)]
pub(crate) struct WeakEventBus {
    inner: Weak<BusInner>,
}

impl WeakEventBus {
    /// 转发回调释放后移除其登记项；同一键已被新的转发回调占用时保留
    pub(crate) fn release_forwarder(&self, key: &ForwardKey) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .forwarders
                .remove_if(key, |_, slot| slot.strong_count() == 0);
        }
    }
}

impl EventBus for InMemoryEventBus {
    fn publish<T: Payload>(&self, event: T) -> BindingResult<()> {
        let closed = self.inner.closed.read();
        if *closed {
            return Err(EventBindingError::BusClosed);
        }

        let queue = self.queue::<T>()?;
        queue
            .tx
            .send(event)
            .map_err(|_| EventBindingError::BusClosed)?;
        self.inner.events_published.fetch_add(1, Ordering::AcqRel);
        trace!(payload = type_name::<T>(), "event enqueued");
        Ok(())
    }

    fn subscribe<T, F, R>(&self, handler: F) -> BindingResult<ConsumerHandle>
    where
        T: Payload,
        F: Fn(T) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        let closed = self.inner.closed.read();
        if *closed {
            return Err(EventBindingError::BusClosed);
        }

        let queue = self.queue::<T>()?;
        let id = ConsumerId(self.inner.next_consumer.fetch_add(1, Ordering::AcqRel) + 1);
        let token = self.inner.token.child_token();

        let worker = self.inner.runtime.spawn(consume_loop(
            id,
            queue.rx.clone(),
            token.clone(),
            handler,
        ));
        {
            let mut workers = self.inner.workers.lock();
            workers.retain(|w| !w.is_finished());
            workers.push(worker);
        }
        self.inner.consumers_started.fetch_add(1, Ordering::AcqRel);

        debug!(consumer = %id, payload = type_name::<T>(), "consumer registered");
        Ok(ConsumerHandle {
            id,
            payload: TypeKey::of::<T>(),
            token,
        })
    }
}

impl fmt::Debug for InMemoryEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryEventBus")
            .field("config", &self.inner.config)
            .field("queues", &self.inner.queues.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn consume_loop<T, F, R>(
    id: ConsumerId,
    rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<T>>>,
    token: CancellationToken,
    handler: F,
) where
    T: Payload,
    F: Fn(T) -> R + Send + Sync + 'static,
    R: IntoHandlerResult + 'static,
{
    debug!(consumer = %id, payload = type_name::<T>(), "consumer started");

    loop {
        // 持锁等待下一个事件，取到后立即释放，处理期间其他消费者可继续取
        let next = {
            let mut receiver = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                guard = rx.lock() => guard,
            };
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                event = receiver.recv() => event,
            }
        };

        let Some(event) = next else {
            break;
        };

        match catch_unwind(AssertUnwindSafe(|| handler(event).into_handler_result())) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(
                    consumer = %id,
                    payload = type_name::<T>(),
                    error = %err,
                    "queued event handler failed, event discarded"
                );
            }
            Err(_) => {
                error!(
                    consumer = %id,
                    payload = type_name::<T>(),
                    "queued event handler panicked, event discarded"
                );
            }
        }
    }

    debug!(consumer = %id, payload = type_name::<T>(), "consumer stopped");
}
