use anyhow::Result as AnyResult;
use evwire_core::{
    ActiveBinding, BindingResolver, BindingSet, CatalogUnit, DispatchMode, Event, EventBus,
    EventDescriptor, HandlerDescriptor, InMemoryEventBus, Instance, TypeCatalog, TypeKey,
};
use evwire_macros::{publisher, subscriber};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
struct UserCreated {
    name: String,
}

#[derive(Clone, Debug)]
struct OrderPlaced(u32);

#[derive(Clone, Debug)]
struct NobodyPublishesThis;

#[publisher]
#[derive(Default)]
struct AccountManager {
    user_created: Event<UserCreated>,
}

#[publisher]
#[derive(Default)]
struct Shop {
    order_placed: Event<OrderPlaced>,
}

#[derive(Default)]
struct GameManager {
    seen: Mutex<Vec<(String, thread::ThreadId)>>,
}

#[subscriber]
impl GameManager {
    #[handles_event]
    fn on_user_created(&self, event: &UserCreated) {
        self.seen
            .lock()
            .unwrap()
            .push((event.name.clone(), thread::current().id()));
    }
}

#[derive(Default)]
struct Billing {
    orders: Mutex<Vec<u32>>,
}

#[subscriber]
impl Billing {
    #[handles_event]
    fn on_order(&self, event: &OrderPlaced) -> AnyResult<()> {
        match event.0 {
            13 => anyhow::bail!("unlucky order"),
            66 => panic!("billing crashed"),
            n => {
                self.orders.lock().unwrap().push(n);
                Ok(())
            }
        }
    }
}

#[derive(Default)]
struct Warehouse {
    orders: Mutex<Vec<u32>>,
}

#[subscriber]
impl Warehouse {
    #[handles_event]
    fn on_order(&self, event: OrderPlaced) {
        self.orders.lock().unwrap().push(event.0);
    }
}

struct Lonely;

#[subscriber]
impl Lonely {
    #[handles_event]
    fn on_nothing(&self, _event: &NobodyPublishesThis) {}
}

fn resolve(mode: DispatchMode, catalog: &TypeCatalog) -> BindingSet {
    BindingResolver::builder()
        .mode(mode)
        .build()
        .resolve(catalog)
        .unwrap()
}

fn activate<P: Send + Sync + 'static, S: Send + Sync + 'static>(
    set: &BindingSet,
    publisher: &Arc<P>,
    subscriber: &Arc<S>,
    bus: Option<&InMemoryEventBus>,
) -> ActiveBinding {
    let binding = set
        .find(TypeKey::of::<P>(), TypeKey::of::<S>())
        .expect("binding resolved");
    let p: Instance = publisher.clone();
    let s: Instance = subscriber.clone();
    binding.activate(&p, &s, bus).unwrap()
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within 1s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[test]
fn direct_mode_runs_every_handler_before_raise_returns() {
    let catalog = TypeCatalog::new("app")
        .publisher::<AccountManager>()
        .subscriber::<GameManager>();
    let set = resolve(DispatchMode::Direct, &catalog);

    let accounts = Arc::new(AccountManager::default());
    let first = Arc::new(GameManager::default());
    let second = Arc::new(GameManager::default());
    let _a = activate(&set, &accounts, &first, None);
    let _b = activate(&set, &accounts, &second, None);
    assert_eq!(accounts.user_created.subscriber_count(), 2);

    accounts
        .user_created
        .raise(&UserCreated {
            name: "Direct".into(),
        })
        .unwrap();

    let caller = thread::current().id();
    for games in [&first, &second] {
        let seen = games.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "Direct");
        assert_eq!(seen[0].1, caller);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn queue_mode_delivers_to_exactly_one_handler() {
    let bus = InMemoryEventBus::new().unwrap();
    let catalog = TypeCatalog::new("app")
        .publisher::<AccountManager>()
        .subscriber::<GameManager>();
    let set = resolve(DispatchMode::InMemoryQueue, &catalog);

    let accounts = Arc::new(AccountManager::default());
    let first = Arc::new(GameManager::default());
    let second = Arc::new(GameManager::default());
    let _a = activate(&set, &accounts, &first, Some(&bus));
    let _b = activate(&set, &accounts, &second, Some(&bus));

    accounts
        .user_created
        .raise(&UserCreated {
            name: "Queued".into(),
        })
        .unwrap();

    let total = || first.seen.lock().unwrap().len() + second.seen.lock().unwrap().len();
    wait_until(|| total() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(total(), 1);
    assert_eq!(bus.stats().events_published, 1);

    drop((_a, _b));
    bus.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn competing_consumers_split_the_queue() {
    let bus = InMemoryEventBus::new().unwrap();
    let catalog = TypeCatalog::new("app")
        .publisher::<Shop>()
        .subscriber::<Warehouse>()
        .subscriber::<Billing>();
    let set = resolve(DispatchMode::InMemoryQueue, &catalog);
    assert_eq!(set.len(), 2);

    let shop = Arc::new(Shop::default());
    let warehouse = Arc::new(Warehouse::default());
    let billing = Arc::new(Billing::default());
    let _w = activate(&set, &shop, &warehouse, Some(&bus));
    let _b = activate(&set, &shop, &billing, Some(&bus));

    const M: u32 = 200;
    for n in 0..M {
        // 13 与 66 会让 Billing 失败，这里避开以便精确计数
        let n = if n == 13 || n == 66 { n + 1000 } else { n };
        shop.order_placed.raise(&OrderPlaced(n)).unwrap();
    }

    let received = || {
        let mut all = warehouse.orders.lock().unwrap().clone();
        all.extend(billing.orders.lock().unwrap().iter().copied());
        all
    };
    wait_until(|| received().len() == M as usize).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut all = received();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), M as usize);

    drop((_w, _b));
    bus.shutdown().await;
}

#[test]
fn unmatched_handler_yields_no_binding_and_no_error() {
    let catalog = TypeCatalog::new("app")
        .publisher::<AccountManager>()
        .subscriber::<Lonely>();
    let set = resolve(DispatchMode::Direct, &catalog);
    assert!(set.is_empty());
    assert_eq!(set.route_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_use_creates_a_single_queue() {
    let bus = InMemoryEventBus::new().unwrap();
    let handled = Arc::new(AtomicUsize::new(0));

    thread::scope(|scope| {
        for i in 0..32u32 {
            let bus = bus.clone();
            let handled = handled.clone();
            scope.spawn(move || {
                if i % 4 == 0 {
                    bus.subscribe(move |_: OrderPlaced| {
                        handled.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
                } else {
                    bus.publish(OrderPlaced(i)).unwrap();
                }
            });
        }
    });

    assert_eq!(bus.queue_count(), 1);
    assert_eq!(bus.stats().queues_created, 1);
    wait_until(|| handled.load(Ordering::SeqCst) == 24).await;
    bus.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_queued_handler_does_not_block_the_next_event() {
    let bus = InMemoryEventBus::new().unwrap();
    let catalog = TypeCatalog::new("app")
        .publisher::<Shop>()
        .subscriber::<Billing>();
    let set = resolve(DispatchMode::InMemoryQueue, &catalog);

    let shop = Arc::new(Shop::default());
    let billing = Arc::new(Billing::default());
    let _active = activate(&set, &shop, &billing, Some(&bus));

    for n in [13, 66, 7] {
        shop.order_placed.raise(&OrderPlaced(n)).unwrap();
    }

    wait_until(|| !billing.orders.lock().unwrap().is_empty()).await;
    assert_eq!(*billing.orders.lock().unwrap(), vec![7]);

    drop(_active);
    bus.shutdown().await;
}

#[test]
fn manual_descriptors_are_equivalent_to_macros() {
    let manual = TypeCatalog::new("manual").with_root(
        CatalogUnit::new("manual")
            .publisher_with(
                TypeKey::of::<AccountManager>(),
                vec![EventDescriptor::new::<AccountManager, UserCreated>(
                    "user_created",
                    |a| &a.user_created,
                )],
            )
            .subscriber_with(
                TypeKey::of::<GameManager>(),
                vec![HandlerDescriptor::new::<GameManager, UserCreated, _, _>(
                    "on_user_created",
                    |g: &GameManager, e: &UserCreated| g.on_user_created(e),
                )],
            ),
    );
    let generated = TypeCatalog::new("generated")
        .publisher::<AccountManager>()
        .subscriber::<GameManager>();

    let describe = |set: BindingSet| -> Vec<(TypeKey, TypeKey, &'static str, &'static str)> {
        set.iter()
            .flat_map(|b| {
                b.routes().iter().map(move |r| {
                    (
                        b.publisher(),
                        b.subscriber(),
                        r.event().name(),
                        r.handler().method(),
                    )
                })
            })
            .collect()
    };

    assert_eq!(
        describe(resolve(DispatchMode::Direct, &manual)),
        describe(resolve(DispatchMode::Direct, &generated))
    );
}
