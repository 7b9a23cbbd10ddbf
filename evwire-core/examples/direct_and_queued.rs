//! 同一组类型分别以直连与排队两种模式装配
//!
//! 运行：`RUST_LOG=evwire_core=debug cargo run -p evwire-core --example direct_and_queued`
use anyhow::Result as AnyResult;
use evwire_core::{
    BindingResolver, DispatchMode, Event, InMemoryEventBus, Instance, TypeCatalog, WiringConfig,
};
use evwire_macros::{publisher, subscriber};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Debug)]
struct UserCreated {
    name: String,
}

#[publisher]
#[derive(Default)]
struct AccountManager {
    user_created: Event<UserCreated>,
}

#[derive(Default)]
struct GameManager {
    players: Mutex<Vec<String>>,
}

#[subscriber]
impl GameManager {
    #[handles_event]
    fn on_user_created(&self, event: &UserCreated) {
        println!("game manager saw {}", event.name);
        if let Ok(mut players) = self.players.lock() {
            players.push(event.name.clone());
        }
    }
}

fn wire(
    mode: DispatchMode,
    bus: Option<&InMemoryEventBus>,
) -> AnyResult<(Arc<AccountManager>, Arc<GameManager>, evwire_core::ActiveBinding)> {
    let catalog = TypeCatalog::new("demo")
        .publisher::<AccountManager>()
        .subscriber::<GameManager>();
    let config = WiringConfig::builder().mode(mode).build();
    let bindings = BindingResolver::from_config(&config).resolve(&catalog)?;

    let accounts = Arc::new(AccountManager::default());
    let games = Arc::new(GameManager::default());
    let publisher: Instance = accounts.clone();
    let subscriber: Instance = games.clone();

    let binding = bindings
        .get(0)
        .ok_or_else(|| anyhow::anyhow!("no binding resolved"))?;
    let active = binding.activate(&publisher, &subscriber, bus)?;
    Ok((accounts, games, active))
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let (accounts, games, _direct) = wire(DispatchMode::Direct, None)?;
    accounts.user_created.raise(&UserCreated {
        name: "Direct".into(),
    })?;
    println!("direct: {:?}", games.players.lock().map(|p| p.clone()));

    let bus = InMemoryEventBus::new()?;
    let (accounts, games, queued) = wire(DispatchMode::InMemoryQueue, Some(&bus))?;
    accounts.user_created.raise(&UserCreated {
        name: "Queued".into(),
    })?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("queued: {:?}", games.players.lock().map(|p| p.clone()));

    drop(queued);
    bus.shutdown().await;
    println!("bus stats: {:?}", bus.stats());
    Ok(())
}
