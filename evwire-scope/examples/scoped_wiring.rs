//! 每个工作单元一个作用域：开始时自动绑定，结束时自动解除
//!
//! 运行：`RUST_LOG=debug cargo run -p evwire-scope --example scoped_wiring -- in_memory_queue`
use anyhow::Result as AnyResult;
use evwire_core::{DispatchMode, Event, TypeCatalog, WiringConfig};
use evwire_macros::{publisher, subscriber};
use evwire_scope::{EventWiring, ScopedInstances};
use std::sync::Arc;
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
struct GameManager;

#[subscriber]
impl GameManager {
    #[handles_event]
    fn on_user_created(&self, event: &UserCreated) -> AnyResult<()> {
        println!("welcome to the game, {}", event.name);
        Ok(())
    }
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

    let mode: DispatchMode = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => DispatchMode::Direct,
    };
    let config = WiringConfig::builder().mode(mode).build();

    let catalog = TypeCatalog::new("scoped_wiring")
        .publisher::<AccountManager>()
        .subscriber::<GameManager>();
    let wiring = EventWiring::new(&catalog, config)?;

    for name in ["Direct", "Queued"] {
        let instances = Arc::new(ScopedInstances::new());
        let accounts = instances.register(AccountManager::default())?;
        instances.register(GameManager)?;

        let scope = wiring.begin_scope(instances)?;
        accounts.user_created.raise(&UserCreated {
            name: name.to_string(),
        })?;
        if mode == DispatchMode::InMemoryQueue {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        scope.end();
    }

    wiring.shutdown().await;
    Ok(())
}
