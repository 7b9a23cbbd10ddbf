#![allow(dead_code)]

use evwire_macros::subscriber;

#[derive(Clone)]
struct Ping;

struct Pinger;

#[subscriber(strict)]
impl Pinger {
    #[handles_event]
    async fn on_ping(&self, _event: &Ping) {}
}

fn main() {}
