#![allow(dead_code)]

use evwire_macros::subscriber;

#[derive(Clone)]
struct Ping;

struct Pinger;

#[subscriber(strict)]
impl Pinger {
    #[handles_event]
    fn on_pair(&self, _a: &Ping, _b: &Ping) {}
}

fn main() {}
