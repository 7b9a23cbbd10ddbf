use evwire_core::Subscriber;
use evwire_macros::subscriber;

#[derive(Clone)]
struct Ping;

struct Noisy;

#[subscriber]
impl Noisy {
    #[handles_event]
    fn no_payload(&self) {}

    #[handles_event]
    fn two_payloads(&self, _a: &Ping, _b: &Ping) {}

    #[handles_event]
    fn generic<T>(&self, _a: &T) {}

    #[handles_event]
    fn associated(_a: &Ping) {}

    #[handles_event]
    fn valid(&self, _a: &Ping) {}
}

fn main() {
    let handlers = Noisy::handlers();
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].method(), "valid");

    let noisy = Noisy;
    noisy.no_payload();
    noisy.two_payloads(&Ping, &Ping);
    noisy.generic(&Ping);
    Noisy::associated(&Ping);
}
