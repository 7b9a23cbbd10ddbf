use evwire_core::{Subscriber, TypeKey};
use evwire_macros::subscriber;

#[derive(Clone)]
struct Opened;

#[derive(Clone)]
struct Closed;

struct Alarm;

#[subscriber]
impl Alarm {
    #[handles_event]
    fn on_opened(&self, _event: &Opened) {}

    #[handles_event]
    fn on_closed(&self, _event: Closed) -> anyhow::Result<()> {
        Ok(())
    }

    fn not_a_handler(&self, _event: &Opened) {}
}

fn main() {
    let handlers = Alarm::handlers();
    assert_eq!(handlers.len(), 2);
    assert_eq!(handlers[0].method(), "on_opened");
    assert_eq!(handlers[0].payload(), TypeKey::of::<Opened>());
    assert_eq!(handlers[1].label(), "Alarm::on_closed");
    Alarm.not_a_handler(&Opened);
}
