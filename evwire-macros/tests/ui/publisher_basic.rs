use evwire_core::{Event, Publisher, TypeKey};
use evwire_macros::publisher;

#[derive(Clone)]
struct Opened;

#[derive(Clone)]
struct Closed {
    reason: String,
}

#[publisher]
#[derive(Default)]
struct Door {
    opened: Event<Opened>,
    closed: evwire_core::Event<Closed>,
    r#type: Event<String>,
    label: String,
}

fn main() {
    let events = Door::events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].name(), "opened");
    assert_eq!(events[1].payload(), TypeKey::of::<Closed>());
    assert_eq!(events[2].name(), "type");

    let door = Door::default();
    let _ = (&door.label, &door.r#type);
    door.closed
        .raise(&Closed {
            reason: "wind".into(),
        })
        .unwrap();
    assert_eq!(door.opened.subscriber_count(), 0);
}
