use evwire_macros::publisher;

#[publisher]
enum Status {
    Idle,
}

fn main() {}
