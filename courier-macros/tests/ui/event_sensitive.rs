use courier::message::EventEnvelope;
use courier_macros::event;

#[event]
struct UserRegistered {
    email: String,
    #[sensitive]
    password_hash: String,
}

fn main() {
    let ev = UserRegistered::new("a@b.c".into(), "bcrypt$...".into());
    assert_eq!(ev.password_hash, "bcrypt$...");

    let json = EventEnvelope::new(ev).to_json().unwrap();
    assert_eq!(json["email"], "a@b.c");
    assert!(json.get("password_hash").is_none());
    assert!(json.get("id").is_some());
    assert!(json.get("occurred_at").is_some());
}
