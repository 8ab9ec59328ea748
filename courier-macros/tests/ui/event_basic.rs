use courier::message::Event;
use courier_macros::event;

#[event]
struct OrderPlaced {
    order_no: String,
    amount: u64,
}

#[event(name = "inventory.reserved")]
#[derive(Debug, Clone)]
struct StockReserved {
    sku: String,
}

fn main() {
    let placed = OrderPlaced::new("A-1".into(), 42);
    assert_eq!(OrderPlaced::NAME, "OrderPlaced");
    assert_eq!(placed.event_id(), placed.id);
    assert_eq!(placed.occurred_at(), placed.occurred_at);
    assert_eq!(placed.clone(), placed);
    assert_eq!(placed.amount, 42);

    let reserved = StockReserved::new("sku-9".into());
    assert_eq!(StockReserved::NAME, "inventory.reserved");
    assert_ne!(reserved.id, OrderPlaced::new("A-2".into(), 1).id);
}
