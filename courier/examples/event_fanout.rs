/// 事件扇出示例
/// 展示注册处理器与本地订阅同时消费事件、处理器失败被隔离，以及处理循环的启停
use async_trait::async_trait;
use courier::EventBus;
use courier::handler::EventHandler;
use courier::processor::ProcessorState;
use courier::registry::HandlerCatalog;
use courier_macros::event;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[event(name = "shop.order_placed")]
struct OrderPlaced {
    order_no: String,
    total_cents: u64,
    #[sensitive]
    card_number: String,
}

struct SendReceipt;

#[async_trait]
impl EventHandler<OrderPlaced> for SendReceipt {
    async fn handle(&self, event: &OrderPlaced, _token: CancellationToken) -> anyhow::Result<()> {
        println!("receipt sent for {}", event.order_no);
        Ok(())
    }
}

struct ReserveStock;

#[async_trait]
impl EventHandler<OrderPlaced> for ReserveStock {
    async fn handle(&self, event: &OrderPlaced, _token: CancellationToken) -> anyhow::Result<()> {
        anyhow::ensure!(event.total_cents < 100_000, "order {} exceeds stock", event.order_no);
        println!("stock reserved for {}", event.order_no);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let catalog = HandlerCatalog::new();
    catalog.add_event_handler::<OrderPlaced, _>(Arc::new(SendReceipt));
    catalog.add_event_handler::<OrderPlaced, _>(Arc::new(ReserveStock));

    let bus = EventBus::builder().resolver(Arc::new(catalog)).build();
    bus.subscribe::<OrderPlaced, _, _>(Arc::new(
        |event: Arc<OrderPlaced>, _token: CancellationToken| async move {
            println!("dashboard: {} = {} cents", event.order_no, event.total_cents);
            anyhow::Ok(())
        },
    ))?;

    let handle = bus.start()?;
    let token = CancellationToken::new();
    bus.publish(OrderPlaced::new("A-1".into(), 4_200, "4111".into()), &token)
        .await?;
    bus.publish(OrderPlaced::new("A-2".into(), 250_000, "4242".into()), &token)
        .await?;

    let mut status = handle.watch_status();
    tokio::time::timeout(
        Duration::from_secs(2),
        status.wait_for(|s| s.processed == 2 && s.state == ProcessorState::Idle),
    )
    .await??;

    handle.stop().await;
    Ok(())
}
