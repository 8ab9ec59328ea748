/// 请求/响应与流式请求示例
/// 展示 HandlerCatalog 注册、send 的一对一调用、stream 的惰性序列与中途取消
use async_trait::async_trait;
use courier::EventBus;
use courier::handler::{RequestHandler, StreamRequestHandler};
use courier::registry::HandlerCatalog;
use courier_macros::{request, stream_request};
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[request(response = Option<String>)]
struct FindCustomer {
    id: u32,
}

#[stream_request(item = u64)]
struct Countdown {
    from: u64,
}

struct CustomerDirectory {
    names: Vec<&'static str>,
}

#[async_trait]
impl RequestHandler<FindCustomer> for CustomerDirectory {
    async fn handle(
        &self,
        request: FindCustomer,
        _token: CancellationToken,
    ) -> anyhow::Result<Option<String>> {
        Ok(self
            .names
            .get(request.id as usize)
            .map(|name| name.to_string()))
    }
}

struct CountdownHandler;

impl StreamRequestHandler<Countdown> for CountdownHandler {
    fn handle(
        &self,
        request: Countdown,
        _token: CancellationToken,
    ) -> BoxStream<'static, anyhow::Result<u64>> {
        futures_util::stream::iter((0..=request.from).rev().map(Ok)).boxed()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let catalog = HandlerCatalog::new();
    catalog.add_request_handler::<FindCustomer, _>(Arc::new(CustomerDirectory {
        names: vec!["ann", "bob"],
    }))?;
    catalog.add_stream_handler::<Countdown, _>(Arc::new(CountdownHandler))?;

    let bus = EventBus::builder().resolver(Arc::new(catalog)).build();

    for id in [0, 1, 7] {
        let found = bus.send(FindCustomer { id }, CancellationToken::new()).await?;
        println!("customer {id}: {found:?}");
    }

    let all: Vec<u64> = bus
        .stream(Countdown { from: 5 }, CancellationToken::new())?
        .filter_map(|item| async move { item.ok() })
        .collect()
        .await;
    println!("countdown: {all:?}");

    // 取消后序列立即结束
    let token = CancellationToken::new();
    let mut partial = bus.stream(Countdown { from: 100 }, token.clone())?;
    let mut taken = Vec::new();
    while let Some(item) = partial.next().await {
        taken.push(item?);
        if taken.len() == 3 {
            token.cancel();
        }
    }
    println!("cancelled after: {taken:?}");

    Ok(())
}
