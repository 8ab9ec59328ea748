use async_trait::async_trait;
use courier::handler::{RequestHandler, StreamRequestHandler};
use courier::registry::HandlerCatalog;
use courier::{EventBus, MediatorError};
use courier_macros::{request, stream_request};
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[request(response = String)]
struct Ping;

#[request(response = u64)]
struct Unhandled;

#[request(response = u32)]
struct Divide {
    a: u32,
    b: u32,
}

#[stream_request(item = char)]
struct Spell {
    word: String,
}

#[stream_request(item = u64)]
struct Ticks;

struct PingHandler {
    calls: AtomicUsize,
}

#[async_trait]
impl RequestHandler<Ping> for PingHandler {
    async fn handle(&self, _request: Ping, _token: CancellationToken) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("pong".to_string())
    }
}

struct DivideHandler;

#[async_trait]
impl RequestHandler<Divide> for DivideHandler {
    async fn handle(&self, request: Divide, _token: CancellationToken) -> anyhow::Result<u32> {
        request
            .a
            .checked_div(request.b)
            .ok_or_else(|| anyhow::anyhow!("division by zero"))
    }
}

struct SpellHandler;

impl StreamRequestHandler<Spell> for SpellHandler {
    fn handle(
        &self,
        request: Spell,
        _token: CancellationToken,
    ) -> BoxStream<'static, anyhow::Result<char>> {
        let letters: Vec<char> = request.word.chars().collect();
        futures_util::stream::iter(letters.into_iter().map(Ok)).boxed()
    }
}

struct TicksHandler;

impl StreamRequestHandler<Ticks> for TicksHandler {
    fn handle(&self, _request: Ticks, _token: CancellationToken) -> BoxStream<'static, anyhow::Result<u64>> {
        futures_util::stream::unfold(0u64, |n| async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Some((Ok(n), n + 1))
        })
        .boxed()
    }
}

fn bus() -> (EventBus, Arc<PingHandler>) {
    let catalog = HandlerCatalog::new();
    let ping = Arc::new(PingHandler {
        calls: AtomicUsize::new(0),
    });
    catalog.add_request_handler::<Ping, _>(ping.clone()).unwrap();
    catalog
        .add_request_handler::<Divide, _>(Arc::new(DivideHandler))
        .unwrap();
    catalog
        .add_stream_handler::<Spell, _>(Arc::new(SpellHandler))
        .unwrap();
    catalog
        .add_stream_handler::<Ticks, _>(Arc::new(TicksHandler))
        .unwrap();

    (EventBus::builder().resolver(Arc::new(catalog)).build(), ping)
}

#[tokio::test(flavor = "multi_thread")]
async fn thousand_pings_all_answer_pong() {
    let (bus, ping) = bus();
    let bus = Arc::new(bus);

    let answers = tokio::time::timeout(Duration::from_secs(5), async {
        let calls = (0..1000).map(|_| {
            let bus = bus.clone();
            async move { bus.send(Ping, CancellationToken::new()).await }
        });
        futures_util::future::join_all(calls).await
    })
    .await
    .expect("pings timed out");

    assert_eq!(answers.len(), 1000);
    assert!(answers.iter().all(|a| a.as_deref() == Ok("pong")));
    assert_eq!(ping.calls.load(Ordering::SeqCst), 1000);
}

#[tokio::test]
async fn thousand_sequential_pings_finish_in_time() {
    let (bus, ping) = bus();

    tokio::time::timeout(Duration::from_secs(5), async {
        for _ in 0..1000 {
            assert_eq!(bus.send(Ping, CancellationToken::new()).await.unwrap(), "pong");
        }
    })
    .await
    .expect("sequential pings timed out");

    assert_eq!(ping.calls.load(Ordering::SeqCst), 1000);
}

#[tokio::test]
async fn request_without_handler_is_a_fatal_error() {
    let (bus, _) = bus();
    let err = bus
        .send(Unhandled, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(
        err,
        MediatorError::HandlerNotFound { message } if message.ends_with("Unhandled")
    ));
}

#[tokio::test]
async fn handler_error_is_returned_to_the_caller() {
    let (bus, _) = bus();
    assert_eq!(
        bus.send(Divide { a: 9, b: 3 }, CancellationToken::new())
            .await
            .unwrap(),
        3
    );

    let err = bus
        .send(Divide { a: 1, b: 0 }, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(!err.is_fatal());
    match err {
        MediatorError::HandlerFailed { handler, reason } => {
            assert!(handler.contains("DivideHandler"));
            assert_eq!(reason, "division by zero");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn stream_yields_items_in_order() {
    let (bus, _) = bus();
    let items: Vec<char> = bus
        .stream(
            Spell {
                word: "abc".into(),
            },
            CancellationToken::new(),
        )
        .unwrap()
        .map(|item| item.unwrap())
        .collect()
        .await;

    assert_eq!(items, vec!['a', 'b', 'c']);
}

#[tokio::test]
async fn cancelled_stream_ends_early() {
    let (bus, _) = bus();
    let token = CancellationToken::new();
    let mut ticks = bus.stream(Ticks, token.clone()).unwrap();

    let mut seen = Vec::new();
    while let Some(tick) = ticks.next().await {
        seen.push(tick.unwrap());
        if seen.len() == 3 {
            token.cancel();
        }
    }

    assert_eq!(seen, vec![0, 1, 2]);
    assert!(ticks.next().await.is_none());
}

#[tokio::test]
async fn stream_without_handler_is_not_found() {
    let catalog = HandlerCatalog::new();
    let bus = EventBus::builder().resolver(Arc::new(catalog)).build();
    let err = bus
        .stream(Ticks, CancellationToken::new())
        .err()
        .expect("no stream handler registered");
    assert!(matches!(
        err,
        MediatorError::HandlerNotFound { message } if message.ends_with("Ticks")
    ));
}
