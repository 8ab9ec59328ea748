use async_trait::async_trait;
use courier::BusProvider;
use courier::audit::MemoryAuditSink;
use courier::config::CourierConfig;
use courier::handler::{EventHandler, RequestHandler, StreamRequestHandler};
use courier::processor::ProcessorState;
use courier::registry::HandlerCatalog;
use courier_macros::{event, request, stream_request};
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[event(name = "account.deposited")]
struct Deposited {
    account: String,
    amount: i64,
}

#[event(name = "account.withdrawn")]
struct Withdrawn {
    account: String,
    amount: i64,
    #[sensitive]
    authorized_by: String,
}

#[request(response = i64)]
struct GetBalance {
    account: String,
}

#[stream_request(item = String, name = "account.history")]
struct History {
    account: String,
}

/// 读模型：余额与流水
#[derive(Default)]
struct Ledger {
    balances: Mutex<HashMap<String, i64>>,
    entries: Mutex<Vec<(String, String)>>,
}

impl Ledger {
    fn apply(&self, account: &str, delta: i64, line: String) {
        let mut balances = self.balances.lock().unwrap_or_else(|e| e.into_inner());
        *balances.entry(account.to_string()).or_default() += delta;
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((account.to_string(), line));
    }
}

struct LedgerProjector {
    ledger: Arc<Ledger>,
}

#[async_trait]
impl EventHandler<Deposited> for LedgerProjector {
    async fn handle(&self, event: &Deposited, _token: CancellationToken) -> anyhow::Result<()> {
        self.ledger
            .apply(&event.account, event.amount, format!("+{}", event.amount));
        Ok(())
    }
}

#[async_trait]
impl EventHandler<Withdrawn> for LedgerProjector {
    async fn handle(&self, event: &Withdrawn, _token: CancellationToken) -> anyhow::Result<()> {
        anyhow::ensure!(event.amount > 0, "withdrawal must be positive");
        self.ledger
            .apply(&event.account, -event.amount, format!("-{}", event.amount));
        Ok(())
    }
}

struct LedgerQueries {
    ledger: Arc<Ledger>,
}

#[async_trait]
impl RequestHandler<GetBalance> for LedgerQueries {
    async fn handle(&self, request: GetBalance, _token: CancellationToken) -> anyhow::Result<i64> {
        let balances = self.ledger.balances.lock().unwrap_or_else(|e| e.into_inner());
        balances
            .get(&request.account)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("unknown account {}", request.account))
    }
}

impl StreamRequestHandler<History> for LedgerQueries {
    fn handle(&self, request: History, _token: CancellationToken) -> BoxStream<'static, anyhow::Result<String>> {
        let lines: Vec<String> = self
            .ledger
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(account, _)| *account == request.account)
            .map(|(_, line)| line.clone())
            .collect();
        futures_util::stream::iter(lines.into_iter().map(Ok)).boxed()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let ledger = Arc::new(Ledger::default());
    let catalog = HandlerCatalog::new();
    let projector = Arc::new(LedgerProjector {
        ledger: ledger.clone(),
    });
    catalog.add_event_handler::<Deposited, _>(projector.clone());
    catalog.add_event_handler::<Withdrawn, _>(projector);
    let queries = Arc::new(LedgerQueries {
        ledger: ledger.clone(),
    });
    catalog.add_request_handler::<GetBalance, _>(queries.clone())?;
    catalog.add_stream_handler::<History, _>(queries)?;

    let config = CourierConfig::from_json(r#"{ "queue": { "kind": { "bounded": { "capacity": 16 } } } }"#)?;
    let audit = Arc::new(MemoryAuditSink::new());
    let provider = BusProvider::new(config, Arc::new(catalog))?.with_audit_sink(audit.clone());
    let bus = provider.bus();

    bus.subscribe::<Withdrawn, _, _>(Arc::new(
        |event: Arc<Withdrawn>, _token: CancellationToken| async move {
            if event.amount >= 500 {
                info!(account = %event.account, amount = event.amount, "large withdrawal");
            }
            anyhow::Ok(())
        },
    ))?;

    let handle = bus.start()?;
    let token = CancellationToken::new();
    bus.publish(Deposited::new("acc-1".into(), 1_000), &token).await?;
    bus.publish(Withdrawn::new("acc-1".into(), 600, "teller-7".into()), &token)
        .await?;
    bus.publish(Withdrawn::new("acc-1".into(), -5, "teller-7".into()), &token)
        .await?;
    bus.publish(Deposited::new("acc-2".into(), 50), &token).await?;

    let mut status = handle.watch_status();
    tokio::time::timeout(
        Duration::from_secs(2),
        status.wait_for(|s| s.processed == 4 && s.state == ProcessorState::Idle),
    )
    .await??;

    let balance = bus
        .send(GetBalance { account: "acc-1".into() }, CancellationToken::new())
        .await?;
    info!(balance, "acc-1 balance");

    let history: Vec<String> = bus
        .stream(History { account: "acc-1".into() }, CancellationToken::new())?
        .filter_map(|line| async move { line.ok() })
        .collect()
        .await;
    info!(?history, "acc-1 history");

    match bus
        .send(GetBalance { account: "acc-9".into() }, CancellationToken::new())
        .await
    {
        Ok(balance) => info!(balance, "acc-9 balance"),
        Err(err) => info!(error = %err, fatal = err.is_fatal(), "acc-9 lookup failed"),
    }

    handle.stop().await;
    if let Some(log) = provider.audit() {
        info!(records = log.len().await, writes = audit.writes(), "audit log");
    }
    Ok(())
}
