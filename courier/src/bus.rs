//! 事件总线（EventBus）
//!
//! 对外的统一入口：
//! - `publish`：事件只入队，由处理循环异步分发；
//! - `subscribe` / `unsubscribe`：挂载或移除本地回调；
//! - `send` / `stream`：请求与流式请求，直接委托给中介者；
//! - `start`：启动处理循环，同一总线同一时刻只允许一个循环。
//!
use crate::audit::AuditLog;
use crate::error::MediatorResult;
use crate::mediator::Mediator;
use crate::message::{Event, EventEnvelope, Request, StreamRequest};
use crate::processor::{EventProcessor, ProcessorHandle};
use crate::queue::{EventQueue, InMemoryEventQueue};
use crate::registry::HandlerResolver;
use crate::subscription::{SubscriptionHandle, SubscriptionTable};
use bon::Builder;
use futures_core::stream::BoxStream;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;

// 导入由 bon::Builder 生成的 typestate 模块与状态转换别名
use self::event_bus_builder::{IsUnset, SetMediator, State as BuilderState};

#[derive(Builder)]
pub struct EventBus {
    mediator: Arc<Mediator>,
    #[builder(default = default_queue())]
    queue: Arc<dyn EventQueue>,
    audit: Option<Arc<AuditLog>>,
    #[builder(skip)]
    subscriptions: Arc<SubscriptionTable>,
    #[builder(skip)]
    running: Arc<AtomicBool>,
}

fn default_queue() -> Arc<dyn EventQueue> {
    Arc::new(InMemoryEventQueue::unbounded())
}

impl<S: BuilderState> EventBusBuilder<S> {
    /// 以处理器解析器构建独享的中介者
    ///
    /// 与 `mediator(...)` 互斥，受 typestate 限制只能设置一次。
    pub fn resolver(self, resolver: Arc<dyn HandlerResolver>) -> EventBusBuilder<SetMediator<S>>
    where
        <S as BuilderState>::Mediator: IsUnset,
    {
        self.mediator(Arc::new(Mediator::new(resolver)))
    }
}

impl EventBus {
    /// 发布事件：仅入队，不等待处理
    ///
    /// 令牌随事件一起交给处理器；有界队列已满时等待空位，令牌取消则返回 `Cancelled`。
    pub async fn publish<E: Event>(&self, event: E, token: &CancellationToken) -> MediatorResult<()> {
        let envelope = EventEnvelope::new(event).with_cancellation(token.clone());
        let event_id = envelope.event_id();

        self.queue
            .enqueue(envelope, token)
            .await
            .inspect(|_| debug!(event = E::NAME, %event_id, "event queued"))
    }

    /// 订阅事件类型 `E`
    pub fn subscribe<E, F, Fut>(&self, callback: Arc<F>) -> MediatorResult<SubscriptionHandle>
    where
        E: Event,
        F: Fn(Arc<E>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.subscriptions.subscribe::<E, F, Fut>(callback)
    }

    /// 退订：事件类型从未订阅返回 `NoSubscriptionForType`，未知回调视为成功
    pub fn unsubscribe<E, F>(&self, callback: &Arc<F>) -> MediatorResult<()>
    where
        E: Event,
        F: ?Sized,
    {
        self.subscriptions.unsubscribe::<E, F>(callback)
    }

    pub fn unsubscribe_handle(&self, handle: SubscriptionHandle) -> MediatorResult<()> {
        self.subscriptions.remove(handle)
    }

    pub async fn send<R: Request>(
        &self,
        request: R,
        token: CancellationToken,
    ) -> MediatorResult<R::Response> {
        self.mediator.send(request, token).await
    }

    pub fn stream<R: StreamRequest>(
        &self,
        request: R,
        token: CancellationToken,
    ) -> MediatorResult<BoxStream<'static, MediatorResult<R::Item>>> {
        self.mediator.stream(request, token)
    }

    /// 启动处理循环；已在运行时返回 `ProcessorRunning`
    pub fn start(&self) -> MediatorResult<ProcessorHandle> {
        EventProcessor::builder()
            .queue(self.queue.clone())
            .mediator(self.mediator.clone())
            .subscriptions(self.subscriptions.clone())
            .maybe_audit(self.audit.clone())
            .running(self.running.clone())
            .build()
            .start()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn subscriptions(&self) -> &SubscriptionTable {
        &self.subscriptions
    }

    pub fn queue(&self) -> &Arc<dyn EventQueue> {
        &self.queue
    }

    pub fn mediator(&self) -> &Arc<Mediator> {
        &self.mediator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediatorError;
    use crate::handler::RequestHandler;
    use crate::registry::HandlerCatalog;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde::Serialize;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use uuid::Uuid;

    #[derive(Debug, Serialize)]
    struct Clicked {
        id: Uuid,
    }

    impl Event for Clicked {
        const NAME: &'static str = "Clicked";

        fn event_id(&self) -> Uuid {
            self.id
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    fn clicked() -> Clicked {
        Clicked { id: Uuid::new_v4() }
    }

    struct Add(i32, i32);

    impl Request for Add {
        const NAME: &'static str = "Add";
        type Response = i32;
    }

    struct AddHandler;

    #[async_trait]
    impl RequestHandler<Add> for AddHandler {
        async fn handle(&self, req: Add, _token: CancellationToken) -> anyhow::Result<i32> {
            Ok(req.0 + req.1)
        }
    }

    #[tokio::test]
    async fn publish_only_enqueues() {
        let bus = EventBus::builder()
            .resolver(Arc::new(HandlerCatalog::new()))
            .build();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        bus.subscribe::<Clicked, _, _>(Arc::new(move |_e: Arc<Clicked>, _t: CancellationToken| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        }))
        .unwrap();

        bus.publish(clicked(), &CancellationToken::new()).await.unwrap();
        assert_eq!(bus.queue().pending(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn publish_with_cancelled_token_is_rejected() {
        let bus = EventBus::builder()
            .resolver(Arc::new(HandlerCatalog::new()))
            .build();
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(
            bus.publish(clicked(), &token).await.unwrap_err(),
            MediatorError::Cancelled
        );
        assert_eq!(bus.queue().pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn processed_events_reach_local_subscribers() {
        let bus = EventBus::builder()
            .resolver(Arc::new(HandlerCatalog::new()))
            .queue(Arc::new(InMemoryEventQueue::bounded(4)))
            .build();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let handle = bus
            .subscribe::<Clicked, _, _>(Arc::new(move |_e: Arc<Clicked>, _t: CancellationToken| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    anyhow::Ok(())
                }
            }))
            .unwrap();

        let processor = bus.start().unwrap();
        assert!(bus.is_running());
        assert!(matches!(bus.start().err(), Some(MediatorError::ProcessorRunning)));

        let token = CancellationToken::new();
        for _ in 0..10 {
            bus.publish(clicked(), &token).await.unwrap();
        }
        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while hits.load(Ordering::SeqCst) < 10 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert_eq!(hits.load(Ordering::SeqCst), 10);

        bus.unsubscribe_handle(handle).unwrap();
        assert_eq!(bus.subscriptions().count::<Clicked>(), 0);
        processor.stop().await;
        assert!(!bus.is_running());
    }

    #[tokio::test]
    async fn send_goes_through_shared_mediator() {
        let catalog = HandlerCatalog::new();
        catalog.add_request_handler::<Add, _>(Arc::new(AddHandler)).unwrap();
        let mediator = Arc::new(Mediator::new(Arc::new(catalog)));

        let first = EventBus::builder().mediator(mediator.clone()).build();
        let second = EventBus::builder().mediator(mediator).build();

        assert_eq!(first.send(Add(2, 3), CancellationToken::new()).await.unwrap(), 5);
        assert_eq!(second.send(Add(4, 4), CancellationToken::new()).await.unwrap(), 8);
        assert!(Arc::ptr_eq(first.mediator(), second.mediator()));
    }
}
