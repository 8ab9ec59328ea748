//! 内存版事件队列（InMemoryEventQueue）
//!
//! 基于 `tokio::sync::mpsc` 实现，支持无界与有界两种模式：
//! - 无界：入队从不阻塞；
//! - 有界：缓冲区满时入队挂起，直到消费者取走事件或调用方取消。
//!
//! 关闭后拒绝新的入队，消费者在取尽已缓冲事件后收到流结束。

use super::EventQueue;
use crate::error::{MediatorError, MediatorResult};
use crate::message::EventEnvelope;
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::{StreamExt, stream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
enum QueueSender {
    Unbounded(mpsc::UnboundedSender<EventEnvelope>),
    Bounded(mpsc::Sender<EventEnvelope>),
}

enum QueueReceiver {
    Unbounded(mpsc::UnboundedReceiver<EventEnvelope>),
    Bounded(mpsc::Receiver<EventEnvelope>),
}

impl QueueReceiver {
    async fn recv(&mut self) -> Option<EventEnvelope> {
        match self {
            Self::Unbounded(rx) => rx.recv().await,
            Self::Bounded(rx) => rx.recv().await,
        }
    }
}

pub struct InMemoryEventQueue {
    // 关闭时置为 None；接收端在所有发送端释放后结束
    sender: RwLock<Option<QueueSender>>,
    receiver: Arc<Mutex<QueueReceiver>>,
    pending: Arc<AtomicUsize>,
    capacity: Option<usize>,
}

impl InMemoryEventQueue {
    /// 创建无界队列
    pub fn unbounded() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self::from_parts(QueueSender::Unbounded(tx), QueueReceiver::Unbounded(rx), None)
    }

    /// 创建有界队列，`capacity` 为缓冲区容量（至少为 1）
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self::from_parts(
            QueueSender::Bounded(tx),
            QueueReceiver::Bounded(rx),
            Some(capacity),
        )
    }

    fn from_parts(tx: QueueSender, rx: QueueReceiver, capacity: Option<usize>) -> Self {
        Self {
            sender: RwLock::new(Some(tx)),
            receiver: Arc::new(Mutex::new(rx)),
            pending: Arc::new(AtomicUsize::new(0)),
            capacity,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn sender(&self) -> Option<QueueSender> {
        self.sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for InMemoryEventQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl EventQueue for InMemoryEventQueue {
    async fn enqueue(&self, event: EventEnvelope, token: &CancellationToken) -> MediatorResult<()> {
        if token.is_cancelled() {
            return Err(MediatorError::Cancelled);
        }
        let Some(sender) = self.sender() else {
            return Err(MediatorError::QueueClosed);
        };

        // 先计数再发送，保证消费者取出时计数已包含该事件
        self.pending.fetch_add(1, Ordering::AcqRel);

        let sent = match sender {
            QueueSender::Unbounded(tx) => tx.send(event).map_err(|_| MediatorError::QueueClosed),
            QueueSender::Bounded(tx) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(MediatorError::Cancelled),
                    sent = tx.send(event) => sent.map_err(|_| MediatorError::QueueClosed),
                }
            }
        };

        if sent.is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
        }
        sent
    }

    fn dequeue(&self, token: CancellationToken) -> BoxStream<'static, EventEnvelope> {
        let receiver = self.receiver.clone();
        let pending = self.pending.clone();

        stream::unfold(
            (receiver, pending, token),
            |(receiver, pending, token)| async move {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    event = async { receiver.lock().await.recv().await } => event,
                };

                let event = next?;
                pending.fetch_sub(1, Ordering::AcqRel);
                Some((event, (receiver, pending, token)))
            },
        )
        .boxed()
    }

    fn close(&self) {
        self.sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Event;
    use chrono::{DateTime, Utc};
    use serde::Serialize;
    use std::time::Duration;
    use uuid::Uuid;

    #[derive(Debug, Serialize)]
    struct Numbered {
        id: Uuid,
        n: u32,
    }

    impl Event for Numbered {
        const NAME: &'static str = "Numbered";

        fn event_id(&self) -> Uuid {
            self.id
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    fn ev(n: u32) -> EventEnvelope {
        EventEnvelope::new(Numbered {
            id: Uuid::new_v4(),
            n,
        })
    }

    fn n_of(env: &EventEnvelope) -> u32 {
        env.downcast::<Numbered>().unwrap().n
    }

    #[tokio::test]
    async fn dequeues_in_enqueue_order() {
        let queue = InMemoryEventQueue::unbounded();
        let token = CancellationToken::new();
        for n in 0..5 {
            queue.enqueue(ev(n), &token).await.unwrap();
        }
        assert_eq!(queue.pending(), 5);

        let got: Vec<u32> = queue
            .dequeue(token.clone())
            .take(5)
            .map(|e| n_of(&e))
            .collect()
            .await;
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn close_drains_buffer_then_ends() {
        let queue = InMemoryEventQueue::unbounded();
        let token = CancellationToken::new();
        for n in 0..3 {
            queue.enqueue(ev(n), &token).await.unwrap();
        }
        queue.close();
        assert!(queue.is_closed());
        assert_eq!(
            queue.enqueue(ev(9), &token).await.unwrap_err(),
            MediatorError::QueueClosed
        );

        let got: Vec<u32> = queue.dequeue(token).map(|e| n_of(&e)).collect().await;
        assert_eq!(got, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn dequeue_is_restartable_per_call() {
        let queue = InMemoryEventQueue::unbounded();
        let token = CancellationToken::new();
        for n in 0..2 {
            queue.enqueue(ev(n), &token).await.unwrap();
        }

        {
            let mut first = queue.dequeue(token.clone());
            assert_eq!(n_of(&first.next().await.unwrap()), 0);
        }
        let mut second = queue.dequeue(token.clone());
        assert_eq!(n_of(&second.next().await.unwrap()), 1);
    }

    #[tokio::test]
    async fn cancelled_consumer_stops_waiting() {
        let queue = InMemoryEventQueue::unbounded();
        let token = CancellationToken::new();
        let mut events = queue.dequeue(token.clone());

        let waiter = tokio::spawn(async move { events.next().await.is_none() });
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bounded_enqueue_waits_for_space() {
        let queue = Arc::new(InMemoryEventQueue::bounded(1));
        let token = CancellationToken::new();
        queue.enqueue(ev(0), &token).await.unwrap();

        let producer = {
            let queue = queue.clone();
            let token = token.clone();
            tokio::spawn(async move { queue.enqueue(ev(1), &token).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!producer.is_finished());

        let mut events = queue.dequeue(token.clone());
        assert_eq!(n_of(&events.next().await.unwrap()), 0);
        producer.await.unwrap().unwrap();
        assert_eq!(n_of(&events.next().await.unwrap()), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bounded_enqueue_can_be_cancelled() {
        let queue = Arc::new(InMemoryEventQueue::bounded(1));
        queue
            .enqueue(ev(0), &CancellationToken::new())
            .await
            .unwrap();

        let token = CancellationToken::new();
        let producer = {
            let queue = queue.clone();
            let token = token.clone();
            tokio::spawn(async move { queue.enqueue(ev(1), &token).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        assert_eq!(producer.await.unwrap().unwrap_err(), MediatorError::Cancelled);
        assert_eq!(queue.pending(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_producers_lose_nothing() {
        let queue = Arc::new(InMemoryEventQueue::bounded(8));
        let token = CancellationToken::new();

        let mut producers = Vec::new();
        for p in 0..4u32 {
            let queue = queue.clone();
            let token = token.clone();
            producers.push(tokio::spawn(async move {
                for i in 0..25u32 {
                    queue.enqueue(ev(p * 100 + i), &token).await.unwrap();
                }
            }));
        }

        let mut got: Vec<u32> = queue
            .dequeue(token.clone())
            .take(100)
            .map(|e| n_of(&e))
            .collect()
            .await;
        for p in producers {
            p.await.unwrap();
        }
        got.sort_unstable();
        got.dedup();
        assert_eq!(got.len(), 100);
    }
}
