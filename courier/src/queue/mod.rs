//! 事件队列（EventQueue）协议
//!
//! 在发布方与处理循环之间缓冲事件的 FIFO 传输：
//! - 允许多个生产者并发入队；
//! - 只有一个逻辑消费者（处理循环）；
//! - 入队从不静默丢弃：无界时从不阻塞，有界时挂起直到有空间或被取消。
//!
mod inmemory;

pub use inmemory::InMemoryEventQueue;

use crate::error::MediatorResult;
use crate::message::EventEnvelope;
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait EventQueue: Send + Sync {
    /// 入队；`token` 取消时返回 `Cancelled`，队列关闭后返回 `QueueClosed`
    async fn enqueue(&self, event: EventEnvelope, token: &CancellationToken) -> MediatorResult<()>;

    /// 返回一个 'static 生命周期的出队流
    ///
    /// 队列为空时挂起；`token` 取消时结束；队列关闭时在取尽缓冲后结束。
    /// 每次调用都返回新的流，丢弃旧流后可以重新开始消费。
    fn dequeue(&self, token: CancellationToken) -> BoxStream<'static, EventEnvelope>;

    /// 关闭队列：拒绝后续入队，已缓冲的事件仍可被取出
    fn close(&self);

    /// 尚未被取出的事件数量
    fn pending(&self) -> usize;
}
