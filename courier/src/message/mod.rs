//! 消息（Message）
//!
//! 三种通信模式对应的消息抽象：
//! - `Event`：发出即忘、可被多个处理器消费的通知；
//! - `Request`：命令/查询，恰好一个处理器、一个响应；
//! - `StreamRequest`：恰好一个处理器，响应为惰性序列。
//!
//! 事件在进入队列前被擦除为 `EventEnvelope`，以便在单一队列中承载任意事件类型。

mod envelope;
mod event;
mod key;
mod request;

pub use envelope::EventEnvelope;
pub use event::Event;
pub use key::{RequestKey, TypeKey};
pub use request::{Request, StreamRequest};
