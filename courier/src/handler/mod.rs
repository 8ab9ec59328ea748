//! 处理器（Handler）
//!
//! - `EventHandler`：事件处理器，同一事件类型可以有多个；
//! - `RequestHandler`：请求处理器，每个请求类型恰好一个；
//! - `StreamRequestHandler`：流式请求处理器，每个流式请求类型恰好一个；
//! - `HandlerOutcome`：扇出时每个处理器的执行结果（以值的形式收集，而非向上抛出）。

mod event_handler;
mod outcome;
mod request_handler;
mod stream_handler;

pub use event_handler::EventHandler;
pub use outcome::{HandlerOrigin, HandlerOutcome, ProcessedEvent};
pub use request_handler::RequestHandler;
pub use stream_handler::StreamRequestHandler;

pub(crate) use outcome::{panic_reason, run_guarded};
