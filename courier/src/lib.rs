//! 进程内中介层（courier）
//!
//! 在单个进程内解耦生产者与消费者，提供三种通信模式：
//! - 事件（`message::Event`）：发布即入队，由处理循环逐个取出，
//!   同时扇出给注册表解析的处理器与通过总线订阅的本地回调；
//! - 请求（`message::Request`）：恰好一个处理器，一个响应；
//! - 流式请求（`message::StreamRequest`）：恰好一个处理器，响应为可取消的惰性序列。
//!
//! 主要构件：
//! - `registry`：处理器解析与按类型缓存（`HandlerCatalog` 为内置的显式注册目录）
//! - `mediator`：处理器调用与失败隔离
//! - `queue`：事件队列（内存版支持有界/无界）
//! - `bus`：对外统一入口 `EventBus`
//! - `processor`：长驻处理循环与运行句柄
//! - `audit` / `config` / `provider`：审计、配置与组合根
//!
//! 典型用法：
//! 1. 定义事件与请求（可使用 `courier-macros` 的 `#[event]`、`#[request]`）；
//! 2. 在 `HandlerCatalog` 中登记处理器；
//! 3. 通过 `EventBus::builder().resolver(...)` 或 `BusProvider` 得到总线；
//! 4. `bus.start()` 启动处理循环，随后 `publish` / `send` / `stream`。
//!
pub mod audit;
pub mod bus;
pub mod config;
pub mod error;
pub mod handler;
pub mod mediator;
pub mod message;
pub mod processor;
pub mod provider;
pub mod queue;
pub mod registry;
pub mod subscription;

pub use bus::EventBus;
pub use error::{MediatorError, MediatorResult};
pub use mediator::Mediator;
pub use provider::BusProvider;

// 过程宏生成代码所依赖的第三方 crate，调用方无需自行引入
#[doc(hidden)]
pub mod __private {
    pub use chrono;
    pub use serde;
    pub use uuid;
}

// 允许在本 crate 内部通过 ::courier 进行自引用，
// 以便过程宏在本 crate 的测试中也能解析到 ::courier 路径。
extern crate self as courier;
