//! courier 过程宏
//!
//! - `#[event]`：为具名字段结构体补齐 id / 发生时间并实现 `Event`
//! - `#[request]`：实现 `Request`
//! - `#[stream_request]`：实现 `StreamRequest`
//!
//! 生成代码通过 `::courier::__private` 引用 serde / uuid / chrono，调用方无需直接依赖。
//!
use proc_macro::TokenStream;

mod event;
mod request;
mod utils;

use request::RequestKind;

/// 事件宏
///
/// ```ignore
/// #[event]
/// struct UserRegistered {
///     email: String,
///     #[sensitive]
///     password_hash: String,
/// }
///
/// let ev = UserRegistered::new("a@b.c".into(), "..".into());
/// ```
#[proc_macro_attribute]
pub fn event(attr: TokenStream, item: TokenStream) -> TokenStream {
    event::expand(attr, item)
}

/// 请求宏：`#[request(response = T)]`，可选 `name = "..."`
#[proc_macro_attribute]
pub fn request(attr: TokenStream, item: TokenStream) -> TokenStream {
    request::expand(RequestKind::Request, attr, item)
}

/// 流式请求宏：`#[stream_request(item = T)]`，可选 `name = "..."`
#[proc_macro_attribute]
pub fn stream_request(attr: TokenStream, item: TokenStream) -> TokenStream {
    request::expand(RequestKind::Stream, attr, item)
}
