use super::{EventHandlerBinding, RequestHandlerBinding, StreamHandlerBinding};
use crate::message::{RequestKey, TypeKey};

/// 处理器解析能力（依赖注入容器的边界）
///
/// 注册表在某个类型首次分发时调用一次，结果随后被缓存，
/// 因此实现可以是昂贵的查找。内置实现见 [`HandlerCatalog`](super::HandlerCatalog)。
///
/// 解析期间可以通过注册表查询其他类型，但不能递归解析正在解析的同一类型。
pub trait HandlerResolver: Send + Sync {
    /// 解析事件的全部处理器；`None` 表示未安装任何处理器
    fn resolve_event_handlers(&self, event: TypeKey) -> Option<Vec<EventHandlerBinding>>;

    /// 解析请求的唯一处理器
    fn resolve_request_handler(&self, key: RequestKey) -> Option<RequestHandlerBinding>;

    /// 解析流式请求的唯一处理器
    fn resolve_stream_handler(&self, key: RequestKey) -> Option<StreamHandlerBinding>;
}
