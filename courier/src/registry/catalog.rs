use super::{EventHandlerBinding, HandlerResolver, RequestHandlerBinding, StreamHandlerBinding};
use crate::error::{MediatorError, MediatorResult};
use crate::handler::{EventHandler, RequestHandler, StreamRequestHandler};
use crate::message::{Event, Request, RequestKey, StreamRequest, TypeKey};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// 显式注册的处理器目录
///
/// - 启动阶段通过 `add_*` 方法登记处理器；
/// - 事件允许一对多，请求/流式请求严格一对一（重复注册返回 `AlreadyRegistered`）；
/// - 实现 [`HandlerResolver`]，作为注册表的默认解析来源。
#[derive(Default)]
pub struct HandlerCatalog {
    events: DashMap<TypeKey, Vec<EventHandlerBinding>>,
    requests: DashMap<RequestKey, RequestHandlerBinding>,
    streams: DashMap<RequestKey, StreamHandlerBinding>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册事件处理器（同一事件可注册多个）
    pub fn add_event_handler<E, H>(&self, handler: Arc<H>)
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        self.events
            .entry(TypeKey::of::<E>())
            .or_default()
            .push(EventHandlerBinding::new::<E, H>(handler));
    }

    /// 注册请求处理器
    pub fn add_request_handler<R, H>(&self, handler: Arc<H>) -> MediatorResult<()>
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        match self.requests.entry(RequestKey::of::<R, R::Response>()) {
            Entry::Occupied(_) => Err(MediatorError::AlreadyRegistered {
                request: R::NAME,
                response: std::any::type_name::<R::Response>(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(RequestHandlerBinding::new::<R, H>(handler));
                Ok(())
            }
        }
    }

    /// 注册流式请求处理器
    pub fn add_stream_handler<R, H>(&self, handler: Arc<H>) -> MediatorResult<()>
    where
        R: StreamRequest,
        H: StreamRequestHandler<R> + 'static,
    {
        match self.streams.entry(RequestKey::of::<R, R::Item>()) {
            Entry::Occupied(_) => Err(MediatorError::AlreadyRegistered {
                request: R::NAME,
                response: std::any::type_name::<R::Item>(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(StreamHandlerBinding::new::<R, H>(handler));
                Ok(())
            }
        }
    }

    /// 已注册事件处理器数量
    pub fn event_handler_count<E: Event>(&self) -> usize {
        self.events
            .get(&TypeKey::of::<E>())
            .map(|list| list.len())
            .unwrap_or(0)
    }

    /// 获取已注册的请求类型名列表（只读视图）
    pub fn registered_requests(&self) -> Vec<&'static str> {
        self.requests.iter().map(|e| e.key().request.name()).collect()
    }
}

impl HandlerResolver for HandlerCatalog {
    fn resolve_event_handlers(&self, event: TypeKey) -> Option<Vec<EventHandlerBinding>> {
        self.events.get(&event).map(|list| list.clone())
    }

    fn resolve_request_handler(&self, key: RequestKey) -> Option<RequestHandlerBinding> {
        self.requests.get(&key).map(|b| b.clone())
    }

    fn resolve_stream_handler(&self, key: RequestKey) -> Option<StreamHandlerBinding> {
        self.streams.get(&key).map(|b| b.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct Ping;

    impl Request for Ping {
        const NAME: &'static str = "Ping";
        type Response = u32;
    }

    struct PingHandler;

    #[async_trait]
    impl RequestHandler<Ping> for PingHandler {
        async fn handle(&self, _req: Ping, _token: CancellationToken) -> anyhow::Result<u32> {
            Ok(1)
        }
    }

    #[test]
    fn second_request_handler_is_rejected() {
        let catalog = HandlerCatalog::new();
        catalog
            .add_request_handler::<Ping, _>(Arc::new(PingHandler))
            .unwrap();
        let err = catalog
            .add_request_handler::<Ping, _>(Arc::new(PingHandler))
            .unwrap_err();
        assert_eq!(
            err,
            MediatorError::AlreadyRegistered {
                request: "Ping",
                response: "u32"
            }
        );
        assert_eq!(catalog.registered_requests().len(), 1);
    }

    #[test]
    fn unknown_types_resolve_to_none() {
        let catalog = HandlerCatalog::new();
        assert!(
            catalog
                .resolve_request_handler(RequestKey::of::<Ping, u32>())
                .is_none()
        );
        assert!(catalog.resolve_event_handlers(TypeKey::of::<Ping>()).is_none());
    }
}
