//! 处理器注册表（HandlerRegistry）
//!
//! 按具体类型缓存解析出的处理器绑定：
//! - 首次分发某类型时通过 [`HandlerResolver`] 解析，之后复用缓存；
//! - 并发的首次访问只会解析一次（先到者解析，其余等待并复用）；
//! - 解析在类型槽位内进行，不持有缓存分片锁，解析器可以查询其他类型；
//! - 事件解析失败视为“未安装处理器”，请求/流式请求解析失败返回 `HandlerNotFound`。
//!
mod binding;
mod catalog;
mod resolver;

pub use binding::{EventHandlerBinding, RequestHandlerBinding, StreamHandlerBinding};
pub use catalog::HandlerCatalog;
pub use resolver::HandlerResolver;

pub(crate) use binding::BoxAnySend;
#[cfg(test)]
pub(crate) use binding::RequestHandlerFn;

use crate::error::{MediatorError, MediatorResult};
use crate::message::{RequestKey, TypeKey};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::debug;

// 每个类型一个槽位：分片锁只用于取出槽位，解析在槽位内进行
type EventSlot = Arc<OnceLock<Arc<[EventHandlerBinding]>>>;
type BindingSlot<B> = Arc<Mutex<Option<B>>>;

pub struct HandlerRegistry {
    resolver: Arc<dyn HandlerResolver>,
    events: DashMap<TypeKey, EventSlot>,
    requests: DashMap<RequestKey, BindingSlot<RequestHandlerBinding>>,
    streams: DashMap<RequestKey, BindingSlot<StreamHandlerBinding>>,
}

impl HandlerRegistry {
    pub fn new(resolver: Arc<dyn HandlerResolver>) -> Self {
        Self {
            resolver,
            events: DashMap::new(),
            requests: DashMap::new(),
            streams: DashMap::new(),
        }
    }

    /// 事件的处理器列表；未安装时为空列表（并被缓存）
    pub fn event_handlers(&self, event: TypeKey) -> Arc<[EventHandlerBinding]> {
        let slot = slot_of(&self.events, event);

        slot.get_or_init(|| match self.resolver.resolve_event_handlers(event) {
            Some(list) if !list.is_empty() => {
                debug!(
                    event = event.name(),
                    handlers = list.len(),
                    "event handlers resolved"
                );
                Arc::from(list)
            }
            _ => {
                debug!(event = event.name(), "no event handlers installed");
                Arc::from(Vec::new())
            }
        })
        .clone()
    }

    /// 请求的唯一处理器
    pub fn request_handler(&self, key: RequestKey) -> MediatorResult<RequestHandlerBinding> {
        resolve_one(&self.requests, key, || {
            self.resolver.resolve_request_handler(key)
        })
    }

    /// 流式请求的唯一处理器
    pub fn stream_handler(&self, key: RequestKey) -> MediatorResult<StreamHandlerBinding> {
        resolve_one(&self.streams, key, || {
            self.resolver.resolve_stream_handler(key)
        })
    }

    /// 已缓存绑定的事件类型（含空绑定）
    pub fn cached_events(&self) -> Vec<&'static str> {
        self.events
            .iter()
            .filter(|e| e.value().get().is_some())
            .map(|e| e.key().name())
            .collect()
    }

    /// 已缓存绑定的请求类型
    pub fn cached_requests(&self) -> Vec<&'static str> {
        self.requests
            .iter()
            .filter(|e| e.value().lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .map(|e| e.key().request.name())
            .collect()
    }
}

// 取出（或创建）类型槽位；返回前释放分片锁
fn slot_of<K, S>(cache: &DashMap<K, S>, key: K) -> S
where
    K: Eq + std::hash::Hash,
    S: Clone + Default,
{
    if let Some(hit) = cache.get(&key) {
        return hit.value().clone();
    }
    cache.entry(key).or_default().value().clone()
}

// 单处理器解析：槽位锁保证同一类型只解析一次；缺失不缓存
fn resolve_one<B, F>(
    cache: &DashMap<RequestKey, BindingSlot<B>>,
    key: RequestKey,
    resolve: F,
) -> MediatorResult<B>
where
    B: Clone,
    F: FnOnce() -> Option<B>,
{
    let slot = slot_of(cache, key);
    let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(binding) = cached.as_ref() {
        return Ok(binding.clone());
    }

    match resolve() {
        Some(binding) => {
            debug!(request = key.request.name(), "request handler resolved");
            *cached = Some(binding.clone());
            Ok(binding)
        }
        None => Err(MediatorError::HandlerNotFound {
            message: key.request.name(),
        }),
    }
}
