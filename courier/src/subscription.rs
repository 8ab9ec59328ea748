//! 本地订阅表（SubscriptionTable）
//!
//! 通过总线 `subscribe` 挂载的回调，按事件具体类型分组：
//! - 同一回调（同一 `Arc` 分配）对同一事件类型只能订阅一次；
//! - 退订未知回调视为成功（无操作），但事件类型从未订阅时返回错误；
//! - 分发时先对订阅列表做快照，分发期间的订阅变更不影响本轮调用。
//!
use crate::error::{MediatorError, MediatorResult};
use crate::handler::{HandlerOrigin, HandlerOutcome, run_guarded};
use crate::message::{Event, EventEnvelope, TypeKey};
use dashmap::DashMap;
use futures_core::future::BoxFuture;
use futures_util::future::join_all;
use std::any::type_name;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type LocalHandlerFn = Arc<
    dyn Fn(EventEnvelope, CancellationToken) -> BoxFuture<'static, MediatorResult<()>>
        + Send
        + Sync,
>;

/// 回调标识：回调 `Arc` 的分配地址
///
/// 订阅表持有该 `Arc` 的克隆，订阅期间地址稳定且唯一。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallbackId(usize);

impl CallbackId {
    pub fn of<F: ?Sized>(callback: &Arc<F>) -> Self {
        Self(Arc::as_ptr(callback) as *const () as usize)
    }
}

/// `subscribe` 返回的订阅句柄，可用于 `unsubscribe_handle`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub event: TypeKey,
    pub callback: CallbackId,
}

#[derive(Clone)]
struct LocalSubscription {
    id: CallbackId,
    handler: &'static str,
    invoke: LocalHandlerFn,
}

#[derive(Default)]
pub struct SubscriptionTable {
    entries: DashMap<TypeKey, Vec<LocalSubscription>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅事件类型 `E`
    pub fn subscribe<E, F, Fut>(&self, callback: Arc<F>) -> MediatorResult<SubscriptionHandle>
    where
        E: Event,
        F: Fn(Arc<E>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let event = TypeKey::of::<E>();
        let id = CallbackId::of(&callback);
        let handler = type_name::<F>();

        let mut list = self.entries.entry(event).or_default();
        if list.iter().any(|s| s.id == id) {
            return Err(MediatorError::DuplicateSubscription { event: E::NAME });
        }

        let invoke: LocalHandlerFn = Arc::new(
            move |envelope: EventEnvelope,
                  token: CancellationToken|
                  -> BoxFuture<'static, MediatorResult<()>> {
                let callback = callback.clone();

                Box::pin(async move {
                    let Some(payload) = envelope.downcast::<E>() else {
                        return Err(MediatorError::TypeMismatch {
                            expected: type_name::<E>(),
                            found: envelope.key().name(),
                        });
                    };
                    callback(payload, token)
                        .await
                        .map_err(|e| MediatorError::handler_failed(handler, e))
                })
            },
        );

        list.push(LocalSubscription {
            id,
            handler,
            invoke,
        });
        debug!(event = E::NAME, subscribers = list.len(), "local subscription added");

        Ok(SubscriptionHandle {
            event,
            callback: id,
        })
    }

    /// 退订事件类型 `E` 上的回调
    pub fn unsubscribe<E, F>(&self, callback: &Arc<F>) -> MediatorResult<()>
    where
        E: Event,
        F: ?Sized,
    {
        self.remove_subscription(TypeKey::of::<E>(), E::NAME, CallbackId::of(callback))
    }

    /// 通过订阅句柄退订
    pub fn remove(&self, handle: SubscriptionHandle) -> MediatorResult<()> {
        self.remove_subscription(handle.event, handle.event.name(), handle.callback)
    }

    fn remove_subscription(
        &self,
        event: TypeKey,
        name: &'static str,
        id: CallbackId,
    ) -> MediatorResult<()> {
        {
            let Some(mut list) = self.entries.get_mut(&event) else {
                return Err(MediatorError::NoSubscriptionForType { event: name });
            };
            let before = list.len();
            list.retain(|s| s.id != id);
            if list.len() == before {
                debug!(event = name, "callback was not subscribed");
            }
        }

        // 空列表即移除，后续退订返回 NoSubscriptionForType
        self.entries.remove_if(&event, |_, list| list.is_empty());
        Ok(())
    }

    /// 事件类型 `E` 的当前订阅数
    pub fn count<E: Event>(&self) -> usize {
        self.entries
            .get(&TypeKey::of::<E>())
            .map(|list| list.len())
            .unwrap_or(0)
    }

    /// 全部订阅数
    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 存在订阅的事件类型名
    pub fn event_types(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.key().name()).collect()
    }

    /// 调用事件类型的全部本地回调，收集各自结果
    pub(crate) async fn invoke(
        &self,
        envelope: &EventEnvelope,
        token: CancellationToken,
    ) -> Vec<HandlerOutcome> {
        // 快照后立即释放分片锁，回调中可安全地订阅/退订
        let snapshot: Vec<LocalSubscription> = match self.entries.get(&envelope.key()) {
            Some(list) => list.clone(),
            None => return Vec::new(),
        };

        let calls = snapshot.iter().map(|s| {
            run_guarded(
                s.handler,
                HandlerOrigin::Local,
                (s.invoke)(envelope.clone(), token.clone()),
            )
        });

        join_all(calls).await
    }
}
