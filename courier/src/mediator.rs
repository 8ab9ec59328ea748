//! 中介者（Mediator）
//!
//! 按具体类型解析并调用处理器：
//! - `publish_to_handlers`：事件扇出到全部已注册处理器，并发执行并收集每个处理器的结果；
//! - `send`：请求/响应，一对一；
//! - `stream`：流式请求，返回惰性序列，支持中途取消。
//!
use crate::error::{MediatorError, MediatorResult};
use crate::handler::{HandlerOrigin, HandlerOutcome, panic_reason, run_guarded};
use crate::message::{Event, EventEnvelope, Request, RequestKey, StreamRequest};
use crate::registry::{HandlerRegistry, HandlerResolver};
use futures_core::stream::BoxStream;
use futures_util::future::join_all;
use futures_util::{FutureExt, StreamExt};
use std::any::type_name;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;

pub struct Mediator {
    registry: HandlerRegistry,
}

impl Mediator {
    pub fn new(resolver: Arc<dyn HandlerResolver>) -> Self {
        Self {
            registry: HandlerRegistry::new(resolver),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// 直接发布事件到已注册处理器（不经过队列）
    pub async fn publish<E: Event>(&self, event: E, token: CancellationToken) -> Vec<HandlerOutcome> {
        let envelope = EventEnvelope::new(event).with_cancellation(token.clone());
        self.publish_to_handlers(&envelope, token).await
    }

    /// 将事件扇出到其全部处理器，等待全部完成
    ///
    /// 未安装处理器时返回空列表；单个处理器失败不影响其他处理器。
    pub async fn publish_to_handlers(
        &self,
        envelope: &EventEnvelope,
        token: CancellationToken,
    ) -> Vec<HandlerOutcome> {
        let bindings = self.registry.event_handlers(envelope.key());
        if bindings.is_empty() {
            return Vec::new();
        }

        let calls = bindings.iter().map(|binding| {
            run_guarded(
                binding.name(),
                HandlerOrigin::Registered,
                binding.call(envelope.clone(), token.clone()),
            )
        });

        join_all(calls).await
    }

    /// 发送请求并等待唯一处理器的响应
    pub async fn send<R: Request>(
        &self,
        request: R,
        token: CancellationToken,
    ) -> MediatorResult<R::Response> {
        let binding = self
            .registry
            .request_handler(RequestKey::of::<R, R::Response>())
            .inspect_err(|e| error!(request = R::NAME, error = %e, "request dispatch failed"))?;

        let out = match AssertUnwindSafe(binding.call(Box::new(request), token))
            .catch_unwind()
            .await
        {
            Ok(out) => out?,
            Err(payload) => {
                return Err(MediatorError::HandlerFailed {
                    handler: binding.name().to_string(),
                    reason: panic_reason(payload.as_ref()),
                });
            }
        };

        match out.downcast::<R::Response>() {
            Ok(response) => Ok(*response),
            Err(_) => {
                let err = MediatorError::TypeMismatch {
                    expected: type_name::<R::Response>(),
                    found: "unknown",
                };
                error!(request = R::NAME, error = %err, "request dispatch failed");
                Err(err)
            }
        }
    }

    /// 发起流式请求
    ///
    /// 返回的序列在 `token` 取消后立即结束，并在耗尽后保持结束状态（不可重启）。
    /// 处理器在创建或迭代序列时 panic 均以 `HandlerFailed` 返回。
    pub fn stream<R: StreamRequest>(
        &self,
        request: R,
        token: CancellationToken,
    ) -> MediatorResult<BoxStream<'static, MediatorResult<R::Item>>> {
        let binding = self
            .registry
            .stream_handler(RequestKey::of::<R, R::Item>())
            .inspect_err(|e| error!(request = R::NAME, error = %e, "stream dispatch failed"))?;

        let handler = binding.name();
        let out = match catch_unwind(AssertUnwindSafe(|| {
            binding.call(Box::new(request), token.clone())
        })) {
            Ok(out) => out?,
            Err(payload) => {
                return Err(MediatorError::HandlerFailed {
                    handler: handler.to_string(),
                    reason: panic_reason(payload.as_ref()),
                });
            }
        };

        match out.downcast::<BoxStream<'static, MediatorResult<R::Item>>>() {
            // 迭代中的 panic 收敛为一个 HandlerFailed，随后序列结束
            Ok(items) => Ok(AssertUnwindSafe(items)
                .catch_unwind()
                .map(move |item| match item {
                    Ok(item) => item,
                    Err(payload) => Err(MediatorError::HandlerFailed {
                        handler: handler.to_string(),
                        reason: panic_reason(payload.as_ref()),
                    }),
                })
                .take_until(token.cancelled_owned())
                .fuse()
                .boxed()),
            Err(_) => Err(MediatorError::TypeMismatch {
                expected: type_name::<BoxStream<'static, MediatorResult<R::Item>>>(),
                found: "unknown",
            }),
        }
    }
}
