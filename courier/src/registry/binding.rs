//! 处理器绑定（HandlerBinding）
//!
//! 将具体的处理器包装为以类型擦除方式调用的闭包：闭包内部负责向下转型与调用，
//! 调度方只需按类型键取出闭包执行。
//!
use crate::error::{MediatorError, MediatorResult};
use crate::handler::{EventHandler, RequestHandler, StreamRequestHandler};
use crate::message::{Event, EventEnvelope, Request, StreamRequest};
use futures_core::future::BoxFuture;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::any::{Any, type_name};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) type BoxAnySend = Box<dyn Any + Send>;

type EventHandlerFn = Arc<
    dyn Fn(EventEnvelope, CancellationToken) -> BoxFuture<'static, MediatorResult<()>>
        + Send
        + Sync,
>;

pub(crate) type RequestHandlerFn = Arc<
    dyn Fn(BoxAnySend, CancellationToken) -> BoxFuture<'static, MediatorResult<BoxAnySend>>
        + Send
        + Sync,
>;

type StreamHandlerFn =
    Arc<dyn Fn(BoxAnySend, CancellationToken) -> MediatorResult<BoxAnySend> + Send + Sync>;

/// 事件处理器绑定
#[derive(Clone)]
pub struct EventHandlerBinding {
    name: &'static str,
    invoke: EventHandlerFn,
}

impl EventHandlerBinding {
    pub fn new<E, H>(handler: Arc<H>) -> Self
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        let name = type_name::<H>();

        let invoke: EventHandlerFn = Arc::new(
            move |envelope: EventEnvelope,
                  token: CancellationToken|
                  -> BoxFuture<'static, MediatorResult<()>> {
                let handler = handler.clone();

                Box::pin(async move {
                    // 键与闭包同一泛型 E，正常情况下这里的 downcast 不会失败
                    let Some(event) = envelope.downcast::<E>() else {
                        return Err(MediatorError::TypeMismatch {
                            expected: type_name::<E>(),
                            found: envelope.key().name(),
                        });
                    };
                    handler
                        .handle(&event, token)
                        .await
                        .map_err(|e| MediatorError::handler_failed(name, e))
                })
            },
        );

        Self { name, invoke }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn call(
        &self,
        envelope: EventEnvelope,
        token: CancellationToken,
    ) -> BoxFuture<'static, MediatorResult<()>> {
        (self.invoke)(envelope, token)
    }
}

/// 请求处理器绑定
#[derive(Clone)]
pub struct RequestHandlerBinding {
    name: &'static str,
    invoke: RequestHandlerFn,
}

impl RequestHandlerBinding {
    pub fn new<R, H>(handler: Arc<H>) -> Self
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        let name = type_name::<H>();

        let invoke: RequestHandlerFn = Arc::new(
            move |boxed: BoxAnySend,
                  token: CancellationToken|
                  -> BoxFuture<'static, MediatorResult<BoxAnySend>> {
                let handler = handler.clone();

                Box::pin(async move {
                    let request = boxed.downcast::<R>().map_err(|_| MediatorError::TypeMismatch {
                        expected: type_name::<R>(),
                        found: "unknown",
                    })?;
                    let response = handler
                        .handle(*request, token)
                        .await
                        .map_err(|e| MediatorError::handler_failed(name, e))?;
                    Ok(Box::new(response) as BoxAnySend)
                })
            },
        );

        Self { name, invoke }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn call(
        &self,
        request: BoxAnySend,
        token: CancellationToken,
    ) -> BoxFuture<'static, MediatorResult<BoxAnySend>> {
        (self.invoke)(request, token)
    }

    #[cfg(test)]
    pub(crate) fn from_fn(name: &'static str, invoke: RequestHandlerFn) -> Self {
        Self { name, invoke }
    }
}

/// 流式请求处理器绑定
///
/// 闭包返回装箱的 `BoxStream<'static, MediatorResult<Item>>`，由中介者还原。
#[derive(Clone)]
pub struct StreamHandlerBinding {
    name: &'static str,
    invoke: StreamHandlerFn,
}

impl StreamHandlerBinding {
    pub fn new<R, H>(handler: Arc<H>) -> Self
    where
        R: StreamRequest,
        H: StreamRequestHandler<R> + 'static,
    {
        let name = type_name::<H>();

        let invoke: StreamHandlerFn = Arc::new(
            move |boxed: BoxAnySend, token: CancellationToken| -> MediatorResult<BoxAnySend> {
                let request = boxed.downcast::<R>().map_err(|_| MediatorError::TypeMismatch {
                    expected: type_name::<R>(),
                    found: "unknown",
                })?;
                let items: BoxStream<'static, MediatorResult<R::Item>> = handler
                    .handle(*request, token)
                    .map(move |item| item.map_err(|e| MediatorError::handler_failed(name, e)))
                    .boxed();
                Ok(Box::new(items) as BoxAnySend)
            },
        );

        Self { name, invoke }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn call(
        &self,
        request: BoxAnySend,
        token: CancellationToken,
    ) -> MediatorResult<BoxAnySend> {
        (self.invoke)(request, token)
    }
}
