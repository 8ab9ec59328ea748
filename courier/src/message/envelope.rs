use super::{Event, TypeKey};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// 擦除后的事件：保留向下转型、序列化与 Debug 渲染能力
trait ErasedEvent: Any + Send + Sync + fmt::Debug {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
    fn to_json(&self) -> serde_json::Result<Value>;
}

impl<E: Event> ErasedEvent for E {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// 事件信封：队列中流转的类型擦除事件
///
/// 克隆只复制引用计数；同一事件在扇出时由所有处理器共享。
/// 信封同时携带发布方的取消令牌，处理该事件的处理器会收到它。
#[derive(Clone)]
pub struct EventEnvelope {
    key: TypeKey,
    name: &'static str,
    event_id: Uuid,
    occurred_at: DateTime<Utc>,
    payload: Arc<dyn ErasedEvent>,
    cancellation: CancellationToken,
}

impl EventEnvelope {
    pub fn new<E: Event>(event: E) -> Self {
        Self {
            key: TypeKey::of::<E>(),
            name: E::NAME,
            event_id: event.event_id(),
            occurred_at: event.occurred_at(),
            payload: Arc::new(event),
            cancellation: CancellationToken::new(),
        }
    }

    /// 绑定发布方的取消令牌
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is<E: Event>(&self) -> bool {
        self.key == TypeKey::of::<E>()
    }

    /// 还原为具体事件类型；类型不符时返回 `None`
    pub fn downcast<E: Event>(&self) -> Option<Arc<E>> {
        self.payload.clone().into_any().downcast::<E>().ok()
    }

    /// 序列化事件载荷（遵循 serde 属性，敏感字段不会出现）
    pub fn to_json(&self) -> serde_json::Result<Value> {
        self.payload.to_json()
    }
}

impl fmt::Debug for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEnvelope")
            .field("name", &self.name)
            .field("event_id", &self.event_id)
            .field("payload", &self.payload)
            .finish()
    }
}
