use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// 事件需要满足的通用能力边界
///
/// 通常通过 `courier_macros::event` 宏生成实现：宏会补齐 `id`/`occurred_at` 字段，
/// 并将 `#[sensitive]` 字段排除在序列化（审计）之外。
pub trait Event: fmt::Debug + Serialize + Send + Sync + 'static {
    /// 事件的稳定名称（用于日志与审计，不随重构变化）
    const NAME: &'static str;

    /// 事件唯一标识
    fn event_id(&self) -> Uuid;

    /// 事件创建时间
    fn occurred_at(&self) -> DateTime<Utc>;
}
