//! 事件审计（Audit）
//!
//! 处理循环每处理完一个事件，向审计日志追加一条 [`AuditRecord`]，
//! 并把完整的日志写入 [`AuditSink`]。载荷经 `serde` 序列化，
//! 标记为敏感（`#[serde(skip_serializing)]`）的字段不会出现在记录中。
//!
mod file;
mod memory;

pub use file::FileAuditSink;
pub use memory::MemoryAuditSink;

use crate::error::MediatorResult;
use crate::handler::{HandlerOrigin, HandlerOutcome, ProcessedEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// 审计输出端
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// 写入当前完整的审计日志
    async fn write(&self, records: &[AuditRecord]) -> MediatorResult<()>;
}

/// 单个处理器在审计中的结果
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditedOutcome {
    pub handler: String,
    pub origin: HandlerOrigin,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&HandlerOutcome> for AuditedOutcome {
    fn from(outcome: &HandlerOutcome) -> Self {
        Self {
            handler: outcome.handler.to_string(),
            origin: outcome.origin,
            elapsed_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
            error: outcome.error().map(ToString::to_string),
        }
    }
}

/// 审计记录
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditRecord {
    pub event_id: Uuid,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub outcomes: Vec<AuditedOutcome>,
}

impl AuditRecord {
    pub fn from_processed(processed: &ProcessedEvent) -> MediatorResult<Self> {
        let envelope = &processed.envelope;

        Ok(Self {
            event_id: envelope.event_id(),
            event_type: envelope.name().to_string(),
            occurred_at: envelope.occurred_at(),
            processed_at: Utc::now(),
            payload: envelope.to_json()?,
            outcomes: processed.outcomes.iter().map(AuditedOutcome::from).collect(),
        })
    }
}

/// 不断增长的审计日志
///
/// 追加与写出在同一把锁内完成，写出顺序与追加顺序一致。
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
    records: Mutex<Vec<AuditRecord>>,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            records: Mutex::new(Vec::new()),
        }
    }

    /// 追加一条记录并写出完整日志
    pub async fn append(&self, record: AuditRecord) -> MediatorResult<()> {
        let mut records = self.records.lock().await;
        records.push(record);
        self.sink.write(&records).await
    }

    /// 根据处理结果生成记录并追加
    pub async fn record(&self, processed: &ProcessedEvent) -> MediatorResult<()> {
        self.append(AuditRecord::from_processed(processed)?).await
    }

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}
