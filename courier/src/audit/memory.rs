use super::{AuditRecord, AuditSink};
use crate::error::MediatorResult;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// 内存审计输出：保留最近一次写出的完整日志
#[derive(Default)]
pub struct MemoryAuditSink {
    snapshot: Mutex<Vec<AuditRecord>>,
    writes: AtomicUsize,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<AuditRecord> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 写出次数
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn write(&self, records: &[AuditRecord]) -> MediatorResult<()> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = records.to_vec();
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
