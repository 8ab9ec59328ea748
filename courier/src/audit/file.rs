use super::{AuditRecord, AuditSink};
use crate::error::MediatorResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 文件审计输出：每次以格式化 JSON 数组覆盖写入
#[derive(Clone, Debug)]
pub struct FileAuditSink {
    path: PathBuf,
}

impl FileAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn write(&self, records: &[AuditRecord]) -> MediatorResult<()> {
        let bytes = serde_json::to_vec_pretty(records)?;

        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.path, bytes).await?;

        debug!(path = %self.path.display(), records = records.len(), "audit log written");
        Ok(())
    }
}
