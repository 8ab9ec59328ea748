//! 配置（CourierConfig）
//!
//! 队列类型与生命周期、审计开关与输出路径。可从 JSON 字符串或文件加载，
//! 缺省字段取默认值：无界队列、单例生命周期、关闭审计。
//!
use crate::error::{MediatorError, MediatorResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub queue: QueueConfig,
    pub audit: AuditConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub kind: QueueKind,
    pub lifetime: QueueLifetime,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    #[default]
    Unbounded,
    Bounded { capacity: usize },
}

/// 队列（及总线）的生命周期
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueLifetime {
    /// 整个提供者共享一条总线与队列
    #[default]
    Singleton,
    /// 每次获取总线都创建新的总线与队列
    Scoped,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    pub path: Option<PathBuf>,
}

impl CourierConfig {
    pub fn from_json(text: &str) -> MediatorResult<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| MediatorError::Config {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> MediatorResult<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MediatorError::Config {
                reason: format!("{}: {e}", path.display()),
            })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> MediatorResult<()> {
        if let QueueKind::Bounded { capacity: 0 } = self.queue.kind {
            return Err(MediatorError::Config {
                reason: "bounded queue capacity must be greater than zero".into(),
            });
        }
        if self.audit.enabled && self.audit.path.is_none() {
            return Err(MediatorError::Config {
                reason: "audit is enabled but no audit path is configured".into(),
            });
        }
        Ok(())
    }
}
