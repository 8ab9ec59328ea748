//! 总线提供者（BusProvider）
//!
//! 组合根：按配置组装队列、中介者与审计日志，并按队列生命周期分发总线：
//! - `Singleton`：首次获取时创建，此后始终返回同一条总线；
//! - `Scoped`：每次获取都创建新的总线与队列（本地订阅与处理循环也随之独立）。
//!
//! 中介者与审计日志在所有总线间共享。
//!
use crate::audit::{AuditLog, AuditSink, FileAuditSink};
use crate::bus::EventBus;
use crate::config::{CourierConfig, QueueKind, QueueLifetime};
use crate::error::{MediatorError, MediatorResult};
use crate::mediator::Mediator;
use crate::queue::{EventQueue, InMemoryEventQueue};
use crate::registry::HandlerResolver;
use std::sync::{Arc, OnceLock};
use tracing::info;

pub struct BusProvider {
    config: CourierConfig,
    mediator: Arc<Mediator>,
    audit: Option<Arc<AuditLog>>,
    shared: OnceLock<Arc<EventBus>>,
}

impl BusProvider {
    pub fn new(config: CourierConfig, resolver: Arc<dyn HandlerResolver>) -> MediatorResult<Self> {
        config.validate()?;

        let audit = if config.audit.enabled {
            let path = config.audit.path.clone().ok_or_else(|| MediatorError::Config {
                reason: "audit is enabled but no audit path is configured".into(),
            })?;
            info!(path = %path.display(), "event audit enabled");
            let sink: Arc<dyn AuditSink> = Arc::new(FileAuditSink::new(path));
            Some(Arc::new(AuditLog::new(sink)))
        } else {
            None
        };

        Ok(Self {
            config,
            mediator: Arc::new(Mediator::new(resolver)),
            audit,
            shared: OnceLock::new(),
        })
    }

    /// 替换审计输出（无论配置是否开启审计）
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(Arc::new(AuditLog::new(sink)));
        self.shared = OnceLock::new();
        self
    }

    /// 按生命周期获取总线
    pub fn bus(&self) -> Arc<EventBus> {
        match self.config.queue.lifetime {
            QueueLifetime::Singleton => self
                .shared
                .get_or_init(|| Arc::new(self.build_bus()))
                .clone(),
            QueueLifetime::Scoped => Arc::new(self.build_bus()),
        }
    }

    pub fn mediator(&self) -> &Arc<Mediator> {
        &self.mediator
    }

    pub fn audit(&self) -> Option<&Arc<AuditLog>> {
        self.audit.as_ref()
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    fn build_bus(&self) -> EventBus {
        let queue: Arc<dyn EventQueue> = match self.config.queue.kind {
            QueueKind::Unbounded => Arc::new(InMemoryEventQueue::unbounded()),
            QueueKind::Bounded { capacity } => Arc::new(InMemoryEventQueue::bounded(capacity)),
        };

        EventBus::builder()
            .mediator(self.mediator.clone())
            .queue(queue)
            .maybe_audit(self.audit.clone())
            .build()
    }
}
