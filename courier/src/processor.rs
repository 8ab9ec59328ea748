//! 事件处理循环（EventProcessor）
//!
//! 长驻任务，逐个从队列取出事件并分发：
//! - 同一事件同时走两条路径：注册表解析的处理器与本地订阅回调，二者均完成后才取下一个；
//! - 单个处理器的失败只记录日志，不会中断循环；
//! - 可选审计：每个事件处理完成后追加审计记录；
//! - 通过 `ProcessorHandle` 关闭、等待并观察运行状态。
//!
use crate::audit::AuditLog;
use crate::error::{MediatorError, MediatorResult};
use crate::handler::ProcessedEvent;
use crate::mediator::Mediator;
use crate::message::EventEnvelope;
use crate::queue::EventQueue;
use crate::subscription::SubscriptionTable;
use bon::Builder;
use futures_util::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 处理循环状态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProcessorState {
    /// 队列为空，等待新事件
    #[default]
    Idle,
    /// 正在处理事件
    Draining,
    /// 已停止（终态）
    Stopped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessorStatus {
    pub state: ProcessorState,
    /// 已处理的事件数
    pub processed: u64,
}

#[derive(Builder)]
pub struct EventProcessor {
    queue: Arc<dyn EventQueue>,
    mediator: Arc<Mediator>,
    subscriptions: Arc<SubscriptionTable>,
    audit: Option<Arc<AuditLog>>,
    // 同一队列同一时刻只允许一个循环，消费同一队列的处理器必须共享该标志
    running: Arc<AtomicBool>,
}

impl EventProcessor {
    /// 启动处理循环
    ///
    /// 已有循环在运行时返回 `ProcessorRunning`；循环退出后可再次启动。
    pub fn start(&self) -> MediatorResult<ProcessorHandle> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MediatorError::ProcessorRunning);
        }

        let guard = RunningGuard(self.running.clone());
        let token = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(ProcessorStatus::default());

        let task = tokio::spawn(Self::run(
            self.queue.clone(),
            self.mediator.clone(),
            self.subscriptions.clone(),
            self.audit.clone(),
            token.clone(),
            status_tx,
            guard,
        ));

        Ok(ProcessorHandle {
            token,
            task: Some(task),
            status: status_rx,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    async fn run(
        queue: Arc<dyn EventQueue>,
        mediator: Arc<Mediator>,
        subscriptions: Arc<SubscriptionTable>,
        audit: Option<Arc<AuditLog>>,
        token: CancellationToken,
        status: watch::Sender<ProcessorStatus>,
        _guard: RunningGuard,
    ) {
        info!(pending = queue.pending(), "event processor started");

        let mut events = queue.dequeue(token.clone());
        let mut processed: u64 = 0;

        while let Some(envelope) = events.next().await {
            status.send_replace(ProcessorStatus {
                state: ProcessorState::Draining,
                processed,
            });

            let done = dispatch(&mediator, &subscriptions, envelope).await;
            processed += 1;

            if let Some(audit) = &audit {
                if let Err(err) = audit.record(&done).await {
                    error!(event = done.envelope.name(), error = %err, "audit write failed");
                }
            }

            let state = if queue.pending() == 0 {
                ProcessorState::Idle
            } else {
                ProcessorState::Draining
            };
            status.send_replace(ProcessorStatus { state, processed });
        }

        status.send_replace(ProcessorStatus {
            state: ProcessorState::Stopped,
            processed,
        });
        info!(processed, "event processor stopped");
    }
}

/// 分发单个事件：两条路径并发执行，全部完成后汇总
#[tracing::instrument(
    name = "dispatch_event",
    skip_all,
    fields(event = envelope.name(), event_id = %envelope.event_id())
)]
pub(crate) async fn dispatch(
    mediator: &Mediator,
    subscriptions: &SubscriptionTable,
    envelope: EventEnvelope,
) -> ProcessedEvent {
    let token = envelope.cancellation().clone();

    let (mut outcomes, local) = tokio::join!(
        mediator.publish_to_handlers(&envelope, token.clone()),
        subscriptions.invoke(&envelope, token),
    );
    outcomes.extend(local);

    for failed in outcomes.iter().filter(|o| !o.is_success()) {
        if let Some(err) = failed.error() {
            warn!(
                handler = failed.handler,
                origin = ?failed.origin,
                payload = ?envelope,
                error = %err,
                "event handler failed"
            );
        }
    }

    ProcessedEvent { envelope, outcomes }
}

// 循环任务结束（含 panic 退出）时释放运行标志
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 处理循环句柄：用于优雅关闭、等待结束与观察状态
pub struct ProcessorHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    status: watch::Receiver<ProcessorStatus>,
}

impl ProcessorHandle {
    /// 请求停止：当前事件处理完成后退出
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// `shutdown` 后等待循环退出
    pub async fn stop(self) {
        self.shutdown();
        self.join().await;
    }

    pub fn status(&self) -> ProcessorStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<ProcessorStatus> {
        self.status.clone()
    }
}

impl Drop for ProcessorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
