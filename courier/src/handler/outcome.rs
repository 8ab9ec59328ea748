use crate::error::{MediatorError, MediatorResult};
use crate::message::EventEnvelope;
use futures_util::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

/// 处理器来源：注册表解析的处理器，或通过 `subscribe` 挂载的本地回调
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerOrigin {
    Registered,
    Local,
}

/// 单个处理器的执行结果
#[derive(Clone, Debug)]
pub struct HandlerOutcome {
    pub handler: &'static str,
    pub origin: HandlerOrigin,
    pub elapsed: Duration,
    pub result: MediatorResult<()>,
}

impl HandlerOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&MediatorError> {
        self.result.as_ref().err()
    }
}

/// 一个事件在两条扇出路径上的聚合结果
#[derive(Clone, Debug)]
pub struct ProcessedEvent {
    pub envelope: EventEnvelope,
    pub outcomes: Vec<HandlerOutcome>,
}

impl ProcessedEvent {
    pub fn failures(&self) -> impl Iterator<Item = &HandlerOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(HandlerOutcome::is_success)
    }

    pub fn count(&self, origin: HandlerOrigin) -> usize {
        self.outcomes.iter().filter(|o| o.origin == origin).count()
    }
}

/// 执行单个处理器并把错误或 panic 收敛为结果值
pub(crate) async fn run_guarded<F>(
    handler: &'static str,
    origin: HandlerOrigin,
    fut: F,
) -> HandlerOutcome
where
    F: Future<Output = MediatorResult<()>>,
{
    let started = Instant::now();
    let result = match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(MediatorError::HandlerFailed {
            handler: handler.to_string(),
            reason: panic_reason(payload.as_ref()),
        }),
    };

    HandlerOutcome {
        handler,
        origin,
        elapsed: started.elapsed(),
        result,
    }
}

pub(crate) fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn errors_and_panics_become_values() {
        let ok = run_guarded("ok", HandlerOrigin::Local, async { Ok(()) }).await;
        assert!(ok.is_success());

        let failed = run_guarded("bad", HandlerOrigin::Registered, async {
            Err(MediatorError::HandlerFailed {
                handler: "bad".into(),
                reason: "nope".into(),
            })
        })
        .await;
        assert!(!failed.is_success());
        assert_eq!(failed.origin, HandlerOrigin::Registered);

        let explode = true;
        let panicked = run_guarded("boom", HandlerOrigin::Local, async move {
            if explode {
                panic!("exploded");
            }
            Ok(())
        })
        .await;
        match panicked.error() {
            Some(MediatorError::HandlerFailed { handler, reason }) => {
                assert_eq!(handler, "boom");
                assert_eq!(reason, "panicked: exploded");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
