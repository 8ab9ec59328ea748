use crate::message::Event;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// 事件处理器：处理某一类型的事件
///
/// 返回的错误不会影响同一事件的其他处理器，只会被记录在该处理器的结果中。
#[async_trait]
pub trait EventHandler<E>: Send + Sync
where
    E: Event,
{
    async fn handle(&self, event: &E, token: CancellationToken) -> anyhow::Result<()>;
}
