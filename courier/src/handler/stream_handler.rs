use crate::message::StreamRequest;
use futures_core::stream::BoxStream;
use tokio_util::sync::CancellationToken;

/// 流式请求处理器
///
/// 返回 `'static` 生命周期的惰性序列：元素在调用方推进时才产生。
/// 处理器应在观察到 `token` 取消后停止产出。
pub trait StreamRequestHandler<R>: Send + Sync
where
    R: StreamRequest,
{
    fn handle(&self, request: R, token: CancellationToken)
    -> BoxStream<'static, anyhow::Result<R::Item>>;
}
