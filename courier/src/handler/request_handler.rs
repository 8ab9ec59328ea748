use crate::message::Request;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait RequestHandler<R>: Send + Sync
where
    R: Request,
{
    async fn handle(&self, request: R, token: CancellationToken) -> anyhow::Result<R::Response>;
}
