//! Accept loop shared by the coordinator and storage nodes

use crate::common::Result;
use std::future::Future;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

/// Accept connections forever, running `handler` on its own task for each.
///
/// A handler error only ends that connection.
pub async fn serve_connections<H, Fut>(listener: TcpListener, handler: H) -> Result<()>
where
    H: Fn(TcpStream) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tracing::debug!("Accepting connections on {}", listener.local_addr()?);

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                // Usually fd exhaustion, back off instead of spinning
                tracing::warn!("Accept failed: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        tracing::debug!("New connection: {}", peer);
        let task = handler(socket);
        tokio::spawn(
            async move {
                if let Err(e) = task.await {
                    tracing::warn!("Connection error: {}", e);
                }
            }
            .instrument(tracing::info_span!("conn", %peer)),
        );
    }
}
