//! Drives the TCP accept loop: on each new connection, writes the oldstyle
//! greeting and then pumps bytes through a [`Connection`] until it signals
//! `Close` or the socket reaches EOF.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use crate::device::Device;
use crate::nbd::connection::{Action, Connection};
use crate::nbd::wire;

/// Binds `addr` and serves NBD connections from `device` until the process
/// is killed. Each connection is handled on its own task; the device itself
/// provides no cross-connection locking (see the concurrency contract).
pub async fn serve(listener: TcpListener, device: Arc<dyn Device + Send + Sync>) -> std::io::Result<()> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let device = Arc::clone(&device);
        let span = tracing::info_span!("connection", %peer_addr);
        tokio::spawn(
            async move {
                if let Err(err) = handle_connection(stream, device.as_ref()).await {
                    tracing::warn!(?err, "connection ended with an I/O error");
                }
            }
            .instrument(span),
        );
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    device: &(dyn Device + Send + Sync),
) -> std::io::Result<()> {
    tracing::info!("accepted connection");

    let greeting = wire::encode_greeting(device.size_bytes());
    stream.write_all(&greeting).await?;

    let mut conn = Connection::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            tracing::info!("peer closed connection");
            return Ok(());
        }

        for action in conn.on_chunk(&buf[..n], device) {
            match action {
                Action::Reply(bytes) => stream.write_all(&bytes).await?,
                Action::Close => {
                    tracing::info!("closing connection");
                    return Ok(());
                }
            }
        }
    }
}
