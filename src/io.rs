//! Dedicated writer task
//!
//! Every socket gets one task that owns its write half. Anyone holding the
//! sender can queue complete frames; the task writes them in order.
//!
//! ```text
//! Router / handlers ─► mpsc::Sender<Bytes> ─► writer task ─► TCP
//! ```

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Frames written before an explicit flush
const MAX_BATCH: usize = 64;

/// Spawn a writer task over `writer`
///
/// The task ends cleanly when every sender is dropped, and with an error
/// when the socket fails.
pub fn spawn_writer<W>(writer: W, capacity: usize) -> (mpsc::Sender<Bytes>, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let task = tokio::spawn(write_loop(writer, rx));
    (tx, task)
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<Bytes>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        writer.write_all(&frame).await?;

        let mut batched = 1;
        while batched < MAX_BATCH {
            match rx.try_recv() {
                Ok(frame) => {
                    writer.write_all(&frame).await?;
                    batched += 1;
                }
                Err(_) => break,
            }
        }

        writer.flush().await?;
    }

    let _ = writer.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_in_order_and_finishes() {
        let (client, mut server) = tokio::io::duplex(1024);
        let (tx, task) = spawn_writer(client, 8);

        tx.send(Bytes::from_static(b"one")).await.unwrap();
        tx.send(Bytes::from_static(b"two")).await.unwrap();
        drop(tx);

        task.await.unwrap().unwrap();

        let mut out = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut server, &mut out)
            .await
            .unwrap();
        assert_eq!(out, b"onetwo");
    }

    #[tokio::test]
    async fn test_socket_error_ends_task() {
        let socket = tokio_test::io::Builder::new()
            .write(b"00010alphahello")
            .write_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let (tx, task) = spawn_writer(socket, 8);

        tx.send(Bytes::from_static(b"00010alphahello")).await.unwrap();
        tx.send(Bytes::from_static(b"00010alphaworld")).await.unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(crate::error::Error::Io(_))));
    }
}
