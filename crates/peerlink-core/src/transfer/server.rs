//! The per-code one-shot file server.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use super::{configure_tcp_keepalive, protocol, TransferState};
use crate::config::ShareConfig;
use crate::error::{Error, Result};
use crate::registry::ShareEntry;

/// A bound listener that will serve one share to one client.
///
/// [`serve`](Self::serve) takes the server by value, so once the single
/// accept-and-send cycle is over the listener is dropped and can never
/// accept again.
#[derive(Debug)]
pub struct EphemeralServer {
    entry: ShareEntry,
    listener: TcpListener,
    chunk_size: usize,
    accept_timeout: Option<Duration>,
    state_tx: watch::Sender<TransferState>,
}

impl EphemeralServer {
    /// Bind a listener on the port equal to the entry's code.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound.
    pub async fn bind(entry: ShareEntry, config: &ShareConfig) -> Result<Self> {
        let (state_tx, _) = watch::channel(TransferState::Created);

        let addr = format!("{}:{}", config.bind_address, entry.code.port());
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                state_tx.send_replace(TransferState::Error);
                return Err(e.into());
            }
        };

        tracing::info!(
            "Serving {} on port {}",
            entry.file_name,
            entry.code.port()
        );
        state_tx.send_replace(TransferState::Listening);

        Ok(Self {
            entry,
            listener,
            chunk_size: config.chunk_size.max(1),
            accept_timeout: config.accept_timeout,
            state_tx,
        })
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TransferState> {
        self.state_tx.subscribe()
    }

    /// Wait for one client, stream the file to it, and retire.
    ///
    /// The connection and listener are closed on return regardless of the
    /// outcome. Failures are not retried.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the accept or the send.
    pub async fn serve(self) -> Result<()> {
        let Self {
            entry,
            listener,
            chunk_size,
            accept_timeout,
            state_tx,
        } = self;
        let code = entry.code;

        let accepted = match accept_timeout {
            Some(limit) => match tokio::time::timeout(limit, listener.accept()).await {
                Ok(accepted) => accepted,
                Err(_) => {
                    tracing::info!(%code, "share expired after {:?} without a client", limit);
                    state_tx.send_replace(TransferState::Closed);
                    return Ok(());
                }
            },
            None => listener.accept().await,
        };
        drop(listener);

        let (mut stream, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(%code, "Accept failed: {}", e);
                state_tx.send_replace(TransferState::Error);
                state_tx.send_replace(TransferState::Closed);
                return Err(e.into());
            }
        };
        tracing::info!(%code, "Client connection from {}", peer);
        state_tx.send_replace(TransferState::Connected);

        let result = send_file(&mut stream, &entry, chunk_size, &state_tx).await;
        let _ = stream.shutdown().await;
        drop(stream);

        match &result {
            Ok(bytes) => {
                tracing::info!(%code, "File {} ({} bytes) sent to {}", entry.file_name, bytes, peer);
            }
            Err(e) => {
                tracing::warn!(%code, "Error sending file to {}: {}", peer, e);
                state_tx.send_replace(TransferState::Error);
            }
        }
        state_tx.send_replace(TransferState::Closed);

        result.map(|_| ())
    }
}

async fn send_file(
    stream: &mut TcpStream,
    entry: &ShareEntry,
    chunk_size: usize,
    state_tx: &watch::Sender<TransferState>,
) -> Result<u64> {
    if let Err(e) = configure_tcp_keepalive(stream) {
        tracing::debug!("Could not enable keep-alive: {}", e);
    }

    let mut file = File::open(&entry.path).await?;

    state_tx.send_replace(TransferState::Sending);
    protocol::write_header(stream, &entry.file_name).await?;

    let mut buffer = vec![0u8; chunk_size];
    let mut sent = 0u64;
    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        stream
            .write_all(&buffer[..n])
            .await
            .map_err(|e| Error::TransferFailed(format!("peer stopped reading: {e}")))?;
        sent += n as u64;
    }
    stream.flush().await?;

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::code::ShareCode;

    fn entry_for(path: PathBuf, name: &str) -> ShareEntry {
        ShareEntry {
            // ignored by bind_any, which takes an ephemeral port
            code: ShareCode::new(1).unwrap(),
            path,
            file_name: name.to_string(),
        }
    }

    async fn bind_any(entry: ShareEntry, config: &ShareConfig) -> EphemeralServer {
        let (state_tx, _) = watch::channel(TransferState::Created);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        state_tx.send_replace(TransferState::Listening);
        EphemeralServer {
            entry,
            listener,
            chunk_size: config.chunk_size,
            accept_timeout: config.accept_timeout,
            state_tx,
        }
    }

    #[tokio::test]
    async fn test_serves_exactly_one_client() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stored");
        let content: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        let config = ShareConfig {
            chunk_size: 4096,
            ..Default::default()
        };
        let server = bind_any(entry_for(path, "data.bin"), &config).await;
        let addr = server.local_addr().unwrap();
        let mut states = server.subscribe();
        let task = tokio::spawn(server.serve());

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();

        let mut expected = b"Filename:data.bin\n".to_vec();
        expected.extend_from_slice(&content);
        assert_eq!(received, expected);

        task.await.unwrap().unwrap();
        assert_eq!(*states.borrow_and_update(), TransferState::Closed);

        assert!(
            TcpStream::connect(addr).await.is_err(),
            "listener must be retired after one client"
        );
    }

    #[tokio::test]
    async fn test_missing_file_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let server = bind_any(
            entry_for(dir.path().join("gone"), "gone.txt"),
            &ShareConfig::default(),
        )
        .await;
        let addr = server.local_addr().unwrap();
        let states = server.subscribe();
        let task = tokio::spawn(server.serve());

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut received = Vec::new();
        let _ = client.read_to_end(&mut received).await;
        assert!(received.is_empty());

        assert!(task.await.unwrap().is_err());
        assert_eq!(*states.borrow(), TransferState::Closed);
    }

    #[tokio::test]
    async fn test_accept_timeout_retires_listener() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShareConfig {
            accept_timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let server = bind_any(entry_for(dir.path().join("f"), "f"), &config).await;
        let addr = server.local_addr().unwrap();
        let states = server.subscribe();

        server.serve().await.unwrap();

        assert_eq!(*states.borrow(), TransferState::Closed);
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_bind_uses_code_as_port() {
        let spare = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = spare.local_addr().unwrap().port();
        drop(spare);

        let entry = ShareEntry {
            code: ShareCode::new(port).unwrap(),
            path: PathBuf::from("unused"),
            file_name: "unused".to_string(),
        };
        let config = ShareConfig {
            bind_address: "127.0.0.1".to_string(),
            ..Default::default()
        };
        let server = EphemeralServer::bind(entry, &config).await.unwrap();

        assert_eq!(server.local_addr().unwrap().port(), port);
        assert_eq!(*server.subscribe().borrow(), TransferState::Listening);
    }
}
