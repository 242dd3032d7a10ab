//! One-shot file transfer engine for PeerLink.
//!
//! Every share code gets its own [`EphemeralServer`]: a TCP listener bound to
//! the port equal to the code that serves exactly one client and then goes
//! away. The [`SessionManager`] owns those servers, and [`fetch`] is the
//! receiving side used by the download relay.
//!
//! ## Session Lifecycle
//!
//! ```text
//! Created -> Listening -> Connected -> Sending -> Closed
//!     \          \            \           \
//!      +----------+------------+-----------+--> Error -> Closed
//! ```

pub mod client;
pub mod manager;
pub mod protocol;
pub mod server;

pub use client::{fetch, FetchedFile};
pub use manager::SessionManager;
pub use server::EphemeralServer;

use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;

use crate::error::Result;

/// State of a single share's file server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    /// Server object exists, no socket yet
    Created,
    /// Bound and waiting for the one client
    Listening,
    /// Client accepted
    Connected,
    /// Streaming the header and file bytes
    Sending,
    /// Connection and listener dropped
    Closed,
    /// Failed; listener and connection are being dropped
    Error,
}

impl TransferState {
    /// Whether the server is finished with its socket.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }
}

/// Configure TCP keep-alive on a transfer socket.
///
/// Long transfers over idle-looking links otherwise risk being dropped by
/// middleboxes.
fn configure_tcp_keepalive(stream: &TcpStream) -> Result<()> {
    let socket_ref = SockRef::from(stream);

    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(10))
        .with_interval(Duration::from_secs(5));

    socket_ref.set_tcp_keepalive(&keepalive)?;

    tracing::trace!("TCP keep-alive enabled on socket");
    Ok(())
}
