use std::net::SocketAddr;
use std::time::Duration;

use socket2::Socket;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{debug, warn};

use super::bind::Connector;
use super::error::NetError;
use crate::constants::LISTEN_BACKLOG;
use crate::handshake::SharedHandshakeManager;

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts incoming peer connections and hands them to a
/// [`HandshakeManager`](crate::handshake::HandshakeManager).
///
/// # Examples
///
/// ```no_run
/// use rbit_handshake::constants::TIMEOUT_SWEEP_INTERVAL;
/// use rbit_handshake::handshake::{spawn_timeout_sweeper, HandshakeManager};
/// use rbit_handshake::net::{BindManager, ConnectionConfig, ConnectionManager, Listener};
/// use rbit_handshake::peer::ClientList;
/// use parking_lot::Mutex;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConnectionConfig::default();
/// let manager = Arc::new(Mutex::new(HandshakeManager::new(
///     Arc::new(ConnectionManager::new(config.clone())),
///     BindManager::from_config(&config),
///     Arc::new(ClientList::new()),
/// )));
///
/// let listener = Listener::bind("0.0.0.0:6881".parse()?).await?;
/// spawn_timeout_sweeper(manager.clone(), TIMEOUT_SWEEP_INTERVAL);
/// tokio::spawn(listener.run(manager));
/// # Ok(())
/// # }
/// ```
pub struct Listener {
    listener: TcpListener,
}

impl Listener {
    pub async fn bind(addr: SocketAddr) -> Result<Self, NetError> {
        if addr.ip().is_multicast() {
            return Err(NetError::InvalidAddress(addr));
        }

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;

        let listener = socket.listen(LISTEN_BACKLOG)?;
        debug!(addr = %listener.local_addr()?, "listening for peers");

        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        Ok(self.listener.local_addr()?)
    }

    /// Waits for the next connection and returns it as a raw socket.
    pub async fn accept(&self) -> Result<(Socket, SocketAddr), NetError> {
        let (stream, addr) = self.listener.accept().await?;
        let stream = stream.into_std()?;
        Ok((Socket::from(stream), addr))
    }

    /// Feeds accepted connections to `manager` until the task is dropped.
    pub async fn run<C>(self, manager: SharedHandshakeManager<C>)
    where
        C: Connector<Socket = Socket>,
    {
        loop {
            match self.accept().await {
                Ok((socket, addr)) => {
                    // Refusals are logged by the manager.
                    let _ = manager.lock().add_incoming(socket, addr);
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }
}
