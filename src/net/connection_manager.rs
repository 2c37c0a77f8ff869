use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use super::socket::SocketBuffers;
use crate::constants::{
    CONNECT_TIMEOUT, HANDSHAKE_TIMEOUT, MAX_FAILED, MAX_OPEN_SOCKETS, SOCKET_RECV_BUFFER_SIZE,
    SOCKET_SEND_BUFFER_SIZE,
};
use crate::handshake::EncryptionOptions;

/// Address filter. Returns `true` if connections to or from the address
/// are allowed.
pub type AddressFilter = Box<dyn Fn(&SocketAddr) -> bool + Send + Sync>;

/// Settings for connection establishment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Limit on open sockets across handshakes and peer connections.
    pub max_sockets: u32,
    /// Encryption options for new handshakes.
    pub encryption: EncryptionOptions,
    /// Outgoing connections are dialed through this address when set.
    pub proxy_address: Option<SocketAddr>,
    /// Local address outgoing sockets bind to before dialing.
    pub bind_address: Option<SocketAddr>,
    pub send_buffer_size: usize,
    pub receive_buffer_size: usize,
    /// Time a handshake may stay in the connecting state.
    pub connect_timeout: Duration,
    /// Time a handshake may take once its socket is connected.
    pub handshake_timeout: Duration,
    /// Peers that failed more often than this are not dialed again.
    pub max_failed: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_sockets: MAX_OPEN_SOCKETS,
            encryption: EncryptionOptions::default_outgoing(),
            proxy_address: None,
            bind_address: None,
            send_buffer_size: SOCKET_SEND_BUFFER_SIZE,
            receive_buffer_size: SOCKET_RECV_BUFFER_SIZE,
            connect_timeout: CONNECT_TIMEOUT,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            max_failed: MAX_FAILED,
        }
    }
}

/// Admission policy and shared connection settings.
///
/// Decides whether a new connection may be opened at all (socket budget
/// and address filter) and counts open sockets. Shared between the
/// handshake layer, which opens sockets, and the peer connection layer,
/// which eventually closes promoted ones.
pub struct ConnectionManager {
    config: RwLock<ConnectionConfig>,
    socket_count: AtomicU32,
    filter: RwLock<Option<AddressFilter>>,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config: RwLock::new(config),
            socket_count: AtomicU32::new(0),
            filter: RwLock::new(None),
        }
    }

    /// Returns true if another socket fits in the budget.
    pub fn can_connect(&self) -> bool {
        self.size() < self.config.read().max_sockets
    }

    /// Returns true if the address passes the installed filter.
    pub fn filter(&self, addr: &SocketAddr) -> bool {
        match self.filter.read().as_ref() {
            Some(filter) => filter(addr),
            None => true,
        }
    }

    pub fn set_filter<F>(&self, filter: F)
    where
        F: Fn(&SocketAddr) -> bool + Send + Sync + 'static,
    {
        *self.filter.write() = Some(Box::new(filter));
    }

    pub fn clear_filter(&self) {
        *self.filter.write() = None;
    }

    pub fn inc_socket_count(&self) {
        self.socket_count.fetch_add(1, Ordering::Relaxed);
    }

    /// # Panics
    ///
    /// Panics if no socket is counted; every decrement must pair with an
    /// earlier [`inc_socket_count`](Self::inc_socket_count).
    pub fn dec_socket_count(&self) {
        if self
            .socket_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_err()
        {
            panic!("internal error: dec_socket_count called with no open sockets");
        }
    }

    /// Number of open sockets.
    pub fn size(&self) -> u32 {
        self.socket_count.load(Ordering::Relaxed)
    }

    pub fn max_size(&self) -> u32 {
        self.config.read().max_sockets
    }

    pub fn set_max_size(&self, max: u32) {
        self.config.write().max_sockets = max;
    }

    pub fn encryption_options(&self) -> EncryptionOptions {
        self.config.read().encryption
    }

    pub fn set_encryption_options(&self, options: EncryptionOptions) {
        self.config.write().encryption = options;
    }

    /// The proxy to dial through, if one is set and usable.
    pub fn proxy_address(&self) -> Option<SocketAddr> {
        self.config
            .read()
            .proxy_address
            .filter(|addr| addr.port() != 0 && !addr.ip().is_unspecified())
    }

    pub fn set_proxy_address(&self, addr: Option<SocketAddr>) {
        self.config.write().proxy_address = addr;
    }

    pub fn bind_address(&self) -> Option<SocketAddr> {
        self.config.read().bind_address
    }

    pub fn socket_buffers(&self) -> SocketBuffers {
        let config = self.config.read();
        SocketBuffers {
            send: config.send_buffer_size,
            recv: config.receive_buffer_size,
        }
    }

    pub fn set_socket_buffers(&self, buffers: SocketBuffers) {
        let mut config = self.config.write();
        config.send_buffer_size = buffers.send;
        config.receive_buffer_size = buffers.recv;
    }

    pub fn connect_timeout(&self) -> Duration {
        self.config.read().connect_timeout
    }

    pub fn handshake_timeout(&self) -> Duration {
        self.config.read().handshake_timeout
    }

    pub fn max_failed(&self) -> u32 {
        self.config.read().max_failed
    }

    /// Snapshot of the current settings.
    pub fn config(&self) -> ConnectionConfig {
        self.config.read().clone()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(ConnectionConfig::default())
    }
}
