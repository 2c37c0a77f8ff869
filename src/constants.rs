//! Connection tuning parameters.
//!
//! Defaults for the handshake layer: socket limits, timeouts, buffer sizes
//! and retry thresholds. These values follow libtorrent and rtorrent defaults
//! where they exist.

use std::time::Duration;

// ============================================================================
// Client identification
// ============================================================================

/// Client ID prefix for peer ID generation (Azureus-style)
pub const CLIENT_PREFIX: &[u8; 8] = b"-RB0001-";

// ============================================================================
// Connection limits
// ============================================================================

/// Global limit on open sockets, handshakes and peer connections combined
/// (qBittorrent: 500, Transmission: 240, libtorrent: 200)
pub const MAX_OPEN_SOCKETS: u32 = 500;

/// A peer whose failure counter exceeds this is no longer dialed
pub const MAX_FAILED: u32 = 3;

/// An outgoing attempt to a peer we tried within this window is suppressed,
/// unless it is an encryption retry
pub const RECENT_ATTEMPT_WINDOW: Duration = Duration::from_secs(60);

// ============================================================================
// Timeouts
// ============================================================================

/// Time allowed for the TCP dial to complete
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed for the whole handshake once the socket is connected
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(60);

/// How often the timeout sweeper checks pending handshakes
pub const TIMEOUT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

// ============================================================================
// Buffers
// ============================================================================

/// Capacity of a peer connection's protocol read buffer. Bytes a handshake
/// read past its own end must fit in here when the connection is promoted.
pub const PROTOCOL_READ_BUFFER_SIZE: usize = 512;

/// Initial capacity of a handshake's own read buffer
pub const HANDSHAKE_BUFFER_SIZE: usize = 1024;

/// Socket send buffer size; 0 leaves the OS default
pub const SOCKET_SEND_BUFFER_SIZE: usize = 0;

/// Socket receive buffer size; 0 leaves the OS default
pub const SOCKET_RECV_BUFFER_SIZE: usize = 0;

/// Listen backlog for the incoming connection listener
pub const LISTEN_BACKLOG: u32 = 128;
