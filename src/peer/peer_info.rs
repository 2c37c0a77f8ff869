use std::net::SocketAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::client::ClientInfo;
use super::peer_id::PeerId;
use super::peer_list::ConnectFlags;

/// What a download knows about one peer address.
///
/// Records are shared between the peer list, pending handshakes and
/// established connections, so all mutable state sits behind a lock.
#[derive(Debug)]
pub struct PeerInfo {
    addr: SocketAddr,
    state: Mutex<PeerInfoState>,
}

#[derive(Debug, Default)]
struct PeerInfoState {
    id: Option<PeerId>,
    client: Option<ClientInfo>,
    connected: bool,
    handshake: bool,
    incoming: bool,
    failed_counter: u32,
    last_connection: Option<Instant>,
}

impl PeerInfo {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            state: Mutex::new(PeerInfoState::default()),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The peer ID received in the handshake, if any.
    pub fn id(&self) -> Option<PeerId> {
        self.state.lock().id
    }

    pub fn set_id(&self, id: PeerId) {
        self.state.lock().id = Some(id);
    }

    pub fn client_info(&self) -> Option<ClientInfo> {
        self.state.lock().client.clone()
    }

    pub fn set_client_info(&self, client: ClientInfo) {
        self.state.lock().client = Some(client);
    }

    /// Number of connection attempts to this peer that ended in failure.
    pub fn failed_counter(&self) -> u32 {
        self.state.lock().failed_counter
    }

    pub fn inc_failed_counter(&self) {
        let mut state = self.state.lock();
        state.failed_counter = state.failed_counter.saturating_add(1);
    }

    pub fn reset_failed_counter(&self) {
        self.state.lock().failed_counter = 0;
    }

    /// True while a handshake or an established connection owns this peer.
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// True while the peer is owned by a pending handshake.
    pub fn is_handshake(&self) -> bool {
        self.state.lock().handshake
    }

    pub fn is_incoming(&self) -> bool {
        self.state.lock().incoming
    }

    pub fn last_connection(&self) -> Option<Instant> {
        self.state.lock().last_connection
    }

    /// Marks the peer connected unless it already is, or unless
    /// `FILTER_RECENT` is set and the last attempt was within `window`.
    pub(crate) fn try_connect(&self, now: Instant, flags: ConnectFlags, window: Duration) -> bool {
        let mut state = self.state.lock();

        if state.connected {
            return false;
        }

        if flags.contains(ConnectFlags::FILTER_RECENT) {
            if let Some(last) = state.last_connection {
                if now.saturating_duration_since(last) < window {
                    return false;
                }
            }
        }

        state.connected = true;
        state.handshake = flags.contains(ConnectFlags::KEEP_HANDSHAKES);
        state.incoming = flags.contains(ConnectFlags::INCOMING);
        state.last_connection = Some(now);
        true
    }

    pub(crate) fn mark_disconnected(&self, failed: bool, now: Option<Instant>) {
        let mut state = self.state.lock();
        state.connected = false;
        state.handshake = false;

        if failed {
            state.failed_counter = state.failed_counter.saturating_add(1);
        }
        if let Some(now) = now {
            state.last_connection = Some(now);
        }
    }

    /// Hands the peer over from its handshake to an established connection.
    pub(crate) fn clear_handshake(&self) {
        self.state.lock().handshake = false;
    }
}
