use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::trace;

use super::peer_info::PeerInfo;
use crate::constants::RECENT_ATTEMPT_WINDOW;
use crate::flags::bit_flags;

bit_flags! {
    /// Options for [`PeerList::connected`].
    pub struct ConnectFlags {
        /// The connection is still owned by a pending handshake.
        const KEEP_HANDSHAKES = 1 << 0;
        /// Refuse peers we attempted within the recent-attempt window.
        const FILTER_RECENT = 1 << 1;
        /// The remote end dialed us.
        const INCOMING = 1 << 2;
    }
}

bit_flags! {
    /// Options for [`PeerList::disconnected`].
    pub struct DisconnectFlags {
        /// Do not count this disconnect as a failed attempt.
        const NO_FAILURE = 1 << 0;
        /// Refresh the last-attempt time.
        const SET_TIME = 1 << 1;
    }
}

/// A download's registry of known peer addresses.
///
/// Tracks which peers are connected (or handshaking), when each was last
/// attempted, and how often attempts failed. The handshake layer consults
/// it before dialing and reports back when an attempt ends.
pub struct PeerList {
    peers: DashMap<SocketAddr, Arc<PeerInfo>>,
    recent_window: Duration,
}

impl PeerList {
    pub fn new() -> Self {
        Self::with_recent_window(RECENT_ATTEMPT_WINDOW)
    }

    pub fn with_recent_window(recent_window: Duration) -> Self {
        Self {
            peers: DashMap::new(),
            recent_window,
        }
    }

    /// Claims the record for `addr`, creating it on first sight.
    ///
    /// Returns `None` if the peer is already connected or handshaking, or if
    /// `FILTER_RECENT` is given and the peer was attempted recently.
    pub fn connected(&self, addr: SocketAddr, flags: ConnectFlags) -> Option<Arc<PeerInfo>> {
        let peer = self
            .peers
            .entry(addr)
            .or_insert_with(|| Arc::new(PeerInfo::new(addr)))
            .clone();

        if !peer.try_connect(Instant::now(), flags, self.recent_window) {
            trace!(%addr, ?flags, "peer list refused connection");
            return None;
        }

        Some(peer)
    }

    /// Releases a record claimed by [`connected`](Self::connected).
    pub fn disconnected(&self, peer: &PeerInfo, flags: DisconnectFlags) {
        let now = flags
            .contains(DisconnectFlags::SET_TIME)
            .then(Instant::now);
        peer.mark_disconnected(!flags.contains(DisconnectFlags::NO_FAILURE), now);
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<Arc<PeerInfo>> {
        self.peers.get(addr).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl Default for PeerList {
    fn default() -> Self {
        Self::new()
    }
}
