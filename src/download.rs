//! What the handshake layer needs from a download.
//!
//! Downloads, their connection lists and established peer connections live
//! in the peer-wire runtime. The handshake layer only sees them through the
//! traits below.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::handshake::{EncryptionInfo, ProtocolExtension};
use crate::peer::{Bitfield, PeerInfo, PeerList};

/// 20-byte SHA-1 info hash identifying a download.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash(pub [u8; 20]);

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A download as seen from the handshake layer.
pub trait Download<S>: Send + Sync {
    fn info_hash(&self) -> InfoHash;

    /// False while the download is stopped or paused.
    fn is_active(&self) -> bool;

    /// True once every wanted piece is on disk.
    fn is_done(&self) -> bool;

    fn peer_list(&self) -> &PeerList;

    fn connection_list(&self) -> &dyn ConnectionList<S>;
}

/// A download's established peer connections.
pub trait ConnectionList<S>: Send + Sync {
    /// Whether a connection to `peer` is wanted at all, e.g. not a duplicate
    /// and not a seeder when we are seeding.
    fn want_connection(&self, peer: &PeerInfo, bitfield: &Bitfield) -> bool;

    /// Takes ownership of a negotiated socket and starts a peer connection
    /// on it. On refusal the socket is handed back untouched.
    fn insert(
        &self,
        peer: Arc<PeerInfo>,
        socket: S,
        bitfield: Bitfield,
        encryption: EncryptionInfo,
        extensions: ProtocolExtension,
    ) -> Result<Arc<dyn PeerConnection>, S>;
}

/// An established peer connection, right after promotion.
pub trait PeerConnection: Send + Sync {
    /// Seeds the "have" timer with the time the handshake started.
    fn set_have_timer(&self, at: Instant);

    /// Bytes the handshake read past its own end. Always fits in
    /// [`PROTOCOL_READ_BUFFER_SIZE`](crate::constants::PROTOCOL_READ_BUFFER_SIZE).
    fn push_unread(&self, data: &[u8]);

    /// Processes buffered input as if the socket had become readable.
    fn event_read(&self);
}
