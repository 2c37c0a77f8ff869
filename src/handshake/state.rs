use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;

use super::encryption::{EncryptionOptions, HandshakeEncryption, Retry};
use super::error::HandshakeError;
use super::extension::ProtocolExtension;
use crate::constants::HANDSHAKE_BUFFER_SIZE;
use crate::download::Download;
use crate::net::ConnectionManager;
use crate::peer::{Bitfield, DisconnectFlags, PeerInfo};

/// Identifies a handshake within its manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandshakeId(pub(crate) u64);

impl fmt::Display for HandshakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Progress of a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// The outgoing dial has not completed yet.
    Connecting,
    /// Exchanging keys or detecting a plaintext header.
    NegotiatingEncryption,
    /// Exchanging the protocol header, peer IDs, bitfield and extensions.
    NegotiatingProtocol,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// The resources a handshake owns until it is promoted or torn down.
pub struct HandshakeConnection<S> {
    pub socket: S,
    /// Bytes read past the end of the handshake.
    pub unread: BytesMut,
}

/// One pending connection.
///
/// The protocol driver advances the state and fills in what the peer sent
/// (through [`HandshakeManager::get_mut`](super::HandshakeManager::get_mut))
/// and reports the outcome to the manager. The manager owns the value and
/// the socket inside it until promotion moves the socket out.
pub struct Handshake<S> {
    id: HandshakeId,
    direction: Direction,
    state: HandshakeState,
    addr: SocketAddr,
    download: Option<Arc<dyn Download<S>>>,
    peer_info: Option<Arc<PeerInfo>>,
    connection: Option<HandshakeConnection<S>>,
    polling: bool,
    active: bool,
    bitfield: Option<Bitfield>,
    encryption: HandshakeEncryption,
    extensions: ProtocolExtension,
    initialized_at: Instant,
}

impl<S> Handshake<S> {
    pub(crate) fn new(id: HandshakeId, socket: S, options: EncryptionOptions, addr: SocketAddr) -> Self {
        Self {
            id,
            direction: Direction::Incoming,
            state: HandshakeState::NegotiatingEncryption,
            addr,
            download: None,
            peer_info: None,
            connection: Some(HandshakeConnection {
                socket,
                unread: BytesMut::with_capacity(HANDSHAKE_BUFFER_SIZE),
            }),
            polling: false,
            active: false,
            bitfield: None,
            encryption: HandshakeEncryption::new(options),
            extensions: ProtocolExtension::make_default(),
            initialized_at: Instant::now(),
        }
    }

    /// Starts waiting for the remote side's first bytes. The download is not
    /// known until the peer names an info hash.
    pub(crate) fn initialize_incoming(&mut self) {
        self.direction = Direction::Incoming;
        self.state = HandshakeState::NegotiatingEncryption;
        self.polling = true;
        self.active = true;
        self.initialized_at = Instant::now();
    }

    /// Starts waiting for the dial to complete.
    pub(crate) fn initialize_outgoing(&mut self, download: Arc<dyn Download<S>>, peer: Arc<PeerInfo>) {
        self.direction = Direction::Outgoing;
        self.state = HandshakeState::Connecting;
        self.download = Some(download);
        self.peer_info = Some(peer);
        self.polling = true;
        self.active = true;
        self.initialized_at = Instant::now();
    }

    pub fn id(&self) -> HandshakeId {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn set_state(&mut self, state: HandshakeState) {
        self.state = state;
    }

    /// Remote address the attempt belongs to. For proxied dials this is
    /// the peer, not the proxy.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn download(&self) -> Option<&Arc<dyn Download<S>>> {
        self.download.as_ref()
    }

    /// Attaches an incoming handshake to the download it asked for.
    pub fn set_download(&mut self, download: Arc<dyn Download<S>>) {
        self.download = Some(download);
    }

    pub fn peer_info(&self) -> Option<&Arc<PeerInfo>> {
        self.peer_info.as_ref()
    }

    pub fn set_peer_info(&mut self, peer: Arc<PeerInfo>) {
        self.peer_info = Some(peer);
    }

    pub fn socket(&self) -> Option<&S> {
        self.connection.as_ref().map(|c| &c.socket)
    }

    pub fn bitfield(&self) -> Option<&Bitfield> {
        self.bitfield.as_ref()
    }

    pub fn set_bitfield(&mut self, bitfield: Bitfield) {
        self.bitfield = Some(bitfield);
    }

    pub fn encryption(&self) -> &HandshakeEncryption {
        &self.encryption
    }

    pub fn encryption_mut(&mut self) -> &mut HandshakeEncryption {
        &mut self.encryption
    }

    pub fn extensions(&self) -> &ProtocolExtension {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut ProtocolExtension {
        &mut self.extensions
    }

    pub fn initialized_at(&self) -> Instant {
        self.initialized_at
    }

    /// Active from initialization until the manager processes its outcome.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True while the socket is watched for readiness.
    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Keeps bytes the peer sent after the handshake for the connection
    /// that takes over.
    pub fn push_unread(&mut self, data: &[u8]) {
        if let Some(connection) = self.connection.as_mut() {
            connection.unread.extend_from_slice(data);
        }
    }

    pub fn unread_size(&self) -> usize {
        self.connection.as_ref().map_or(0, |c| c.unread.len())
    }

    pub fn unread_data(&self) -> &[u8] {
        match &self.connection {
            Some(connection) => &connection.unread[..],
            None => &[],
        }
    }

    /// Encryption options for a retry with the other mode. Retries never
    /// retry again.
    ///
    /// # Panics
    ///
    /// Panics if no retry was signaled.
    pub fn retry_options(&self) -> EncryptionOptions {
        let options = self
            .encryption
            .options()
            .without(EncryptionOptions::ENABLE_RETRY | EncryptionOptions::USE_PROXY);

        match self.encryption.retry() {
            Retry::Plaintext => options.without(EncryptionOptions::TRY_OUTGOING),
            Retry::Encrypted => options.with(EncryptionOptions::TRY_OUTGOING),
            Retry::None => panic!("internal error: handshake {} has no retry type", self.id),
        }
    }

    /// How a timeout is reported: a dial that never completed means the
    /// peer is unreachable, anything later is a stalled negotiation.
    pub fn timeout_reason(&self) -> HandshakeError {
        if self.state == HandshakeState::Connecting {
            HandshakeError::NetworkUnreachable
        } else {
            HandshakeError::NetworkTimeout
        }
    }

    /// When the handshake times out.
    pub fn deadline(&self, connect_timeout: Duration, handshake_timeout: Duration) -> Instant {
        if self.state == HandshakeState::Connecting {
            self.initialized_at + connect_timeout
        } else {
            self.initialized_at + handshake_timeout
        }
    }

    pub(crate) fn mark_inactive(&mut self) {
        self.active = false;
    }

    /// Stops watching the socket without closing it.
    pub(crate) fn deactivate_connection(&mut self) {
        self.polling = false;
    }

    /// Closes the socket, drops buffered data and releases the peer record.
    /// Does nothing once the connection has been closed or promoted.
    pub(crate) fn destroy_connection(&mut self, connections: &ConnectionManager) {
        if self.connection.take().is_none() {
            return;
        }
        connections.dec_socket_count();

        if let (Some(peer), Some(download)) = (self.peer_info.take(), self.download.as_ref()) {
            download
                .peer_list()
                .disconnected(&peer, DisconnectFlags::empty());
        }
    }

    /// Moves the socket and buffered bytes out for promotion, leaving an
    /// empty shell that has nothing left to close.
    pub(crate) fn take_connection(&mut self) -> Option<HandshakeConnection<S>> {
        self.connection.take()
    }

    /// Puts back a connection the connection list refused.
    pub(crate) fn restore_connection(&mut self, connection: HandshakeConnection<S>) {
        self.connection = Some(connection);
    }

    /// Hands the peer record over to the promoted connection.
    pub(crate) fn release_peer(&mut self) {
        if let Some(peer) = self.peer_info.take() {
            peer.clear_handshake();
        }
    }
}

impl<S> fmt::Debug for Handshake<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handshake")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("state", &self.state)
            .field("addr", &self.addr)
            .field("download", &self.download.as_ref().map(|d| d.info_hash()))
            .field("active", &self.active)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}
