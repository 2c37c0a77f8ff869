use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace};

use super::encryption::EncryptionOptions;
use super::error::{AdmissionError, HandshakeError};
use super::event::ConnectionEvent;
use super::state::{Handshake, HandshakeConnection, HandshakeId};
use crate::constants::PROTOCOL_READ_BUFFER_SIZE;
use crate::download::{Download, InfoHash};
use crate::net::{setup_socket, ConnectionManager, Connector};
use crate::peer::{Bitfield, ClientInfo, ClientList, ConnectFlags, DisconnectFlags, PeerInfo};

const LOG_TARGET: &str = "rbit::handshake";

/// A handshake manager shared between the listener, the timeout sweeper
/// and the protocol driver.
pub type SharedHandshakeManager<C> = Arc<Mutex<HandshakeManager<C>>>;

/// Owns every connection that has not finished its handshake.
///
/// New connections enter through [`add_incoming`](Self::add_incoming) and
/// [`add_outgoing`](Self::add_outgoing), which apply the admission policy
/// and register a [`Handshake`]. The protocol driver reports each outcome
/// through one of the `receive_*` methods; the manager then promotes the
/// socket to the download's connection list, retries with another
/// encryption mode, or closes it.
///
/// # Examples
///
/// ```no_run
/// use rbit_handshake::handshake::HandshakeManager;
/// use rbit_handshake::net::{BindManager, ConnectionConfig, ConnectionManager};
/// use rbit_handshake::peer::ClientList;
/// use std::sync::Arc;
///
/// let config = ConnectionConfig::default();
/// let connector = BindManager::from_config(&config);
/// let connections = Arc::new(ConnectionManager::new(config));
///
/// let mut manager = HandshakeManager::new(connections, connector, Arc::new(ClientList::new()));
/// assert!(manager.is_empty());
/// manager.clear();
/// ```
pub struct HandshakeManager<C: Connector> {
    handshakes: Vec<Handshake<C::Socket>>,
    connections: Arc<ConnectionManager>,
    connector: C,
    clients: Arc<ClientList>,
    next_id: u64,
}

impl<C: Connector> HandshakeManager<C> {
    pub fn new(connections: Arc<ConnectionManager>, connector: C, clients: Arc<ClientList>) -> Self {
        Self {
            handshakes: Vec::new(),
            connections,
            connector,
            clients,
            next_id: 0,
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    pub fn len(&self) -> usize {
        self.handshakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handshakes.is_empty()
    }

    pub fn get(&self, id: HandshakeId) -> Option<&Handshake<C::Socket>> {
        self.handshakes.iter().find(|h| h.id() == id)
    }

    pub fn get_mut(&mut self, id: HandshakeId) -> Option<&mut Handshake<C::Socket>> {
        self.handshakes.iter_mut().find(|h| h.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handshake<C::Socket>> {
        self.handshakes.iter()
    }

    /// Number of handshakes attributed to a download.
    pub fn size_info(&self, info_hash: &InfoHash) -> usize {
        self.handshakes
            .iter()
            .filter(|h| belongs_to(h, info_hash))
            .count()
    }

    /// Returns true if a pending handshake already targets the peer at `addr`.
    pub fn find(&self, addr: &SocketAddr) -> bool {
        self.handshakes
            .iter()
            .any(|h| h.peer_info().is_some_and(|peer| peer.addr() == *addr))
    }

    /// Tears down every handshake.
    pub fn clear(&mut self) {
        for handshake in std::mem::take(&mut self.handshakes) {
            self.delete_handshake(handshake);
        }
    }

    /// Tears down the handshakes of one download, keeping the rest in order.
    pub fn erase_download(&mut self, info_hash: &InfoHash) {
        let (erased, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.handshakes)
            .into_iter()
            .partition(|h| belongs_to(h, info_hash));
        self.handshakes = kept;

        for handshake in erased {
            self.delete_handshake(handshake);
        }
    }

    /// Admits an accepted connection.
    ///
    /// On any `Err` the socket has already been closed.
    pub fn add_incoming(
        &mut self,
        socket: C::Socket,
        addr: SocketAddr,
    ) -> Result<HandshakeId, AdmissionError> {
        if let Err(e) = self.admit(&addr) {
            debug!(target: LOG_TARGET, %addr, "incoming connection failed, out of resources or filtered");
            return Err(e);
        }

        if let Err(e) = setup_socket(&socket, self.connections.socket_buffers()) {
            debug!(target: LOG_TARGET, %addr, error = %e, "incoming connection failed, setup unsuccessful");
            return Err(AdmissionError::Setup(e));
        }

        let id = self.next_id();
        debug!(target: LOG_TARGET, %addr, %id, "incoming connection");

        self.connections.inc_socket_count();

        let mut handshake =
            Handshake::new(id, socket, self.connections.encryption_options(), addr);
        handshake.initialize_incoming();
        self.handshakes.push(handshake);

        Ok(id)
    }

    /// Dials a peer for `download` with the default encryption options.
    pub fn add_outgoing(
        &mut self,
        addr: SocketAddr,
        download: Arc<dyn Download<C::Socket>>,
    ) -> Result<HandshakeId, AdmissionError> {
        self.admit(&addr)?;
        self.create_outgoing(addr, download, self.connections.encryption_options())
    }

    /// Dials a peer with explicit encryption options. Attempts carrying
    /// [`EncryptionOptions::RETRYING`] skip the recent-attempt filter.
    pub fn create_outgoing(
        &mut self,
        addr: SocketAddr,
        download: Arc<dyn Download<C::Socket>>,
        mut options: EncryptionOptions,
    ) -> Result<HandshakeId, AdmissionError> {
        let mut flags = ConnectFlags::KEEP_HANDSHAKES;
        if !options.contains(EncryptionOptions::RETRYING) {
            flags |= ConnectFlags::FILTER_RECENT;
        }

        let peer_list = download.peer_list();
        let peer = peer_list
            .connected(addr, flags)
            .ok_or(AdmissionError::PeerRefused)?;

        let failed = peer.failed_counter();
        if failed > self.connections.max_failed() {
            trace!(target: LOG_TARGET, %addr, failed, "peer failed too often");
            peer_list.disconnected(&peer, DisconnectFlags::NO_FAILURE);
            return Err(AdmissionError::TooManyFailures(failed));
        }

        let mut connect_addr = addr;
        if let Some(proxy) = self.connections.proxy_address() {
            connect_addr = proxy;
            options |= EncryptionOptions::USE_PROXY;
        }

        let socket = match self.connector.connect(connect_addr) {
            Ok(socket) => socket,
            Err(e) => {
                debug!(target: LOG_TARGET, %addr, error = %e, "outgoing connection could not open socket");
                peer_list.disconnected(&peer, DisconnectFlags::empty());
                return Err(AdmissionError::Connect(e));
            }
        };

        // A local setup failure is not the peer's fault.
        if let Err(e) = setup_socket(&socket, self.connections.socket_buffers()) {
            debug!(target: LOG_TARGET, %addr, error = %e, "outgoing connection failed, setup unsuccessful");
            drop(socket);
            peer_list.disconnected(&peer, DisconnectFlags::NO_FAILURE);
            return Err(AdmissionError::Setup(e));
        }

        let id = self.next_id();
        debug!(
            target: LOG_TARGET,
            %addr,
            %id,
            encryption = ?options,
            kind = %options.outgoing_event(),
            "outgoing connection"
        );

        self.connections.inc_socket_count();

        let mut handshake = Handshake::new(id, socket, options, addr);
        handshake.initialize_outgoing(download.clone(), peer);
        self.handshakes.push(handshake);

        Ok(id)
    }

    /// Processes a completed handshake: promotes its socket to the
    /// download's connection list, or drops it if the connection is not
    /// wanted.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not an active handshake, if the handshake has no
    /// download, peer or bitfield, or if more bytes were read past the
    /// handshake than a peer connection can buffer.
    pub fn receive_succeeded(&mut self, id: HandshakeId) {
        let mut handshake = self.erase_active(id, "receive_succeeded");
        handshake.mark_inactive();
        handshake.deactivate_connection();

        let Some(download) = handshake.download().cloned() else {
            panic!("internal error: receive_succeeded called on handshake {id} without a download");
        };
        let Some(peer) = handshake.peer_info().cloned() else {
            panic!("internal error: receive_succeeded called on handshake {id} without a peer");
        };
        let Some(bitfield) = handshake.bitfield().cloned() else {
            panic!("internal error: receive_succeeded called on handshake {id} without a bitfield");
        };

        let promoted = download.is_active()
            && download.connection_list().want_connection(&peer, &bitfield)
            && self.promote(&mut handshake, &download, &peer, bitfield.clone());

        if !promoted {
            let reason = if !download.is_active() {
                HandshakeError::InactiveDownload
            } else if download.is_done() && bitfield.is_all_set() {
                HandshakeError::UnwantedConnection
            } else {
                HandshakeError::Duplicate
            };

            debug!(
                target: LOG_TARGET,
                addr = %peer.addr(),
                %id,
                code = reason.code(),
                message = %reason,
                "handshake dropped"
            );
            handshake.destroy_connection(&self.connections);
        }
    }

    /// Processes a failed handshake: closes it and, if the encryption layer
    /// asked for it, dials the same peer again with the other mode.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not an active handshake.
    pub fn receive_failed(&mut self, id: HandshakeId, event: ConnectionEvent, error: HandshakeError) {
        let mut handshake = self.erase_active(id, "receive_failed");
        let addr = handshake.addr();

        handshake.mark_inactive();
        handshake.deactivate_connection();
        handshake.destroy_connection(&self.connections);

        debug!(
            target: LOG_TARGET,
            %addr,
            %id,
            %event,
            code = error.code(),
            message = %error,
            "received error"
        );

        if !handshake.encryption().should_retry() {
            return;
        }

        let Some(download) = handshake.download().cloned() else {
            return;
        };

        let retry_options = handshake.retry_options() | EncryptionOptions::RETRYING;
        let retry_event = if retry_options.contains(EncryptionOptions::TRY_OUTGOING) {
            ConnectionEvent::RetryEncrypted
        } else {
            ConnectionEvent::RetryPlaintext
        };
        debug!(target: LOG_TARGET, %addr, %id, event = %retry_event, "retrying");

        if let Err(e) = self.create_outgoing(addr, download, retry_options) {
            trace!(target: LOG_TARGET, %addr, error = %e, "retry not started");
        }
    }

    /// Processes a handshake that ran out of time.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not an active handshake.
    pub fn receive_timeout(&mut self, id: HandshakeId) {
        let Some(handshake) = self.get(id) else {
            panic!("internal error: receive_timeout called on an inactive handshake {id}");
        };
        let reason = handshake.timeout_reason();

        self.receive_failed(id, ConnectionEvent::Failed, reason);
    }

    /// Times out every handshake whose deadline is at or before `now` and
    /// returns how many there were.
    pub fn expire(&mut self, now: Instant) -> usize {
        let connect_timeout = self.connections.connect_timeout();
        let handshake_timeout = self.connections.handshake_timeout();

        let expired: Vec<HandshakeId> = self
            .handshakes
            .iter()
            .filter(|h| h.deadline(connect_timeout, handshake_timeout) <= now)
            .map(|h| h.id())
            .collect();

        for &id in &expired {
            self.receive_timeout(id);
        }
        expired.len()
    }

    fn admit(&self, addr: &SocketAddr) -> Result<(), AdmissionError> {
        if !self.connections.can_connect() {
            return Err(AdmissionError::OutOfResources);
        }
        if !self.connections.filter(addr) {
            return Err(AdmissionError::Filtered);
        }
        Ok(())
    }

    /// Hands the socket to the connection list. Returns false, with the
    /// connection put back into the handshake, if the list refuses it.
    fn promote(
        &self,
        handshake: &mut Handshake<C::Socket>,
        download: &Arc<dyn Download<C::Socket>>,
        peer: &Arc<PeerInfo>,
        bitfield: Bitfield,
    ) -> bool {
        let Some(HandshakeConnection { socket, unread }) = handshake.take_connection() else {
            panic!("internal error: handshake {} has no connection to promote", handshake.id());
        };

        let connection = match download.connection_list().insert(
            peer.clone(),
            socket,
            bitfield,
            handshake.encryption().info(),
            handshake.extensions().clone(),
        ) {
            Ok(connection) => connection,
            Err(socket) => {
                handshake.restore_connection(HandshakeConnection { socket, unread });
                return false;
            }
        };

        if let Some(peer_id) = peer.id() {
            peer.set_client_info(self.clients.retrieve_id(&peer_id));
        }
        info!(
            target: LOG_TARGET,
            addr = %peer.addr(),
            id = %handshake.id(),
            client = %peer.client_info().unwrap_or_else(ClientInfo::unknown),
            "handshake success"
        );

        connection.set_have_timer(handshake.initialized_at());

        if !unread.is_empty() {
            if unread.len() > PROTOCOL_READ_BUFFER_SIZE {
                panic!(
                    "internal error: {} unread bytes won't fit the peer connection's read buffer",
                    unread.len()
                );
            }

            connection.push_unread(&unread);
            connection.event_read();
        }

        handshake.release_peer();
        true
    }

    /// Removes an active handshake from the registry.
    fn erase_active(&mut self, id: HandshakeId, caller: &str) -> Handshake<C::Socket> {
        let Some(index) = self.handshakes.iter().position(|h| h.id() == id) else {
            panic!("internal error: {caller} called on an inactive handshake {id}");
        };
        if !self.handshakes[index].is_active() {
            panic!("internal error: {caller} called on an inactive handshake {id}");
        }

        self.handshakes.remove(index)
    }

    fn delete_handshake(&self, mut handshake: Handshake<C::Socket>) {
        handshake.mark_inactive();
        handshake.deactivate_connection();
        handshake.destroy_connection(&self.connections);
    }

    fn next_id(&mut self) -> HandshakeId {
        self.next_id += 1;
        HandshakeId(self.next_id)
    }
}

impl<C: Connector> Drop for HandshakeManager<C> {
    fn drop(&mut self) {
        self.clear();
    }
}

fn belongs_to<S>(handshake: &Handshake<S>, info_hash: &InfoHash) -> bool {
    handshake
        .download()
        .is_some_and(|d| d.info_hash() == *info_hash)
}

/// Runs [`HandshakeManager::expire`] every `period` until the task is
/// aborted.
pub fn spawn_timeout_sweeper<C>(manager: SharedHandshakeManager<C>, period: Duration) -> JoinHandle<()>
where
    C: Connector + Send + 'static,
    C::Socket: Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let expired = manager.lock().expire(Instant::now());
            if expired > 0 {
                trace!(target: LOG_TARGET, expired, "handshakes timed out");
            }
        }
    })
}
