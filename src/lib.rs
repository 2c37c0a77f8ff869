//! rbit-handshake - Connection establishment for BitTorrent clients
//!
//! This library owns every peer socket from the moment it is accepted or
//! dialed until it is either promoted to an established peer connection or
//! discarded.
//!
//! # Modules
//!
//! - [`handshake`] - Pending handshakes and the manager that admits, retries and promotes them
//! - [`net`] - Socket setup, dialing, listening and admission policy
//! - [`peer`] - Peer IDs, bitfields, per-download peer lists and client identification
//! - [`download`] - Traits through which downloads accept promoted connections
//! - [`constants`] - Limits, timeouts and buffer sizes

pub mod constants;
pub mod download;
mod flags;
pub mod handshake;
pub mod net;
pub mod peer;

pub use download::{ConnectionList, Download, InfoHash, PeerConnection};
pub use handshake::{
    AdmissionError, ConnectionEvent, EncryptionInfo, EncryptionOptions, Handshake, HandshakeError,
    HandshakeId, HandshakeManager, HandshakeState, ProtocolExtension, Retry,
};
pub use net::{BindManager, ConnectionConfig, ConnectionManager, Connector, Listener, SocketFd};
pub use peer::{Bitfield, ClientInfo, ClientList, PeerId, PeerInfo, PeerList};
