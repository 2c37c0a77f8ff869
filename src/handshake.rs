//! Handshake orchestration.
//!
//! Every socket passes through here between being accepted or dialed and
//! becoming an established peer connection. The [`HandshakeManager`]
//! applies admission policy, tracks the pending [`Handshake`]s, and acts on
//! their outcomes: promotion, encryption fallback retries, or teardown.

mod encryption;
mod error;
mod event;
mod extension;
mod manager;
mod state;

pub use encryption::{EncryptionInfo, EncryptionOptions, HandshakeEncryption, Retry};
pub use error::{AdmissionError, HandshakeError};
pub use event::ConnectionEvent;
pub use extension::ProtocolExtension;
pub use manager::{spawn_timeout_sweeper, HandshakeManager, SharedHandshakeManager};
pub use state::{Direction, Handshake, HandshakeConnection, HandshakeId, HandshakeState};
