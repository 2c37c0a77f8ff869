//! Socket plumbing and admission policy.
//!
//! Socket setup, the dialer, the accept loop, and the [`ConnectionManager`]
//! that decides whether a new connection may be opened.

mod bind;
mod connection_manager;
mod error;
mod listener;
mod socket;

pub use bind::{BindManager, Connector};
pub use connection_manager::{AddressFilter, ConnectionConfig, ConnectionManager};
pub use error::NetError;
pub use listener::Listener;
pub use socket::{setup_socket, SocketBuffers, SocketFd};

#[cfg(test)]
mod tests;
