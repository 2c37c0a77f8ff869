//! Peer identity and per-download peer bookkeeping.
//!
//! This module holds what the handshake layer needs to know about remote
//! peers: their 20-byte IDs, the pieces they announced, the per-download
//! registry of known addresses, and the resolver that turns peer IDs into
//! client names.

mod bitfield;
mod client;
mod peer_id;
mod peer_info;
mod peer_list;

pub use bitfield::Bitfield;
pub use client::{ClientInfo, ClientKind, ClientList};
pub use peer_id::PeerId;
pub use peer_info::PeerInfo;
pub use peer_list::{ConnectFlags, DisconnectFlags, PeerList};

#[cfg(test)]
mod tests;
