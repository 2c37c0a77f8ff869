use super::*;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

#[test]
fn test_peer_id_generate() {
    let id1 = PeerId::generate();
    let id2 = PeerId::generate();
    assert_ne!(id1.0, id2.0);
    assert_eq!(id1.client_id(), Some("RB0001"));
}

#[test]
fn test_peer_id_from_bytes() {
    assert!(PeerId::from_bytes(&[0u8; 19]).is_none());
    let id = PeerId::from_bytes(b"-UT3550-abcdefghijkl").unwrap();
    assert_eq!(id.client_id(), Some("UT3550"));
}

#[test]
fn test_bitfield() {
    let mut bf = Bitfield::new(100);
    assert!(!bf.has(0));

    bf.set(0);
    bf.set(99);
    assert!(bf.has(0));
    assert!(bf.has(99));
    assert!(!bf.has(100));

    bf.unset(0);
    assert!(!bf.has(0));
    assert_eq!(bf.count(), 1);
}

#[test]
fn test_bitfield_from_bytes_masks_spare_bits() {
    let bf = Bitfield::from_bytes(Bytes::from_static(&[0xFF, 0xFF]), 10);
    assert_eq!(bf.count(), 10);
    assert!(bf.is_all_set());
    assert_eq!(bf.as_bytes(), &[0xFF, 0xC0]);
}

#[test]
fn test_bitfield_all_set() {
    assert!(Bitfield::full(13).is_all_set());
    assert!(!Bitfield::new(13).is_all_set());
    assert!(Bitfield::new(13).is_empty());
}

#[test]
fn test_peer_list_creates_and_claims_record() {
    let list = PeerList::new();
    let peer = list
        .connected(addr("10.0.0.1:6881"), ConnectFlags::KEEP_HANDSHAKES)
        .unwrap();

    assert!(peer.is_connected());
    assert!(peer.is_handshake());
    assert!(!peer.is_incoming());
    assert_eq!(list.len(), 1);

    // Already claimed.
    assert!(list
        .connected(addr("10.0.0.1:6881"), ConnectFlags::KEEP_HANDSHAKES)
        .is_none());
}

#[test]
fn test_peer_list_disconnect_counts_failures() {
    let list = PeerList::new();
    let a = addr("10.0.0.2:6881");
    let peer = list.connected(a, ConnectFlags::empty()).unwrap();

    list.disconnected(&peer, DisconnectFlags::empty());
    assert!(!peer.is_connected());
    assert_eq!(peer.failed_counter(), 1);

    let peer = list.connected(a, ConnectFlags::empty()).unwrap();
    list.disconnected(&peer, DisconnectFlags::NO_FAILURE);
    assert_eq!(peer.failed_counter(), 1);
}

#[test]
fn test_peer_list_filters_recent_attempts() {
    let list = PeerList::with_recent_window(Duration::from_secs(3600));
    let a = addr("10.0.0.3:6881");

    let peer = list.connected(a, ConnectFlags::FILTER_RECENT).unwrap();
    list.disconnected(&peer, DisconnectFlags::SET_TIME);

    assert!(list.connected(a, ConnectFlags::FILTER_RECENT).is_none());
    // A retry does not ask for the filter.
    assert!(list.connected(a, ConnectFlags::KEEP_HANDSHAKES).is_some());
}

#[test]
fn test_peer_list_zero_window_never_filters() {
    let list = PeerList::with_recent_window(Duration::ZERO);
    let a = addr("10.0.0.4:6881");

    let peer = list.connected(a, ConnectFlags::FILTER_RECENT).unwrap();
    list.disconnected(&peer, DisconnectFlags::SET_TIME);
    assert!(list.connected(a, ConnectFlags::FILTER_RECENT).is_some());
}

#[test]
fn test_incoming_flag() {
    let list = PeerList::new();
    let peer = list
        .connected(addr("10.0.0.5:51413"), ConnectFlags::INCOMING)
        .unwrap();
    assert!(peer.is_incoming());
    assert!(!peer.is_handshake());
}

#[test]
fn test_client_list_azureus() {
    let clients = ClientList::new();
    let id = PeerId::from_bytes(b"-qB4630-abcdefghijkl").unwrap();
    let info = clients.retrieve_id(&id);

    assert_eq!(info.kind, ClientKind::Azureus);
    assert_eq!(info.name, "qBittorrent");
    assert_eq!(info.version, "4.6.3.0");
    assert_eq!(info.to_string(), "qBittorrent 4.6.3.0");
}

#[test]
fn test_client_list_compact_and_mainline() {
    let clients = ClientList::new();

    let tornado = clients.retrieve_id(&PeerId::from_bytes(b"T03I--abcdefghijklmn").unwrap());
    assert_eq!(tornado.kind, ClientKind::Compact);
    assert_eq!(tornado.name, "BitTornado");
    assert_eq!(tornado.version, "0.3.18");

    let mainline = clients.retrieve_id(&PeerId::from_bytes(b"M4-3-6--abcdefghijkl").unwrap());
    assert_eq!(mainline.kind, ClientKind::Mainline);
    assert_eq!(mainline.version, "4.3.6");
}

#[test]
fn test_client_list_unknown_and_insert() {
    let clients = ClientList::new();
    let id = PeerId::from_bytes(b"-ZZ1000-abcdefghijkl").unwrap();
    assert_eq!(clients.retrieve_id(&id), ClientInfo::unknown());

    clients.insert(ClientKind::Azureus, "ZZ", "Zed");
    let info = clients.retrieve_id(&id);
    assert_eq!(info.name, "Zed");
    assert_eq!(info.version, "1.0.0.0");

    let random = PeerId([0xAB; 20]);
    assert_eq!(clients.retrieve_id(&random).kind, ClientKind::Unknown);
}
