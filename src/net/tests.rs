use super::*;
use crate::handshake::{EncryptionOptions, HandshakeManager, HandshakeState};
use crate::peer::ClientList;
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct RecordingFd {
    calls: Mutex<Vec<(&'static str, usize)>>,
    fail_on: Option<&'static str>,
}

impl RecordingFd {
    fn failing(step: &'static str) -> Self {
        Self {
            fail_on: Some(step),
            ..Self::default()
        }
    }

    fn record(&self, step: &'static str, value: usize) -> io::Result<()> {
        self.calls.lock().push((step, value));
        if self.fail_on == Some(step) {
            return Err(io::Error::other(step));
        }
        Ok(())
    }

    fn calls(&self) -> Vec<(&'static str, usize)> {
        self.calls.lock().clone()
    }
}

impl SocketFd for RecordingFd {
    fn set_nonblocking(&self) -> io::Result<()> {
        self.record("nonblocking", 0)
    }

    fn set_send_buffer_size(&self, size: usize) -> io::Result<()> {
        self.record("send", size)
    }

    fn set_recv_buffer_size(&self, size: usize) -> io::Result<()> {
        self.record("recv", size)
    }
}

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

#[test]
fn test_setup_socket_skips_zero_buffer_sizes() {
    let fd = RecordingFd::default();
    setup_socket(&fd, SocketBuffers::default()).unwrap();
    assert_eq!(fd.calls(), vec![("nonblocking", 0)]);

    let fd = RecordingFd::default();
    let buffers = SocketBuffers {
        send: 0,
        recv: 65536,
    };
    setup_socket(&fd, buffers).unwrap();
    assert_eq!(fd.calls(), vec![("nonblocking", 0), ("recv", 65536)]);
}

#[test]
fn test_setup_socket_applies_both_buffers() {
    let fd = RecordingFd::default();
    let buffers = SocketBuffers {
        send: 16384,
        recv: 32768,
    };

    setup_socket(&fd, buffers).unwrap();

    assert_eq!(
        fd.calls(),
        vec![("nonblocking", 0), ("send", 16384), ("recv", 32768)]
    );
}

#[test]
fn test_setup_socket_stops_at_first_failure() {
    let fd = RecordingFd::failing("nonblocking");
    let buffers = SocketBuffers {
        send: 16384,
        recv: 32768,
    };
    assert!(setup_socket(&fd, buffers).is_err());
    assert_eq!(fd.calls(), vec![("nonblocking", 0)]);

    let fd = RecordingFd::failing("send");
    assert!(setup_socket(&fd, buffers).is_err());
    assert_eq!(fd.calls(), vec![("nonblocking", 0), ("send", 16384)]);
}

#[test]
fn test_connection_config_defaults() {
    let config = ConnectionConfig::default();
    assert_eq!(config.max_sockets, crate::constants::MAX_OPEN_SOCKETS);
    assert_eq!(config.encryption, EncryptionOptions::default_outgoing());
    assert!(config.proxy_address.is_none());
    assert!(config.bind_address.is_none());
    assert_eq!(config.connect_timeout, crate::constants::CONNECT_TIMEOUT);
    assert_eq!(config.handshake_timeout, crate::constants::HANDSHAKE_TIMEOUT);
}

#[test]
fn test_socket_budget() {
    let manager = ConnectionManager::default();
    manager.set_max_size(2);
    assert!(manager.can_connect());

    manager.inc_socket_count();
    manager.inc_socket_count();
    assert_eq!(manager.size(), 2);
    assert!(!manager.can_connect());

    manager.dec_socket_count();
    assert!(manager.can_connect());
    assert_eq!(manager.max_size(), 2);
}

#[test]
#[should_panic(expected = "no open sockets")]
fn test_socket_count_underflow_is_fatal() {
    let manager = ConnectionManager::default();
    manager.dec_socket_count();
}

#[test]
fn test_address_filter() {
    let manager = ConnectionManager::default();
    let peer = addr("192.168.1.10:6881");
    assert!(manager.filter(&peer));

    manager.set_filter(|a| !a.ip().is_loopback());
    assert!(manager.filter(&peer));
    assert!(!manager.filter(&addr("127.0.0.1:6881")));

    manager.clear_filter();
    assert!(manager.filter(&addr("127.0.0.1:6881")));
}

#[test]
fn test_proxy_address_must_be_usable() {
    let manager = ConnectionManager::default();
    assert_eq!(manager.proxy_address(), None);

    manager.set_proxy_address(Some(addr("0.0.0.0:1080")));
    assert_eq!(manager.proxy_address(), None);

    manager.set_proxy_address(Some(addr("10.0.0.1:0")));
    assert_eq!(manager.proxy_address(), None);

    manager.set_proxy_address(Some(addr("10.0.0.1:1080")));
    assert_eq!(manager.proxy_address(), Some(addr("10.0.0.1:1080")));
}

#[test]
fn test_socket_buffers_round_through_config() {
    let manager = ConnectionManager::default();
    let buffers = SocketBuffers {
        send: 4096,
        recv: 8192,
    };

    manager.set_socket_buffers(buffers);

    assert_eq!(manager.socket_buffers(), buffers);
    assert_eq!(manager.config().send_buffer_size, 4096);
    assert_eq!(manager.config().receive_buffer_size, 8192);
}

#[tokio::test]
async fn test_bind_manager_dials_without_blocking() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap();

    let mut connector = BindManager::default();
    let socket = connector.connect(target).unwrap();

    let (_stream, from) = listener.accept().await.unwrap();
    assert_eq!(from, socket.local_addr().unwrap().as_socket().unwrap());
}

#[tokio::test]
async fn test_bind_manager_ignores_bind_address_of_other_family() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap();

    let mut connector = BindManager::new(Some(addr("[::1]:0")), SocketBuffers::default());
    assert!(connector.connect(target).is_ok());
    assert!(listener.accept().await.is_ok());
}

#[tokio::test]
async fn test_listener_rejects_multicast() {
    let result = Listener::bind(addr("224.0.0.1:6881")).await;
    assert!(matches!(result, Err(NetError::InvalidAddress(_))));
}

#[tokio::test]
async fn test_accepted_socket_enters_handshake() {
    let listener = Listener::bind(addr("127.0.0.1:0")).await.unwrap();
    let local = listener.local_addr().unwrap();

    let _client = tokio::net::TcpStream::connect(local).await.unwrap();
    let (socket, from) = listener.accept().await.unwrap();

    let config = ConnectionConfig::default();
    let connections = Arc::new(ConnectionManager::new(config.clone()));
    let mut manager = HandshakeManager::new(
        connections.clone(),
        BindManager::from_config(&config),
        Arc::new(ClientList::new()),
    );

    let id = manager.add_incoming(socket, from).unwrap();
    assert_eq!(
        manager.get(id).unwrap().state(),
        HandshakeState::NegotiatingEncryption
    );
    assert_eq!(connections.size(), 1);

    manager.clear();
    assert_eq!(connections.size(), 0);
}

#[tokio::test]
async fn test_listener_run_feeds_manager() {
    let listener = Listener::bind(addr("127.0.0.1:0")).await.unwrap();
    let local = listener.local_addr().unwrap();

    let config = ConnectionConfig::default();
    let manager = Arc::new(Mutex::new(HandshakeManager::new(
        Arc::new(ConnectionManager::new(config.clone())),
        BindManager::from_config(&config),
        Arc::new(ClientList::new()),
    )));
    let task = tokio::spawn(listener.run(manager.clone()));

    let _client = tokio::net::TcpStream::connect(local).await.unwrap();

    let mut admitted = false;
    for _ in 0..100 {
        if manager.lock().len() == 1 {
            admitted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    task.abort();

    assert!(admitted);
}
