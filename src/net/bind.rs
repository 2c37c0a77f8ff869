use std::io;
use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::trace;

use super::connection_manager::ConnectionConfig;
use super::socket::{setup_socket, SocketBuffers, SocketFd};

/// Opens outgoing sockets.
///
/// `connect` must not block: it returns as soon as the dial is in flight,
/// and the handshake notices completion through readiness.
pub trait Connector {
    type Socket: SocketFd;

    fn connect(&mut self, addr: SocketAddr) -> io::Result<Self::Socket>;
}

/// The default [`Connector`]: non-blocking TCP dials, optionally from a
/// fixed local address.
#[derive(Debug, Clone, Default)]
pub struct BindManager {
    bind_address: Option<SocketAddr>,
    buffers: SocketBuffers,
}

impl BindManager {
    pub fn new(bind_address: Option<SocketAddr>, buffers: SocketBuffers) -> Self {
        Self {
            bind_address,
            buffers,
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(
            config.bind_address,
            SocketBuffers {
                send: config.send_buffer_size,
                recv: config.receive_buffer_size,
            },
        )
    }

    pub fn bind_address(&self) -> Option<SocketAddr> {
        self.bind_address
    }
}

impl Connector for BindManager {
    type Socket = Socket;

    fn connect(&mut self, addr: SocketAddr) -> io::Result<Socket> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        setup_socket(&socket, self.buffers)?;

        if let Some(bind) = self.bind_address.filter(|b| b.is_ipv4() == addr.is_ipv4()) {
            socket.set_reuse_address(true)?;
            socket.bind(&bind.into())?;
        }

        match socket.connect(&addr.into()) {
            Ok(()) => Ok(socket),
            Err(e) if is_in_progress(&e) => {
                trace!(%addr, "dial in progress");
                Ok(socket)
            }
            Err(e) => Err(e),
        }
    }
}

fn is_in_progress(e: &io::Error) -> bool {
    #[cfg(unix)]
    if e.raw_os_error() == Some(libc::EINPROGRESS) {
        return true;
    }
    e.kind() == io::ErrorKind::WouldBlock
}
