use std::io;

use socket2::Socket;

/// The socket operations the handshake layer needs before handing a
/// descriptor to a handshake.
///
/// Closing is dropping: whoever owns the value owns the descriptor.
pub trait SocketFd {
    fn set_nonblocking(&self) -> io::Result<()>;

    fn set_send_buffer_size(&self, size: usize) -> io::Result<()>;

    fn set_recv_buffer_size(&self, size: usize) -> io::Result<()>;
}

impl SocketFd for Socket {
    fn set_nonblocking(&self) -> io::Result<()> {
        Socket::set_nonblocking(self, true)
    }

    fn set_send_buffer_size(&self, size: usize) -> io::Result<()> {
        Socket::set_send_buffer_size(self, size)
    }

    fn set_recv_buffer_size(&self, size: usize) -> io::Result<()> {
        Socket::set_recv_buffer_size(self, size)
    }
}

/// Buffer sizes applied by [`setup_socket`]. Zero keeps the OS default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SocketBuffers {
    pub send: usize,
    pub recv: usize,
}

/// Prepares a connected or accepted descriptor for a handshake.
///
/// Stops at the first failing step. The caller still owns `fd` and must
/// drop it on error. Applying this twice to the same descriptor is harmless;
/// outgoing sockets pass through it once when the dialer creates them and
/// again before the handshake starts.
pub fn setup_socket<S: SocketFd>(fd: &S, buffers: SocketBuffers) -> io::Result<()> {
    fd.set_nonblocking()?;

    if buffers.send != 0 {
        fd.set_send_buffer_size(buffers.send)?;
    }

    if buffers.recv != 0 {
        fd.set_recv_buffer_size(buffers.recv)?;
    }

    Ok(())
}
