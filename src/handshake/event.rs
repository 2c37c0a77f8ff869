use std::fmt;

/// Handshake events as they appear in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEvent {
    Incoming,
    Outgoing,
    OutgoingEncrypted,
    OutgoingProxy,
    Success,
    Dropped,
    Failed,
    RetryPlaintext,
    RetryEncrypted,
}

impl ConnectionEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionEvent::Incoming => "handshake_incoming",
            ConnectionEvent::Outgoing => "handshake_outgoing",
            ConnectionEvent::OutgoingEncrypted => "handshake_outgoing_encrypted",
            ConnectionEvent::OutgoingProxy => "handshake_outgoing_proxy",
            ConnectionEvent::Success => "handshake_success",
            ConnectionEvent::Dropped => "handshake_dropped",
            ConnectionEvent::Failed => "handshake_failed",
            ConnectionEvent::RetryPlaintext => "handshake_retry_plaintext",
            ConnectionEvent::RetryEncrypted => "handshake_retry_encrypted",
        }
    }
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
