use thiserror::Error;

/// Why a handshake ended without producing a peer connection.
///
/// These are reasons for logs, not errors returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[repr(u32)]
pub enum HandshakeError {
    #[error("not a bittorrent stream")]
    NotBittorrent = 1,

    #[error("not encrypted")]
    NotEncrypted = 2,

    #[error("encryption required")]
    EncryptionRequired = 3,

    #[error("invalid encryption method")]
    InvalidEncryption = 4,

    #[error("invalid value received")]
    InvalidValue = 5,

    #[error("unknown download")]
    UnknownDownload = 6,

    #[error("inactive download")]
    InactiveDownload = 7,

    #[error("duplicate peer id")]
    Duplicate = 8,

    #[error("connected to self")]
    IsSelf = 9,

    #[error("invalid message order")]
    InvalidOrder = 10,

    #[error("unwanted connection")]
    UnwantedConnection = 11,

    #[error("network unreachable")]
    NetworkUnreachable = 12,

    #[error("network read error")]
    NetworkReadError = 13,

    #[error("network write error")]
    NetworkWriteError = 14,

    #[error("network timeout")]
    NetworkTimeout = 15,
}

impl HandshakeError {
    /// Stable numeric code for logs.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Why a new connection attempt was not admitted.
///
/// Returned for information only: by the time the caller sees it, the
/// socket has been closed and the peer list notified as needed.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("out of socket resources")]
    OutOfResources,

    #[error("address filtered")]
    Filtered,

    #[error("socket setup failed: {0}")]
    Setup(#[source] std::io::Error),

    #[error("could not open socket: {0}")]
    Connect(#[source] std::io::Error),

    /// The peer list refused: the peer is connected, handshaking, or was
    /// attempted too recently.
    #[error("refused by peer list")]
    PeerRefused,

    #[error("peer failed {0} times")]
    TooManyFailures(u32),
}
