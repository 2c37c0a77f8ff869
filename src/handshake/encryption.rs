use super::event::ConnectionEvent;
use crate::flags::bit_flags;

bit_flags! {
    /// Encryption settings threaded through every handshake attempt.
    pub struct EncryptionOptions {
        /// Accept encrypted incoming handshakes.
        const ALLOW_INCOMING = 1 << 0;
        /// Start outgoing handshakes encrypted.
        const TRY_OUTGOING = 1 << 1;
        /// Refuse plaintext peers.
        const REQUIRE = 1 << 2;
        /// Refuse peers that only obfuscate the header.
        const REQUIRE_RC4 = 1 << 3;
        /// Retry a failed attempt with the other mode.
        const ENABLE_RETRY = 1 << 4;
        const PREFER_PLAINTEXT = 1 << 5;
        /// The socket is dialed through a proxy.
        const USE_PROXY = 1 << 6;
        /// This attempt is itself a retry; it skips the recent-attempt
        /// filter and never retries again.
        const RETRYING = 1 << 7;
    }
}

impl EncryptionOptions {
    pub const fn default_outgoing() -> Self {
        Self::ALLOW_INCOMING
            .with(Self::TRY_OUTGOING)
            .with(Self::ENABLE_RETRY)
    }

    /// Log classification of an outgoing attempt made with these options.
    pub fn outgoing_event(self) -> ConnectionEvent {
        if self.contains(Self::USE_PROXY) {
            ConnectionEvent::OutgoingProxy
        } else if self.intersects(Self::TRY_OUTGOING.with(Self::REQUIRE)) {
            ConnectionEvent::OutgoingEncrypted
        } else {
            ConnectionEvent::Outgoing
        }
    }
}

/// What the handshake negotiated, handed on to the peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncryptionInfo {
    /// The stream is RC4 encrypted past the handshake.
    pub encrypted: bool,
    /// Only the handshake itself was obfuscated.
    pub obfuscated: bool,
}

/// Retry hint set by the handshake when an attempt failed in a way another
/// encryption mode might fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retry {
    #[default]
    None,
    Plaintext,
    Encrypted,
}

/// Encryption state of one handshake: what was asked for, what was
/// negotiated, and whether to retry.
#[derive(Debug, Clone, Default)]
pub struct HandshakeEncryption {
    options: EncryptionOptions,
    info: EncryptionInfo,
    retry: Retry,
}

impl HandshakeEncryption {
    pub fn new(options: EncryptionOptions) -> Self {
        Self {
            options,
            info: EncryptionInfo::default(),
            retry: Retry::None,
        }
    }

    pub fn options(&self) -> EncryptionOptions {
        self.options
    }

    pub fn info(&self) -> EncryptionInfo {
        self.info
    }

    pub fn set_info(&mut self, info: EncryptionInfo) {
        self.info = info;
    }

    pub fn retry(&self) -> Retry {
        self.retry
    }

    /// Records a retry hint. Ignored unless the options allow retrying and
    /// this attempt is not already a retry.
    pub fn set_retry(&mut self, retry: Retry) {
        if self.options.contains(EncryptionOptions::ENABLE_RETRY)
            && !self.options.contains(EncryptionOptions::RETRYING)
        {
            self.retry = retry;
        }
    }

    pub fn should_retry(&self) -> bool {
        self.retry != Retry::None
    }
}
