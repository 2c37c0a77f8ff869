use std::collections::BTreeMap;

/// Protocol extensions negotiated during a handshake.
///
/// Holds the reserved bytes both sides exchanged plus the extension IDs
/// the peer advertised in its BEP-10 extension handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolExtension {
    reserved: [u8; 8],
    extensions: BTreeMap<String, u8>,
}

impl ProtocolExtension {
    /// The reserved bits we advertise: extension protocol (BEP-10), fast
    /// extension (BEP-6) and DHT (BEP-5).
    pub fn make_default() -> Self {
        let mut reserved = [0u8; 8];
        reserved[5] |= 0x10;
        reserved[7] |= 0x04 | 0x01;
        Self::from_reserved(reserved)
    }

    pub fn from_reserved(reserved: [u8; 8]) -> Self {
        Self {
            reserved,
            extensions: BTreeMap::new(),
        }
    }

    pub fn reserved(&self) -> [u8; 8] {
        self.reserved
    }

    pub fn supports_extension_protocol(&self) -> bool {
        (self.reserved[5] & 0x10) != 0
    }

    pub fn supports_fast_extension(&self) -> bool {
        (self.reserved[7] & 0x04) != 0
    }

    pub fn supports_dht(&self) -> bool {
        (self.reserved[7] & 0x01) != 0
    }

    /// Records an extension message ID from the peer's extension handshake.
    pub fn set_extension(&mut self, name: impl Into<String>, id: u8) {
        self.extensions.insert(name.into(), id);
    }

    pub fn extension_id(&self, name: &str) -> Option<u8> {
        self.extensions.get(name).copied()
    }
}

impl Default for ProtocolExtension {
    fn default() -> Self {
        Self::make_default()
    }
}
