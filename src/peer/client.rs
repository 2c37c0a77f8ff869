use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

use super::peer_id::PeerId;

/// The peer ID convention a client follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientKind {
    /// `-XXvvvv-` followed by random bytes.
    Azureus,
    /// One letter, three version characters, then `--` (Shadow's style).
    Compact,
    /// `Mv-v-v--` as used by the mainline client.
    Mainline,
    Unknown,
}

/// A resolved client identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub kind: ClientKind,
    pub name: String,
    pub version: String,
}

impl ClientInfo {
    pub fn unknown() -> Self {
        Self {
            kind: ClientKind::Unknown,
            name: "Unknown".to_string(),
            version: String::new(),
        }
    }
}

impl fmt::Display for ClientInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} {}", self.name, self.version)
        }
    }
}

const AZUREUS_CLIENTS: &[(&str, &str)] = &[
    ("AR", "Arctic"),
    ("AZ", "Azureus"),
    ("BC", "BitComet"),
    ("BT", "BitTorrent"),
    ("DE", "Deluge"),
    ("FD", "Free Download Manager"),
    ("KT", "KTorrent"),
    ("LT", "libtorrent (Rasterbar)"),
    ("lt", "libTorrent (rakshasa)"),
    ("RB", "rbit"),
    ("TR", "Transmission"),
    ("UM", "uTorrent Mac"),
    ("UT", "uTorrent"),
    ("qB", "qBittorrent"),
];

const COMPACT_CLIENTS: &[(&str, &str)] = &[
    ("A", "ABC"),
    ("O", "Osprey Permaseed"),
    ("Q", "BTQueue"),
    ("R", "Tribler"),
    ("S", "Shadow"),
    ("T", "BitTornado"),
    ("U", "UPnP NAT BitTorrent"),
];

const MAINLINE_CLIENTS: &[(&str, &str)] = &[("M", "Mainline"), ("Q", "Queen Bee")];

/// Resolves peer IDs to client names and versions.
///
/// Starts out with a table of well-known clients; more can be registered
/// with [`insert`](Self::insert).
pub struct ClientList {
    known: RwLock<HashMap<(ClientKind, String), String>>,
}

impl ClientList {
    pub fn new() -> Self {
        let mut known = HashMap::new();
        let tables = [
            (ClientKind::Azureus, AZUREUS_CLIENTS),
            (ClientKind::Compact, COMPACT_CLIENTS),
            (ClientKind::Mainline, MAINLINE_CLIENTS),
        ];
        for (kind, table) in tables {
            for (code, name) in table {
                known.insert((kind, (*code).to_string()), (*name).to_string());
            }
        }

        Self {
            known: RwLock::new(known),
        }
    }

    pub fn insert(&self, kind: ClientKind, code: &str, name: &str) {
        self.known
            .write()
            .insert((kind, code.to_string()), name.to_string());
    }

    /// Decodes `id` into a client identity, falling back to
    /// [`ClientInfo::unknown`] for unrecognized formats or codes.
    pub fn retrieve_id(&self, id: &PeerId) -> ClientInfo {
        let Some((kind, code, version)) = parse_peer_id(id.as_bytes()) else {
            return ClientInfo::unknown();
        };

        match self.known.read().get(&(kind, code)) {
            Some(name) => ClientInfo {
                kind,
                name: name.clone(),
                version,
            },
            None => ClientInfo::unknown(),
        }
    }
}

impl Default for ClientList {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_peer_id(id: &[u8; 20]) -> Option<(ClientKind, String, String)> {
    if id[0] == b'-' && id[7] == b'-' {
        let code = std::str::from_utf8(&id[1..3]).ok()?;
        let version = dotted(&id[3..7])?;
        return Some((ClientKind::Azureus, code.to_string(), version));
    }

    if id[0].is_ascii_uppercase() && id[1].is_ascii_digit() && id[2] == b'-' {
        // Mainline: "M4-3-6--" or "M4-20-8-".
        let end = id[1..8].iter().rposition(|&b| b != b'-')? + 2;
        let version = std::str::from_utf8(&id[1..end]).ok()?.replace('-', ".");
        return Some((ClientKind::Mainline, (id[0] as char).to_string(), version));
    }

    if id[0].is_ascii_uppercase() && id[4..6] == *b"--" {
        let version = dotted(&id[1..4])?;
        return Some((ClientKind::Compact, (id[0] as char).to_string(), version));
    }

    None
}

fn dotted(chars: &[u8]) -> Option<String> {
    let parts: Option<Vec<String>> = chars
        .iter()
        .map(|&c| match c {
            b'0'..=b'9' => Some((c - b'0').to_string()),
            b'A'..=b'Z' => Some((c - b'A' + 10).to_string()),
            b'a'..=b'z' => Some((c - b'a' + 36).to_string()),
            b'.' | b'-' => Some("0".to_string()),
            _ => None,
        })
        .collect();
    Some(parts?.join("."))
}
