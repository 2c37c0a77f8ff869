use bytes::Bytes;

/// The set of pieces a peer announced during the handshake.
///
/// Bits are numbered from the high bit of the first byte, as on the wire.
/// Spare bits past `piece_count` are always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitfield {
    bits: Vec<u8>,
    piece_count: usize,
}

impl Bitfield {
    /// Creates an empty bitfield for the given number of pieces.
    pub fn new(piece_count: usize) -> Self {
        Self {
            bits: vec![0; piece_count.div_ceil(8)],
            piece_count,
        }
    }

    /// Creates a bitfield from raw bytes, padding or masking to `piece_count`.
    pub fn from_bytes(bytes: Bytes, piece_count: usize) -> Self {
        let mut bits = bytes.to_vec();
        bits.resize(piece_count.div_ceil(8), 0);

        let mut bf = Self { bits, piece_count };
        bf.clear_spare_bits();
        bf
    }

    /// Creates a bitfield with every piece set, as sent by a seeder.
    pub fn full(piece_count: usize) -> Self {
        let mut bf = Self {
            bits: vec![0xFF; piece_count.div_ceil(8)],
            piece_count,
        };
        bf.clear_spare_bits();
        bf
    }

    pub fn has(&self, index: usize) -> bool {
        if index >= self.piece_count {
            return false;
        }
        (self.bits[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    pub fn set(&mut self, index: usize) {
        if index < self.piece_count {
            self.bits[index / 8] |= 1 << (7 - index % 8);
        }
    }

    pub fn unset(&mut self, index: usize) {
        if index < self.piece_count {
            self.bits[index / 8] &= !(1 << (7 - index % 8));
        }
    }

    /// Returns the number of pieces set.
    pub fn count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Returns true if the peer has every piece. A peer like this is of no
    /// use to a download that is already complete.
    pub fn is_all_set(&self) -> bool {
        self.count() == self.piece_count
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    pub fn piece_count(&self) -> usize {
        self.piece_count
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    fn clear_spare_bits(&mut self) {
        let spare = self.bits.len() * 8 - self.piece_count;
        if spare > 0 && spare < 8 {
            let last = self.bits.len() - 1;
            self.bits[last] &= 0xFFu8 << spare;
        }
    }
}
