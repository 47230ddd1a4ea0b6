//! Helper module to compute a CRC32 checksum

use crc32fast::Hasher;

/// Incremental checksum over the uncompressed bytes of an entry.
pub trait Checksum {
    /// Feeds more bytes.
    fn update(&mut self, buf: &[u8]);

    /// Checksum of everything fed since the last reset.
    fn value(&self) -> u32;

    /// Starts over as if nothing had been fed.
    fn reset(&mut self);
}

impl Checksum for Hasher {
    fn update(&mut self, buf: &[u8]) {
        Hasher::update(self, buf);
    }

    fn value(&self) -> u32 {
        self.clone().finalize()
    }

    fn reset(&mut self) {
        Hasher::reset(self);
    }
}
