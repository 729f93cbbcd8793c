//! Dictionary cache: a fixed-size bit set keyed by phrase id.
//!
//! The cache answers "could this phrase exist in the index?" before a store lookup is made.
//! An id is reduced modulo `2^bits`; inserted ids never test negative, but unrelated ids can
//! alias the same bit and test positive.
//!
//! The serialized form is the raw buffer: exactly 2 MiB for a 24-bit cache and 32 MiB for a
//! 28-bit cache. Bit `id & 7` of byte `(id >> 3) mod len` holds the membership of `id`.

use std::{fmt, fs, path::Path};

use crate::IndexError;

/// Supported cache sizes in bits.
pub const SUPPORTED_BITS: [u8; 2] = [24, 28];

/// A bit-packed membership set over `2^bits` addresses.
#[derive(Clone, PartialEq, Eq)]
pub struct DictCache {
    /// Address width.
    bits: u8,
    /// `2^bits / 8` bytes.
    data: Box<[u8]>,
}

impl DictCache {
    /// Creates an empty cache of `2^bits` bits.
    pub fn new(bits: u8) -> Result<Self, IndexError> {
        if !SUPPORTED_BITS.contains(&bits) {
            return Err(IndexError::InvalidBitSize(bits));
        }
        Ok(Self {
            bits,
            data: vec![0u8; byte_len(bits)].into_boxed_slice(),
        })
    }

    /// Takes ownership of a serialized buffer. The bit size is inferred from its length.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, IndexError> {
        let bits = SUPPORTED_BITS
            .into_iter()
            .find(|&bits| byte_len(bits) == bytes.len())
            .ok_or(IndexError::InvalidCacheLength(bytes.len()))?;
        Ok(Self {
            bits,
            data: bytes.into_boxed_slice(),
        })
    }

    /// Copies a serialized buffer into a new cache.
    pub fn load(bytes: &[u8]) -> Result<Self, IndexError> {
        Self::from_bytes(bytes.to_vec())
    }

    /// Reads a cache previously written with [`Self::write_to`].
    pub fn read_from(path: &Path) -> Result<Self, IndexError> {
        Self::from_bytes(fs::read(path)?)
    }

    /// Writes the raw buffer to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), IndexError> {
        fs::write(path, &self.data)?;
        Ok(())
    }

    /// Returns the byte index and bit mask addressing `id`.
    fn address(&self, id: u64) -> (usize, u8) {
        let byte = (id >> 3) % self.data.len() as u64;
        (byte as usize, 1 << (id & 7))
    }

    /// Marks `id` as present.
    pub fn set(&mut self, id: u64) {
        let (byte, mask) = self.address(id);
        self.data[byte] |= mask;
    }

    /// Returns true if `id` may be present.
    pub fn has(&self, id: u64) -> bool {
        let (byte, mask) = self.address(id);
        self.data[byte] & mask != 0
    }

    /// Clears the bit addressed by `id`.
    ///
    /// This also clears every id aliasing the same address.
    pub fn delete(&mut self, id: u64) {
        let (byte, mask) = self.address(id);
        self.data[byte] &= !mask;
    }

    /// Returns the raw buffer.
    pub fn dump(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the cache, returning the raw buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data.into_vec()
    }

    /// Number of addressable bits, `2^bits`.
    pub fn size(&self) -> u64 {
        1 << self.bits
    }

    /// Address width in bits.
    pub fn bit_size(&self) -> u8 {
        self.bits
    }

    /// Number of bits currently set.
    pub fn count_ones(&self) -> u64 {
        self.data.iter().map(|b| u64::from(b.count_ones())).sum()
    }
}

impl fmt::Debug for DictCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictCache")
            .field("bits", &self.bits)
            .field("populated", &self.count_ones())
            .finish()
    }
}

/// Byte length of a cache with `bits` address bits.
const fn byte_len(bits: u8) -> usize {
    1 << (bits - 3)
}
