//! The block device: `N` fixed-size blocks of `B` bytes, held entirely in memory.
//!
//! This is the only layer that touches the raw byte array. Everything above it
//! (bitmap, inode table, directory, open-file table) only ever copies whole blocks
//! in and out, so the algorithms up there are oblivious to how the bytes are stored.

use crate::error::{Error, Result};

/// A fixed-capacity, in-memory array of `n` blocks of `b` bytes each.
#[derive(Debug, Clone)]
pub struct BlockDevice {
    b: usize,
    n: usize,
    data: Vec<u8>,
}

impl BlockDevice {
    /// Creates a new device of `n` blocks of `b` bytes each, zero-filled.
    pub fn new(b: usize, n: usize) -> Self {
        Self {
            b,
            n,
            data: vec![0u8; b * n],
        }
    }

    /// Rebuilds a device from raw bytes previously produced by [`BlockDevice::raw_bytes`].
    ///
    /// `data.len()` must equal `b * n`; this is only used by the backup/restore path,
    /// which is trusted to preserve that invariant.
    pub(crate) fn from_raw(b: usize, n: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), b * n);
        Self { b, n, data }
    }

    /// The configured block size, in bytes.
    pub fn block_size(&self) -> usize {
        self.b
    }

    /// The configured number of blocks.
    pub fn block_count(&self) -> usize {
        self.n
    }

    /// Returns a copy of the bytes of block `i`.
    pub fn read_block(&self, i: i64) -> Result<Vec<u8>> {
        let off = self.offset_of(i)?;
        Ok(self.data[off..off + self.b].to_vec())
    }

    /// Overwrites block `i` with `data`, which must be exactly `B` bytes.
    pub fn write_block(&mut self, i: i64, data: &[u8]) -> Result<()> {
        if data.len() != self.b {
            return Err(Error::SizeMismatch {
                expected: self.b,
                actual: data.len(),
            });
        }
        let off = self.offset_of(i)?;
        self.data[off..off + self.b].copy_from_slice(data);
        Ok(())
    }

    /// The raw bytes of the whole device, for the backup writer.
    pub(crate) fn raw_bytes(&self) -> &[u8] {
        &self.data
    }

    fn offset_of(&self, i: i64) -> Result<usize> {
        if i < 0 || i as usize >= self.n {
            return Err(Error::OutOfRange(i));
        }
        Ok(i as usize * self.b)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_write_round_trip() {
        let mut dev = BlockDevice::new(8, 4);
        dev.write_block(2, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(dev.read_block(2).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(dev.read_block(0).unwrap(), vec![0; 8]);
    }

    #[test]
    fn out_of_range() {
        let dev = BlockDevice::new(8, 4);
        assert!(matches!(dev.read_block(4), Err(Error::OutOfRange(4))));
        assert!(matches!(dev.read_block(-1), Err(Error::OutOfRange(-1))));
    }

    #[test]
    fn size_mismatch() {
        let mut dev = BlockDevice::new(8, 4);
        assert!(matches!(
            dev.write_block(0, &[1, 2, 3]),
            Err(Error::SizeMismatch {
                expected: 8,
                actual: 3
            })
        ));
    }
}
