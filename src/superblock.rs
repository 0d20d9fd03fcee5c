//! Block 0: the superblock. Four big-endian `i32` fields, zero-padded to `B`.

use crate::block::BlockDevice;
use crate::error::{Error, Result};
use crate::layout::{FS_VERSION, SUPERBLOCK_SIZE};

/// The decoded contents of block 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub version: i32,
    pub b: i32,
    pub n: i32,
    pub i: i32,
}

impl Superblock {
    /// Encodes `self` as a zero-padded block of `block_size` bytes.
    pub fn encode(&self, block_size: usize) -> Vec<u8> {
        let mut buf = vec![0u8; block_size];
        buf[0..4].copy_from_slice(&self.version.to_be_bytes());
        buf[4..8].copy_from_slice(&self.b.to_be_bytes());
        buf[8..12].copy_from_slice(&self.n.to_be_bytes());
        buf[12..16].copy_from_slice(&self.i.to_be_bytes());
        buf
    }

    /// Decodes a superblock from the first [`SUPERBLOCK_SIZE`] bytes of `block`.
    pub fn decode(block: &[u8]) -> Self {
        let field = |off: usize| i32::from_be_bytes(block[off..off + 4].try_into().unwrap());
        Self {
            version: field(0),
            b: field(4),
            n: field(8),
            i: field(12),
        }
    }

    /// Writes `self` to block 0 of `dev`.
    pub fn write(&self, dev: &mut BlockDevice) -> Result<()> {
        dev.write_block(0, &self.encode(dev.block_size()))
    }

    /// Reads block 0 of `dev` and checks its version against [`FS_VERSION`].
    pub fn read_checked(dev: &BlockDevice) -> Result<Self> {
        let block = dev.read_block(0)?;
        let sb = Self::decode(&block[..SUPERBLOCK_SIZE.min(block.len())]);
        if sb.version != FS_VERSION {
            return Err(Error::VersionMismatch {
                expected: FS_VERSION,
                found: sb.version,
            });
        }
        Ok(sb)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_decode_identity() {
        let sb = Superblock {
            version: 1,
            b: 64,
            n: 64,
            i: 24,
        };
        let encoded = sb.encode(64);
        assert_eq!(encoded.len(), 64);
        assert_eq!(&encoded[16..], &vec![0u8; 48][..]);
        assert_eq!(Superblock::decode(&encoded), sb);
    }

    #[test]
    fn version_mismatch_rejected() {
        let mut dev = BlockDevice::new(64, 64);
        let bad = Superblock {
            version: 0xDEAD,
            b: 64,
            n: 64,
            i: 24,
        };
        bad.write(&mut dev).unwrap();
        assert!(matches!(
            Superblock::read_checked(&dev),
            Err(Error::VersionMismatch { found: 0xDEAD, .. })
        ));
    }
}
