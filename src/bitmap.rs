//! The free-block bitmap.
//!
//! Polarity is the opposite of the usual convention: bit `k` set to **1** means
//! block `k` is available to the allocator. `mark_used` sets the bit, `mark_free`
//! clears it. This is deliberate — see the design notes — and must not be
//! "fixed" to the more common "1 = in use" convention.
//!
//! Like [`crate::inode`], this module has no state of its own: every function
//! takes the device and layout explicitly rather than holding a borrow across calls.

use crate::block::BlockDevice;
use crate::error::{Error, Result};
use crate::layout::Layout;

/// Returns the lowest block index whose bit is set, or `None` if the device is full.
pub fn find_free(dev: &BlockDevice, layout: &Layout) -> Result<Option<i64>> {
    let bits_per_block = 8 * layout.b;
    for block_off in 0..layout.bitmap_blocks {
        let block = dev.read_block((layout.bitmap_start() + block_off) as i64)?;
        for (byte_idx, byte) in block.iter().enumerate() {
            for bit in 0..8u32 {
                let k = block_off * bits_per_block + byte_idx * 8 + bit as usize;
                if k >= layout.n {
                    // Tail bits past N are not valid candidates, scanned or not.
                    return Ok(None);
                }
                if byte & (1 << bit) != 0 {
                    return Ok(Some(k as i64));
                }
            }
        }
    }
    Ok(None)
}

/// Sets bit `k`, marking block `k` as available to the allocator.
pub fn mark_used(dev: &mut BlockDevice, layout: &Layout, k: i64) -> Result<()> {
    set_bit(dev, layout, k, true)
}

/// Clears bit `k`, marking block `k` as unavailable.
///
/// Callers must never pass the `-1` sentinel used for unused inode block slots;
/// skip those entries instead of calling this on them.
pub fn mark_free(dev: &mut BlockDevice, layout: &Layout, k: i64) -> Result<()> {
    set_bit(dev, layout, k, false)
}

fn set_bit(dev: &mut BlockDevice, layout: &Layout, k: i64, value: bool) -> Result<()> {
    if k < 0 || k as usize >= layout.n {
        return Err(Error::OutOfRange(k));
    }
    let k = k as usize;
    let bits_per_block = 8 * layout.b;
    let block_off = k / bits_per_block;
    let byte_idx = (k % bits_per_block) / 8;
    let bit = k % 8;

    let block_idx = (layout.bitmap_start() + block_off) as i64;
    let mut block = dev.read_block(block_idx)?;
    if value {
        block[byte_idx] |= 1 << bit;
    } else {
        block[byte_idx] &= !(1 << bit);
    }
    dev.write_block(block_idx, &block)
}

/// Initializes the bitmap so that every block in `data_start..n` is findable by
/// the allocator, and every metadata block (superblock, bitmap, inode table) is
/// left unavailable.
pub fn init(dev: &mut BlockDevice, layout: &Layout) -> Result<()> {
    for block_off in 0..layout.bitmap_blocks {
        let zero = vec![0u8; layout.b];
        dev.write_block((layout.bitmap_start() + block_off) as i64, &zero)?;
    }
    for k in layout.data_start..layout.n {
        mark_used(dev, layout, k as i64)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn layout() -> Layout {
        Layout::new(8, 32, 4)
    }

    #[test]
    fn init_then_scan_finds_data_blocks_only() {
        let mut dev = BlockDevice::new(8, 32);
        let layout = layout();
        init(&mut dev, &layout).unwrap();
        assert_eq!(find_free(&dev, &layout).unwrap(), Some(layout.data_start as i64));
    }

    #[test]
    fn mark_used_then_free_round_trips() {
        let mut dev = BlockDevice::new(8, 32);
        let layout = layout();
        init(&mut dev, &layout).unwrap();
        let first = find_free(&dev, &layout).unwrap().unwrap();
        mark_free(&mut dev, &layout, first).unwrap();
        let next = find_free(&dev, &layout).unwrap().unwrap();
        assert_ne!(first, next);
        mark_used(&mut dev, &layout, first).unwrap();
        assert_eq!(find_free(&dev, &layout).unwrap(), Some(first));
    }

    #[test]
    fn tail_bits_past_n_never_returned() {
        // n is not a multiple of 8*b, so the last bitmap block has trailing bits
        // beyond N even if left set.
        let mut dev = BlockDevice::new(8, 3);
        let layout = Layout::new(8, 3, 1);
        // Hand-set every bit in the only bitmap block, including the tail.
        dev.write_block(1, &vec![0xffu8; 8]).unwrap();
        assert_eq!(find_free(&dev, &layout).unwrap(), Some(0));
    }
}
