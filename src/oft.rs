//! The open-file table: one buffered block per open file, driving every
//! block-crossing `read`/`write`/`lseek`.
//!
//! This is the hardest subsystem in the file system: it has to keep the buffer,
//! the inode's direct pointers, and the free-block bitmap in lock-step, flushing
//! a dirty buffer before a new block ever replaces it.

use crate::bitmap;
use crate::block::BlockDevice;
use crate::error::{Error, Result};
use crate::inode::{self, Inode};
use crate::layout::{Layout, FREE, INODE_DIRECT};

/// One entry of the open-file table. Slot 0 always holds the directory.
#[derive(Debug, Clone)]
pub struct OpenFileEntry {
    /// Index of the owning inode in the inode table.
    pub inode_index: i64,
    /// The inode's last-persisted value, kept in RAM between calls.
    pub inode: Inode,
    /// Byte offset of the cursor, `0 <= position <= inode.length`.
    pub position: i64,
    /// `position / B`: which direct pointer the cursor currently falls in.
    pub current_link: i64,
    /// Which direct pointer's block `buffer` currently holds, or `-1` if none.
    pub buffered_link: i64,
    /// The one block this entry keeps in memory.
    pub buffer: Vec<u8>,
    /// Whether `buffer` has writes not yet flushed to the device.
    pub modified: bool,
}

impl OpenFileEntry {
    /// A freshly opened entry, cursor at 0, nothing buffered yet.
    pub fn new(inode_index: i64, inode: Inode, block_size: usize) -> Self {
        Self {
            inode_index,
            inode,
            position: 0,
            current_link: 0,
            buffered_link: FREE as i64,
            buffer: vec![0; block_size],
            modified: false,
        }
    }
}

/// Flushes a dirty buffer, then loads (or allocates) the block for `current_link`.
///
/// This is the one place allocation happens, and the one place a write is ever
/// flushed, so every invariant about `modified`/`buffered_link` funnels through it.
pub fn load_current_block(dev: &mut BlockDevice, layout: &Layout, e: &mut OpenFileEntry) -> Result<()> {
    if !(0..INODE_DIRECT as i64).contains(&e.current_link) {
        return Err(Error::OutOfRange(e.current_link));
    }

    if e.modified {
        let target = e.inode.blocks[e.buffered_link as usize] as i64;
        dev.write_block(target, &e.buffer)?;
        e.modified = false;
    }

    let link = e.current_link as usize;
    let existing = e.inode.blocks[link];
    if existing != FREE {
        e.buffer = dev.read_block(existing as i64)?;
    } else {
        match bitmap::find_free(dev, layout)? {
            None => {
                e.inode.length = e.position as i32;
                inode::write_inode(dev, layout, e.inode_index, &e.inode)?;
                return Err(Error::ReadWriteError("no free space".to_string()));
            }
            Some(new_block) => {
                e.inode.blocks[link] = new_block as i32;
                bitmap::mark_used(dev, layout, new_block)?;
                inode::write_inode(dev, layout, e.inode_index, &e.inode)?;
                e.buffer = vec![0u8; layout.b];
                log::debug!(
                    "oft: allocated block {new_block} for inode {} link {link}",
                    e.inode_index
                );
            }
        }
    }
    e.buffered_link = e.current_link;
    Ok(())
}

/// Reads `count` bytes starting at the cursor, advancing it.
pub fn read(dev: &mut BlockDevice, layout: &Layout, e: &mut OpenFileEntry, count: i64) -> Result<Vec<u8>> {
    if e.position + count > e.inode.length as i64 {
        return Err(Error::ReadWriteError("EOF before N bytes".to_string()));
    }

    let mut out = Vec::with_capacity(count as usize);
    let mut remaining = count;
    while remaining > 0 {
        if e.current_link != e.buffered_link {
            load_current_block(dev, layout, e)?;
        }
        let off_in_block = (e.position % layout.b as i64) as usize;
        let take = remaining.min((layout.b - off_in_block) as i64) as usize;
        out.extend_from_slice(&e.buffer[off_in_block..off_in_block + take]);

        e.position += take as i64;
        e.current_link = e.position / layout.b as i64;
        remaining -= take as i64;
    }
    Ok(out)
}

/// Writes `src` starting at the cursor, advancing it and growing `length` as needed.
///
/// The façade is responsible for rejecting writes that would exceed `MAX_FILE_SIZE`
/// before calling this; this function has no size cap of its own beyond running out
/// of free blocks.
pub fn write(dev: &mut BlockDevice, layout: &Layout, e: &mut OpenFileEntry, src: &[u8]) -> Result<()> {
    let mut remaining = src.len();
    let mut src_off = 0usize;
    while remaining > 0 {
        if e.current_link != e.buffered_link {
            load_current_block(dev, layout, e)?;
        }
        let off_in_block = (e.position % layout.b as i64) as usize;
        let take = remaining.min(layout.b - off_in_block);
        e.buffer[off_in_block..off_in_block + take].copy_from_slice(&src[src_off..src_off + take]);
        e.modified = true;

        e.position += take as i64;
        e.current_link = e.position / layout.b as i64;
        src_off += take;
        remaining -= take;
    }
    e.inode.length = e.inode.length.max(e.position as i32);
    inode::write_inode(dev, layout, e.inode_index, &e.inode)
}

/// Moves the cursor to `pos`, which must be in `0..=length`. Does not touch the
/// buffer: the next `read`/`write` will see `current_link != buffered_link` and
/// trigger the flush+load on its own, keeping `lseek` itself O(1).
pub fn lseek(layout: &Layout, e: &mut OpenFileEntry, pos: i64) -> Result<()> {
    if pos < 0 || pos > e.inode.length as i64 {
        return Err(Error::OutOfRange(pos));
    }
    e.position = pos;
    e.current_link = pos / layout.b as i64;
    Ok(())
}

/// Flushes a dirty buffer (if any) and persists the inode, without touching the
/// open-file table itself — the façade clears the slot afterwards.
pub fn flush(dev: &mut BlockDevice, layout: &Layout, e: &mut OpenFileEntry) -> Result<()> {
    if e.modified {
        let target = e.inode.blocks[e.buffered_link as usize] as i64;
        dev.write_block(target, &e.buffer)?;
        e.modified = false;
    }
    inode::write_inode(dev, layout, e.inode_index, &e.inode)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layout::Layout;

    fn fresh(layout: &Layout) -> (BlockDevice, i64, Inode) {
        let mut dev = BlockDevice::new(layout.b, layout.n);
        bitmap::init(&mut dev, layout).unwrap();
        let first = bitmap::find_free(&dev, layout).unwrap().unwrap();
        bitmap::mark_used(&mut dev, layout, first).unwrap();
        let inode = Inode {
            length: 0,
            blocks: [first as i32, FREE, FREE],
        };
        inode::write_inode(&mut dev, layout, 1, &inode).unwrap();
        (dev, 1, inode)
    }

    #[test]
    fn write_then_read_back() {
        let layout = Layout::new(64, 64, 24);
        let (mut dev, idx, inode) = fresh(&layout);
        let mut e = OpenFileEntry::new(idx, inode, layout.b);

        write(&mut dev, &layout, &mut e, b"xyxy").unwrap();
        lseek(&layout, &mut e, 0).unwrap();
        let out = read(&mut dev, &layout, &mut e, 4).unwrap();
        assert_eq!(out, b"xyxy");
    }

    #[test]
    fn read_past_eof_fails() {
        let layout = Layout::new(64, 64, 24);
        let (mut dev, idx, inode) = fresh(&layout);
        let mut e = OpenFileEntry::new(idx, inode, layout.b);
        write(&mut dev, &layout, &mut e, b"xyxy").unwrap();
        lseek(&layout, &mut e, 0).unwrap();
        assert!(matches!(
            read(&mut dev, &layout, &mut e, 5),
            Err(Error::ReadWriteError(_))
        ));
    }

    #[test]
    fn multi_block_write_spans_blocks() {
        let layout = Layout::new(64, 64, 24);
        let (mut dev, idx, inode) = fresh(&layout);
        let mut e = OpenFileEntry::new(idx, inode, layout.b);
        let payload = vec![b'a'; 128];
        write(&mut dev, &layout, &mut e, &payload).unwrap();
        lseek(&layout, &mut e, 0).unwrap();
        let out = read(&mut dev, &layout, &mut e, 128).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn seek_to_length_then_read_one_fails() {
        let layout = Layout::new(64, 64, 24);
        let (mut dev, idx, inode) = fresh(&layout);
        let mut e = OpenFileEntry::new(idx, inode, layout.b);
        write(&mut dev, &layout, &mut e, b"abc").unwrap();
        lseek(&layout, &mut e, 3).unwrap();
        assert!(matches!(
            read(&mut dev, &layout, &mut e, 1),
            Err(Error::ReadWriteError(_))
        ));
    }

    #[test]
    fn running_out_of_free_blocks_sets_length_and_fails() {
        // A tiny device: one data block reserved for the file plus barely
        // anything else free, so the second write runs the device dry.
        let layout = Layout::new(16, 9, 1);
        let mut dev = BlockDevice::new(layout.b, layout.n);
        bitmap::init(&mut dev, &layout).unwrap();
        // Consume every data block, simulating a device with nothing left but
        // the one block already assigned to this file.
        for k in layout.data_start..layout.n {
            bitmap::mark_free(&mut dev, &layout, k as i64).unwrap();
        }
        let first = layout.data_start as i32;
        let inode = Inode {
            length: 0,
            blocks: [first, FREE, FREE],
        };
        inode::write_inode(&mut dev, &layout, 0, &inode).unwrap();
        let mut e = OpenFileEntry::new(0, inode, layout.b);

        let payload = vec![b'x'; layout.b * 2];
        let err = write(&mut dev, &layout, &mut e, &payload).unwrap_err();
        assert!(matches!(err, Error::ReadWriteError(_)));
        let persisted = inode::read_inode(&dev, &layout, 0).unwrap();
        assert_eq!(persisted.length as usize, layout.b);
    }
}
