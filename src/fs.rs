//! The `FileSystem` façade: the only thing a caller talks to.
//!
//! It owns the device, computes the layout once at mount time, and
//! orchestrates the bitmap/inode-table/directory/open-file-table updates that
//! `create`, `destroy`, `open`, `close`, `read`, `write`, `lseek`, and
//! `directory` each require. None of the layers underneath know about each
//! other; this module is where they meet.

use crate::bitmap;
use crate::block::BlockDevice;
use crate::directory;
use crate::error::{Error, Result};
use crate::inode::{self, Inode};
use crate::layout::{Layout, FREE, FS_VERSION};
use crate::oft::{self, OpenFileEntry};
use crate::superblock::Superblock;

/// A mounted file system: a device plus the open-file table driving it.
pub struct FileSystem {
    dev: BlockDevice,
    layout: Layout,
    m: usize,
    /// `table[0]` is always `Some`, holding the directory. `table[1..=m]` are
    /// user slots, `None` when free.
    table: Vec<Option<OpenFileEntry>>,
}

impl FileSystem {
    /// Formats a brand-new device of block size `b`, `n` blocks, `i` inodes,
    /// and an open-file table sized for `m` simultaneously open user files.
    pub fn init(b: usize, n: usize, i: usize, m: usize) -> Result<Self> {
        let layout = Layout::new(b, n, i);
        let mut dev = BlockDevice::new(b, n);

        Superblock {
            version: FS_VERSION,
            b: b as i32,
            n: n as i32,
            i: i as i32,
        }
        .write(&mut dev)?;

        bitmap::init(&mut dev, &layout)?;

        for k in 0..i {
            inode::write_inode(&mut dev, &layout, k as i64, &Inode::free())?;
        }
        // Inode 0 is always the directory: allocated, empty, no data block yet.
        let dir_inode = Inode {
            length: 0,
            blocks: [FREE; 3],
        };
        inode::write_inode(&mut dev, &layout, 0, &dir_inode)?;

        log::debug!("fs: formatted device b={b} n={n} i={i} m={m}");
        Self::mount(dev, layout, m)
    }

    /// Mounts an already-initialized device, reading its superblock and
    /// rejecting a version mismatch. `m` is supplied by the caller, since it
    /// is never stored on the device itself.
    pub fn restore(dev: BlockDevice, m: usize) -> Result<Self> {
        let sb = Superblock::read_checked(&dev)?;
        let layout = Layout::new(sb.b as usize, sb.n as usize, sb.i as usize);
        Self::mount(dev, layout, m)
    }

    fn mount(dev: BlockDevice, layout: Layout, m: usize) -> Result<Self> {
        let mut fs = Self {
            dev,
            layout,
            m,
            table: Vec::new(),
        };
        let dir_inode = inode::read_inode(&fs.dev, &fs.layout, 0)?;
        let mut table = vec![None; m + 1];
        table[0] = Some(OpenFileEntry::new(0, dir_inode, fs.layout.b));
        fs.table = table;
        Ok(fs)
    }

    /// Creates an empty file named `name`.
    pub fn create(&mut self, name: &str) -> Result<()> {
        let name_bytes = directory::encode_name(name)?;

        if directory::find_entry(&mut self.dev, &self.layout, dir_entry(&mut self.table), name)?.is_some() {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        let dir_slot = directory::find_free_slot(&mut self.dev, &self.layout, dir_entry(&mut self.table))?
            .ok_or(Error::NoSpace("directory"))?;
        let inode_idx = (0..self.layout.i as i64)
            .find(|&k| {
                inode::read_inode(&self.dev, &self.layout, k)
                    .map(|inode| !inode.is_allocated())
                    .unwrap_or(false)
            })
            .ok_or(Error::NoSpace("inodes"))?;
        let data_block = bitmap::find_free(&self.dev, &self.layout)?.ok_or(Error::NoSpace("blocks"))?;

        let inode = Inode {
            length: 0,
            blocks: [data_block as i32, FREE, FREE],
        };
        bitmap::mark_used(&mut self.dev, &self.layout, data_block)?;
        inode::write_inode(&mut self.dev, &self.layout, inode_idx, &inode)?;
        directory::write_entry(
            &mut self.dev,
            &self.layout,
            dir_entry(&mut self.table),
            dir_slot,
            name_bytes,
            inode_idx as i32,
        )?;
        log::debug!("fs: created {name:?} -> inode {inode_idx}, first block {data_block}");
        Ok(())
    }

    /// Removes `name`, closing it first if it is open, and reclaiming its
    /// inode and data blocks.
    pub fn destroy(&mut self, name: &str) -> Result<()> {
        let (slot, inode_idx) =
            directory::find_entry_full(&mut self.dev, &self.layout, dir_entry(&mut self.table), name)?
                .ok_or_else(|| Error::NotFound(name.to_string()))?;

        let inode = inode::read_inode(&self.dev, &self.layout, inode_idx)?;
        let used_blocks: Vec<i64> = inode
            .blocks
            .iter()
            .copied()
            .take_while(|&b| b != FREE)
            .map(|b| b as i64)
            .collect();

        if let Some(open_slot) = self.find_open_slot(inode_idx) {
            self.close(open_slot)?;
        }

        directory::clear_entry(&mut self.dev, &self.layout, dir_entry(&mut self.table), slot)?;
        inode::write_inode(&mut self.dev, &self.layout, inode_idx, &Inode::free())?;
        for block in used_blocks {
            bitmap::mark_free(&mut self.dev, &self.layout, block)?;
        }
        log::debug!("fs: destroyed {name:?} (inode {inode_idx})");
        Ok(())
    }

    fn find_open_slot(&self, inode_idx: i64) -> Option<i64> {
        self.table
            .iter()
            .enumerate()
            .skip(1)
            .find_map(|(slot, entry)| match entry {
                Some(e) if e.inode_index == inode_idx => Some(slot as i64),
                _ => None,
            })
    }

    /// Opens `name`, returning the open-file-table slot it was assigned.
    pub fn open(&mut self, name: &str) -> Result<i64> {
        let (_, inode_idx) =
            directory::find_entry_full(&mut self.dev, &self.layout, dir_entry(&mut self.table), name)?
                .ok_or_else(|| Error::NotFound(name.to_string()))?;

        let slot = (1..=self.m as i64)
            .find(|&s| self.table[s as usize].is_none())
            .ok_or(Error::TooManyOpenFiles)?;

        let inode = inode::read_inode(&self.dev, &self.layout, inode_idx)?;
        self.table[slot as usize] = Some(OpenFileEntry::new(inode_idx, inode, self.layout.b));
        log::debug!("fs: opened {name:?} (inode {inode_idx}) as slot {slot}");
        Ok(slot)
    }

    /// Flushes and closes the file open at `slot`.
    pub fn close(&mut self, slot: i64) -> Result<()> {
        self.check_user_slot(slot)?;
        let mut entry = self.table[slot as usize].take().ok_or(Error::NotFound(format!("slot {slot}")))?;
        oft::flush(&mut self.dev, &self.layout, &mut entry)?;
        Ok(())
    }

    /// Reads `count` bytes from `slot`, advancing its cursor.
    pub fn read(&mut self, slot: i64, count: i64) -> Result<Vec<u8>> {
        self.check_user_slot(slot)?;
        let entry = user_entry(&mut self.table, slot)?;
        oft::read(&mut self.dev, &self.layout, entry, count)
    }

    /// Writes `src` at `slot`'s cursor, advancing it. Rejects writes that
    /// would push the file past `MAX_FILE_SIZE` before mutating anything.
    pub fn write(&mut self, slot: i64, src: &[u8]) -> Result<()> {
        self.check_user_slot(slot)?;
        let max_file_size = self.layout.max_file_size;
        let entry = user_entry(&mut self.table, slot)?;
        if entry.position + src.len() as i64 > max_file_size {
            return Err(Error::ReadWriteError("max file size".to_string()));
        }
        oft::write(&mut self.dev, &self.layout, entry, src)
    }

    /// Moves `slot`'s cursor to `pos`.
    pub fn lseek(&mut self, slot: i64, pos: i64) -> Result<()> {
        self.check_user_slot(slot)?;
        let layout = self.layout;
        let entry = user_entry(&mut self.table, slot)?;
        oft::lseek(&layout, entry, pos)
    }

    /// Lists every file as `(name, length)`, in directory order.
    pub fn directory(&mut self) -> Result<Vec<(String, i64)>> {
        let entries = directory::list(&mut self.dev, &self.layout, dir_entry(&mut self.table))?;
        entries
            .into_iter()
            .map(|(name, idx)| {
                let length = inode::read_inode(&self.dev, &self.layout, idx as i64)?.length as i64;
                Ok((name, length))
            })
            .collect()
    }

    /// Persists the whole device to `path`. See [`crate::backup`].
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        crate::backup::save(&self.dev, path)
    }

    /// Restores a device previously saved with [`FileSystem::save_to_file`]
    /// and mounts it with open-file-table size `m`.
    pub fn restore_from_file(path: &std::path::Path, m: usize) -> Result<Self> {
        let dev = crate::backup::restore(path)?;
        Self::restore(dev, m)
    }

    fn check_user_slot(&self, slot: i64) -> Result<()> {
        if slot < 1 || slot as usize > self.m {
            return Err(Error::NotFound(format!("slot {slot}")));
        }
        Ok(())
    }
}

/// Borrows slot 0 (the directory) out of the open-file table.
///
/// A free function rather than a `&mut self` method: call sites need this
/// borrow alongside a simultaneous borrow of `self.dev`/`self.layout`, and the
/// borrow checker only splits disjoint fields through direct field
/// projections, not through another method call on `self`.
fn dir_entry(table: &mut [Option<OpenFileEntry>]) -> &mut OpenFileEntry {
    table[0].as_mut().expect("slot 0 always holds the directory")
}

/// Borrows the open-file-table slot for an already-validated user `slot`.
/// Callers must check [`FileSystem::check_user_slot`] first; this only does
/// the presence check, same disjoint-field reasoning as [`dir_entry`].
fn user_entry(table: &mut [Option<OpenFileEntry>], slot: i64) -> Result<&mut OpenFileEntry> {
    table[slot as usize]
        .as_mut()
        .ok_or(Error::NotFound(format!("slot {slot}")))
}
