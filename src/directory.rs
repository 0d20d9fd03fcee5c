//! The directory: the file stored at inode 0, a packed array of 8-byte
//! name → inode-index slots.
//!
//! Every operation here is implemented on top of the same buffered
//! [`crate::oft`] machinery used for ordinary files — the directory is not a
//! special case at the storage layer, only at the façade layer that decides
//! when to consult it.

use crate::block::BlockDevice;
use crate::error::{Error, Result};
use crate::layout::{Layout, DIR_ENTRY_BYTES, NAME_BYTES};
use crate::oft::{self, OpenFileEntry};

/// One decoded directory slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; NAME_BYTES],
    pub inode_index: i32,
}

impl DirEntry {
    /// The all-zero slot, meaning "unused".
    pub fn empty() -> Self {
        Self {
            name: [0; NAME_BYTES],
            inode_index: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name == [0; NAME_BYTES]
    }

    /// Name as far as the first `0x00` byte (or all of it, if none).
    pub fn name_str(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_BYTES);
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    pub fn encode(&self) -> [u8; DIR_ENTRY_BYTES] {
        let mut buf = [0u8; DIR_ENTRY_BYTES];
        buf[..NAME_BYTES].copy_from_slice(&self.name);
        buf[NAME_BYTES..].copy_from_slice(&self.inode_index.to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Self {
        debug_assert_eq!(buf.len(), DIR_ENTRY_BYTES);
        let mut name = [0u8; NAME_BYTES];
        name.copy_from_slice(&buf[..NAME_BYTES]);
        let inode_index = i32::from_be_bytes(buf[NAME_BYTES..].try_into().unwrap());
        Self { name, inode_index }
    }
}

/// Packs `name` into the fixed-width, zero-padded name field, rejecting names
/// that do not fit.
pub fn encode_name(name: &str) -> Result<[u8; NAME_BYTES]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > NAME_BYTES || bytes.contains(&0) {
        return Err(Error::ReadWriteError(format!(
            "name {name:?} does not fit in {NAME_BYTES} bytes"
        )));
    }
    let mut out = [0u8; NAME_BYTES];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

fn slot_count(dir: &OpenFileEntry) -> i64 {
    dir.inode.length as i64 / DIR_ENTRY_BYTES as i64
}

fn read_slot(dev: &mut BlockDevice, layout: &Layout, dir: &mut OpenFileEntry, slot: i64) -> Result<DirEntry> {
    oft::lseek(layout, dir, slot * DIR_ENTRY_BYTES as i64)?;
    let bytes = oft::read(dev, layout, dir, DIR_ENTRY_BYTES as i64)?;
    Ok(DirEntry::decode(&bytes))
}

/// Scans the directory for `name`, returning its slot if present.
pub(crate) fn find_entry(dev: &mut BlockDevice, layout: &Layout, dir: &mut OpenFileEntry, name: &str) -> Result<Option<i64>> {
    Ok(find_entry_full(dev, layout, dir, name)?.map(|(slot, _)| slot))
}

/// Scans the directory for `name`, returning its `(slot, inode_index)` if present.
pub(crate) fn find_entry_full(
    dev: &mut BlockDevice,
    layout: &Layout,
    dir: &mut OpenFileEntry,
    name: &str,
) -> Result<Option<(i64, i64)>> {
    for slot in 0..slot_count(dir) {
        let entry = read_slot(dev, layout, dir, slot)?;
        if !entry.is_empty() && entry.name_str() == name {
            return Ok(Some((slot, entry.inode_index as i64)));
        }
    }
    Ok(None)
}

/// Returns the first all-zero slot, or the next slot past the end if appending
/// one would not exceed `MAX_FILE_SIZE`.
pub(crate) fn find_free_slot(dev: &mut BlockDevice, layout: &Layout, dir: &mut OpenFileEntry) -> Result<Option<i64>> {
    for slot in 0..slot_count(dir) {
        let entry = read_slot(dev, layout, dir, slot)?;
        if entry.is_empty() {
            return Ok(Some(slot));
        }
    }
    let next = slot_count(dir);
    if (next + 1) * DIR_ENTRY_BYTES as i64 <= layout.max_file_size {
        Ok(Some(next))
    } else {
        Ok(None)
    }
}

/// Writes an 8-byte record at `slot`, growing the directory if necessary.
pub(crate) fn write_entry(
    dev: &mut BlockDevice,
    layout: &Layout,
    dir: &mut OpenFileEntry,
    slot: i64,
    name: [u8; NAME_BYTES],
    inode_index: i32,
) -> Result<()> {
    let entry = DirEntry { name, inode_index };
    oft::lseek(layout, dir, slot * DIR_ENTRY_BYTES as i64)?;
    oft::write(dev, layout, dir, &entry.encode())
}

/// Zeroes the 8-byte record at `slot`.
pub(crate) fn clear_entry(dev: &mut BlockDevice, layout: &Layout, dir: &mut OpenFileEntry, slot: i64) -> Result<()> {
    oft::lseek(layout, dir, slot * DIR_ENTRY_BYTES as i64)?;
    oft::write(dev, layout, dir, &[0u8; DIR_ENTRY_BYTES])
}

/// Lists every occupied slot as `(name, inode_index)`, in slot order.
pub(crate) fn list(dev: &mut BlockDevice, layout: &Layout, dir: &mut OpenFileEntry) -> Result<Vec<(String, i32)>> {
    let mut out = Vec::new();
    for slot in 0..slot_count(dir) {
        let entry = read_slot(dev, layout, dir, slot)?;
        if !entry.is_empty() {
            out.push((entry.name_str().to_string(), entry.inode_index));
        }
    }
    Ok(out)
}
