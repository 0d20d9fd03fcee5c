//! Whole-device backup and restore.
//!
//! The abstract contract is just "save the bytes, get the same bytes back" —
//! this module's concrete choice is a `serde`-derived container holding the
//! block size, block count, and the raw device bytes, serialized with
//! `bincode` into a single opaque file.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::block::BlockDevice;
use crate::error::{Error, Result};

#[derive(Serialize, Deserialize)]
struct BackupImage {
    b: i32,
    n: i32,
    bytes: Vec<u8>,
}

/// Writes the entire device to `path`.
pub fn save(dev: &BlockDevice, path: &Path) -> Result<()> {
    let image = BackupImage {
        b: dev.block_size() as i32,
        n: dev.block_count() as i32,
        bytes: dev.raw_bytes().to_vec(),
    };
    let file = File::create(path)?;
    bincode::serialize_into(BufWriter::new(file), &image)
        .map_err(|e| Error::CorruptBackup(e.to_string()))?;
    log::debug!("backup: saved device ({} bytes) to {}", image.bytes.len(), path.display());
    Ok(())
}

/// Reads a device previously written by [`save`].
pub fn restore(path: &Path) -> Result<BlockDevice> {
    let file = File::open(path)?;
    let image: BackupImage = bincode::deserialize_from(BufReader::new(file))
        .map_err(|e| Error::CorruptBackup(e.to_string()))?;
    let (b, n) = (image.b as usize, image.n as usize);
    if image.bytes.len() != b * n {
        return Err(Error::CorruptBackup(format!(
            "expected {} bytes for {n} blocks of {b}, found {}",
            b * n,
            image.bytes.len()
        )));
    }
    log::debug!("backup: restored device ({} bytes) from {}", image.bytes.len(), path.display());
    Ok(BlockDevice::from_raw(b, n, image.bytes))
}
