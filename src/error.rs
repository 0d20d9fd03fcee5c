//! The error taxonomy shared by every layer of the file system.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while operating the emulated file system.
#[derive(Debug, Error)]
pub enum Error {
    /// A block index, inode index, or seek offset fell outside its valid bounds.
    #[error("index {0} out of range")]
    OutOfRange(i64),

    /// `write_block` was given a buffer whose length does not match the block size.
    #[error("expected a block of {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The superblock's version field does not match this implementation's `FS_VERSION`.
    #[error("superblock version mismatch: found {found}, expected {expected}")]
    VersionMismatch { expected: i32, found: i32 },

    /// No file with the given name exists, or the open-file slot is empty.
    #[error("not found: {0}")]
    NotFound(String),

    /// `create` was called with a name that is already present in the directory.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// There is no free slot in `1..M` of the open-file table.
    #[error("too many open files")]
    TooManyOpenFiles,

    /// A resource (directory slots, inodes, data blocks) is exhausted.
    #[error("no space: {0}")]
    NoSpace(&'static str),

    /// EOF reached before satisfying a read, or a write exceeded a size limit.
    #[error("{0}")]
    ReadWriteError(String),

    /// Backup/restore I/O against the host file system failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The backup container could not be decoded.
    #[error("corrupt backup file: {0}")]
    CorruptBackup(String),
}
