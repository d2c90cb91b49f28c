use std::io;

use thiserror::Error;

/// Every fallible operation in the crate returns one of these. Each variant
/// other than `Io` carries a stable integer code for callers that speak the
/// on-wire convention of the original API:
///
/// | Code | Variant         |
/// |------|-----------------|
/// | -100 | NotMounted      |
/// | -101 | AlreadyMounted  |
/// | -102 | InvalidInode    |
/// | -103 | OutOfSpace      |
/// | -104 | OutOfInodes     |
/// | -105 | CorruptDisk     |
/// | -106 | InvalidOffset   |
///
/// `Io` wraps a device-level failure and keeps the adapter-defined value:
/// its code is the negated OS errno when one is available.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("disk not mounted")]
    NotMounted,
    #[error("disk already mounted")]
    AlreadyMounted,
    #[error("invalid inode (out of range or free)")]
    InvalidInode,
    #[error("no free data blocks")]
    OutOfSpace,
    #[error("no free inodes")]
    OutOfInodes,
    #[error("corrupt disk image")]
    CorruptDisk,
    #[error("offset beyond maximum file capacity")]
    InvalidOffset,
    #[error("device i/o failed: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    pub fn code(&self) -> i32 {
        match self {
            FsError::NotMounted => -100,
            FsError::AlreadyMounted => -101,
            FsError::InvalidInode => -102,
            FsError::OutOfSpace => -103,
            FsError::OutOfInodes => -104,
            FsError::CorruptDisk => -105,
            FsError::InvalidOffset => -106,
            // EIO when the OS did not hand us anything more specific.
            FsError::Io(e) => -e.raw_os_error().unwrap_or(5),
        }
    }
}

pub type Result<T> = core::result::Result<T, FsError>;
