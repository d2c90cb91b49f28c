//! SSFS is a tiny single-volume file system that lives inside one host file
//! acting as a virtual disk of fixed 1024-byte sectors. Files are identified
//! by inode number alone; there are no directories, names, permissions or
//! timestamps.
//!
//! SSFS's linear layout:
//! - Superblock (block 0)
//! - Inode table (blocks 1..=num_inode_blocks)
//! - Data blocks (everything after the inode table)
//!
//! SSFS's layers (from bottom to top):
//! 1. Block Device: abstraction for sector-addressable storage.   | User implemented (DiskFile provided)
//! 2. Superblock: volume header codec and validation.             | Fs implemented
//! 3. Inode table: 32-byte records, read-modify-write in place.   | Fs implemented
//! 4. Block bitmap: in-memory free map, rebuilt at mount.         | Fs implemented
//! 5. Block map: logical offset -> physical block, on-demand.     | Fs implemented
//! 6. File ops: create/delete/stat/read/write.                    | Fs implemented
//! 7. Volume: mount state and the remembered disk name.           | User facing

mod config;
mod error;
mod block_dev;
mod disk;
mod superblock;
mod bitmap;
mod inode;
mod file;
mod fs;
mod volume;

pub use block_dev::BlockDevice;
pub use config::*;
pub use disk::DiskFile;
pub use superblock::*;
pub use bitmap::BlockBitmap;
pub use inode::*;
pub use fs::FileSystem;
pub use volume::Volume;
pub use error::FsError;
pub use error::FsError as Error;
pub use error::Result;
