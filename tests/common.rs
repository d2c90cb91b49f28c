//! Common utilities for tests
#![allow(unused)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ssfs::*;

#[derive(Debug)]
pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
    num_blocks: usize,
}

impl RamDisk {
    /// Creates a new RamDisk with the specified number of blocks.
    /// Each block is BLOCK_SIZE bytes.
    pub fn new(num_blocks: usize) -> Self {
        let size = num_blocks * BLOCK_SIZE;
        RamDisk {
            inner: Arc::new(Mutex::new(vec![0u8; size])),
            num_blocks,
        }
    }
}

impl BlockDevice for RamDisk {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        if block_id >= self.num_blocks as u32 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "sector out of range").into());
        }
        let start = block_id as usize * BLOCK_SIZE;
        let data = self.inner.lock().unwrap();
        buf.copy_from_slice(&data[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&self, block_id: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        if block_id >= self.num_blocks as u32 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "sector out of range").into());
        }
        let start = block_id as usize * BLOCK_SIZE;
        let mut data = self.inner.lock().unwrap();
        data[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        // Data already lives in memory.
        Ok(())
    }
}

/// Wraps a device and injects sector failures: after the programmed number
/// of reads or writes has gone through, every further one fails.
pub struct FlakyDisk {
    inner: RamDisk,
    reads_left: AtomicUsize,
    writes_left: AtomicUsize,
    bad_read_sector: AtomicU32,
    bad_write_sector: AtomicU32,
    fail_sync: AtomicBool,
}

const NO_SECTOR: u32 = u32::MAX;

impl FlakyDisk {
    pub fn new(inner: RamDisk) -> Self {
        FlakyDisk {
            inner,
            reads_left: AtomicUsize::new(usize::MAX),
            writes_left: AtomicUsize::new(usize::MAX),
            bad_read_sector: AtomicU32::new(NO_SECTOR),
            bad_write_sector: AtomicU32::new(NO_SECTOR),
            fail_sync: AtomicBool::new(false),
        }
    }

    /// The next `n` reads succeed, everything after fails.
    pub fn fail_reads_after(&self, n: usize) {
        self.reads_left.store(n, Ordering::SeqCst);
    }

    /// The next `n` writes succeed, everything after fails.
    pub fn fail_writes_after(&self, n: usize) {
        self.writes_left.store(n, Ordering::SeqCst);
    }

    /// Every read of one specific sector fails.
    pub fn fail_reads_of(&self, block_id: u32) {
        self.bad_read_sector.store(block_id, Ordering::SeqCst);
    }

    /// Every write of one specific sector fails.
    pub fn fail_writes_of(&self, block_id: u32) {
        self.bad_write_sector.store(block_id, Ordering::SeqCst);
    }

    pub fn fail_sync(&self, fail: bool) {
        self.fail_sync.store(fail, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.reads_left.store(usize::MAX, Ordering::SeqCst);
        self.writes_left.store(usize::MAX, Ordering::SeqCst);
        self.bad_read_sector.store(NO_SECTOR, Ordering::SeqCst);
        self.bad_write_sector.store(NO_SECTOR, Ordering::SeqCst);
        self.fail_sync.store(false, Ordering::SeqCst);
    }

    fn consume(counter: &AtomicUsize) -> Result<()> {
        let left = counter.load(Ordering::SeqCst);
        if left == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "injected sector fault").into());
        }
        if left != usize::MAX {
            counter.store(left - 1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl BlockDevice for FlakyDisk {
    fn num_blocks(&self) -> usize {
        self.inner.num_blocks()
    }

    fn read_block(&self, block_id: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        if self.bad_read_sector.load(Ordering::SeqCst) == block_id {
            return Err(io::Error::new(io::ErrorKind::Other, "injected sector fault").into());
        }
        Self::consume(&self.reads_left)?;
        self.inner.read_block(block_id, buf)
    }

    fn write_block(&self, block_id: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        if self.bad_write_sector.load(Ordering::SeqCst) == block_id {
            return Err(io::Error::new(io::ErrorKind::Other, "injected sector fault").into());
        }
        Self::consume(&self.writes_left)?;
        self.inner.write_block(block_id, buf)
    }

    fn sync(&self) -> Result<()> {
        if self.fail_sync.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected sync fault").into());
        }
        self.inner.sync()
    }
}

/// Formats a fresh RamDisk volume and mounts it.
pub fn fresh_fs(num_blocks: usize, inode_count: u32) -> FileSystem<RamDisk> {
    let disk = RamDisk::new(num_blocks);
    FileSystem::format(&disk, inode_count).unwrap();
    FileSystem::mount(Arc::new(disk)).unwrap()
}

/// Deterministic pseudo-random payload for round-trip checks.
pub fn pattern(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2654435761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            (state >> 16) as u8
        })
        .collect()
}
