use std::sync::Arc;

use log::debug;

use crate::bitmap::BlockBitmap;
use crate::config::*;
use crate::error::{FsError, Result};
use crate::file::{fread, fwrite};
use crate::inode::{free_inode_blocks, get_inode, write_inode, IndexBlock, Inode};
use crate::superblock::{read_superblock, write_superblock};
use crate::BlockDevice;
use crate::SuperBlock;

/// A mounted volume. The value's existence is the mount state: `mount`
/// creates it, dropping it releases every in-memory resource. Callers
/// wanting the unmounted/mounted state machine of the original API use
/// [`crate::Volume`] instead.
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    device: Arc<D>,
    superblock: SuperBlock,
    bitmap: BlockBitmap,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Lays an empty file system onto the device: superblock at block 0,
    /// zeroed inode table right after it. Leaves the volume unmounted.
    ///
    /// `inode_count` is rounded up to a whole inode block; zero is treated
    /// as one inode. Fails with `OutOfSpace` when the device cannot hold
    /// the table plus at least one data block.
    pub fn format(device: &D, inode_count: u32) -> Result<()> {
        let inode_count = inode_count.max(1);
        let num_inode_blocks =
            (inode_count + INODES_PER_BLOCK as u32 - 1) / INODES_PER_BLOCK as u32;

        let num_blocks = device.num_blocks() as u32;
        if num_inode_blocks + 1 >= num_blocks {
            return Err(FsError::OutOfSpace);
        }

        let superblock = SuperBlock::new(num_blocks, num_inode_blocks);
        write_superblock(device, &superblock)?;

        let zeros = [0u8; BLOCK_SIZE];
        for block_id in 1..=num_inode_blocks {
            device.write_block(block_id, &zeros)?;
        }

        device.sync()?;
        debug!(
            "formatted volume: {} blocks, {} inode blocks ({} inodes)",
            num_blocks,
            num_inode_blocks,
            superblock.num_inodes()
        );
        Ok(())
    }

    /// Mounts the device: validates the superblock, then rebuilds the free
    /// map by walking every block reachable from a valid inode. The device
    /// is the sole source of truth; nothing survives from previous mounts.
    pub fn mount(device: Arc<D>) -> Result<Self> {
        let superblock = read_superblock(&*device)?;
        if superblock.data_start() >= superblock.num_blocks {
            return Err(FsError::CorruptDisk);
        }

        let mut bitmap = BlockBitmap::new(&superblock);
        let mut valid_inodes = 0;

        for inode_id in 0..superblock.num_inodes() {
            let inode = get_inode(&*device, &superblock, inode_id)?;
            if !inode.valid {
                continue;
            }
            valid_inodes += 1;

            for &ptr in inode.direct.iter() {
                if ptr != 0 {
                    mark_reachable(&mut bitmap, &superblock, ptr)?;
                }
            }

            if inode.indirect != 0 {
                mark_reachable(&mut bitmap, &superblock, inode.indirect)?;
                let index = IndexBlock::read_from(&*device, inode.indirect)?;
                for &ptr in index.0.iter() {
                    if ptr != 0 {
                        mark_reachable(&mut bitmap, &superblock, ptr)?;
                    }
                }
            }

            if inode.double_indirect != 0 {
                mark_reachable(&mut bitmap, &superblock, inode.double_indirect)?;
                let outer = IndexBlock::read_from(&*device, inode.double_indirect)?;
                for &mid in outer.0.iter() {
                    if mid != 0 {
                        mark_reachable(&mut bitmap, &superblock, mid)?;
                        let inner = IndexBlock::read_from(&*device, mid)?;
                        for &ptr in inner.0.iter() {
                            if ptr != 0 {
                                mark_reachable(&mut bitmap, &superblock, ptr)?;
                            }
                        }
                    }
                }
            }
        }

        debug!(
            "mounted volume: {} valid inodes, {} free data blocks",
            valid_inodes,
            bitmap.free_blocks()
        );
        Ok(FileSystem { device, superblock, bitmap })
    }

    pub fn sync(&self) -> Result<()> {
        self.device.sync()
    }

    /// Claims the lowest-numbered free inode and returns its index.
    pub fn create(&mut self) -> Result<u32> {
        for inode_id in 0..self.superblock.num_inodes() {
            let inode = get_inode(&*self.device, &self.superblock, inode_id)?;
            if !inode.valid {
                let inode = Inode { valid: true, ..Inode::ZERO };
                write_inode(&*self.device, &self.superblock, inode_id, &inode)?;
                debug!("created inode {}", inode_id);
                return Ok(inode_id);
            }
        }
        Err(FsError::OutOfInodes)
    }

    /// Frees the file's blocks and returns the inode to the free pool.
    pub fn delete(&mut self, inode_id: u32) -> Result<()> {
        let mut inode = get_inode(&*self.device, &self.superblock, inode_id)?;
        if !inode.valid {
            return Err(FsError::InvalidInode);
        }

        free_inode_blocks(&*self.device, &mut self.bitmap, &mut inode)?;
        write_inode(&*self.device, &self.superblock, inode_id, &Inode::ZERO)?;
        debug!("deleted inode {}", inode_id);
        Ok(())
    }

    /// Size in bytes of the file at `inode_id`.
    pub fn stat(&self, inode_id: u32) -> Result<u32> {
        let inode = get_inode(&*self.device, &self.superblock, inode_id)?;
        if !inode.valid {
            return Err(FsError::InvalidInode);
        }
        Ok(inode.size)
    }

    /// Reads up to `buf.len()` bytes at `offset`. Never reads past the
    /// file size; a device failure after the first delivered byte is
    /// downgraded to the partial count.
    pub fn read(&mut self, inode_id: u32, buf: &mut [u8], offset: u32) -> Result<usize> {
        let mut inode = get_inode(&*self.device, &self.superblock, inode_id)?;
        if !inode.valid {
            return Err(FsError::InvalidInode);
        }
        fread(&*self.device, &mut self.bitmap, &mut inode, offset, buf)
    }

    /// Writes `buf` at `offset`, zero-filling the gap first when `offset`
    /// lies past the end of the file. A device failure after the first
    /// written byte is downgraded to the partial count.
    pub fn write(&mut self, inode_id: u32, buf: &[u8], offset: u32) -> Result<usize> {
        let mut inode = get_inode(&*self.device, &self.superblock, inode_id)?;
        if !inode.valid {
            return Err(FsError::InvalidInode);
        }
        fwrite(
            &*self.device,
            &self.superblock,
            &mut self.bitmap,
            inode_id,
            &mut inode,
            offset,
            buf,
        )
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn free_data_blocks(&self) -> usize {
        self.bitmap.free_blocks()
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }
}

/// A valid inode may only reference the data region; anything else means
/// the image is corrupt and the mount is aborted.
fn mark_reachable(bitmap: &mut BlockBitmap, superblock: &SuperBlock, block_id: u32) -> Result<()> {
    if !superblock.is_data_block(block_id) {
        return Err(FsError::CorruptDisk);
    }
    bitmap.mark_used(block_id);
    Ok(())
}
