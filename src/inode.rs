//! Inode records, the inode-table I/O, and the block map that turns a byte
//! offset inside a file into a physical block number.

use crate::bitmap::BlockBitmap;
use crate::config::*;
use crate::error::{FsError, Result};
use crate::BlockDevice;
use crate::SuperBlock;

/// One 32-byte inode record. Block number 0 is the superblock and doubles
/// as the null pointer in every slot.
///
/// On-disk layout, little-endian scalars:
/// byte 0 valid, bytes 1-3 zero padding, bytes 4-7 size,
/// bytes 8-23 four direct pointers, bytes 24-27 indirect,
/// bytes 28-31 double indirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    pub valid: bool,
    pub size: u32,
    pub direct: [u32; NUM_DIRECT_PTRS],
    pub indirect: u32,
    pub double_indirect: u32,
}

impl Inode {
    pub const ZERO: Self = Self {
        valid: false,
        size: 0,
        direct: [0; NUM_DIRECT_PTRS],
        indirect: 0,
        double_indirect: 0,
    };

    pub fn encode(&self, window: &mut [u8]) {
        debug_assert_eq!(window.len(), INODE_SIZE);
        window.fill(0);
        window[0] = self.valid as u8;
        window[4..8].copy_from_slice(&self.size.to_le_bytes());
        for (i, ptr) in self.direct.iter().enumerate() {
            window[8 + i * 4..12 + i * 4].copy_from_slice(&ptr.to_le_bytes());
        }
        window[24..28].copy_from_slice(&self.indirect.to_le_bytes());
        window[28..32].copy_from_slice(&self.double_indirect.to_le_bytes());
    }

    pub fn decode(window: &[u8]) -> Self {
        debug_assert_eq!(window.len(), INODE_SIZE);
        let mut direct = [0u32; NUM_DIRECT_PTRS];
        for (i, ptr) in direct.iter_mut().enumerate() {
            *ptr = u32::from_le_bytes(window[8 + i * 4..12 + i * 4].try_into().unwrap());
        }
        Inode {
            valid: window[0] != 0,
            size: u32::from_le_bytes(window[4..8].try_into().unwrap()),
            direct,
            indirect: u32::from_le_bytes(window[24..28].try_into().unwrap()),
            double_indirect: u32::from_le_bytes(window[28..32].try_into().unwrap()),
        }
    }
}

fn inode_location(superblock: &SuperBlock, inode_id: u32) -> Result<(u32, usize)> {
    if inode_id >= superblock.num_inodes() {
        return Err(FsError::InvalidInode);
    }
    let block_id = 1 + inode_id / INODES_PER_BLOCK as u32;
    let offset = (inode_id as usize % INODES_PER_BLOCK) * INODE_SIZE;
    Ok((block_id, offset))
}

/// Reads the inode record at `inode_id` out of the inode table.
pub fn get_inode<D: BlockDevice>(
    device: &D,
    superblock: &SuperBlock,
    inode_id: u32,
) -> Result<Inode> {
    let (block_id, offset) = inode_location(superblock, inode_id)?;
    let mut buf = [0u8; BLOCK_SIZE];
    device.read_block(block_id, &mut buf)?;
    Ok(Inode::decode(&buf[offset..offset + INODE_SIZE]))
}

/// Writes the inode record at `inode_id`, leaving the other 31 records of
/// its block untouched. Always a read-modify-write of the whole block.
pub fn write_inode<D: BlockDevice>(
    device: &D,
    superblock: &SuperBlock,
    inode_id: u32,
    inode: &Inode,
) -> Result<()> {
    let (block_id, offset) = inode_location(superblock, inode_id)?;
    let mut buf = [0u8; BLOCK_SIZE];
    device.read_block(block_id, &mut buf)?;
    inode.encode(&mut buf[offset..offset + INODE_SIZE]);
    device.write_block(block_id, &buf)?;
    Ok(())
}

/// A data block interpreted as 256 little-endian 32-bit block numbers.
/// Zero means "no block".
pub(crate) struct IndexBlock(pub(crate) [u32; PTRS_PER_BLOCK]);

impl IndexBlock {
    pub(crate) fn read_from<D: BlockDevice>(device: &D, block_id: u32) -> Result<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        device.read_block(block_id, &mut buf)?;
        let mut ptrs = [0u32; PTRS_PER_BLOCK];
        for (i, ptr) in ptrs.iter_mut().enumerate() {
            *ptr = u32::from_le_bytes(buf[i * 4..i * 4 + 4].try_into().unwrap());
        }
        Ok(IndexBlock(ptrs))
    }

    pub(crate) fn write_to<D: BlockDevice>(&self, device: &D, block_id: u32) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        for (i, ptr) in self.0.iter().enumerate() {
            buf[i * 4..i * 4 + 4].copy_from_slice(&ptr.to_le_bytes());
        }
        device.write_block(block_id, &buf)?;
        Ok(())
    }
}

/// Claims a free data block and zero-fills it on disk before handing it
/// out. If the zero-fill write fails the block goes straight back to the
/// bitmap.
fn alloc_zeroed<D: BlockDevice>(device: &D, bitmap: &mut BlockBitmap) -> Result<u32> {
    let block_id = bitmap.alloc()?;
    let zeros = [0u8; BLOCK_SIZE];
    if let Err(e) = device.write_block(block_id, &zeros) {
        bitmap.free(block_id);
        return Err(e);
    }
    Ok(block_id)
}

/// Block map: resolves the data block holding byte `offset` of the file.
///
/// With `allocate` false, a zero anywhere along the path short-circuits to
/// `Ok(0)` — the caller reads the hole as zeros or stops. With `allocate`
/// true, missing intermediate index blocks and the leaf are allocated
/// top-down, each zero-filled before any pointer to it is written. Pointer
/// fields of `inode` are only updated in memory; persisting the inode is
/// the caller's job.
pub fn bmap<D: BlockDevice>(
    device: &D,
    bitmap: &mut BlockBitmap,
    inode: &mut Inode,
    offset: u32,
    allocate: bool,
) -> Result<u32> {
    let lbi = offset as usize / BLOCK_SIZE;

    if lbi < NUM_DIRECT_PTRS {
        if inode.direct[lbi] == 0 && allocate {
            inode.direct[lbi] = alloc_zeroed(device, bitmap)?;
        }
        return Ok(inode.direct[lbi]);
    }

    let lbi = lbi - NUM_DIRECT_PTRS;
    if lbi < PTRS_PER_BLOCK {
        if inode.indirect == 0 {
            if !allocate {
                return Ok(0);
            }
            inode.indirect = alloc_zeroed(device, bitmap)?;
        }

        let mut index = IndexBlock::read_from(device, inode.indirect)?;
        if index.0[lbi] == 0 && allocate {
            let leaf = alloc_zeroed(device, bitmap)?;
            index.0[lbi] = leaf;
            if let Err(e) = index.write_to(device, inode.indirect) {
                bitmap.free(leaf);
                return Err(e);
            }
        }
        return Ok(index.0[lbi]);
    }

    let lbi = lbi - PTRS_PER_BLOCK;
    if lbi < PTRS_PER_BLOCK * PTRS_PER_BLOCK {
        if inode.double_indirect == 0 {
            if !allocate {
                return Ok(0);
            }
            inode.double_indirect = alloc_zeroed(device, bitmap)?;
        }

        let mut outer = IndexBlock::read_from(device, inode.double_indirect)?;
        let outer_slot = lbi / PTRS_PER_BLOCK;
        let inner_slot = lbi % PTRS_PER_BLOCK;

        if outer.0[outer_slot] == 0 {
            if !allocate {
                return Ok(0);
            }
            let mid = alloc_zeroed(device, bitmap)?;
            outer.0[outer_slot] = mid;
            if let Err(e) = outer.write_to(device, inode.double_indirect) {
                bitmap.free(mid);
                return Err(e);
            }
        }

        let mut inner = IndexBlock::read_from(device, outer.0[outer_slot])?;
        if inner.0[inner_slot] == 0 && allocate {
            let leaf = alloc_zeroed(device, bitmap)?;
            inner.0[inner_slot] = leaf;
            if let Err(e) = inner.write_to(device, outer.0[outer_slot]) {
                bitmap.free(leaf);
                return Err(e);
            }
        }
        return Ok(inner.0[inner_slot]);
    }

    Err(FsError::InvalidOffset)
}

/// Returns every block of an inode to the free map: data blocks first, then
/// the index blocks that referenced them. Clears the pointer fields of the
/// in-memory inode as it goes.
pub fn free_inode_blocks<D: BlockDevice>(
    device: &D,
    bitmap: &mut BlockBitmap,
    inode: &mut Inode,
) -> Result<()> {
    for ptr in inode.direct.iter_mut() {
        if *ptr != 0 {
            bitmap.free(*ptr);
            *ptr = 0;
        }
    }

    if inode.indirect != 0 {
        let index = IndexBlock::read_from(device, inode.indirect)?;
        for &ptr in index.0.iter() {
            if ptr != 0 {
                bitmap.free(ptr);
            }
        }
        bitmap.free(inode.indirect);
        inode.indirect = 0;
    }

    if inode.double_indirect != 0 {
        let outer = IndexBlock::read_from(device, inode.double_indirect)?;
        for &mid in outer.0.iter() {
            if mid != 0 {
                let inner = IndexBlock::read_from(device, mid)?;
                for &ptr in inner.0.iter() {
                    if ptr != 0 {
                        bitmap.free(ptr);
                    }
                }
                bitmap.free(mid);
            }
        }
        bitmap.free(inode.double_indirect);
        inode.double_indirect = 0;
    }

    Ok(())
}
