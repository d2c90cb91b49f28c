//! File data transfer: block-by-block read and write with the zero-fill
//! gap rule and downgrade-to-partial-count failure semantics.

use log::warn;

use crate::bitmap::BlockBitmap;
use crate::config::BLOCK_SIZE;
use crate::error::Result;
use crate::inode::{bmap, write_inode, Inode};
use crate::BlockDevice;
use crate::SuperBlock;

/// Reads up to `buffer.len()` bytes starting at `offset` into `buffer`.
///
/// Never reads past the file size. A device failure after at least one byte
/// has been delivered is downgraded to the partial count; before any byte,
/// it is surfaced. A hole in the block map stops the transfer with the
/// bytes delivered so far.
pub fn fread<D: BlockDevice>(
    device: &D,
    bitmap: &mut BlockBitmap,
    inode: &mut Inode,
    offset: u32,
    buffer: &mut [u8],
) -> Result<usize> {
    if offset >= inode.size {
        return Ok(0);
    }
    let bytes_to_read = buffer.len().min((inode.size - offset) as usize);

    let mut bytes_read = 0;
    let mut current_offset = offset;

    while bytes_read < bytes_to_read {
        let block_offset = current_offset as usize % BLOCK_SIZE;
        let block_id = match bmap(device, bitmap, inode, current_offset, false) {
            Ok(0) => break, // hole
            Ok(block_id) => block_id,
            Err(e) => {
                if bytes_read > 0 {
                    return Ok(bytes_read);
                }
                return Err(e);
            }
        };

        let mut block = [0u8; BLOCK_SIZE];
        if let Err(e) = device.read_block(block_id, &mut block) {
            if bytes_read > 0 {
                return Ok(bytes_read);
            }
            return Err(e);
        }

        let bytes_to_copy = (BLOCK_SIZE - block_offset).min(bytes_to_read - bytes_read);
        buffer[bytes_read..bytes_read + bytes_to_copy]
            .copy_from_slice(&block[block_offset..block_offset + bytes_to_copy]);

        bytes_read += bytes_to_copy;
        current_offset += bytes_to_copy as u32;
    }

    Ok(bytes_read)
}

/// Best-effort inode persist on a path that already moved data; the data
/// outcome is reported to the caller either way.
fn persist_inode<D: BlockDevice>(
    device: &D,
    superblock: &SuperBlock,
    inode_id: u32,
    inode: &Inode,
) {
    if let Err(e) = write_inode(device, superblock, inode_id, inode) {
        warn!("inode {} not persisted after partial transfer: {}", inode_id, e);
    }
}

/// Writes `buffer` at `offset`, extending the file with zeros first when
/// `offset` lies past the current size.
///
/// Returns the bytes written; a device failure after the first byte is
/// downgraded to the partial count. On every early-out the inode's `size`
/// is moved monotonically to the furthest byte successfully touched and
/// persisted, so a later mount scans a consistent file.
pub fn fwrite<D: BlockDevice>(
    device: &D,
    superblock: &SuperBlock,
    bitmap: &mut BlockBitmap,
    inode_id: u32,
    inode: &mut Inode,
    offset: u32,
    buffer: &[u8],
) -> Result<usize> {
    if buffer.is_empty() {
        return Ok(0);
    }

    // Phase one: zero-fill the gap between the old size and `offset`.
    if offset > inode.size {
        let zeros = [0u8; BLOCK_SIZE];
        let mut current_offset = inode.size;

        while current_offset < offset {
            let block_offset = current_offset as usize % BLOCK_SIZE;
            let bytes_to_fill = (BLOCK_SIZE - block_offset).min((offset - current_offset) as usize);

            let block_id = match bmap(device, bitmap, inode, current_offset, true) {
                Ok(block_id) => block_id,
                Err(e) => {
                    inode.size = inode.size.max(current_offset);
                    persist_inode(device, superblock, inode_id, inode);
                    return Err(e);
                }
            };

            let result = if block_offset > 0 || bytes_to_fill < BLOCK_SIZE {
                // Only part of the block belongs to the gap.
                let mut block = [0u8; BLOCK_SIZE];
                match device.read_block(block_id, &mut block) {
                    Ok(()) => {
                        block[block_offset..block_offset + bytes_to_fill].fill(0);
                        device.write_block(block_id, &block)
                    }
                    Err(e) => Err(e),
                }
            } else {
                device.write_block(block_id, &zeros)
            };

            if let Err(e) = result {
                inode.size = inode.size.max(current_offset);
                persist_inode(device, superblock, inode_id, inode);
                return Err(e);
            }

            current_offset += bytes_to_fill as u32;
        }

        inode.size = offset;
    }

    // Phase two: the payload itself.
    let mut bytes_written = 0;
    let mut current_offset = offset;

    while bytes_written < buffer.len() {
        let block_offset = current_offset as usize % BLOCK_SIZE;
        let bytes_to_write = (BLOCK_SIZE - block_offset).min(buffer.len() - bytes_written);

        let step = (|| {
            let block_id = bmap(device, bitmap, inode, current_offset, true)?;
            let mut block = [0u8; BLOCK_SIZE];
            if block_offset > 0 || bytes_to_write < BLOCK_SIZE {
                device.read_block(block_id, &mut block)?;
            }
            block[block_offset..block_offset + bytes_to_write]
                .copy_from_slice(&buffer[bytes_written..bytes_written + bytes_to_write]);
            device.write_block(block_id, &block)
        })();

        if let Err(e) = step {
            inode.size = inode.size.max(current_offset);
            persist_inode(device, superblock, inode_id, inode);
            if bytes_written > 0 {
                warn!(
                    "write on inode {} downgraded to partial count {} at offset {}: {}",
                    inode_id, bytes_written, current_offset, e
                );
                return Ok(bytes_written);
            }
            return Err(e);
        }

        bytes_written += bytes_to_write;
        current_offset += bytes_to_write as u32;
    }

    // Pointer fields may have changed even when the size did not, so the
    // inode is persisted unconditionally.
    inode.size = inode.size.max(current_offset);
    if let Err(e) = write_inode(device, superblock, inode_id, inode) {
        warn!("inode {} not persisted after write: {}", inode_id, e);
    }

    Ok(bytes_written)
}
