use crate::config::BLOCK_SIZE;
use crate::error::Result;

/// Contract over a sector-addressable device. Sector size is fixed at
/// [`BLOCK_SIZE`]; the block ID is the sector index on the device.
///
/// Opening a device is the implementor's constructor; closing is `Drop`.
/// On a failed read or write no buffer content is guaranteed.
pub trait BlockDevice: Send + Sync {
    /// Returns the number of sectors on the device.
    fn num_blocks(&self) -> usize;

    /// Reads one sector into `buf`.
    fn read_block(&self, block_id: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()>;

    /// Writes one sector from `buf`.
    fn write_block(&self, block_id: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()>;

    /// Pushes any buffered writes down to persistent storage.
    fn sync(&self) -> Result<()>;
}
