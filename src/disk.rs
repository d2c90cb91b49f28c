//! Host-file backed block device: one file on the host acts as the virtual
//! disk, sector i living at byte range [i * 1024, (i + 1) * 1024).

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use log::debug;

use crate::config::BLOCK_SIZE;
use crate::error::Result;
use crate::BlockDevice;

#[derive(Debug)]
pub struct DiskFile {
    file: Mutex<File>,
    num_blocks: usize,
}

impl DiskFile {
    /// Opens an existing disk image. Fails if the file is missing or its
    /// length is not a whole number of sectors.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        if len == 0 || len % BLOCK_SIZE as u64 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("disk image length {} is not a multiple of {}", len, BLOCK_SIZE),
            )
            .into());
        }
        let num_blocks = (len / BLOCK_SIZE as u64) as usize;
        debug!("opened disk image {:?}: {} sectors", path.as_ref(), num_blocks);
        Ok(DiskFile { file: Mutex::new(file), num_blocks })
    }

    /// Creates (or truncates) a disk image of `num_blocks` zeroed sectors
    /// and returns it opened.
    pub fn create<P: AsRef<Path>>(path: P, num_blocks: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len((num_blocks * BLOCK_SIZE) as u64)?;
        debug!("created disk image {:?}: {} sectors", path.as_ref(), num_blocks);
        Ok(DiskFile { file: Mutex::new(file), num_blocks })
    }
}

impl BlockDevice for DiskFile {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        if block_id as usize >= self.num_blocks {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("sector {} out of range", block_id),
            )
            .into());
        }
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(block_id as u64 * BLOCK_SIZE as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&self, block_id: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        if block_id as usize >= self.num_blocks {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("sector {} out of range", block_id),
            )
            .into());
        }
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(block_id as u64 * BLOCK_SIZE as u64))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        let file = self.file.lock().unwrap();
        file.sync_all()?;
        Ok(())
    }
}
