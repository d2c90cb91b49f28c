//! The mount-state façade: one process-wide bundle of mounted file system,
//! device handle and remembered disk name, living from `mount` to
//! `unmount`. This is the level that produces the `NotMounted` and
//! `AlreadyMounted` errors.

use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::disk::DiskFile;
use crate::error::{FsError, Result};
use crate::fs::FileSystem;

#[derive(Default)]
pub struct Volume {
    mounted: Option<Mounted>,
}

struct Mounted {
    fs: FileSystem<DiskFile>,
    disk_name: String,
}

impl Volume {
    pub fn new() -> Self {
        Volume { mounted: None }
    }

    /// Formats the disk image at `path`. The image must already exist (see
    /// [`DiskFile::create`]). Refuses while a volume is mounted; leaves the
    /// volume unmounted.
    pub fn format<P: AsRef<Path>>(&self, path: P, inode_count: u32) -> Result<()> {
        if self.mounted.is_some() {
            return Err(FsError::AlreadyMounted);
        }
        let disk = DiskFile::open(&path)?;
        FileSystem::format(&disk, inode_count)
        // `disk` dropped here: the device is closed again.
    }

    /// Mounts the disk image at `path` and remembers its name until
    /// `unmount`.
    pub fn mount<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        if self.mounted.is_some() {
            return Err(FsError::AlreadyMounted);
        }
        let disk = DiskFile::open(&path)?;
        let fs = FileSystem::mount(Arc::new(disk))?;
        let disk_name = path.as_ref().to_string_lossy().into_owned();
        debug!("volume mounted from {}", disk_name);
        self.mounted = Some(Mounted { fs, disk_name });
        Ok(())
    }

    /// Syncs the device and releases all in-memory state. The state is
    /// released even when the sync fails; the sync result is returned.
    pub fn unmount(&mut self) -> Result<()> {
        let state = self.mounted.take().ok_or(FsError::NotMounted)?;
        let result = state.fs.sync();
        debug!("volume {} unmounted", state.disk_name);
        // state dropped here: bitmap, superblock and device handle go away.
        result
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    pub fn disk_name(&self) -> Option<&str> {
        self.mounted.as_ref().map(|m| m.disk_name.as_str())
    }

    pub fn create(&mut self) -> Result<u32> {
        self.fs_mut()?.create()
    }

    pub fn delete(&mut self, inode_id: u32) -> Result<()> {
        self.fs_mut()?.delete(inode_id)
    }

    pub fn stat(&self, inode_id: u32) -> Result<u32> {
        self.mounted
            .as_ref()
            .ok_or(FsError::NotMounted)?
            .fs
            .stat(inode_id)
    }

    pub fn read(&mut self, inode_id: u32, buf: &mut [u8], offset: u32) -> Result<usize> {
        self.fs_mut()?.read(inode_id, buf, offset)
    }

    pub fn write(&mut self, inode_id: u32, buf: &[u8], offset: u32) -> Result<usize> {
        self.fs_mut()?.write(inode_id, buf, offset)
    }

    fn fs_mut(&mut self) -> Result<&mut FileSystem<DiskFile>> {
        self.mounted
            .as_mut()
            .map(|m| &mut m.fs)
            .ok_or(FsError::NotMounted)
    }
}
