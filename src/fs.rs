//! High-level file and directory operations composed over the block
//! device, FAT manager, and directory primitives.

use std::path::Path;

use log::{info, warn};

use crate::device::{BlockDevice, Superblock};
use crate::directory::Directory;
use crate::entry::{normalize, Attr, DirEntry};
use crate::error::{Error, Result};
use crate::fat::FatManager;
use crate::layout::{CLUSTER_SIZE, FREE_CLUSTER, ROOT_DIR_CLUSTER};

/// The mounted file system: owns the block device and the FAT mirror, and
/// tracks a "current directory" cursor for callers that don't pass an
/// explicit parent cluster.
pub struct FileSystem {
    device: BlockDevice,
    fat: FatManager,
    current_dir: usize,
}

impl FileSystem {
    /// Opens (or creates) the image at `path`. A fresh image — detected by
    /// the root directory cluster being unallocated — is formatted before
    /// use.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut device = BlockDevice::initialize(path)?;
        let mut fat = FatManager::new();
        fat.load(&mut device)?;

        if fat.get(ROOT_DIR_CLUSTER)? == FREE_CLUSTER {
            info!("fresh image detected, formatting");
            for i in 0..=ROOT_DIR_CLUSTER {
                fat.set(i, crate::layout::END_OF_CHAIN)?;
            }
            fat.write(&mut device)?;
        }

        Ok(Self {
            device,
            fat,
            current_dir: ROOT_DIR_CLUSTER,
        })
    }

    fn dir(&mut self) -> Directory<'_> {
        Directory::new(&mut self.device, &mut self.fat)
    }

    fn parent_or_current(&self, parent: Option<usize>) -> usize {
        parent.unwrap_or(self.current_dir)
    }

    /// The cluster of the current-directory cursor.
    pub fn current_dir(&self) -> usize {
        self.current_dir
    }

    /// Moves the cursor to `target`, which must be the root or the first
    /// cluster of a live directory entry within the current directory.
    pub fn change_dir(&mut self, target: usize) -> Result<()> {
        if target == ROOT_DIR_CLUSTER {
            self.current_dir = target;
            return Ok(());
        }

        let entries = self.dir().read(self.current_dir)?;
        let is_live_dir = entries
            .iter()
            .any(|e| e.attr == Attr::DIR && e.first_cluster as usize == target);

        if !is_live_dir {
            return Err(Error::NotADirectory {
                name: format!("cluster {target}"),
            });
        }

        self.current_dir = target;
        Ok(())
    }

    /// Looks up an entry by name within `parent` without requiring it to
    /// exist.
    pub fn lookup(&mut self, parent: usize, name: &str) -> Result<Option<DirEntry>> {
        self.dir().find(parent, name)
    }

    /// Creates an empty file entry. Fails with `AlreadyExists` if `name`
    /// is already taken in `parent`.
    pub fn create_file(&mut self, name: &str, parent: Option<usize>) -> Result<()> {
        let parent = self.parent_or_current(parent);
        if self.dir().find(parent, name)?.is_some() {
            return Err(Error::AlreadyExists {
                name: name.to_string(),
            });
        }

        let entry = DirEntry::new(name, Attr::FILE, 0, 0);
        self.dir().add(parent, &entry)
    }

    /// Replaces a file's content. The file must already exist. Writing
    /// empty content is a no-op, matching the reference behavior.
    ///
    /// Allocates and writes the new chain before freeing the old one, so a
    /// `DiskFull` during allocation leaves the previous content intact.
    pub fn write_file(&mut self, name: &str, content: &[u8], parent: Option<usize>) -> Result<()> {
        let parent = self.parent_or_current(parent);
        let entry = self
            .dir()
            .find(parent, name)?
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })?;

        if content.is_empty() {
            warn!("write_file({name:?}): empty content, no-op");
            return Ok(());
        }

        let clusters_needed = content.len().div_ceil(CLUSTER_SIZE);
        let start = self.fat.allocate_chain(&mut self.device, clusters_needed)?;
        let chain = self.fat.follow_chain(start)?;

        for (i, &cluster) in chain.iter().enumerate() {
            let begin = i * CLUSTER_SIZE;
            let end = (begin + CLUSTER_SIZE).min(content.len());
            self.device.write_cluster(cluster, &content[begin..end])?;
        }

        self.dir().remove(parent, name)?;
        let updated = DirEntry::new(name, Attr::FILE, start as u32, content.len() as u32);
        self.dir().add(parent, &updated)?;

        if entry.first_cluster != 0 {
            self.fat
                .free_chain(&mut self.device, entry.first_cluster as usize)?;
        }

        Ok(())
    }

    /// Reads a file's full content, truncated to its recorded size.
    pub fn read_file(&mut self, name: &str, parent: Option<usize>) -> Result<Vec<u8>> {
        let parent = self.parent_or_current(parent);
        let entry = self
            .dir()
            .find(parent, name)?
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })?;

        if entry.first_cluster == 0 {
            return Ok(Vec::new());
        }

        let chain = self.fat.follow_chain(entry.first_cluster as usize)?;
        let mut content = Vec::with_capacity(chain.len() * CLUSTER_SIZE);
        for cluster in chain {
            content.extend(self.device.read_cluster(cluster)?);
        }
        content.truncate(entry.file_size as usize);
        Ok(content)
    }

    /// Appends `data` to a file's existing content.
    pub fn append_to_file(&mut self, name: &str, data: &[u8], parent: Option<usize>) -> Result<()> {
        let mut content = self.read_file(name, parent)?;
        content.extend_from_slice(data);
        self.write_file(name, &content, parent)
    }

    /// Frees a file's content chain (if any) and tombstones its entry.
    pub fn delete_file(&mut self, name: &str, parent: Option<usize>) -> Result<()> {
        let parent = self.parent_or_current(parent);
        let entry = self
            .dir()
            .find(parent, name)?
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })?;

        if entry.first_cluster != 0 {
            self.fat
                .free_chain(&mut self.device, entry.first_cluster as usize)?;
        }
        self.dir().remove(parent, name)?;
        Ok(())
    }

    /// Allocates exactly one cluster for a new, empty subdirectory.
    pub fn create_directory(&mut self, name: &str, parent: Option<usize>) -> Result<()> {
        let parent = self.parent_or_current(parent);
        if self.dir().find(parent, name)?.is_some() {
            return Err(Error::AlreadyExists {
                name: name.to_string(),
            });
        }

        let cluster = self.fat.allocate_chain(&mut self.device, 1)?;
        self.device.write_cluster(cluster, &[0u8; CLUSTER_SIZE])?;

        let entry = DirEntry::new(name, Attr::DIR, cluster as u32, 0);
        self.dir().add(parent, &entry)
    }

    /// Removes an empty subdirectory. Fails with `NotADirectory` if the
    /// entry is a file, or `DirectoryNotEmpty` if it has live entries.
    pub fn remove_directory(&mut self, name: &str, parent: Option<usize>) -> Result<()> {
        let parent = self.parent_or_current(parent);
        let entry = self
            .dir()
            .find(parent, name)?
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })?;

        if entry.attr != Attr::DIR {
            return Err(Error::NotADirectory {
                name: name.to_string(),
            });
        }

        let contents = self.dir().read(entry.first_cluster as usize)?;
        if !contents.is_empty() {
            return Err(Error::DirectoryNotEmpty {
                name: name.to_string(),
            });
        }

        self.dir().remove(parent, name)?;
        self.fat
            .free_chain(&mut self.device, entry.first_cluster as usize)
    }

    /// Lists every live entry in `parent`, in scan order.
    pub fn list_directory(&mut self, parent: usize) -> Result<Vec<DirEntry>> {
        self.dir().read(parent)
    }

    /// Copies `src`'s content to a newly created `dst`. Refuses if the
    /// normalized names match.
    pub fn copy_file(&mut self, src: &str, dst: &str, parent: Option<usize>) -> Result<()> {
        if normalize(src) == normalize(dst) {
            return Err(Error::InvalidName {
                name: dst.to_string(),
            });
        }

        let content = self.read_file(src, parent)?;
        self.create_file(dst, parent)?;
        self.write_file(dst, &content, parent)
    }

    /// Copies then deletes the source: a move within the same parent.
    pub fn move_file(&mut self, src: &str, dst: &str, parent: Option<usize>) -> Result<()> {
        self.copy_file(src, dst, parent)?;
        self.delete_file(src, parent)
    }

    /// Alias for `move_file`: renaming is a move within the same directory.
    pub fn rename_file(&mut self, old: &str, new: &str, parent: Option<usize>) -> Result<()> {
        self.move_file(old, new, parent)
    }

    /// Reads `host_path` fully and writes it as `virtual_name`.
    pub fn import_file_from_host<P: AsRef<Path>>(
        &mut self,
        host_path: P,
        virtual_name: &str,
        parent: Option<usize>,
    ) -> Result<()> {
        let content = std::fs::read(host_path).map_err(|source| Error::HostIoError { source })?;
        self.create_file(virtual_name, parent)?;
        self.write_file(virtual_name, &content, parent)
    }

    /// Reads `virtual_name` fully and writes it to `host_path`.
    pub fn export_file_to_host<P: AsRef<Path>>(
        &mut self,
        virtual_name: &str,
        host_path: P,
        parent: Option<usize>,
    ) -> Result<()> {
        let content = self.read_file(virtual_name, parent)?;
        std::fs::write(host_path, content).map_err(|source| Error::HostIoError { source })?;
        Ok(())
    }

    /// Free space in bytes: free clusters times cluster size.
    pub fn free_space(&self) -> usize {
        self.fat.free_count() * CLUSTER_SIZE
    }

    /// Grants scoped access to the opaque superblock cluster.
    pub fn superblock(&mut self) -> Superblock<'_> {
        Superblock::new(&mut self.device)
    }

    /// Closes the backing file handle.
    pub fn close(self) {
        self.device.close();
    }

    /// Closes the backing file handle and deletes the image from the host
    /// file system.
    pub fn cleanup(self) -> Result<()> {
        let path = self.device.path().to_path_buf();
        self.device.close();
        std::fs::remove_file(path).map_err(|source| Error::HostIoError { source })?;
        Ok(())
    }
}
