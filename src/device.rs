//! Fixed-size cluster I/O over a single backing file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::layout::{CLUSTERS_NUMBER, CLUSTER_SIZE, SUPERBLOCK_CLUSTER};

/// A backing file treated as a flat array of `CLUSTERS_NUMBER` fixed-size
/// clusters. Owns the single open handle for the life of the mount.
#[derive(Debug)]
pub struct BlockDevice {
    file: File,
    path: PathBuf,
}

impl BlockDevice {
    /// Opens `path`, creating it zero-filled to the full image size if it
    /// doesn't exist yet.
    pub fn initialize<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            debug!("creating zero-filled image at {}", path.display());
            let total = CLUSTERS_NUMBER * CLUSTER_SIZE;
            let mut f = File::create(&path).map_err(|source| Error::HostIoError { source })?;
            f.write_all(&vec![0u8; total])
                .map_err(|source| Error::HostIoError { source })?;
            f.flush().map_err(|source| Error::HostIoError { source })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| Error::HostIoError { source })?;
        Ok(Self { file, path })
    }

    fn check_bounds(&self, idx: usize) -> Result<()> {
        if idx >= CLUSTERS_NUMBER {
            return Err(Error::OutOfBounds {
                index: idx as i64,
                bound: CLUSTERS_NUMBER,
            });
        }
        Ok(())
    }

    /// Reads cluster `idx`, always returning exactly `CLUSTER_SIZE` bytes.
    pub fn read_cluster(&mut self, idx: usize) -> Result<Vec<u8>> {
        self.check_bounds(idx)?;
        trace!("read_cluster({idx})");

        let mut buf = vec![0u8; CLUSTER_SIZE];
        self.file
            .seek(SeekFrom::Start((idx * CLUSTER_SIZE) as u64))
            .map_err(|source| Error::HostIoError { source })?;
        self.file
            .read_exact(&mut buf)
            .map_err(|source| Error::HostIoError { source })?;
        Ok(buf)
    }

    /// Writes `data` to cluster `idx`. Shorter-than-cluster buffers are
    /// zero-extended; longer buffers fail with `BadSize`.
    pub fn write_cluster(&mut self, idx: usize, data: &[u8]) -> Result<()> {
        self.check_bounds(idx)?;
        if data.len() > CLUSTER_SIZE {
            return Err(Error::BadSize {
                expected: CLUSTER_SIZE,
                actual: data.len(),
            });
        }
        trace!("write_cluster({idx}, {} bytes)", data.len());

        let mut buf = vec![0u8; CLUSTER_SIZE];
        buf[..data.len()].copy_from_slice(data);

        self.file
            .seek(SeekFrom::Start((idx * CLUSTER_SIZE) as u64))
            .map_err(|source| Error::HostIoError { source })?;
        self.file
            .write_all(&buf)
            .map_err(|source| Error::HostIoError { source })?;
        self.file.flush().map_err(|source| Error::HostIoError { source })?;
        Ok(())
    }

    /// Closes the backing file handle.
    pub fn close(self) {}

    /// Path of the backing image file, used by `FileSystem::cleanup`.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Thin wrapper scoping access to the opaque superblock cluster (cluster 0).
/// The core never interprets its contents; collaborators outside this crate
/// may stash whatever they like there.
pub struct Superblock<'a> {
    device: &'a mut BlockDevice,
}

impl<'a> Superblock<'a> {
    pub fn new(device: &'a mut BlockDevice) -> Self {
        Self { device }
    }

    /// Writes `data` to the superblock cluster. `data` must be exactly
    /// `CLUSTER_SIZE` bytes.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != CLUSTER_SIZE {
            return Err(Error::BadSize {
                expected: CLUSTER_SIZE,
                actual: data.len(),
            });
        }
        self.device.write_cluster(SUPERBLOCK_CLUSTER, data)
    }

    /// Reads the superblock cluster verbatim.
    pub fn read(&mut self) -> Result<Vec<u8>> {
        self.device.read_cluster(SUPERBLOCK_CLUSTER)
    }
}
