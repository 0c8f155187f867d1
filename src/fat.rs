//! In-memory mirror of the File Allocation Table: allocation, chain
//! traversal, and chain freeing.

use log::{debug, warn};

use crate::device::BlockDevice;
use crate::error::{Error, Result};
use crate::layout::{
    CLUSTERS_NUMBER, CLUSTER_SIZE, END_OF_CHAIN, FAT_END, FAT_START, FREE_CLUSTER, NO_CHAIN,
    ROOT_DIR_CLUSTER,
};

/// Owns the FAT mirror and mediates every structural change to cluster
/// occupancy. Persists the FAT region on every mutation so a single
/// flushed FAT always reflects a legal graph.
pub struct FatManager {
    cells: Vec<i32>,
}

impl FatManager {
    /// Builds a manager with an all-free mirror. Callers load the real
    /// contents with `load`.
    pub fn new() -> Self {
        Self {
            cells: vec![FREE_CLUSTER; CLUSTERS_NUMBER],
        }
    }

    /// Reads the FAT region off disk into the in-memory mirror.
    pub fn load(&mut self, device: &mut BlockDevice) -> Result<()> {
        let mut buffer = Vec::with_capacity((FAT_END - FAT_START + 1) * CLUSTER_SIZE);
        for idx in FAT_START..=FAT_END {
            buffer.extend(device.read_cluster(idx)?);
        }

        let mut cells = Vec::with_capacity(CLUSTERS_NUMBER);
        for chunk in buffer.chunks(4) {
            if chunk.len() < 4 {
                break;
            }
            cells.push(i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        cells.resize(CLUSTERS_NUMBER, FREE_CLUSTER);
        self.cells = cells;
        Ok(())
    }

    /// Serializes the mirror and writes it back across the FAT region.
    pub fn write(&self, device: &mut BlockDevice) -> Result<()> {
        let mut data = Vec::with_capacity(CLUSTERS_NUMBER * 4);
        for &cell in &self.cells {
            data.extend_from_slice(&cell.to_le_bytes());
        }

        let mut offset = 0;
        for idx in FAT_START..=FAT_END {
            let end = (offset + CLUSTER_SIZE).min(data.len());
            device.write_cluster(idx, &data[offset..end])?;
            offset += CLUSTER_SIZE;
        }
        Ok(())
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

    pub fn get(&self, idx: usize) -> Result<i32> {
        self.check_bounds(idx)?;
        Ok(self.cells[idx])
    }

    /// Sets a cell in the mirror. Does not persist; callers either call
    /// `write` themselves or rely on the next structural operation to do so.
    pub fn set(&mut self, idx: usize, value: i32) -> Result<()> {
        self.check_bounds(idx)?;
        self.cells[idx] = value;
        Ok(())
    }

    /// Number of free clusters from `ROOT_DIR_CLUSTER` to the end, inclusive.
    pub fn free_count(&self) -> usize {
        self.cells[ROOT_DIR_CLUSTER..]
            .iter()
            .filter(|&&c| c == FREE_CLUSTER)
            .count()
    }

    /// Allocates a chain of `n` free clusters, linking them in scan order
    /// and terminating with `END_OF_CHAIN`. Returns the first cluster of
    /// the new chain, or `NO_CHAIN` if `n == 0`. Fails with `DiskFull`
    /// without mutating anything if fewer than `n` clusters are free.
    pub fn allocate_chain(&mut self, device: &mut BlockDevice, n: usize) -> Result<usize> {
        if n == 0 {
            return Ok(NO_CHAIN);
        }

        let mut free_indices = Vec::with_capacity(n);
        for idx in ROOT_DIR_CLUSTER..CLUSTERS_NUMBER {
            if self.cells[idx] == FREE_CLUSTER {
                free_indices.push(idx);
                if free_indices.len() == n {
                    break;
                }
            }
        }

        if free_indices.len() < n {
            warn!(
                "disk full: requested {n} clusters, {} free",
                free_indices.len()
            );
            return Err(Error::DiskFull {
                requested: n,
                free: free_indices.len(),
            });
        }

        for pair in free_indices.windows(2) {
            self.cells[pair[0]] = pair[1] as i32;
        }
        let last = *free_indices.last().unwrap();
        self.cells[last] = END_OF_CHAIN;

        self.write(device)?;
        debug!("allocated chain of {n} clusters starting at {}", free_indices[0]);
        Ok(free_indices[0])
    }

    /// Walks the chain starting at `start`, returning the ordered list of
    /// visited cluster indices. Fails with `CorruptedFat` if the walk
    /// exceeds `CLUSTERS_NUMBER` steps without reaching `END_OF_CHAIN`.
    pub fn follow_chain(&self, start: usize) -> Result<Vec<usize>> {
        let mut chain = Vec::new();
        let mut curr = start;

        loop {
            chain.push(curr);
            if chain.len() > CLUSTERS_NUMBER {
                return Err(Error::CorruptedFat {
                    start,
                    limit: CLUSTERS_NUMBER,
                });
            }

            let next = self.get(curr)?;
            if next == END_OF_CHAIN {
                break;
            }
            curr = next as usize;
        }

        Ok(chain)
    }

    /// Frees every cluster in the chain starting at `start`, then persists
    /// the FAT.
    pub fn free_chain(&mut self, device: &mut BlockDevice, start: usize) -> Result<()> {
        let mut curr = start;
        loop {
            let next = self.get(curr)?;
            self.set(curr, FREE_CLUSTER)?;
            if next == END_OF_CHAIN {
                break;
            }
            curr = next as usize;
        }
        self.write(device)
    }
}

impl Default for FatManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_device(name: &str) -> (BlockDevice, PathBuf) {
        let mut p = std::env::temp_dir();
        p.push(format!("microfat-fat-test-{name}-{}", std::process::id()));
        let _ = std::fs::remove_file(&p);
        (BlockDevice::initialize(&p).unwrap(), p)
    }

    #[test]
    fn allocate_links_chain_and_terminates() {
        let (mut dev, path) = temp_device("alloc");
        let mut fat = FatManager::new();
        fat.load(&mut dev).unwrap();

        let start = fat.allocate_chain(&mut dev, 3).unwrap();
        let chain = fat.follow_chain(start).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(fat.get(*chain.last().unwrap()).unwrap(), END_OF_CHAIN);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn allocate_zero_returns_no_chain_without_mutating() {
        let (mut dev, path) = temp_device("zero");
        let mut fat = FatManager::new();
        fat.load(&mut dev).unwrap();
        let before = fat.free_count();

        let start = fat.allocate_chain(&mut dev, 0).unwrap();
        assert_eq!(start, NO_CHAIN);
        assert_eq!(fat.free_count(), before);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn allocate_more_than_free_fails_without_mutating() {
        let (mut dev, path) = temp_device("full");
        let mut fat = FatManager::new();
        fat.load(&mut dev).unwrap();
        let free = fat.free_count();

        let before = fat.cells.clone();
        let err = fat.allocate_chain(&mut dev, free + 1).unwrap_err();
        assert!(matches!(err, Error::DiskFull { .. }));
        assert_eq!(fat.cells, before);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn free_chain_releases_every_cluster() {
        let (mut dev, path) = temp_device("free");
        let mut fat = FatManager::new();
        fat.load(&mut dev).unwrap();

        let start = fat.allocate_chain(&mut dev, 4).unwrap();
        let before_free = fat.free_count();
        fat.free_chain(&mut dev, start).unwrap();
        assert_eq!(fat.free_count(), before_free + 4);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn corrupted_fat_is_detected_on_cyclic_chain() {
        let (mut dev, path) = temp_device("cycle");
        let mut fat = FatManager::new();
        fat.load(&mut dev).unwrap();

        // Build a two-cluster cycle manually: not reachable via the
        // public allocator, which always terminates chains.
        fat.set(ROOT_DIR_CLUSTER, (ROOT_DIR_CLUSTER + 1) as i32).unwrap();
        fat.set(ROOT_DIR_CLUSTER + 1, ROOT_DIR_CLUSTER as i32).unwrap();

        let err = fat.follow_chain(ROOT_DIR_CLUSTER).unwrap_err();
        assert!(matches!(err, Error::CorruptedFat { .. }));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn load_then_write_is_stable() {
        let (mut dev, path) = temp_device("roundtrip");
        let mut fat = FatManager::new();
        fat.load(&mut dev).unwrap();
        fat.set(ROOT_DIR_CLUSTER, END_OF_CHAIN).unwrap();
        fat.write(&mut dev).unwrap();

        let mut reloaded = FatManager::new();
        reloaded.load(&mut dev).unwrap();
        assert_eq!(reloaded.get(ROOT_DIR_CLUSTER).unwrap(), END_OF_CHAIN);

        std::fs::remove_file(path).unwrap();
    }
}
