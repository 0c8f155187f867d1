//! Read/search/add/remove entries within a directory's cluster chain.

use log::debug;

use crate::device::BlockDevice;
use crate::entry::{normalize, DirEntry};
use crate::error::Result;
use crate::fat::FatManager;
use crate::layout::{CLUSTER_SIZE, DIR_ENTRY_SIZE, EMPTY_ENTRY};

/// Operates on directories addressed by their starting cluster. Performs
/// no uniqueness checking — that is the facade's responsibility.
pub struct Directory<'a> {
    device: &'a mut BlockDevice,
    fat: &'a mut FatManager,
}

impl<'a> Directory<'a> {
    pub fn new(device: &'a mut BlockDevice, fat: &'a mut FatManager) -> Self {
        Self { device, fat }
    }

    /// Reads every live entry in a directory's chain, in scan order.
    pub fn read(&mut self, start: usize) -> Result<Vec<DirEntry>> {
        let chain = self.fat.follow_chain(start)?;
        let mut entries = Vec::new();

        for cluster in chain {
            let data = self.device.read_cluster(cluster)?;
            for slot in data.chunks(DIR_ENTRY_SIZE) {
                if slot.len() < DIR_ENTRY_SIZE || slot[0] == EMPTY_ENTRY {
                    continue;
                }
                entries.push(DirEntry::decode(slot)?);
            }
        }

        Ok(entries)
    }

    /// Finds the first entry in `start` matching `name` (normalized).
    pub fn find(&mut self, start: usize, name: &str) -> Result<Option<DirEntry>> {
        let target = normalize(name);
        let entries = self.read(start)?;
        Ok(entries.into_iter().find(|e| e.name == target))
    }

    /// Places `entry` in the first free slot of the chain, extending it
    /// with a freshly allocated cluster if none is free.
    pub fn add(&mut self, start: usize, entry: &DirEntry) -> Result<()> {
        let chain = self.fat.follow_chain(start)?;
        let encoded = entry.encode();

        for &cluster in &chain {
            let mut data = self.device.read_cluster(cluster)?;
            for slot_start in (0..data.len()).step_by(DIR_ENTRY_SIZE) {
                if data[slot_start] == EMPTY_ENTRY {
                    data[slot_start..slot_start + DIR_ENTRY_SIZE].copy_from_slice(&encoded);
                    self.device.write_cluster(cluster, &data)?;
                    return Ok(());
                }
            }
        }

        debug!("directory chain at {start} full, extending by one cluster");
        let new_cluster = self.fat.allocate_chain(self.device, 1)?;
        let last = *chain.last().expect("follow_chain always returns at least one cluster");
        self.fat.set(last, new_cluster as i32)?;
        self.fat.write(self.device)?;

        let mut new_data = vec![0u8; CLUSTER_SIZE];
        new_data[0..DIR_ENTRY_SIZE].copy_from_slice(&encoded);
        self.device.write_cluster(new_cluster, &new_data)
    }

    /// Tombstones the first entry matching `name`. Never frees or shrinks
    /// the directory's own chain. Returns whether a match was found.
    pub fn remove(&mut self, start: usize, name: &str) -> Result<bool> {
        let target = normalize(name);
        let chain = self.fat.follow_chain(start)?;

        for cluster in chain {
            let mut data = self.device.read_cluster(cluster)?;
            let mut dirty = false;

            for slot_start in (0..data.len()).step_by(DIR_ENTRY_SIZE) {
                let slot = &data[slot_start..slot_start + DIR_ENTRY_SIZE];
                if slot[0] == EMPTY_ENTRY {
                    continue;
                }
                let entry = DirEntry::decode(slot)?;
                if entry.name == target {
                    data[slot_start] = EMPTY_ENTRY;
                    dirty = true;
                    break;
                }
            }

            if dirty {
                self.device.write_cluster(cluster, &data)?;
                return Ok(true);
            }
        }

        Ok(false)
    }
}
