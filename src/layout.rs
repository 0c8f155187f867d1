//! On-disk geometry. These are compile-time constants of the image format,
//! not runtime configuration: changing any of them changes the format.

/// Size in bytes of one cluster, the unit of all disk I/O.
pub const CLUSTER_SIZE: usize = 512;

/// Total number of clusters in an image. The backing file is always
/// exactly `CLUSTERS_NUMBER * CLUSTER_SIZE` bytes.
pub const CLUSTERS_NUMBER: usize = 512;

/// Cluster holding the opaque superblock region.
pub const SUPERBLOCK_CLUSTER: usize = 0;

/// First cluster of the FAT region (inclusive).
pub const FAT_START: usize = 1;

/// Last cluster of the FAT region (inclusive).
pub const FAT_END: usize = 4;

/// First cluster of the root directory.
pub const ROOT_DIR_CLUSTER: usize = 5;

/// Packed size of one directory entry on disk.
pub const DIR_ENTRY_SIZE: usize = 32;

/// Directory entries per cluster.
pub const ENTRIES_PER_CLUSTER: usize = CLUSTER_SIZE / DIR_ENTRY_SIZE;

/// Marks a directory slot as free when it is the first byte of the slot.
pub const EMPTY_ENTRY: u8 = 0x00;

/// FAT cell value meaning "unallocated".
pub const FREE_CLUSTER: i32 = 0;

/// FAT cell sentinel meaning "last cluster of a chain" (or reserved).
/// Distinct from any valid cluster index and from `FREE_CLUSTER`.
pub const END_OF_CHAIN: i32 = -1;

/// Attribute byte value for a plain file entry.
pub const ATTR_FILE: u8 = 0x01;

/// Attribute byte value for a directory entry.
pub const ATTR_DIR: u8 = 0x02;

/// `allocate_chain`'s return value for a request of zero clusters: no
/// chain was allocated, so there is no first cluster to report.
pub const NO_CHAIN: usize = 0;

const _: () = assert!(CLUSTERS_NUMBER * 4 <= (FAT_END - FAT_START + 1) * CLUSTER_SIZE);
const _: () = assert!(ROOT_DIR_CLUSTER > FAT_END);
const _: () = assert!(SUPERBLOCK_CLUSTER < FAT_START);
