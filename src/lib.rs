//! A self-contained FAT-style file system that stores its entire state
//! inside a single host file treated as a flat array of fixed-size
//! clusters: hierarchical directories, 8.3-style file names,
//! byte-granular reads and writes, and in-place append/overwrite with
//! cluster reallocation, mediated by a File Allocation Table.
//!
//! Single-threaded, single-mount by design (see [`fs::FileSystem`]'s
//! docs); no journaling, long names, timestamps, or permissions.

mod device;
mod directory;
mod entry;
mod error;
mod fat;
mod fs;
pub mod layout;

pub use device::{BlockDevice, Superblock};
pub use directory::Directory;
pub use entry::{normalize, Attr, DirEntry};
pub use error::{Error, Result};
pub use fat::FatManager;
pub use fs::FileSystem;
