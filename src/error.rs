use std::io;

use thiserror::Error;

/// Every way a core operation can fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cluster index {index} out of range [0, {bound})")]
    OutOfBounds { index: i64, bound: usize },

    #[error("bad size: expected {expected} bytes, got {actual}")]
    BadSize { expected: usize, actual: usize },

    #[error("disk full: need {requested} clusters, {free} free")]
    DiskFull { requested: usize, free: usize },

    #[error("fat corrupted: chain walk from {start} exceeded {limit} steps")]
    CorruptedFat { start: usize, limit: usize },

    #[error("not found: {name}")]
    NotFound { name: String },

    #[error("already exists: {name}")]
    AlreadyExists { name: String },

    #[error("not a directory: {name}")]
    NotADirectory { name: String },

    #[error("directory not empty: {name}")]
    DirectoryNotEmpty { name: String },

    #[error("invalid name: {name}")]
    InvalidName { name: String },

    #[error("host io error: {source}")]
    HostIoError { source: io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;
