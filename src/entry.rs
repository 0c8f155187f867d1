//! Directory entry codec: the 32-byte on-disk record, 8.3 name
//! normalization, and the "clean" display form.

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::layout::{ATTR_DIR, ATTR_FILE, DIR_ENTRY_SIZE};

bitflags! {
    /// Attribute byte at offset 11. Only `FILE` and `DIR` are meaningful;
    /// an entry is always exactly one of the two.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attr: u8 {
        const FILE = ATTR_FILE;
        const DIR  = ATTR_DIR;
    }
}

/// A decoded 32-byte directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Space-padded 8.3 form, uppercase ASCII, exactly 11 bytes.
    pub name: [u8; 11],
    pub attr: Attr,
    /// Start of the content chain; 0 means empty.
    pub first_cluster: u32,
    /// Content length in bytes (files); 0 for directories.
    pub file_size: u32,
}

impl DirEntry {
    /// Builds an entry, normalizing `name` to 8.3 form unless it is
    /// already exactly 11 bytes (names read back off disk are kept
    /// verbatim).
    pub fn new(name: &str, attr: Attr, first_cluster: u32, file_size: u32) -> Self {
        Self {
            name: normalize(name),
            attr,
            first_cluster,
            file_size,
        }
    }

    /// Builds an entry from an already-normalized 11-byte name, bypassing
    /// normalization entirely.
    pub fn from_raw_name(name: [u8; 11], attr: Attr, first_cluster: u32, file_size: u32) -> Self {
        Self {
            name,
            attr,
            first_cluster,
            file_size,
        }
    }

    /// Encodes the entry as a 32-byte on-disk record.
    pub fn encode(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut out = [0u8; DIR_ENTRY_SIZE];
        out[0..11].copy_from_slice(&self.name);
        out[11] = self.attr.bits();
        out[12..16].copy_from_slice(&self.first_cluster.to_le_bytes());
        out[16..20].copy_from_slice(&self.file_size.to_le_bytes());
        // out[20..32] stays zero: reserved, uninterpreted.
        out
    }

    /// Decodes a 32-byte on-disk record. Fails with `BadSize` if `data`
    /// is not exactly `DIR_ENTRY_SIZE` bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != DIR_ENTRY_SIZE {
            return Err(Error::BadSize {
                expected: DIR_ENTRY_SIZE,
                actual: data.len(),
            });
        }

        let mut name = [0u8; 11];
        name.copy_from_slice(&data[0..11]);
        let attr = Attr::from_bits_truncate(data[11]);
        let first_cluster = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);
        let file_size = u32::from_le_bytes([data[16], data[17], data[18], data[19]]);

        Ok(Self {
            name,
            attr,
            first_cluster,
            file_size,
        })
    }

    /// Display form: trailing spaces stripped from base and extension,
    /// rejoined with a `.` iff an extension is present.
    pub fn clean_name(&self) -> String {
        let base = trim_trailing_spaces(&self.name[0..8]);
        let ext = trim_trailing_spaces(&self.name[8..11]);
        if ext.is_empty() {
            base
        } else {
            format!("{base}.{ext}")
        }
    }
}

fn trim_trailing_spaces(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Normalizes an input name to the 11-byte 8.3 on-disk form. Inputs that
/// are already exactly 11 bytes are kept verbatim (round-tripping a name
/// read off disk).
pub fn normalize(input: &str) -> [u8; 11] {
    if input.len() == 11 && input.is_ascii() {
        let mut out = [0u8; 11];
        out.copy_from_slice(input.as_bytes());
        return out;
    }

    let upper = input.to_ascii_uppercase();
    let mut out = [b' '; 11];

    if let Some(dot) = upper.rfind('.') {
        let base = &upper[..dot];
        let ext = &upper[dot + 1..];
        let base_bytes = base.as_bytes();
        let base_len = base_bytes.len().min(8);
        out[0..base_len].copy_from_slice(&base_bytes[..base_len]);

        let ext_bytes = ext.as_bytes();
        let ext_len = ext_bytes.len().min(3);
        out[8..8 + ext_len].copy_from_slice(&ext_bytes[..ext_len]);
    } else {
        let bytes = upper.as_bytes();
        let len = bytes.len().min(11);
        out[0..len].copy_from_slice(&bytes[..len]);
    }

    out
}
