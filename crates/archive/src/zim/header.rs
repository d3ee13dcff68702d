use crate::error::{ErrorKind, Result};

pub(super) const MAGIC: u32 = 72_173_914;
pub(super) const HEADER_LEN: usize = 80;

/// The fixed-size header at the start of every ZIM file.
///
/// All integers are little-endian; all positions are absolute file offsets.
#[derive(Clone, Debug)]
pub(super) struct Header {
    pub major_version: u16,
    pub entry_count: u32,
    pub cluster_count: u32,
    pub path_ptr_pos: u64,
    pub cluster_ptr_pos: u64,
    pub mime_list_pos: u64,
    pub checksum_pos: u64,
}

impl Header {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            exn::bail!(ErrorKind::InvalidArchive("truncated header"));
        }
        if le_u32(bytes, 0) != MAGIC {
            exn::bail!(ErrorKind::InvalidArchive("bad magic number"));
        }
        let header = Self {
            major_version: le_u16(bytes, 4),
            entry_count: le_u32(bytes, 24),
            cluster_count: le_u32(bytes, 28),
            path_ptr_pos: le_u64(bytes, 32),
            cluster_ptr_pos: le_u64(bytes, 48),
            mime_list_pos: le_u64(bytes, 56),
            checksum_pos: le_u64(bytes, 72),
        };
        if !matches!(header.major_version, 5 | 6) {
            exn::bail!(ErrorKind::InvalidArchive("unsupported major version"));
        }
        if header.mime_list_pos < HEADER_LEN as u64 {
            exn::bail!(ErrorKind::InvalidArchive("MIME list overlaps header"));
        }
        Ok(header)
    }
}

// Callers check lengths up front; these index panics would mean a logic bug.
pub(super) fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

pub(super) fn le_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

pub(super) fn le_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}
