use super::header::{le_u32, le_u64};
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use zimdb_compress::Compression;

const EXTENDED: u8 = 0x10;

/// A decompressed cluster: a table of blob offsets followed by blob data.
pub(super) struct Cluster {
    offsets: Vec<u64>,
    data: Vec<u8>,
}

impl Cluster {
    /// Parse raw on-disk cluster bytes (info byte followed by the payload).
    pub fn parse(index: u32, raw: &[u8]) -> Result<Self> {
        let Some((&info, payload)) = raw.split_first() else {
            exn::bail!(ErrorKind::CorruptCluster(index));
        };
        let compression = match info & 0x0f {
            0 | 1 => Compression::None,
            3 => Compression::Bzip2,
            4 => Compression::Xz,
            5 => Compression::Zstd,
            other => exn::bail!(ErrorKind::UnsupportedCompression(other)),
        };
        let data = compression.decompress(payload).or_raise(|| ErrorKind::CorruptCluster(index))?;
        let width = if info & EXTENDED != 0 { 8 } else { 4 };
        let offsets = read_offsets(&data, width).ok_or_raise(|| ErrorKind::CorruptCluster(index))?;
        Ok(Self { offsets, data })
    }

    pub fn blob(&self, blob: u32) -> Option<&[u8]> {
        let blob = blob as usize;
        let start = usize::try_from(*self.offsets.get(blob)?).ok()?;
        let end = usize::try_from(*self.offsets.get(blob + 1)?).ok()?;
        self.data.get(start..end)
    }
}

/// The first offset doubles as the size of the offset table itself.
fn read_offsets(data: &[u8], width: usize) -> Option<Vec<u64>> {
    let read = |at: usize| -> Option<u64> {
        let bytes = data.get(at..at + width)?;
        Some(if width == 8 { le_u64(bytes, 0) } else { le_u32(bytes, 0) as u64 })
    };
    let first = read(0)?;
    if first == 0 || first % width as u64 != 0 {
        return None;
    }
    let count = usize::try_from(first).ok()? / width;
    let offsets = (0..count).map(|i| read(i * width)).collect::<Option<Vec<_>>>()?;
    if offsets.windows(2).any(|w| w[0] > w[1]) || offsets.last().copied()? > data.len() as u64 {
        return None;
    }
    Some(offsets)
}

#[cfg(test)]
pub(super) fn encode(blobs: &[&[u8]], compression: Compression) -> Vec<u8> {
    let table = (blobs.len() + 1) * 4;
    let mut body = Vec::new();
    let mut offset = table;
    body.extend_from_slice(&(offset as u32).to_le_bytes());
    for blob in blobs {
        offset += blob.len();
        body.extend_from_slice(&(offset as u32).to_le_bytes());
    }
    for blob in blobs {
        body.extend_from_slice(blob);
    }
    let info = match compression {
        Compression::Zstd => 5,
        Compression::Xz => 4,
        Compression::Bzip2 => 3,
        _ => 1,
    };
    let mut raw = vec![info];
    raw.extend(compression.compress(&body).unwrap());
    raw
}
