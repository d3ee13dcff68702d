//! Native ZIM file reader.
//!
//! Layout, as far as this reader cares:
//!
//! ```text
//! header (80 bytes) → MIME list → path pointer list → cluster pointer list
//!                   → directory entries → clusters → checksum
//! ```
//!
//! The path pointer list is sorted by `(namespace, url)` and its positions
//! are the dense entry ids. Clusters are decompressed one at a time and the
//! most recent one is kept, since consecutive entries tend to share one.

mod cluster;
mod dirent;
mod header;

use self::cluster::Cluster;
use self::dirent::{Dirent, Target};
use self::header::{HEADER_LEN, Header, le_u64};
use crate::error::{ErrorKind, Result};
use crate::{Archive, ArchiveHandle, ArchiveOpener, Entry};
use exn::{OptionExt, ResultExt};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::instrument;

const MAX_MIME_TYPES: usize = 4096;

pub struct ZimArchive {
    path: PathBuf,
    header: Header,
    mime_types: Vec<String>,
    file_len: u64,
    file: Mutex<File>,
    cache: Mutex<Option<(u32, Arc<Cluster>)>>,
}

impl ZimArchive {
    /// Open and validate a ZIM file.
    ///
    /// Only the header and MIME list are read up front; everything else is
    /// read on demand.
    #[instrument(level = "debug", fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).or_raise(|| ErrorKind::Io(path.clone()))?;
        let file_len = file.metadata().or_raise(|| ErrorKind::Io(path.clone()))?.len();

        let mut head = [0u8; HEADER_LEN];
        file.read_exact(&mut head).or_raise(|| ErrorKind::InvalidArchive("truncated header"))?;
        let header = Header::parse(&head)?;
        let path_ptrs_end = header.path_ptr_pos.saturating_add(8 * header.entry_count as u64);
        let cluster_ptrs_end = header.cluster_ptr_pos.saturating_add(8 * header.cluster_count as u64);
        if path_ptrs_end > file_len || cluster_ptrs_end > file_len {
            exn::bail!(ErrorKind::InvalidArchive("pointer lists extend past end of file"));
        }

        file.seek(SeekFrom::Start(header.mime_list_pos)).or_raise(|| ErrorKind::Io(path.clone()))?;
        let mime_types = read_mime_list(&mut BufReader::new(&mut file))
            .or_raise(|| ErrorKind::InvalidArchive("corrupt MIME list"))?;

        tracing::debug!(
            entries = header.entry_count,
            clusters = header.cluster_count,
            mime_types = mime_types.len(),
            "Opened ZIM archive"
        );
        Ok(Self { path, header, mime_types, file_len, file: Mutex::new(file), cache: Mutex::new(None) })
    }

    fn read_at(&self, pos: u64, len: usize) -> std::io::Result<Vec<u8>> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(pos))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_pointer(&self, list: u64, index: u32) -> Result<u64> {
        let bytes = self.read_at(list + 8 * index as u64, 8).or_raise(|| ErrorKind::Io(self.path.clone()))?;
        Ok(le_u64(&bytes, 0))
    }

    fn dirent(&self, id: u32) -> Result<Dirent> {
        if id >= self.header.entry_count {
            exn::bail!(ErrorKind::IdOutOfRange(id));
        }
        let offset = self.read_pointer(self.header.path_ptr_pos, id)?;
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(offset)).or_raise(|| ErrorKind::Io(self.path.clone()))?;
        Dirent::read(&mut BufReader::with_capacity(512, &mut *file)).or_raise(|| ErrorKind::CorruptEntry(id))
    }

    fn entry(&self, id: u32, dirent: Dirent) -> Entry {
        let title = dirent.display_title().to_string();
        let path = dirent.path();
        match dirent.target {
            Target::Redirect(target) => Entry::redirect(id, path, title, target),
            Target::Blob { mime, .. } => Entry::content(id, path, title, self.mime_types.get(mime as usize).cloned()),
            Target::Empty => Entry::content(id, path, title, None),
        }
    }

    #[instrument(level = "trace", skip(self))]
    fn cluster(&self, index: u32) -> Result<Arc<Cluster>> {
        {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((cached, cluster)) = cache.as_ref()
                && *cached == index
            {
                return Ok(Arc::clone(cluster));
            }
        }
        if index >= self.header.cluster_count {
            exn::bail!(ErrorKind::CorruptCluster(index));
        }

        let start = self.read_pointer(self.header.cluster_ptr_pos, index)?;
        let end = if index + 1 < self.header.cluster_count {
            self.read_pointer(self.header.cluster_ptr_pos, index + 1)?
        } else if self.header.checksum_pos > start {
            self.header.checksum_pos
        } else {
            self.file_len
        };
        let len = end.checked_sub(start).ok_or_raise(|| ErrorKind::CorruptCluster(index))?;
        let len = usize::try_from(len).or_raise(|| ErrorKind::CorruptCluster(index))?;
        let raw = self.read_at(start, len).or_raise(|| ErrorKind::Io(self.path.clone()))?;
        let cluster = Arc::new(Cluster::parse(index, &raw)?);

        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some((index, Arc::clone(&cluster)));
        Ok(cluster)
    }

    /// Binary search over the sorted path pointer list.
    fn find(&self, namespace: u8, url: &str) -> Result<Option<(u32, Dirent)>> {
        let (mut low, mut high) = (0, self.header.entry_count);
        while low < high {
            let mid = low + (high - low) / 2;
            let dirent = self.dirent(mid)?;
            match (dirent.namespace, dirent.url.as_bytes()).cmp(&(namespace, url.as_bytes())) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Ok(Some((mid, dirent))),
            }
        }
        Ok(None)
    }
}

impl Archive for ZimArchive {
    fn entry_count(&self) -> u32 {
        self.header.entry_count
    }

    fn entry_by_id(&self, id: u32) -> Result<Entry> {
        let dirent = self.dirent(id)?;
        Ok(self.entry(id, dirent))
    }

    fn entry_by_path(&self, path: &str) -> Result<Entry> {
        let not_found = || ErrorKind::NotFound(path.to_string());
        let (namespace, url) = path.split_once('/').ok_or_raise(not_found)?;
        let &[namespace] = namespace.as_bytes() else {
            exn::bail!(not_found());
        };
        let (id, dirent) = self.find(namespace, url)?.ok_or_raise(not_found)?;
        Ok(self.entry(id, dirent))
    }

    fn content(&self, id: u32) -> Result<Vec<u8>> {
        let Target::Blob { cluster, blob, .. } = self.dirent(id)?.target else {
            exn::bail!(ErrorKind::NoContent(id));
        };
        let bytes = self.cluster(cluster)?.blob(blob).map(<[u8]>::to_vec);
        bytes.ok_or_raise(|| ErrorKind::CorruptCluster(cluster))
    }
}

fn read_mime_list(reader: &mut impl BufRead) -> std::io::Result<Vec<String>> {
    let mut types = Vec::new();
    loop {
        let mut buf = Vec::new();
        reader.read_until(0, &mut buf)?;
        if buf.pop() != Some(0) {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        if buf.is_empty() || types.len() >= MAX_MIME_TYPES {
            return Ok(types);
        }
        types.push(String::from_utf8_lossy(&buf).into_owned());
    }
}

/// Opens independent [`ZimArchive`] handles onto one file.
#[derive(Clone, Debug)]
pub struct ZimOpener(PathBuf);

impl ZimOpener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
}

impl ArchiveOpener for ZimOpener {
    fn open(&self) -> Result<ArchiveHandle> {
        Ok(Arc::new(ZimArchive::open(&self.0)?))
    }
}
