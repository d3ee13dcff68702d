use super::header::{le_u16, le_u32};
use std::io::{self, BufRead, Read};

const REDIRECT: u16 = 0xffff;
const LINK_TARGET: u16 = 0xfffe;
const DELETED: u16 = 0xfffd;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Target {
    Blob { cluster: u32, blob: u32, mime: u16 },
    Redirect(u32),
    /// Link targets and deleted entries from old archives carry neither.
    Empty,
}

/// A directory entry as stored on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct Dirent {
    pub namespace: u8,
    pub url: String,
    pub title: String,
    pub target: Target,
}

impl Dirent {
    pub fn read(reader: &mut impl BufRead) -> io::Result<Self> {
        let mut fixed = [0u8; 8];
        reader.read_exact(&mut fixed)?;
        let mime = le_u16(&fixed, 0);
        let parameter_len = fixed[2] as usize;
        let namespace = fixed[3];

        let target = match mime {
            REDIRECT => {
                let mut buf = [0u8; 4];
                reader.read_exact(&mut buf)?;
                Target::Redirect(le_u32(&buf, 0))
            },
            LINK_TARGET | DELETED => Target::Empty,
            _ => {
                let mut buf = [0u8; 8];
                reader.read_exact(&mut buf)?;
                Target::Blob { cluster: le_u32(&buf, 0), blob: le_u32(&buf, 4), mime }
            },
        };
        let url = read_cstring(reader)?;
        let title = read_cstring(reader)?;
        // Extra parameters are unused, but must be consumed by sequential readers.
        io::copy(&mut reader.take(parameter_len as u64), &mut io::sink())?;

        Ok(Self { namespace, url, title, target })
    }

    /// `{namespace}/{url}`, the path form callers use to address entries.
    pub fn path(&self) -> String {
        format!("{}/{}", self.namespace as char, self.url)
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() { &self.url } else { &self.title }
    }
}

fn read_cstring(reader: &mut impl BufRead) -> io::Result<String> {
    let mut buf = Vec::new();
    reader.read_until(0, &mut buf)?;
    if buf.pop() != Some(0) {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "unterminated string in directory entry"));
    }
    String::from_utf8(buf).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

#[cfg(test)]
pub(super) fn encode(dirent: &Dirent) -> Vec<u8> {
    let mut out = Vec::new();
    let mime = match dirent.target {
        Target::Blob { mime, .. } => mime,
        Target::Redirect(_) => REDIRECT,
        Target::Empty => DELETED,
    };
    out.extend_from_slice(&mime.to_le_bytes());
    out.push(0);
    out.push(dirent.namespace);
    out.extend_from_slice(&0u32.to_le_bytes());
    match dirent.target {
        Target::Blob { cluster, blob, .. } => {
            out.extend_from_slice(&cluster.to_le_bytes());
            out.extend_from_slice(&blob.to_le_bytes());
        },
        Target::Redirect(index) => out.extend_from_slice(&index.to_le_bytes()),
        Target::Empty => {},
    }
    out.extend_from_slice(dirent.url.as_bytes());
    out.push(0);
    out.extend_from_slice(dirent.title.as_bytes());
    out.push(0);
    out
}
