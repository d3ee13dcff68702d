use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use zimdb_compress::Compression;

/// Where a dump is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    /// `-` means standard input.
    pub fn from_arg(arg: impl Into<PathBuf>) -> Self {
        let path = arg.into();
        if path.as_os_str() == "-" { Self::Stdin } else { Self::File(path) }
    }

    /// Open the source and strip its compression.
    ///
    /// Files are recognised by extension, falling back to their first bytes
    /// when the extension says nothing; standard input only has its bytes.
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        let describe = || ErrorKind::Input(self.to_string());
        let (hint, reader): (Compression, Box<dyn Read + Send>) = match self {
            Self::Stdin => (Compression::None, Box::new(std::io::stdin())),
            Self::File(path) => (Compression::from_path(path), Box::new(File::open(path).or_raise(describe)?)),
        };
        let mut reader = BufReader::new(reader);
        let compression = match hint {
            Compression::None => Compression::from_magic_bytes(reader.fill_buf().or_raise(describe)?).or_raise(describe)?,
            known => known,
        };
        tracing::debug!(source = %self, %compression, "Opened page-view dump");
        Ok(Box::new(BufReader::new(compression.wrap_reader(reader).or_raise(describe)?)))
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("<stdin>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}
