use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("archive not found: {}", _0.display())]
    ArchiveMissing(#[error(not(source))] PathBuf),
    #[display("{} already exists; pass --overwrite to replace it", _0.display())]
    OutputExists(#[error(not(source))] PathBuf),
    #[display("input not found: {}", _0.display())]
    InputMissing(#[error(not(source))] PathBuf),
    #[display("image recompression requested, but no usable tool was found")]
    Tool,
    #[display("failed to open archive")]
    Archive,
    #[display("database error")]
    Store,
    #[display("conversion failed")]
    Convert,
    #[display("page-view import failed")]
    Pageviews,
}
