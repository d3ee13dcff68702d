//! Recognising a format from a file name or from the stream itself.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use std::ffi::OsStr;
use std::path::Path;

/// Leading bytes of every format this crate knows, whether compiled in or not.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"BZh", "bzip2"),
    (&[0x1F, 0x8B], "gzip"),
    (&[0xFD, b'7', b'z', b'X', b'Z', 0x00], "xz"),
    (&[0x28, 0xB5, 0x2F, 0xFD], "zstd"),
];

impl Compression {
    /// Every format available in this build.
    pub fn available() -> Vec<Self> {
        #[allow(unused_mut)]
        let mut formats = vec![Self::None, Self::Bzip2, Self::Gzip];
        #[cfg(feature = "xz")]
        formats.push(Self::Xz);
        #[cfg(feature = "zstd")]
        formats.push(Self::Zstd);
        formats
    }

    /// The format a file extension (without the dot) stands for, if it is compiled in.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let name = match extension.to_ascii_lowercase().as_str() {
            "bz2" => "bzip2",
            "gz" => "gzip",
            "xz" => "xz",
            "zst" => "zstd",
            _ => return None,
        };
        Self::available().into_iter().find(|format| format.as_str() == name)
    }

    /// Detect compression from a file extension (`pageviews-202208-user.bz2`).
    /// Anything unrecognised is treated as uncompressed.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref().extension().and_then(OsStr::to_str).and_then(Self::from_extension).unwrap_or_default()
    }

    /// Detect compression from the first bytes of a stream.
    ///
    /// Used when the input has no name to go by (a feed piped through stdin).
    /// A recognised format that this build lacks is an error rather than
    /// being passed through as plain text.
    pub fn from_magic_bytes(bytes: &[u8]) -> Result<Self> {
        let Some(&(_, name)) = SIGNATURES.iter().find(|(magic, _)| bytes.starts_with(magic)) else {
            return Ok(Self::None);
        };
        Self::available()
            .into_iter()
            .find(|format| format.as_str() == name)
            .ok_or_raise(|| ErrorKind::DisabledFormat(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use rstest::rstest;

    #[rstest]
    #[case("pageviews-202208-user.bz2", Compression::Bzip2)]
    #[case("pageviews.txt.GZ", Compression::Gzip)]
    #[case("pageviews.txt", Compression::None)]
    #[case(".bz2", Compression::None)]
    #[case("pageviews", Compression::None)]
    #[cfg_attr(feature = "zstd", case("pageviews.zst", Compression::Zstd))]
    fn detects_from_path(#[case] path: &str, #[case] expected: Compression) {
        assert_eq!(Compression::from_path(path), expected);
    }

    #[rstest]
    #[case(b"en.wikipedia Dog 1 desktop 600 A600", Compression::None)]
    #[case(b"", Compression::None)]
    #[case(b"B", Compression::None)]
    #[case(b"BZh91AY&SY", Compression::Bzip2)]
    #[case(&[0x1F, 0x8B, 0x08, 0x00], Compression::Gzip)]
    #[cfg_attr(feature = "zstd", case(&[0x28, 0xB5, 0x2F, 0xFD, 0x00], Compression::Zstd))]
    fn detects_from_magic_bytes(#[case] bytes: &[u8], #[case] expected: Compression) {
        assert_eq!(Compression::from_magic_bytes(bytes).unwrap(), expected);
    }

    #[test]
    fn compressed_output_is_recognised() {
        for format in Compression::available() {
            let compressed = format.compress(b"en.wikipedia Dog 1 desktop 600 A600\n").unwrap();
            assert_eq!(Compression::from_magic_bytes(&compressed).unwrap(), format);
        }
    }

    #[cfg(not(feature = "xz"))]
    #[test]
    fn compiled_out_formats_are_reported() {
        let err = Compression::from_magic_bytes(&[0xFD, b'7', b'z', b'X', b'Z', 0x00]).unwrap_err();
        assert!(matches!(&*err, crate::error::ErrorKind::DisabledFormat(name) if name == "xz"));
    }
}
