//! Codec Operations

use crate::error::{ErrorKind, Result};
use crate::{Compression, Level};
use bzip2::{Compression as BzCompression, write::BzEncoder};
use exn::ResultExt;
use flate2::{Compression as GzCompression, write::GzEncoder};
use std::io::{Read, Write};
use tracing::instrument;
#[cfg(feature = "xz")]
use xz2::{read::XzDecoder, write::XzEncoder};
#[cfg(feature = "zstd")]
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

impl Level {
    fn bzip2(&self) -> BzCompression {
        match self {
            Level::Fast => BzCompression::fast(),
            Level::Balanced => BzCompression::new(6),
            Level::Smallest => BzCompression::best(),
        }
    }

    fn gzip(&self) -> GzCompression {
        match self {
            Level::Fast => GzCompression::fast(),
            Level::Balanced => GzCompression::default(),
            Level::Smallest => GzCompression::best(),
        }
    }

    #[cfg(feature = "xz")]
    fn xz(&self) -> u32 {
        match self {
            Level::Fast => 1,
            Level::Balanced => 6,
            Level::Smallest => 9,
        }
    }

    // Levels above 19 need the "ultra" window sizes, which readers on small
    // devices cannot always afford to decode.
    #[cfg(feature = "zstd")]
    fn zstd(&self) -> i32 {
        match self {
            Level::Fast => 1,
            Level::Balanced => 10,
            Level::Smallest => 19,
        }
    }
}

impl Compression {
    /// Compress a byte slice in memory at the [`Balanced`](Level::Balanced) level.
    ///
    /// # Examples
    ///
    /// ```
    /// use zimdb_compress::Compression;
    ///
    /// let data = b"<p>Hello, world!</p>";
    /// let compressed = Compression::Gzip.compress(data).unwrap();
    /// assert_eq!(Compression::Gzip.decompress(&compressed).unwrap(), data);
    /// ```
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        self.compress_with(input, Level::Balanced)
    }

    /// Compress a byte slice in memory at an explicit level.
    #[instrument(level = "trace", skip(input), fields(format = %self, input_size = input.len(), output_size))]
    pub fn compress_with(&self, input: &[u8], level: Level) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 2);
        match self {
            Compression::None => output.extend_from_slice(input),
            Compression::Bzip2 => {
                let mut encoder = BzEncoder::new(&mut output, level.bzip2());
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(&mut output, level.gzip());
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
            #[cfg(feature = "xz")]
            Compression::Xz => {
                let mut encoder = XzEncoder::new(&mut output, level.xz());
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
            #[cfg(feature = "zstd")]
            Compression::Zstd => {
                let mut encoder = ZstdEncoder::new(&mut output, level.zstd()).or_raise(|| ErrorKind::Encoder)?;
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
        }
        tracing::Span::current().record("output_size", output.len());
        Ok(output)
    }

    /// Decompress a byte slice in memory.
    #[instrument(level = "trace", skip(input), fields(format = %self, input_size = input.len(), output_size))]
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        if let Compression::None = self {
            output.extend_from_slice(input);
        } else {
            self.wrap_reader(input)?.read_to_end(&mut output).or_raise(|| ErrorKind::InvalidData)?;
        }
        tracing::Span::current().record("output_size", output.len());
        Ok(output)
    }

    /// Wrap a reader with the appropriate decompression layer.
    ///
    /// Nothing is buffered beyond what the decoder itself needs, which is
    /// what makes multi-gigabyte feeds readable line by line.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::{BufRead, BufReader, Cursor};
    /// use zimdb_compress::Compression;
    ///
    /// let compressed = Compression::Bzip2.compress(b"one\ntwo\n").unwrap();
    /// let reader = Compression::Bzip2.wrap_reader(Cursor::new(compressed)).unwrap();
    /// let lines: Vec<String> = BufReader::new(reader).lines().map(|l| l.unwrap()).collect();
    /// assert_eq!(lines, ["one", "two"]);
    /// ```
    pub fn wrap_reader<'a, R: Read + Send + 'a>(&self, reader: R) -> Result<Box<dyn Read + Send + 'a>> {
        Ok(match self {
            Compression::None => Box::new(reader),
            // Pageview dumps are produced by parallel bzip2 tools and consist
            // of many concatenated streams.
            Compression::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
            Compression::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            #[cfg(feature = "xz")]
            Compression::Xz => Box::new(XzDecoder::new_multi_decoder(reader)),
            #[cfg(feature = "zstd")]
            Compression::Zstd => Box::new(ZstdDecoder::new(reader).or_raise(|| ErrorKind::Encoder)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::{BufRead, BufReader, Cursor};

    const ARTICLE: &[u8] = b"<html><head><title>Canine</title></head><body><p>The dog is a domesticated descendant \
        of the wolf. The dog is a domesticated descendant of the wolf.</p></body></html>";

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[cfg_attr(feature = "xz", case(Compression::Xz))]
    #[cfg_attr(feature = "zstd", case(Compression::Zstd))]
    fn roundtrip_at_every_level(#[case] format: Compression) {
        for level in [Level::Fast, Level::Balanced, Level::Smallest] {
            let compressed = format.compress_with(ARTICLE, level).unwrap();
            assert_eq!(format.decompress(&compressed).unwrap(), ARTICLE);
        }
    }

    #[rstest]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[cfg_attr(feature = "xz", case(Compression::Xz))]
    #[cfg_attr(feature = "zstd", case(Compression::Zstd))]
    fn garbage_is_invalid_data(#[case] format: Compression) {
        let err = format.decompress(b"this was never compressed").unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidData | ErrorKind::Encoder));
    }

    #[test]
    fn concatenated_bzip2_streams_are_read_to_the_end() {
        let mut joined = Compression::Bzip2.compress(b"en.wikipedia Dog 1 desktop 600 A600\n").unwrap();
        joined.extend(Compression::Bzip2.compress(b"en.wikipedia Cat 2 desktop 700 A700\n").unwrap());
        let reader = Compression::Bzip2.wrap_reader(Cursor::new(joined)).unwrap();
        let lines = BufReader::new(reader).lines().count();
        assert_eq!(lines, 2);
    }

    #[test]
    fn compressing_nothing_is_fine() {
        let compressed = Compression::Gzip.compress(b"").unwrap();
        assert!(Compression::Gzip.decompress(&compressed).unwrap().is_empty());
    }
}
