use std::path::Path;

/// Image formats recognised by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Svg,
    Icon,
    Other,
}

impl ImageFormat {
    pub fn from_path(path: &str) -> Self {
        let extension = Path::new(path).extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("png") => Self::Png,
            Some("jpg" | "jpeg" | "jpe") => Self::Jpeg,
            Some("gif") => Self::Gif,
            Some("webp") => Self::Webp,
            Some("bmp") => Self::Bmp,
            Some("svg" | "svgz") => Self::Svg,
            Some("ico") => Self::Icon,
            _ => Self::Other,
        }
    }

    /// MIME type for a `data:` reference; unrecognised extensions get the
    /// generic `image/*`.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Svg => "image/svg+xml",
            Self::Icon => "image/x-icon",
            Self::Other => "image/*",
        }
    }

    /// ImageMagick coder name, for raster formats only.
    pub fn coder(&self) -> Option<&'static str> {
        match self {
            Self::Png => Some("png"),
            Self::Jpeg => Some("jpeg"),
            Self::Gif => Some("gif"),
            Self::Webp => Some("webp"),
            Self::Bmp => Some("bmp"),
            Self::Svg | Self::Icon | Self::Other => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("I/m/Dog.png", "image/png")]
    #[case("I/m/Dog.JPG", "image/jpeg")]
    #[case("-/logo.svg", "image/svg+xml")]
    #[case("I/m/Dog", "image/*")]
    #[case("I/m/Dog.tiff", "image/*")]
    fn mime_follows_extension(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(ImageFormat::from_path(path).mime(), expected);
    }

    #[test]
    fn vectors_have_no_coder() {
        assert_eq!(ImageFormat::Svg.coder(), None);
        assert_eq!(ImageFormat::Jpeg.coder(), Some("jpeg"));
    }
}
