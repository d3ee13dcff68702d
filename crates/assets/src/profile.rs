use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Absolute ceiling for any inlined asset, recompressed or not.
pub const MAX_INLINE_BYTES: usize = 300 * 1024;

/// A named bundle of image transforms applied when an asset has to shrink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Bounded to 640px, colour kept, targeting 50 KiB.
    Moderate,
    /// Bounded to 320px, posterized greyscale with dithering, targeting 15 KiB.
    #[default]
    Aggressive,
}

impl Profile {
    /// Assets at or below this size are inlined as they are.
    pub fn target_bytes(&self) -> usize {
        match self {
            Self::Moderate => 50 * 1024,
            Self::Aggressive => 15 * 1024,
        }
    }

    /// ImageMagick operators, placed between the input and output arguments.
    pub fn arguments(&self) -> &'static [&'static str] {
        match self {
            Self::Moderate => &["-resize", "640x640>", "-strip", "-quality", "60"],
            Self::Aggressive => &[
                "-resize",
                "320x320>",
                "-strip",
                "-colorspace",
                "Gray",
                "-dither",
                "FloydSteinberg",
                "-posterize",
                "8",
                "-quality",
                "30",
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        }
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "moderate" => Ok(Self::Moderate),
            "aggressive" => Ok(Self::Aggressive),
            _ => exn::bail!(ErrorKind::UnknownProfile(s.to_string())),
        }
    }
}

/// What the rewriter does with image references.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssetPolicy {
    /// Leave every reference alone.
    #[default]
    Disabled,
    /// Inline images up to the absolute ceiling.
    Inline,
    /// Inline images, recompressing those above the profile's target first.
    Recompress(Profile),
}

impl AssetPolicy {
    pub fn from_flags(inline_images: bool, recompress: Option<Profile>) -> Self {
        match (inline_images, recompress) {
            (_, Some(profile)) => Self::Recompress(profile),
            (true, None) => Self::Inline,
            (false, None) => Self::Disabled,
        }
    }
}
