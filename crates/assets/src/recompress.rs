use crate::error::{ErrorKind, Result};
use crate::{ImageFormat, Profile};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::instrument;

/// Shrinks raster images.
///
/// Implementations need not bound their own running time; the rewriter wraps
/// every call in a timeout and drops the future when it fires.
#[async_trait]
pub trait Recompressor: Send + Sync {
    async fn recompress(&self, bytes: &[u8], format: ImageFormat, profile: Profile) -> Result<Vec<u8>>;
}

/// ImageMagick, driven through stdin/stdout.
#[derive(Clone, Debug)]
pub struct ImageMagick {
    path: PathBuf,
}

impl ImageMagick {
    /// Locate the tool: an explicit path if given, otherwise `magick` (v7)
    /// or `convert` (v6) on `PATH`.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(explicit) = explicit {
            return match which::which(explicit) {
                Ok(path) => Ok(Self { path }),
                Err(_) => exn::bail!(ErrorKind::ToolMissing(explicit.to_path_buf())),
            };
        }
        for exe in ["magick", "convert"] {
            if let Ok(path) = which::which(exe) {
                tracing::debug!(path = %path.display(), "Discovered ImageMagick");
                return Ok(Self { path });
            }
        }
        tracing::info!("ImageMagick executable not found in PATH");
        exn::bail!(ErrorKind::ToolNotFound);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Recompressor for ImageMagick {
    #[instrument(level = "trace", skip(self, bytes), fields(input_size = bytes.len(), output_size))]
    async fn recompress(&self, bytes: &[u8], format: ImageFormat, profile: Profile) -> Result<Vec<u8>> {
        let coder = format.coder().ok_or_raise(|| ErrorKind::Unsupported(format.mime()))?;
        let mut child = Command::new(&self.path)
            .arg(format!("{coder}:-"))
            .args(profile.arguments())
            .arg(format!("{coder}:-"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out call drops this future, and the child with it.
            .kill_on_drop(true)
            .spawn()
            .or_raise(|| ErrorKind::Spawn)?;

        let mut stdin = child.stdin.take().ok_or_raise(|| ErrorKind::Spawn)?;
        let feed = async move {
            stdin.write_all(bytes).await?;
            stdin.shutdown().await
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.or_raise(|| ErrorKind::Io)?;
        if !output.status.success() {
            tracing::debug!(stderr = %String::from_utf8_lossy(&output.stderr), "ImageMagick failed");
            exn::bail!(ErrorKind::ToolFailed(output.status.code()));
        }
        fed.or_raise(|| ErrorKind::Io)?;
        tracing::Span::current().record("output_size", output.stdout.len());
        Ok(output.stdout)
    }
}
