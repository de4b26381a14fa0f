//! Panels: where frame-sized buffers end up.
//!
//! The hardware driver is an external program. [`CommandPanel`] hands it a
//! PNG path; [`FilePanel`] just writes the PNG, which is handy on a desktop
//! or behind a file watcher.

use crate::errors::{DisplayError, Result};
use ecal_common::FrameSize;
use ecal_sync::ProcessRunner;
use futures::future::BoxFuture;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// A display surface of fixed resolution.
pub trait Panel: Send {
    fn size(&self) -> FrameSize;

    /// Paint `image`, which must be exactly [`size`](Self::size).
    fn show<'a>(&'a mut self, image: &'a RgbImage) -> BoxFuture<'a, Result<()>>;
}

/// Fails unless `image` is exactly `expected`.
pub fn check_size(expected: FrameSize, image: &RgbImage) -> Result<()> {
    let actual = FrameSize::new(image.width(), image.height());
    if actual != expected {
        return Err(DisplayError::SizeMismatch { expected, actual });
    }
    Ok(())
}

/// Runs a driver program with the path of a temporary PNG appended to its
/// arguments.
pub struct CommandPanel {
    size: FrameSize,
    program: String,
    args: Vec<String>,
    runner: ProcessRunner,
}

impl CommandPanel {
    pub fn new(
        size: FrameSize,
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            size,
            program: program.into(),
            args,
            runner: ProcessRunner::new(timeout),
        }
    }
}

impl Panel for CommandPanel {
    fn size(&self) -> FrameSize {
        self.size
    }

    fn show<'a>(&'a mut self, image: &'a RgbImage) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            check_size(self.size, image)?;

            let file = tempfile::Builder::new()
                .prefix("ecal-frame-")
                .suffix(".png")
                .tempfile()?;
            let png = ecal_image::encode_png(image)?;
            tokio::fs::write(file.path(), png).await?;

            let mut args = self.args.clone();
            args.push(file.path().to_string_lossy().into_owned());
            debug!("Running {} {:?}", self.program, args);

            let outcome = self.runner.run(&self.program, &args).await?;
            outcome
                .into_result(&self.program)
                .map_err(|e| DisplayError::Driver(e.to_string()))?;
            info!("Panel updated via {}", self.program);
            Ok(())
        })
    }
}

/// Writes each frame to a PNG file, replacing it atomically.
pub struct FilePanel {
    size: FrameSize,
    path: PathBuf,
}

impl FilePanel {
    pub fn new(size: FrameSize, path: impl Into<PathBuf>) -> Self {
        Self {
            size,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Panel for FilePanel {
    fn size(&self) -> FrameSize {
        self.size
    }

    fn show<'a>(&'a mut self, image: &'a RgbImage) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            check_size(self.size, image)?;
            let png = ecal_image::encode_png(image)?;
            let tmp = self.path.with_extension("png.tmp");
            tokio::fs::write(&tmp, png).await?;
            tokio::fs::rename(&tmp, &self.path).await?;
            info!("Frame written to {}", self.path.display());
            Ok(())
        })
    }
}
