//! Frame sources: where encoded frames come from
//!
//! The player never talks to storage directly. It hands a `Locator` to a
//! `FrameSource` on a worker thread and gets back a decoded frame or an error.
//! `DirSource` reads a local mirror of the static file server layout.

use log::trace;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::addressing::Locator;
use super::frame::{FrameError, FrameImage};

/// Fetch and decode one frame. Called from worker threads.
pub trait FrameSource: Send + Sync {
    fn fetch(&self, locator: &Locator) -> Result<FrameImage, FrameError>;

    /// Human-readable address for logs
    fn describe(&self, locator: &Locator) -> String;
}

impl<T: FrameSource + ?Sized> FrameSource for Arc<T> {
    fn fetch(&self, locator: &Locator) -> Result<FrameImage, FrameError> {
        (**self).fetch(locator)
    }

    fn describe(&self, locator: &Locator) -> String {
        (**self).describe(locator)
    }
}

/// Reads frames from `{root}/Webp Sequence {seq}/frame_{idx:03}_delay-0.04s.webp`
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, locator: &Locator) -> PathBuf {
        self.root.join(locator.relative_path())
    }
}

impl FrameSource for DirSource {
    fn fetch(&self, locator: &Locator) -> Result<FrameImage, FrameError> {
        let path = self.path_for(locator);
        trace!("Reading frame: {}", path.display());
        let bytes = std::fs::read(&path)
            .map_err(|e| FrameError::Io(format!("{}: {}", path.display(), e)))?;
        FrameImage::decode(&bytes)
    }

    fn describe(&self, locator: &Locator) -> String {
        self.path_for(locator).display().to_string()
    }
}
