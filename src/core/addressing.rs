//! Frame addressing: absolute frame index -> sequence locator -> retrieval path
//!
//! Frame indices are 0-based across all sequences. The file server numbers
//! sequences from 1 and pads the in-sequence index to `FRAME_PAD_WIDTH` digits:
//!
//! ```text
//! {base}/Webp%20Sequence%20{seq}/frame_{frame:03}_delay-0.04s.webp
//! ```

use std::path::PathBuf;

use crate::config::{AnimConfig, FRAME_PAD_WIDTH};

/// Where a single frame lives on the file server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    /// 1-based sequence number
    pub sequence: usize,
    /// 0-based index inside the sequence
    pub frame_in_sequence: usize,
}

impl Locator {
    /// In-sequence index padded to `FRAME_PAD_WIDTH` digits ("000".."191")
    pub fn padded_index(&self) -> String {
        format!("{:0width$}", self.frame_in_sequence, width = FRAME_PAD_WIDTH)
    }

    pub fn file_name(&self) -> String {
        format!("frame_{}_delay-0.04s.webp", self.padded_index())
    }

    /// Directory name as stored on disk (unescaped)
    pub fn sequence_dir(&self) -> String {
        format!("Webp Sequence {}", self.sequence)
    }

    /// URL under `base` with the space in the directory name percent-encoded
    pub fn url(&self, base: &str) -> String {
        format!(
            "{}/Webp%20Sequence%20{}/{}",
            base.trim_end_matches('/'),
            self.sequence,
            self.file_name()
        )
    }

    /// Path relative to a local mirror of the file server
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.sequence_dir()).join(self.file_name())
    }
}

/// Map an absolute frame index to its locator.
///
/// Returns `None` outside `[0, total_frames)`.
pub fn locate(frame: usize, config: &AnimConfig) -> Option<Locator> {
    if frame >= config.total_frames() {
        return None;
    }
    Some(Locator {
        sequence: frame / config.frames_per_sequence + 1,
        frame_in_sequence: frame % config.frames_per_sequence,
    })
}
