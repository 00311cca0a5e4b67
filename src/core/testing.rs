//! Test doubles shared by the core unit tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::addressing::Locator;
use super::canvas::{SourceRect, Surface};
use super::frame::{FrameError, FrameImage};
use super::source::FrameSource;
use super::workers::{Job, WorkerPool};

/// In-memory source: solid frames, configurable failures, per-frame fetch counts
pub struct ScriptedSource {
    frames_per_sequence: usize,
    failing: HashSet<usize>,
    size: (u32, u32),
    fetches: Mutex<HashMap<usize, usize>>,
}

impl ScriptedSource {
    /// `frames_per_sequence` must match the config under test so locators
    /// map back to the right absolute frames
    pub fn new(frames_per_sequence: usize) -> Self {
        Self {
            frames_per_sequence,
            failing: HashSet::new(),
            size: (4, 4),
            fetches: Mutex::new(HashMap::new()),
        }
    }

    /// Absolute frame indices that fail to load
    pub fn failing(mut self, frames: impl IntoIterator<Item = usize>) -> Self {
        self.failing = frames.into_iter().collect();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    fn absolute(&self, locator: &Locator) -> usize {
        (locator.sequence - 1) * self.frames_per_sequence + locator.frame_in_sequence
    }

    pub fn fetch_count(&self, frame: usize) -> usize {
        self.fetches.lock().unwrap().get(&frame).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }
}

impl FrameSource for ScriptedSource {
    fn fetch(&self, locator: &Locator) -> Result<FrameImage, FrameError> {
        let frame = self.absolute(locator);
        *self.fetches.lock().unwrap().entry(frame).or_default() += 1;
        if self.failing.contains(&frame) {
            return Err(FrameError::Unavailable(format!("scripted failure for frame {}", frame)));
        }
        let shade = (frame % 256) as u8;
        Ok(FrameImage::solid(self.size.0, self.size.1, [shade, shade, shade, 255]))
    }

    fn describe(&self, locator: &Locator) -> String {
        format!("memory://{}", self.absolute(locator))
    }
}

/// Holds jobs until the test releases them
#[derive(Default)]
pub struct ManualPool {
    jobs: Mutex<Vec<Job>>,
}

impl ManualPool {
    pub fn queued(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Run the first `n` queued jobs in issue order
    pub fn run(&self, n: usize) {
        let batch: Vec<Job> = {
            let mut jobs = self.jobs.lock().unwrap();
            let n = n.min(jobs.len());
            jobs.drain(..n).collect()
        };
        for job in batch {
            job();
        }
    }

    pub fn run_all(&self) {
        let n = self.queued();
        self.run(n);
    }
}

impl WorkerPool for ManualPool {
    fn execute(&self, job: Job) {
        self.jobs.lock().unwrap().push(job);
    }
}

/// Surface that records operations instead of drawing
#[derive(Debug, Default)]
pub struct ProbeSurface {
    pub size: (u32, u32),
    pub clears: usize,
    pub resizes: usize,
    pub blits: Vec<SourceRect>,
}

impl ProbeSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            ..Default::default()
        }
    }
}

impl Surface for ProbeSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.resizes += 1;
    }

    fn clear(&mut self) {
        self.clears += 1;
    }

    fn draw_image(&mut self, _image: &FrameImage, src: SourceRect) {
        self.blits.push(src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_source_maps_locators() {
        let source = ScriptedSource::new(16).failing([17]);
        let failed = source.fetch(&Locator { sequence: 2, frame_in_sequence: 1 });
        assert!(matches!(failed, Err(FrameError::Unavailable(_))));
        assert!(source.fetch(&Locator { sequence: 2, frame_in_sequence: 7 }).is_ok());
        assert_eq!(source.fetch_count(17), 1);
        assert_eq!(source.fetch_count(23), 1);
        assert_eq!(source.describe(&Locator { sequence: 1, frame_in_sequence: 3 }), "memory://3");
    }
}
