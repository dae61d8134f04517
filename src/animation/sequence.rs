// Tue Jan 13 2026 - Alex

use crate::config::Config;
use crate::engine::handler::ArtifactPaths;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SequenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Frame {0} was never rendered")]
    MissingFrame(usize),
    #[error("No frames to finalize")]
    Empty,
}

/// The numbered frame files after finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalSequence {
    pub frames: usize,
    /// Holes covered by repeating the previous frame.
    pub filled: usize,
    pub pattern: PathBuf,
}

/// Turns the rendered frames into a gapless sequence with a still lead-in
/// and a held final frame.
#[derive(Debug, Clone)]
pub struct SequenceFinalizer {
    paths: ArtifactPaths,
    lead_in: usize,
    hold: usize,
}

impl SequenceFinalizer {
    pub fn new(paths: ArtifactPaths, lead_in: usize, hold: usize) -> Self {
        Self { paths, lead_in, hold }
    }

    pub fn from_config(paths: ArtifactPaths, config: &Config) -> Self {
        let fr = config.framerate as f64;
        Self::new(
            paths,
            (config.start_delay * fr).floor() as usize,
            (config.end_delay * fr).floor() as usize,
        )
    }

    pub fn lead_in(&self) -> usize {
        self.lead_in
    }

    pub fn hold(&self) -> usize {
        self.hold
    }

    pub fn finalize(&self, total: usize) -> Result<FinalSequence, SequenceError> {
        if total == 0 {
            return Err(SequenceError::Empty);
        }

        let filled = self.fill_holes(total)?;
        if filled > 0 {
            log::warn!("{} of {} frames were missing and have been duplicated", filled, total);
        }

        let last = self.frame(total - 1);
        for i in 0..self.hold {
            fs::copy(&last, self.frame(total + self.lead_in + i))?;
        }

        if self.lead_in > 0 {
            for i in (0..total).rev() {
                fs::rename(self.frame(i), self.frame(self.lead_in + i))?;
            }
            let first = self.frame(self.lead_in);
            for i in 0..self.lead_in {
                fs::copy(&first, self.frame(i))?;
            }
        }

        let frames = total + self.lead_in + self.hold;
        log::info!("Finalized sequence of {} frames", frames);

        Ok(FinalSequence {
            frames,
            filled,
            pattern: self.paths.frame_pattern(),
        })
    }

    fn fill_holes(&self, total: usize) -> Result<usize, SequenceError> {
        let mut filled = 0;
        for i in 0..total {
            let path = self.frame(i);
            if path.exists() {
                continue;
            }
            if i == 0 {
                return Err(SequenceError::MissingFrame(0));
            }
            log::debug!("Frame {} missing, repeating frame {}", i, i - 1);
            fs::copy(self.frame(i - 1), &path)?;
            filled += 1;
        }
        Ok(filled)
    }

    fn frame(&self, seq: usize) -> PathBuf {
        self.paths.frame(Some(seq as u32))
    }
}
