use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::error::{ReelError, ReelResult};

/// Immutable per-run configuration for the movie path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MovieOptions {
    /// Total output duration in seconds.
    pub duration_secs: f64,
    /// Duration of one pass over the source list, in seconds.
    pub loop_duration_secs: f64,
    /// Remove a pre-existing output file instead of failing.
    #[serde(default)]
    pub overwrite: bool,
}

impl MovieOptions {
    pub fn validate(&self, frame_count: usize) -> ReelResult<()> {
        if frame_count < 2 {
            return Err(ReelError::NoImages);
        }
        if !(self.duration_secs > 0.0 && self.duration_secs.is_finite())
            || !(self.loop_duration_secs > 0.0 && self.loop_duration_secs.is_finite())
        {
            // NaN compares false everywhere, so the positive check must be
            // phrased positively to reject it.
            return Err(ReelError::DurationZero);
        }
        Ok(())
    }

    /// Fixed temporary-directory output used when the caller does not supply
    /// an explicit location.
    pub fn default_output_path() -> PathBuf {
        std::env::temp_dir().join("stillreel-movie.mov")
    }
}

/// Container-level loop metadata for the animated-image path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GifLoop {
    #[default]
    Forever,
    Count(u16),
}

/// Immutable per-run configuration for the animated-image path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GifOptions {
    /// Total animation duration in seconds.
    pub duration_secs: f64,
    /// Uniform scale applied to the first frame's natural size. The 1920-cap
    /// aspect-fit policy of the movie path deliberately does not apply here.
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub repeat: GifLoop,
    /// Skip frames that fail to rasterize instead of aborting the run.
    #[serde(default)]
    pub skips_failed_frames: bool,
    #[serde(default)]
    pub overwrite: bool,
}

fn default_scale() -> f64 {
    1.0
}

impl GifOptions {
    pub fn validate(&self, frame_count: usize) -> ReelResult<()> {
        if frame_count < 2 {
            return Err(ReelError::NoImages);
        }
        if !(self.duration_secs > 0.0 && self.duration_secs.is_finite()) {
            return Err(ReelError::DurationZero);
        }
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(ReelError::validation(
                "gif scale factor must be positive and finite",
            ));
        }
        Ok(())
    }

    pub fn default_output_path() -> PathBuf {
        std::env::temp_dir().join("stillreel.gif")
    }
}

/// Enforce the overwrite policy before any background work starts: an
/// existing output either fails the run or is removed up front.
pub(crate) fn preflight_output(path: &Path, overwrite: bool) -> ReelResult<()> {
    if path.exists() {
        if !overwrite {
            return Err(ReelError::OutputExists(path.to_path_buf()));
        }
        std::fs::remove_file(path)
            .with_context(|| format!("remove existing output '{}'", path.display()))?;
    }
    Ok(())
}
