use crate::error::{ReelError, ReelResult};

/// Temporal schedule for one movie run.
///
/// The source list is played back `iterations` times at a constant
/// `fps`; the repetition exists only in presentation-time progression, the
/// sequencer never duplicates buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovieTimingPlan {
    /// `ceil(duration / loop_duration)` passes over the source list.
    pub iterations: u32,
    /// `ceil(frame_count / loop_duration)` frames per second.
    pub fps: u32,
    /// `frame_count * iterations`, the total number of appended frames.
    pub total_frames: u64,
}

impl MovieTimingPlan {
    pub fn plan(
        duration_secs: f64,
        loop_duration_secs: f64,
        frame_count: usize,
    ) -> ReelResult<Self> {
        if frame_count < 2 {
            return Err(ReelError::NoImages);
        }
        if duration_secs <= 0.0 || loop_duration_secs <= 0.0 {
            return Err(ReelError::DurationZero);
        }

        let iterations = (duration_secs / loop_duration_secs).ceil() as u32;
        let fps = (frame_count as f64 / loop_duration_secs).ceil() as u32;
        Ok(Self {
            iterations,
            fps,
            total_frames: frame_count as u64 * u64::from(iterations),
        })
    }

    /// Presentation time of the frame at `cursor`, in seconds.
    pub fn presentation_time(&self, cursor: u64) -> f64 {
        cursor as f64 / f64::from(self.fps)
    }
}

/// Smallest frame duration animated-image viewers reliably honor.
pub const MIN_GIF_FRAME_SECS: f64 = 0.1;

/// Per-frame delay pair for the animated-image path.
///
/// `unclamped_secs` carries the exact requested pacing for metadata
/// fidelity; `clamped_secs` respects [`MIN_GIF_FRAME_SECS`] and is what the
/// GIF wire format actually encodes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GifFrameDelay {
    pub unclamped_secs: f64,
    pub clamped_secs: f64,
}

impl GifFrameDelay {
    pub fn plan(duration_secs: f64, frame_count: usize) -> ReelResult<Self> {
        if frame_count < 2 {
            return Err(ReelError::NoImages);
        }
        if duration_secs <= 0.0 {
            return Err(ReelError::DurationZero);
        }

        let unclamped_secs = duration_secs / frame_count as f64;
        Ok(Self {
            unclamped_secs,
            clamped_secs: unclamped_secs.max(MIN_GIF_FRAME_SECS),
        })
    }

    /// Clamped delay in the GIF container's unit, hundredths of a second.
    pub fn delay_centis(&self) -> u16 {
        (self.clamped_secs * 100.0 + 0.5).min(f64::from(u16::MAX)) as u16
    }
}
