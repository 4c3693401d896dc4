use std::{
    path::{Path, PathBuf},
    thread,
};

use crate::{
    encode_ffmpeg::{FfmpegConfig, FfmpegSink, MOVIE_BITRATE_BPS},
    error::{ReelError, ReelResult},
    geom::{PixelSize, canonical_size},
    normalize::normalize_frame,
    notify::{Completion, NotifyContext, RunHandle},
    options::{MovieOptions, preflight_output},
    sink::{EncoderSink, SinkStatus},
    source::PixelSource,
    timing::MovieTimingPlan,
};

/// Sequencer state. `Failed` is reachable from any state; `Finished` and
/// `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Writing,
    Draining,
    Finished,
    Failed,
}

/// Encode `sources` as a looped movie at the default temporary-directory
/// output location.
pub fn write_movie<S>(
    sources: Vec<S>,
    options: MovieOptions,
    on_complete: Completion,
) -> ReelResult<RunHandle>
where
    S: PixelSource + Send + 'static,
{
    write_movie_to(sources, options, MovieOptions::default_output_path(), on_complete)
}

/// Encode `sources` as a looped movie at `out_path`.
///
/// Pre-flight failures (`NoImages`, `DurationZero`, `OutputExists`) return
/// synchronously before any background work starts. Everything after that is
/// reported exclusively through `on_complete`: `(location, Some(bytes))` on
/// success, `(location, None)` on any runtime failure. The callback fires
/// exactly once per run.
pub fn write_movie_to<S>(
    sources: Vec<S>,
    options: MovieOptions,
    out_path: impl Into<PathBuf>,
    on_complete: Completion,
) -> ReelResult<RunHandle>
where
    S: PixelSource + Send + 'static,
{
    write_movie_on(sources, options, out_path, NotifyContext::default(), on_complete)
}

/// [`write_movie_to`] with an explicit completion dispatch context.
pub fn write_movie_on<S>(
    sources: Vec<S>,
    options: MovieOptions,
    out_path: impl Into<PathBuf>,
    notify: NotifyContext,
    on_complete: Completion,
) -> ReelResult<RunHandle>
where
    S: PixelSource + Send + 'static,
{
    let out_path = out_path.into();
    options.validate(sources.len())?;
    preflight_output(&out_path, options.overwrite)?;

    // The canonical size is computed exactly once per run, from the first
    // frame; every frame is normalized to it.
    let canonical = canonical_size(sources[0].natural_size());
    let plan = MovieTimingPlan::plan(
        options.duration_secs,
        options.loop_duration_secs,
        sources.len(),
    )?;

    // One dedicated lane per run; concurrent runs never share cursor or
    // buffer state.
    let worker_path = out_path.clone();
    let join = thread::Builder::new()
        .name("stillreel-movie".into())
        .spawn(move || {
            let payload = run_to_completion(&sources, plan, canonical, &worker_path);
            notify.dispatch(Box::new(move || on_complete(&worker_path, payload)));
        })
        .map_err(|e| ReelError::encoding(format!("failed to spawn movie worker: {e}")))?;

    Ok(RunHandle::new(join))
}

fn run_to_completion<S: PixelSource>(
    sources: &[S],
    plan: MovieTimingPlan,
    canonical: PixelSize,
    out_path: &Path,
) -> Option<Vec<u8>> {
    let cfg = FfmpegConfig {
        width: canonical.width,
        height: canonical.height,
        fps: plan.fps,
        bitrate_bps: MOVIE_BITRATE_BPS,
        out_path: out_path.to_path_buf(),
    };
    let mut sink = match FfmpegSink::open(cfg) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to open encoder sink");
            return None;
        }
    };

    match MovieRun::new(sources, plan, canonical).drive(&mut sink) {
        Ok(SinkStatus::Completed) => match std::fs::read(out_path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read back encoded movie");
                None
            }
        },
        Ok(SinkStatus::Failed(reason)) => {
            tracing::warn!(%reason, "encoder sink reported failure");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "movie run failed");
            None
        }
    }
}

/// One movie encoding run: exclusive owner of its cursor and in-flight
/// buffer, driven on the run's worker lane.
pub(crate) struct MovieRun<'a, S> {
    sources: &'a [S],
    plan: MovieTimingPlan,
    canonical: PixelSize,
    cursor: u64,
    phase: Phase,
}

impl<'a, S: PixelSource> MovieRun<'a, S> {
    pub(crate) fn new(sources: &'a [S], plan: MovieTimingPlan, canonical: PixelSize) -> Self {
        Self {
            sources,
            plan,
            canonical,
            cursor: 0,
            phase: Phase::Idle,
        }
    }

    /// Feed every scheduled frame to `sink`, respecting its readiness
    /// signal, then drain it and return its terminal status.
    pub(crate) fn drive(mut self, sink: &mut dyn EncoderSink) -> ReelResult<SinkStatus> {
        match self.drive_inner(sink) {
            Ok(status) => {
                self.transition(if status == SinkStatus::Completed {
                    Phase::Finished
                } else {
                    Phase::Failed
                });
                Ok(status)
            }
            Err(e) => {
                self.transition(Phase::Failed);
                Err(e)
            }
        }
    }

    fn drive_inner(&mut self, sink: &mut dyn EncoderSink) -> ReelResult<SinkStatus> {
        self.transition(Phase::Writing);
        while self.cursor < self.plan.total_frames {
            sink.wait_until_ready()?;
            // Drain while capacity lasts, re-checking readiness after every
            // push; at most one append is in flight at a time.
            while sink.is_ready() && self.cursor < self.plan.total_frames {
                // Cyclic index into the original source list: iteration
                // repetition exists only in presentation-time progression,
                // never in buffer re-allocation.
                let index = (self.cursor % self.sources.len() as u64) as usize;
                let frame = normalize_frame(&self.sources[index], self.canonical)?;
                sink.append(frame, self.plan.presentation_time(self.cursor))?;
                self.cursor += 1;
            }
        }

        self.transition(Phase::Draining);
        sink.close_input();
        Ok(sink.finish())
    }

    fn transition(&mut self, next: Phase) {
        tracing::debug!(from = ?self.phase, to = ?next, cursor = self.cursor, "movie sequencer");
        self.phase = next;
    }
}
