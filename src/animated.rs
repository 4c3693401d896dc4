use std::{
    path::{Path, PathBuf},
    thread,
};

use crate::{
    encode_gif::GifContainer,
    error::{ReelError, ReelResult},
    geom::PixelSize,
    notify::{Completion, NotifyContext, RunHandle},
    options::{GifOptions, preflight_output},
    sink::FrameContainer,
    source::PixelSource,
    timing::GifFrameDelay,
};

/// Encode `sources` as an animated GIF at the default temporary-directory
/// output location.
pub fn create_gif<S>(
    sources: Vec<S>,
    options: GifOptions,
    on_complete: Completion,
) -> ReelResult<RunHandle>
where
    S: PixelSource + Send + 'static,
{
    create_gif_to(sources, options, GifOptions::default_output_path(), on_complete)
}

/// Encode `sources` as an animated GIF at `out_path`.
///
/// Pre-flight failures return synchronously; after that the run executes on
/// one background worker as a single synchronous pass, and the outcome is
/// reported exclusively through `on_complete`, exactly once per run.
pub fn create_gif_to<S>(
    sources: Vec<S>,
    options: GifOptions,
    out_path: impl Into<PathBuf>,
    on_complete: Completion,
) -> ReelResult<RunHandle>
where
    S: PixelSource + Send + 'static,
{
    create_gif_on(sources, options, out_path, NotifyContext::default(), on_complete)
}

/// [`create_gif_to`] with an explicit completion dispatch context.
pub fn create_gif_on<S>(
    sources: Vec<S>,
    options: GifOptions,
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

    let delay = GifFrameDelay::plan(options.duration_secs, sources.len())?;
    // Uniform scale of the first frame's natural size. Unlike the movie
    // path, no 1920-cap aspect-fit applies here.
    let scaled = sources[0].natural_size().scaled(options.scale);

    let worker_path = out_path.clone();
    let join = thread::Builder::new()
        .name("stillreel-gif".into())
        .spawn(move || {
            let payload = run_to_completion(&sources, &options, delay, scaled, &worker_path);
            notify.dispatch(Box::new(move || on_complete(&worker_path, payload)));
        })
        .map_err(|e| ReelError::encoding(format!("failed to spawn gif worker: {e}")))?;

    Ok(RunHandle::new(join))
}

fn run_to_completion<S: PixelSource>(
    sources: &[S],
    options: &GifOptions,
    delay: GifFrameDelay,
    scaled: PixelSize,
    out_path: &Path,
) -> Option<Vec<u8>> {
    let container = match GifContainer::create(out_path, scaled, sources.len(), options.repeat) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "failed to open gif container");
            discard_partial(out_path);
            return None;
        }
    };

    match push_frames(sources, options, delay, scaled, Box::new(container)) {
        Ok(()) => match std::fs::read(out_path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read back encoded gif");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "gif run aborted");
            discard_partial(out_path);
            None
        }
    }
}

/// Single straight-line pass: rasterize each frame at the scaled size and
/// submit it with its delay metadata, then finalize.
///
/// A rasterization failure either skips the frame (soft-failure policy) or
/// aborts the whole run; every other failure is fail-fast.
pub(crate) fn push_frames<S: PixelSource>(
    sources: &[S],
    options: &GifOptions,
    delay: GifFrameDelay,
    scaled: PixelSize,
    mut container: Box<dyn FrameContainer>,
) -> ReelResult<()> {
    for (index, source) in sources.iter().enumerate() {
        let frame = match source.rasterize(scaled) {
            Ok(f) => f,
            Err(e) if options.skips_failed_frames => {
                tracing::warn!(index, error = %e, "skipping frame that failed to rasterize");
                continue;
            }
            Err(e) => return Err(e),
        };
        container.add_frame(frame, delay)?;
    }
    container.finalize()
}

fn discard_partial(out_path: &Path) {
    if std::fs::remove_file(out_path).is_ok() {
        tracing::debug!(out = %out_path.display(), "removed partial gif output");
    }
}
