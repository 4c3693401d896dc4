use image::RgbaImage;

use crate::{error::ReelResult, normalize::PixelBuffer, timing::GifFrameDelay};

/// Terminal status an [`EncoderSink`] reports after its input is closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkStatus {
    Completed,
    Failed(String),
}

/// Pull-based video encoder sink.
///
/// The sequencer must only push while the sink reports ready, and re-checks
/// readiness after every push, so at most one append is ever in flight.
/// Implementations are free to realize the readiness signal however they
/// like; [`FfmpegSink`](crate::encode_ffmpeg::FfmpegSink) uses a bounded
/// frame queue in front of the encoder process.
pub trait EncoderSink: Send {
    /// Block until at least one frame can be accepted, or the sink has
    /// failed (in which case the next append surfaces the error).
    fn wait_until_ready(&mut self) -> ReelResult<()>;

    /// Non-blocking readiness probe.
    fn is_ready(&mut self) -> bool;

    /// Push one frame at the given presentation time in seconds. Ownership
    /// of the buffer transfers to the sink.
    fn append(&mut self, frame: PixelBuffer, pts_secs: f64) -> ReelResult<()>;

    /// Signal that no more frames are coming.
    fn close_input(&mut self);

    /// Wait for the sink to settle and report its terminal status. Called
    /// once, after `close_input`.
    fn finish(&mut self) -> SinkStatus;
}

/// Push-only animated-image container writer. Unbounded; no backpressure
/// protocol exists on this path.
pub trait FrameContainer {
    /// Submit one frame with its delay pair. The container decides which of
    /// the two delay values it can honor.
    fn add_frame(&mut self, frame: RgbaImage, delay: GifFrameDelay) -> ReelResult<()>;

    /// Finish the container. Consumes the writer; nothing may be appended
    /// afterwards.
    fn finalize(self: Box<Self>) -> ReelResult<()>;
}
