use std::{fs::File, path::Path};

use anyhow::Context as _;
use image::RgbaImage;

use crate::{
    error::{ReelError, ReelResult},
    geom::PixelSize,
    options::GifLoop,
    sink::FrameContainer,
    timing::GifFrameDelay,
};

/// Animated GIF container writer backed by the `gif` crate.
///
/// Opened with the run's frame size, declared frame count, and loop
/// metadata. The GIF wire format only carries the clamped delay; the
/// unclamped value in [`GifFrameDelay`] is metadata for containers that can
/// honor sub-centisecond pacing.
pub struct GifContainer {
    encoder: gif::Encoder<File>,
    size: PixelSize,
    declared_frames: usize,
    written: usize,
}

impl GifContainer {
    pub fn create(
        path: &Path,
        size: PixelSize,
        declared_frames: usize,
        repeat: GifLoop,
    ) -> ReelResult<Self> {
        if size.width == 0 || size.height == 0 {
            return Err(ReelError::validation(format!(
                "gif frame size {size} has a zero dimension"
            )));
        }
        if size.width > u32::from(u16::MAX) || size.height > u32::from(u16::MAX) {
            return Err(ReelError::validation(format!(
                "gif frame size {size} exceeds the container's u16 limit"
            )));
        }

        let file = File::create(path)
            .with_context(|| format!("create gif output '{}'", path.display()))?;
        let mut encoder = gif::Encoder::new(file, size.width as u16, size.height as u16, &[])
            .map_err(|e| ReelError::encoding(format!("failed to open gif encoder: {e}")))?;

        let repeat = match repeat {
            GifLoop::Forever => gif::Repeat::Infinite,
            GifLoop::Count(n) => gif::Repeat::Finite(n),
        };
        encoder
            .set_repeat(repeat)
            .map_err(|e| ReelError::encoding(format!("failed to set gif loop metadata: {e}")))?;

        Ok(Self {
            encoder,
            size,
            declared_frames,
            written: 0,
        })
    }
}

impl FrameContainer for GifContainer {
    fn add_frame(&mut self, frame: RgbaImage, delay: GifFrameDelay) -> ReelResult<()> {
        let (width, height) = frame.dimensions();
        if PixelSize::new(width, height) != self.size {
            return Err(ReelError::validation(format!(
                "gif frame size mismatch: got {width}x{height}, expected {}",
                self.size
            )));
        }

        let mut pixels = frame.into_raw();
        let mut gif_frame =
            gif::Frame::from_rgba_speed(width as u16, height as u16, &mut pixels, 10);
        gif_frame.delay = delay.delay_centis();

        self.encoder
            .write_frame(&gif_frame)
            .map_err(|e| ReelError::encoding(format!("failed to write gif frame: {e}")))?;
        self.written += 1;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> ReelResult<()> {
        if self.written == 0 {
            return Err(ReelError::encoding("no gif frames were written"));
        }
        if self.written != self.declared_frames {
            tracing::warn!(
                declared = self.declared_frames,
                written = self.written,
                "gif finalized with fewer frames than declared"
            );
        }
        // Dropping the encoder writes the trailer.
        Ok(())
    }
}
