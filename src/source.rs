use image::{DynamicImage, RgbaImage, imageops::FilterType};

use crate::{
    error::{ReelError, ReelResult},
    geom::PixelSize,
};

/// A still frame the pipeline can size and rasterize.
///
/// Sources are read-only inputs; the pipeline never mutates them. This is
/// also the seam where tests inject rasterization failures to exercise the
/// skip/abort policies.
pub trait PixelSource {
    /// The source's native resolution.
    fn natural_size(&self) -> PixelSize;

    /// Produce an RGBA8 raster scaled to exactly fill `target`.
    ///
    /// The source's aspect ratio is *not* preserved here; aspect handling
    /// happens in [`canonical_size`](crate::geom::canonical_size) before the
    /// target is chosen.
    fn rasterize(&self, target: PixelSize) -> ReelResult<RgbaImage>;
}

impl PixelSource for DynamicImage {
    fn natural_size(&self) -> PixelSize {
        PixelSize::new(self.width(), self.height())
    }

    fn rasterize(&self, target: PixelSize) -> ReelResult<RgbaImage> {
        if self.width() == 0 || self.height() == 0 {
            return Err(ReelError::normalization("source image has a zero dimension"));
        }
        if target.width == 0 || target.height == 0 {
            return Err(ReelError::normalization(format!(
                "cannot rasterize to degenerate target {target}"
            )));
        }
        Ok(self
            .resize_exact(target.width, target.height, FilterType::Lanczos3)
            .to_rgba8())
    }
}
