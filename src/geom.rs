use serde::{Deserialize, Serialize};

/// A frame size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Uniform scale, rounded to whole pixels. A factor small enough to
    /// collapse an axis to zero yields a zero dimension; rasterization
    /// rejects those downstream.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            width: (f64::from(self.width) * factor).round() as u32,
            height: (f64::from(self.height) * factor).round() as u32,
        }
    }
}

impl std::fmt::Display for PixelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Largest dimension the encoder accepts before frames are fit into one of
/// the bounding boxes below.
const MAX_EDGE: u32 = 1920;
const LANDSCAPE_BOX: PixelSize = PixelSize::new(1920, 1080);
const PORTRAIT_BOX: PixelSize = PixelSize::new(1080, 1920);
const ALIGN: u32 = 16;

/// Compute the canonical frame size for one encoding run from the first
/// frame's natural size. Called exactly once per run; every frame is then
/// normalized to the result.
///
/// Sizes within 1920x1920 are kept as-is apart from alignment up to the
/// next multiple of 16. Larger sources are aspect-fit into 1920x1080
/// (landscape, width > height) or 1080x1920 (portrait) and aligned to the
/// nearest multiple of 16 with ties rounding down, which keeps the result
/// inside the bounding box. Both axes are never below 16.
pub fn canonical_size(natural: PixelSize) -> PixelSize {
    if natural.width <= MAX_EDGE && natural.height <= MAX_EDGE {
        return PixelSize::new(
            align_ceil(f64::from(natural.width)),
            align_ceil(f64::from(natural.height)),
        );
    }

    let bounds = if natural.width > natural.height {
        LANDSCAPE_BOX
    } else {
        PORTRAIT_BOX
    };
    let (w, h) = aspect_fit(natural, bounds);
    PixelSize::new(align_nearest(w), align_nearest(h))
}

/// Largest size with `natural`'s aspect ratio that fits inside `bounds`.
fn aspect_fit(natural: PixelSize, bounds: PixelSize) -> (f64, f64) {
    let scale = (f64::from(bounds.width) / f64::from(natural.width))
        .min(f64::from(bounds.height) / f64::from(natural.height));
    (
        f64::from(natural.width) * scale,
        f64::from(natural.height) * scale,
    )
}

fn align_ceil(v: f64) -> u32 {
    let aligned = (v / f64::from(ALIGN)).ceil() as u32 * ALIGN;
    aligned.max(ALIGN)
}

/// Nearest multiple of 16 with ties rounding down. Fitted sizes are at most
/// the box edge, and both box edges sit on a multiple or an exact half-step
/// of 16, so the aligned value never leaves the box.
fn align_nearest(v: f64) -> u32 {
    let aligned = (v / f64::from(ALIGN) - 0.5).ceil() as u32 * ALIGN;
    aligned.max(ALIGN)
}
