use crate::{
    error::ReelResult,
    geom::PixelSize,
    source::PixelSource,
};

/// An owned raw frame in the run's canonical layout: RGBA8, 4 bytes per
/// pixel, `stride >= width * 4`. A fresh buffer is allocated per frame and
/// handed to the sink for the duration of one append.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes. Always `width * 4` for buffers produced here.
    pub stride: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    pub fn expected_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }
}

/// Rasterize `source` at the run's canonical size and flatten any alpha over
/// opaque white, so the video encoder never sees premultiplied-alpha
/// artifacts. Fails if the source cannot be rasterized; there is no retry.
pub fn normalize_frame(source: &dyn PixelSource, canonical: PixelSize) -> ReelResult<PixelBuffer> {
    let rgba = source.rasterize(canonical)?;
    let (width, height) = rgba.dimensions();
    let mut data = rgba.into_raw();
    flatten_over_white(&mut data);
    Ok(PixelBuffer {
        width,
        height,
        stride: width * 4,
        data,
    })
}

/// Composite straight-alpha RGBA8 over an opaque white background, in place.
fn flatten_over_white(px: &mut [u8]) {
    for p in px.chunks_exact_mut(4) {
        let a = u16::from(p[3]);
        if a == 255 {
            continue;
        }
        // White contributes exactly `255 - a` per channel.
        let inv = 255 - a;
        p[0] = (mul_div255(u16::from(p[0]), a) + inv).min(255) as u8;
        p[1] = (mul_div255(u16::from(p[1]), a) + inv).min(255) as u8;
        p[2] = (mul_div255(u16::from(p[2]), a) + inv).min(255) as u8;
        p[3] = 255;
    }
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgba, RgbaImage};

    use super::*;

    #[test]
    fn normalize_produces_canonical_layout() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            100,
            100,
            Rgba([200, 10, 10, 255]),
        ));
        let buf = normalize_frame(&img, PixelSize::new(112, 112)).unwrap();
        assert_eq!(buf.size(), PixelSize::new(112, 112));
        assert_eq!(buf.stride, 112 * 4);
        assert_eq!(buf.data.len(), buf.expected_len());
    }

    #[test]
    fn transparent_pixels_flatten_to_white() {
        let mut px = vec![0u8, 0, 0, 0];
        flatten_over_white(&mut px);
        assert_eq!(px, vec![255, 255, 255, 255]);
    }

    #[test]
    fn half_alpha_red_flattens_over_white() {
        // Straight red @ 50% over white: r = 128*... + 127 keeps red high,
        // g/b pick up the white contribution.
        let mut px = vec![255u8, 0, 0, 128];
        flatten_over_white(&mut px);
        assert_eq!(px[0], 255);
        assert_eq!(px[1], 127);
        assert_eq!(px[2], 127);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn opaque_pixels_are_untouched() {
        let mut px = vec![1u8, 2, 3, 255];
        flatten_over_white(&mut px);
        assert_eq!(px, vec![1, 2, 3, 255]);
    }
}
