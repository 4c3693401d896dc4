use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
};

use image::{DynamicImage, Rgba, RgbaImage};
use stillreel::{
    GifLoop, GifOptions, PixelSize, PixelSource, ReelError, ReelResult, create_gif_to,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn temp_out(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("stillreel-gif-test-{tag}-{}.gif", std::process::id()))
}

fn solid(color: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 20, Rgba(color)))
}

fn gif_options() -> GifOptions {
    GifOptions {
        duration_secs: 3.0,
        scale: 1.0,
        repeat: GifLoop::Forever,
        skips_failed_frames: false,
        overwrite: true,
    }
}

/// Source whose rasterization always fails, to exercise the abort path
/// end to end.
struct BrokenSource;

impl PixelSource for BrokenSource {
    fn natural_size(&self) -> PixelSize {
        PixelSize::new(20, 20)
    }

    fn rasterize(&self, _target: PixelSize) -> ReelResult<RgbaImage> {
        Err(ReelError::normalization("broken test source"))
    }
}

/// Source wrapper so a run can mix working and broken frames.
enum TestSource {
    Ok(DynamicImage),
    Broken,
}

impl PixelSource for TestSource {
    fn natural_size(&self) -> PixelSize {
        match self {
            TestSource::Ok(img) => img.natural_size(),
            TestSource::Broken => BrokenSource.natural_size(),
        }
    }

    fn rasterize(&self, target: PixelSize) -> ReelResult<RgbaImage> {
        match self {
            TestSource::Ok(img) => img.rasterize(target),
            TestSource::Broken => BrokenSource.rasterize(target),
        }
    }
}

#[test]
fn three_frames_encode_to_a_gif_payload() {
    init_tracing();
    let out = temp_out("ok");
    let images = vec![
        solid([255, 0, 0, 255]),
        solid([0, 255, 0, 255]),
        solid([0, 0, 255, 255]),
    ];

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_in_cb = fired.clone();
    let (tx, rx) = mpsc::channel();

    let handle = create_gif_to(
        images,
        gif_options(),
        &out,
        Box::new(move |location, payload| {
            fired_in_cb.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send((location.to_path_buf(), payload));
        }),
    )
    .unwrap();
    handle.join().unwrap();

    let (location, payload) = rx.recv().unwrap();
    assert_eq!(location, out);
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    let bytes = payload.expect("successful run must carry the encoded bytes");
    assert!(bytes.starts_with(b"GIF89a"));
    assert_eq!(std::fs::read(&out).unwrap(), bytes);
    std::fs::remove_file(&out).ok();
}

#[test]
fn broken_frame_aborts_and_removes_partial_output() {
    init_tracing();
    let out = temp_out("abort");
    let sources = vec![
        TestSource::Ok(solid([255, 0, 0, 255])),
        TestSource::Broken,
        TestSource::Ok(solid([0, 0, 255, 255])),
    ];

    let (tx, rx) = mpsc::channel();
    let handle = create_gif_to(
        sources,
        gif_options(),
        &out,
        Box::new(move |location, payload| {
            let _ = tx.send((location.to_path_buf(), payload));
        }),
    )
    .unwrap();
    handle.join().unwrap();

    let (_, payload) = rx.recv().unwrap();
    assert!(payload.is_none(), "aborted run must not report a payload");
    assert!(!out.exists(), "partial output should be cleaned up");
}

#[test]
fn broken_frame_is_skipped_under_soft_failure_policy() {
    init_tracing();
    let out = temp_out("skip");
    let sources = vec![
        TestSource::Ok(solid([255, 0, 0, 255])),
        TestSource::Broken,
        TestSource::Ok(solid([0, 0, 255, 255])),
    ];

    let mut options = gif_options();
    options.skips_failed_frames = true;

    let (tx, rx) = mpsc::channel();
    let handle = create_gif_to(
        sources,
        options,
        &out,
        Box::new(move |location, payload| {
            let _ = tx.send((location.to_path_buf(), payload));
        }),
    )
    .unwrap();
    handle.join().unwrap();

    let (_, payload) = rx.recv().unwrap();
    let bytes = payload.expect("skipping run should still finalize");
    assert!(bytes.starts_with(b"GIF89a"));
    std::fs::remove_file(&out).ok();
}

#[test]
fn single_image_fails_preflight_before_touching_the_filesystem() {
    let out = temp_out("preflight-count");
    let err = create_gif_to(
        vec![solid([1, 2, 3, 255])],
        gif_options(),
        &out,
        Box::new(|_: &Path, _| panic!("callback must not fire on pre-flight failure")),
    )
    .unwrap_err();
    assert!(matches!(err, ReelError::NoImages));
    assert!(!out.exists());
}

#[test]
fn zero_duration_fails_preflight() {
    let mut options = gif_options();
    options.duration_secs = 0.0;
    let err = create_gif_to(
        vec![solid([0, 0, 0, 255]), solid([9, 9, 9, 255])],
        options,
        temp_out("preflight-duration"),
        Box::new(|_: &Path, _| panic!("callback must not fire on pre-flight failure")),
    )
    .unwrap_err();
    assert!(matches!(err, ReelError::DurationZero));
}

#[test]
fn existing_output_respects_overwrite_policy() {
    let out = temp_out("overwrite");
    std::fs::write(&out, b"old contents").unwrap();

    let mut options = gif_options();
    options.overwrite = false;
    let err = create_gif_to(
        vec![solid([1, 1, 1, 255]), solid([2, 2, 2, 255])],
        options,
        &out,
        Box::new(|_: &Path, _| panic!("callback must not fire on pre-flight failure")),
    )
    .unwrap_err();
    assert!(matches!(err, ReelError::OutputExists(_)));
    assert_eq!(std::fs::read(&out).unwrap(), b"old contents");

    // With overwrite enabled the stale file is replaced by a fresh encode.
    let (tx, rx) = mpsc::channel();
    let handle = create_gif_to(
        vec![solid([1, 1, 1, 255]), solid([2, 2, 2, 255])],
        gif_options(),
        &out,
        Box::new(move |_, payload| {
            let _ = tx.send(payload);
        }),
    )
    .unwrap();
    handle.join().unwrap();
    let bytes = rx.recv().unwrap().expect("overwriting run should succeed");
    assert!(bytes.starts_with(b"GIF89a"));
    std::fs::remove_file(&out).ok();
}

#[test]
fn scale_factor_shrinks_the_logical_screen() {
    init_tracing();
    let out = temp_out("scale");
    let mut options = gif_options();
    options.scale = 0.5;

    let (tx, rx) = mpsc::channel();
    let handle = create_gif_to(
        vec![solid([10, 20, 30, 255]), solid([40, 50, 60, 255])],
        options,
        &out,
        Box::new(move |_, payload| {
            let _ = tx.send(payload);
        }),
    )
    .unwrap();
    handle.join().unwrap();
    let bytes = rx.recv().unwrap().unwrap();

    // Logical screen descriptor: width at offset 6, height at offset 8 (LE).
    let width = u16::from_le_bytes([bytes[6], bytes[7]]);
    let height = u16::from_le_bytes([bytes[8], bytes[9]]);
    assert_eq!((width, height), (10, 10));
    std::fs::remove_file(&out).ok();
}
