use std::{
    io::Write as _,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    sync::{
        Arc, Condvar, Mutex,
        mpsc::{Receiver, SyncSender, TrySendError, sync_channel},
    },
    thread::JoinHandle,
};

use crate::{
    error::{ReelError, ReelResult},
    normalize::PixelBuffer,
    sink::{EncoderSink, SinkStatus},
};

/// Constant bitrate applied to every movie run: 2500 kbps.
pub const MOVIE_BITRATE_BPS: u32 = 2500 * 1000;

/// Frames the sink buffers ahead of the encoder before readiness drops.
const QUEUE_DEPTH: usize = 4;

#[derive(Clone, Debug)]
pub struct FfmpegConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_bps: u32,
    pub out_path: PathBuf,
}

impl FfmpegConfig {
    pub fn validate(&self) -> ReelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ReelError::validation("encode width/height must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // yuv420p output requires even dimensions; canonical sizes are
            // multiples of 16 and always satisfy this.
            return Err(ReelError::validation(
                "encode width/height must be even (required for yuv420p output)",
            ));
        }
        if self.fps == 0 {
            return Err(ReelError::validation("encode fps must be non-zero"));
        }
        if self.bitrate_bps == 0 {
            return Err(ReelError::validation("encode bitrate must be non-zero"));
        }
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[derive(Default)]
struct QueueState {
    free: usize,
    closed: bool,
}

struct Slots {
    state: Mutex<QueueState>,
    cv: Condvar,
}

/// Video encoder sink backed by the system `ffmpeg` binary.
///
/// Raw RGBA frames are handed to a bounded queue; a writer thread owns the
/// child's stdin and drains the queue. Free queue slots are the readiness
/// signal, so the sequencer's at-most-one-in-flight-push loop gets real
/// backpressure against the encoder process.
pub struct FfmpegSink {
    cfg: FfmpegConfig,
    child: Option<Child>,
    tx: Option<SyncSender<PixelBuffer>>,
    writer: Option<JoinHandle<ReelResult<()>>>,
    slots: Arc<Slots>,
    last_pts: Option<f64>,
}

impl FfmpegSink {
    /// Spawn `ffmpeg` and open the sink at the canonical size, constant
    /// bitrate, and expected frame rate.
    ///
    /// We intentionally pipe to the system binary rather than linking
    /// FFmpeg, to avoid native dev header/lib requirements. The overwrite
    /// policy is enforced before the sink is opened, so `-y` is safe here.
    pub fn open(cfg: FfmpegConfig) -> ReelResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !is_ffmpeg_on_path() {
            return Err(ReelError::encoding(
                "ffmpeg is required for movie encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let bitrate = cfg.bitrate_bps.to_string();
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-b:v",
            &bitrate,
            "-maxrate",
            &bitrate,
            "-bufsize",
            &(cfg.bitrate_bps * 2).to_string(),
            "-movflags",
            "+faststart",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            ReelError::encoding(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::encoding("failed to open ffmpeg stdin (unexpected)"))?;

        let (tx, rx) = sync_channel::<PixelBuffer>(QUEUE_DEPTH);
        let slots = Arc::new(Slots {
            state: Mutex::new(QueueState {
                free: QUEUE_DEPTH,
                closed: false,
            }),
            cv: Condvar::new(),
        });

        let writer_slots = slots.clone();
        let writer = std::thread::Builder::new()
            .name("stillreel-ffmpeg-writer".into())
            .spawn(move || {
                let result = write_loop(rx, stdin, &writer_slots);
                if let Ok(mut st) = writer_slots.state.lock() {
                    st.closed = true;
                    writer_slots.cv.notify_all();
                }
                result
            })
            .map_err(|e| ReelError::encoding(format!("failed to spawn encoder writer: {e}")))?;

        tracing::debug!(
            width = cfg.width,
            height = cfg.height,
            fps = cfg.fps,
            bitrate_bps = cfg.bitrate_bps,
            out = %cfg.out_path.display(),
            "opened ffmpeg sink"
        );

        Ok(Self {
            cfg,
            child: Some(child),
            tx: Some(tx),
            writer: Some(writer),
            slots,
            last_pts: None,
        })
    }

    fn lock_state(&self) -> ReelResult<std::sync::MutexGuard<'_, QueueState>> {
        self.slots
            .state
            .lock()
            .map_err(|_| ReelError::encoding("frame queue lock poisoned"))
    }
}

fn write_loop(
    rx: Receiver<PixelBuffer>,
    mut stdin: ChildStdin,
    slots: &Slots,
) -> ReelResult<()> {
    while let Ok(frame) = rx.recv() {
        let written = stdin.write_all(&frame.data);
        drop(frame);
        if let Ok(mut st) = slots.state.lock() {
            st.free += 1;
            slots.cv.notify_all();
        }
        written.map_err(|e| {
            ReelError::encoding(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
    }
    stdin
        .flush()
        .map_err(|e| ReelError::encoding(format!("failed to flush ffmpeg stdin: {e}")))
}

impl EncoderSink for FfmpegSink {
    fn wait_until_ready(&mut self) -> ReelResult<()> {
        let mut st = self.lock_state()?;
        while st.free == 0 && !st.closed {
            st = self
                .slots
                .cv
                .wait(st)
                .map_err(|_| ReelError::encoding("frame queue lock poisoned"))?;
        }
        Ok(())
    }

    fn is_ready(&mut self) -> bool {
        // A closed (failed) queue also reports ready so the next append can
        // surface the writer's error instead of the loop spinning forever.
        self.lock_state()
            .map(|st| st.free > 0 || st.closed)
            .unwrap_or(true)
    }

    fn append(&mut self, frame: PixelBuffer, pts_secs: f64) -> ReelResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(ReelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }
        if frame.data.len() != frame.expected_len() {
            return Err(ReelError::validation(
                "frame data size mismatch with stride*height",
            ));
        }
        // The raw pipe is constant-rate (`-r fps`), so the presentation time
        // is positional; we only enforce that the schedule is monotonic.
        if let Some(last) = self.last_pts
            && pts_secs < last
        {
            return Err(ReelError::encoding(format!(
                "presentation times must be monotonic (got {pts_secs} after {last})"
            )));
        }

        let Some(tx) = self.tx.as_ref() else {
            return Err(ReelError::encoding("append after input was closed"));
        };

        {
            let mut st = self.lock_state()?;
            if st.closed {
                return Err(ReelError::encoding(
                    "encoder writer exited early; frame rejected",
                ));
            }
            if st.free == 0 {
                return Err(ReelError::encoding("append without sink readiness"));
            }
            st.free -= 1;
        }

        tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => ReelError::encoding("frame queue unexpectedly full"),
            TrySendError::Disconnected(_) => {
                ReelError::encoding("encoder writer exited early; frame rejected")
            }
        })?;
        self.last_pts = Some(pts_secs);
        Ok(())
    }

    fn close_input(&mut self) {
        // Dropping the sender is the end-of-input signal; the writer drains
        // what is queued and exits.
        self.tx = None;
    }

    fn finish(&mut self) -> SinkStatus {
        self.tx = None;

        let writer_result = match self.writer.take() {
            Some(w) => w
                .join()
                .unwrap_or_else(|_| Err(ReelError::encoding("ffmpeg writer thread panicked"))),
            None => Ok(()),
        };

        let Some(child) = self.child.take() else {
            return SinkStatus::Failed("sink already finished".into());
        };
        let output = match child.wait_with_output() {
            Ok(o) => o,
            Err(e) => return SinkStatus::Failed(format!("failed to wait for ffmpeg: {e}")),
        };

        if let Err(e) = writer_result {
            return SinkStatus::Failed(e.to_string());
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return SinkStatus::Failed(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        SinkStatus::Completed
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.tx = None;
        // Kill the child before joining the writer: a stalled encoder leaves
        // the writer blocked in write_all on a full pipe, and only the
        // broken pipe from the dead child unblocks it.
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(w) = self.writer.take() {
            let _ = w.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(width: u32, height: u32, fps: u32) -> FfmpegConfig {
        FfmpegConfig {
            width,
            height,
            fps,
            bitrate_bps: MOVIE_BITRATE_BPS,
            out_path: PathBuf::from("out.mov"),
        }
    }

    #[test]
    fn config_validation_catches_bad_values() {
        assert!(cfg(0, 16, 30).validate().is_err());
        assert!(cfg(16, 16, 0).validate().is_err());
        assert!(cfg(15, 16, 30).validate().is_err());
        assert!(cfg(112, 112, 2).validate().is_ok());

        let mut bad_bitrate = cfg(16, 16, 30);
        bad_bitrate.bitrate_bps = 0;
        assert!(bad_bitrate.validate().is_err());
    }

    #[test]
    fn bitrate_matches_the_2500k_profile() {
        assert_eq!(MOVIE_BITRATE_BPS, 2_500_000);
    }
}
