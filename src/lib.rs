#![forbid(unsafe_code)]

pub mod animated;
pub mod encode_ffmpeg;
pub mod encode_gif;
pub mod error;
pub mod geom;
pub mod movie;
pub mod normalize;
pub mod notify;
pub mod options;
pub mod sink;
pub mod source;
pub mod timing;

pub use animated::{create_gif, create_gif_on, create_gif_to};
pub use error::{ReelError, ReelResult};
pub use geom::{PixelSize, canonical_size};
pub use movie::{write_movie, write_movie_on, write_movie_to};
pub use normalize::{PixelBuffer, normalize_frame};
pub use notify::{Completion, NotifyContext, RunHandle};
pub use options::{GifLoop, GifOptions, MovieOptions};
pub use sink::{EncoderSink, FrameContainer, SinkStatus};
pub use source::PixelSource;
pub use timing::{GifFrameDelay, MIN_GIF_FRAME_SECS, MovieTimingPlan};
