use std::{path::PathBuf, sync::mpsc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stillreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode the input images as a looped H.264 movie (requires `ffmpeg` on PATH).
    Movie(MovieArgs),
    /// Encode the input images as an animated GIF.
    Gif(GifArgs),
}

#[derive(Parser, Debug)]
struct MovieArgs {
    /// Input images, in playback order (at least two).
    #[arg(required = true, num_args = 2..)]
    images: Vec<PathBuf>,

    /// Output path. Defaults to a fixed file in the temporary directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Total output duration in seconds.
    #[arg(long)]
    duration: f64,

    /// Duration of one pass over the input images, in seconds.
    #[arg(long)]
    loop_duration: f64,

    /// Fail if the output already exists instead of overwriting it.
    #[arg(long)]
    keep_existing: bool,
}

#[derive(Parser, Debug)]
struct GifArgs {
    /// Input images, in playback order (at least two).
    #[arg(required = true, num_args = 2..)]
    images: Vec<PathBuf>,

    /// Output path. Defaults to a fixed file in the temporary directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Total animation duration in seconds.
    #[arg(long)]
    duration: f64,

    /// Uniform scale applied to the first image's natural size.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Loop count; omit to loop forever.
    #[arg(long)]
    repeat: Option<u16>,

    /// Skip frames that fail to rasterize instead of aborting.
    #[arg(long)]
    skip_failed: bool,

    /// Fail if the output already exists instead of overwriting it.
    #[arg(long)]
    keep_existing: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Movie(args) => cmd_movie(args),
        Command::Gif(args) => cmd_gif(args),
    }
}

fn load_images(paths: &[PathBuf]) -> anyhow::Result<Vec<image::DynamicImage>> {
    paths
        .iter()
        .map(|p| image::open(p).with_context(|| format!("open image '{}'", p.display())))
        .collect()
}

fn cmd_movie(args: MovieArgs) -> anyhow::Result<()> {
    let images = load_images(&args.images)?;
    let options = stillreel::MovieOptions {
        duration_secs: args.duration,
        loop_duration_secs: args.loop_duration,
        overwrite: !args.keep_existing,
    };
    let out = args
        .out
        .unwrap_or_else(stillreel::MovieOptions::default_output_path);

    let (tx, rx) = mpsc::channel();
    let handle = stillreel::write_movie_to(
        images,
        options,
        &out,
        Box::new(move |location, payload| {
            let _ = tx.send((location.to_path_buf(), payload));
        }),
    )?;
    handle.join()?;

    let (location, payload) = rx.recv().context("completion callback never fired")?;
    match payload {
        Some(bytes) => {
            eprintln!("wrote {} ({} bytes)", location.display(), bytes.len());
            Ok(())
        }
        None => anyhow::bail!("movie encoding failed (see log output)"),
    }
}

fn cmd_gif(args: GifArgs) -> anyhow::Result<()> {
    let images = load_images(&args.images)?;
    let options = stillreel::GifOptions {
        duration_secs: args.duration,
        scale: args.scale,
        repeat: match args.repeat {
            None => stillreel::GifLoop::Forever,
            Some(n) => stillreel::GifLoop::Count(n),
        },
        skips_failed_frames: args.skip_failed,
        overwrite: !args.keep_existing,
    };
    let out = args
        .out
        .unwrap_or_else(stillreel::GifOptions::default_output_path);

    let (tx, rx) = mpsc::channel();
    let handle = stillreel::create_gif_to(
        images,
        options,
        &out,
        Box::new(move |location, payload| {
            let _ = tx.send((location.to_path_buf(), payload));
        }),
    )?;
    handle.join()?;

    let (location, payload) = rx.recv().context("completion callback never fired")?;
    match payload {
        Some(bytes) => {
            eprintln!("wrote {} ({} bytes)", location.display(), bytes.len());
            Ok(())
        }
        None => anyhow::bail!("gif encoding failed (see log output)"),
    }
}
