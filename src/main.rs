use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::ProgressStyle;
use point_tracker::config::{PartialConfig, parse_frame_rate, scale_ratio_from_reference};
use point_tracker::{Color, FrameDirectory, ParallelPipeline, Position, TrackingConfig, TrackingPipeline};
use std::path::PathBuf;
use tracing::{info, info_span};
use tracing_indicatif::IndicatifLayer;
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Two ends of a reference segment one track width long, in pixels.
#[derive(Debug, Clone, Copy)]
struct ReferenceSegment {
    a: Position,
    b: Position,
}

fn parse_reference(text: &str) -> Result<ReferenceSegment, String> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("expected x1,y1,x2,y2: {e}"))?;
    match values.as_slice() {
        [x1, y1, x2, y2] => Ok(ReferenceSegment {
            a: Position::new(*x1, *y1),
            b: Position::new(*x2, *y2),
        }),
        _ => Err(format!("expected four comma-separated integers, got {}", values.len())),
    }
}

/// Command line arguments for the point tracker
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Track a colored marker through a directory of video frames",
    long_about = "Follows a uniquely colored marker through a directory of frames extracted \
        from a video, marks its position on every frame and writes its speed in track widths \
        per second next to it. Frames are annotated in place, ready to be re-encoded."
)]
struct Args {
    #[arg(help = "Directory of extracted frames, annotated in place")]
    frames: PathBuf,

    #[arg(
        short,
        long,
        help = "TOML file with a [tracking] table",
        long_help = "TOML file with a [tracking] table holding any of target_color, \
            scale_ratio, track_width and fps. Command line flags override file values."
    )]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Marker color as #rrggbb or r,g,b")]
    target: Option<Color>,

    #[arg(
        long,
        value_parser = parse_frame_rate,
        help = "Source frame rate, e.g. 30 or 30000/1001"
    )]
    fps: Option<f64>,

    #[arg(long, help = "Pixels per track width", conflicts_with = "reference")]
    scale_ratio: Option<f64>,

    #[arg(
        long,
        value_parser = parse_reference,
        help = "Reference segment x1,y1,x2,y2 whose length defines the scale ratio"
    )]
    reference: Option<ReferenceSegment>,

    #[arg(long, help = "Track widths spanned by the reference length")]
    track_width: Option<f64>,

    #[arg(long, help = "Write the tracked positions to this JSON file")]
    track_out: Option<PathBuf>,

    #[arg(
        long,
        help = "Track first, then annotate frames concurrently",
        long_help = "Runs a sequential tracking pass over all frames first and annotates \
            afterwards on a pool of workers. A tracking failure then leaves every frame untouched."
    )]
    parallel: bool,

    #[arg(long, requires = "parallel", help = "Number of annotation workers (default: CPU count)")]
    workers: Option<usize>,
}

impl Args {
    fn tracking_config(&self) -> Result<TrackingConfig> {
        let from_file = match &self.config {
            Some(path) => PartialConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => PartialConfig::default(),
        };
        let scale_ratio = self
            .reference
            .map(|r| scale_ratio_from_reference(r.a, r.b))
            .or(self.scale_ratio);
        let from_cli = PartialConfig {
            target_color: self.target,
            scale_ratio,
            track_width: self.track_width,
            fps: self.fps,
        };
        Ok(from_file.merge(from_cli).into_config()?)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // setup logging
    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();

    let config = args.tracking_config()?;
    let frames = FrameDirectory::open(&args.frames)
        .with_context(|| format!("failed to open frame directory {}", args.frames.display()))?;
    if frames.is_empty() {
        bail!("no frames found in {}", args.frames.display());
    }
    info!(
        target_color = %config.target_color,
        scale_ratio = config.scale_ratio,
        track_width = config.track_width,
        fps = config.fps,
        frames = frames.len(),
        "starting run"
    );

    let track = if args.parallel {
        let mut pipeline = ParallelPipeline::new(config)?;
        if let Some(workers) = args.workers {
            pipeline = pipeline.with_workers(workers);
        }
        let runtime = tokio::runtime::Runtime::new().context("failed to start worker runtime")?;
        runtime.block_on(pipeline.run_directory(&frames))?
    } else {
        let header_span = info_span!("tracking");
        header_span.pb_set_style(&ProgressStyle::default_bar());
        header_span.pb_set_length(frames.len() as u64);
        let _enter = header_span.enter();

        TrackingPipeline::new(config)?.run_directory(&frames, |_, _| header_span.pb_inc(1))?
    };

    if let Some(path) = &args.track_out {
        track
            .write_json(path)
            .with_context(|| format!("failed to write track to {}", path.display()))?;
        info!(path = %path.display(), "wrote track");
    }

    let speeds = track.speeds(&config);
    let top_speed = speeds.iter().copied().fold(0.0, f64::max);
    info!(frames = track.len(), top_speed, "run complete");
    Ok(())
}
