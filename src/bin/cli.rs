//! CLI application for eye landmark extraction from a sequence of frames.
//!
//! Usage:
//!   percent-eyes frame_*.png                      # Human-readable output
//!   percent-eyes frame_*.png --json               # JSON output
//!   percent-eyes frame_*.png -o landmarks.json    # Save to file
//!   percent-eyes frame_*.png --overlay-dir debug/ # Write annotated frames

use clap::Parser;
use percent_eyes::{
    overlay, preprocess, BoundingBox, FaceDetector, FrameSource, GrayImage, ImageAccess,
    LandmarkPipeline, LandmarkResult, PipelineConfig, TickOutcome,
};
use rustface::ImageData;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "percent-eyes")]
#[command(author, version, about = "Eye region, pupil and corner landmarks", long_about = None)]
struct Args {
    /// Input frames, processed in order
    #[arg(required = true)]
    frames: Vec<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pipeline configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Face detector model path
    #[arg(long, default_value = "seeta_fd_frontal_v1.0.bin")]
    detector: PathBuf,

    /// Minimum face size for detection
    #[arg(long, default_value = "20")]
    min_face_size: u32,

    /// Simulated host tick rate in Hz
    #[arg(long, default_value = "60")]
    tick_hz: f64,

    /// Directory for annotated overlay images
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct Output {
    refresh_rate_hz: f64,
    tick_hz: f64,
    ticks: u64,
    frames: Vec<FrameOutput>,
}

#[derive(Serialize)]
struct FrameOutput {
    frame: String,
    /// Host tick on which the frame was processed (1-based)
    tick: u64,
    /// Simulated time in seconds
    time: f64,
    width: u32,
    height: u32,
    landmarks: Option<LandmarkResult>,
}

/// [`FaceDetector`] backed by a SeetaFace model.
struct RustfaceDetector {
    inner: Box<dyn rustface::Detector>,
}

impl RustfaceDetector {
    fn load(path: &Path, min_face_size: u32) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.to_str().ok_or("Invalid detector path")?;
        let mut inner = rustface::create_detector(path)
            .map_err(|e| format!("Failed to load face detector: {}", e))?;
        inner.set_min_face_size(min_face_size);
        inner.set_score_thresh(2.0);
        inner.set_pyramid_scale_factor(0.8);
        inner.set_slide_window_step(4, 4);
        Ok(Self { inner })
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&mut self, frame: &GrayImage) -> Vec<BoundingBox> {
        let data = ImageData::new(frame.as_raw(), frame.width(), frame.height());
        self.inner
            .detect(&data)
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                BoundingBox::new(bbox.x(), bbox.y(), bbox.width() as i32, bbox.height() as i32)
            })
            .collect()
    }
}

/// Frames read from image files, one file per cycle.
///
/// Files that fail to load are logged and skipped.
struct ImageFiles {
    pending: VecDeque<PathBuf>,
    current: Option<(PathBuf, GrayImage)>,
}

impl ImageFiles {
    fn new(paths: &[PathBuf]) -> Self {
        Self {
            pending: paths.iter().cloned().collect(),
            current: None,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }
}

impl FrameSource for ImageFiles {
    fn next_frame(&mut self) -> Option<GrayImage> {
        while let Some(path) = self.pending.pop_front() {
            match GrayImage::open(&path) {
                Ok(frame) => {
                    self.current = Some((path, frame.clone()));
                    return Some(frame);
                }
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }
        None
    }
}

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if !(args.tick_hz.is_finite() && args.tick_hz > 0.0) {
        return Err(format!("Tick rate must be greater than 0, got {}", args.tick_hz).into());
    }

    let config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    tracing::info!("Loading face detector from {}", args.detector.display());
    let detector = RustfaceDetector::load(&args.detector, args.min_face_size)?;
    let mut pipeline = LandmarkPipeline::with_reference_locators(config, detector)?;

    if let Some(dir) = &args.overlay_dir {
        std::fs::create_dir_all(dir)?;
    }

    let tick_secs = 1.0 / args.tick_hz;
    let mut source = ImageFiles::new(&args.frames);
    let mut frames = Vec::new();
    let mut tick = 0u64;

    loop {
        tick += 1;
        let mut published: Vec<LandmarkResult> = Vec::new();
        let outcome = pipeline.run_one_tick(tick_secs, &mut source, &mut published);

        match outcome {
            TickOutcome::Skipped => continue,
            TickOutcome::NoFrame => {
                if source.is_exhausted() {
                    break;
                }
                continue;
            }
            TickOutcome::NoFace | TickOutcome::Published => {}
        }

        let Some((path, raw)) = source.current.take() else {
            continue;
        };
        let landmarks = published.pop();

        if let (Some(dir), Some(result)) = (&args.overlay_dir, &landmarks) {
            let frame = preprocess(&raw, &pipeline.config().preprocess);
            let out_path = overlay_path(dir, &path);
            overlay::render(&frame, result).save(&out_path)?;
            tracing::debug!("Overlay written to {}", out_path.display());
        }

        frames.push(FrameOutput {
            frame: path.display().to_string(),
            tick,
            time: tick as f64 * tick_secs,
            width: raw.width(),
            height: raw.height(),
            landmarks,
        });
    }

    let output = Output {
        refresh_rate_hz: pipeline.config().refresh_rate_hz,
        tick_hz: args.tick_hz,
        ticks: tick,
        frames,
    };

    let output_str = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_human_readable(&output)
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output_str)?;
        tracing::info!("Output written to {}", path.display());
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn overlay_path(dir: &Path, frame: &Path) -> PathBuf {
    let stem = frame
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    dir.join(format!("{}_eyes.png", stem))
}

fn format_human_readable(output: &Output) -> String {
    let mut s = String::new();

    s.push_str(&format!(
        "Processed {} frame(s) over {} tick(s) ({:.1} Hz pipeline, {:.1} Hz host)\n",
        output.frames.len(),
        output.ticks,
        output.refresh_rate_hz,
        output.tick_hz
    ));

    for frame in &output.frames {
        s.push_str(&format!(
            "\n{} ({}x{}, tick {}, t={:.3}s)\n",
            frame.frame, frame.width, frame.height, frame.tick, frame.time
        ));

        let Some(result) = &frame.landmarks else {
            s.push_str("  No face detected\n");
            continue;
        };

        let face = &result.face;
        s.push_str(&format!(
            "  Face: ({}, {}) {}x{}\n",
            face.x, face.y, face.width, face.height
        ));

        for eye in [&result.left, &result.right] {
            let (nx, ny) = eye.pupil_offset();
            s.push_str(&format!(
                "  {:?} eye: region ({}, {}) {}x{}\n",
                eye.eye, eye.region.x, eye.region.y, eye.region.width, eye.region.height
            ));
            s.push_str(&format!(
                "    Pupil: ({}, {})  offset ({:+.2}, {:+.2})\n",
                eye.pupil.x, eye.pupil.y, nx, ny
            ));
            if let Some(corners) = &eye.corners {
                s.push_str(&format!(
                    "    Inner corner: ({}, {})\n",
                    corners.inner.point.x, corners.inner.point.y
                ));
                s.push_str(&format!(
                    "    Outer corner: ({}, {})\n",
                    corners.outer.point.x, corners.outer.point.y
                ));
            }
        }
    }

    s
}
