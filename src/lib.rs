//! # percent-eyes
//!
//! Real-time eye landmark geometry from a face bounding box.
//!
//! This crate provides:
//! - **Eye Regions**: proportional eye search regions derived from four percentages
//! - **Pupils and Corners**: pluggable locators run on correctly cropped regions,
//!   with corner regions derived from the already-located pupils
//! - **Coordinates**: every result composed back into full-frame space
//! - **Cadence**: a fixed processing rate independent of the host tick rate
//!
//! ## Pipeline Overview
//!
//! Each due cycle:
//!
//! 1. Pull a frame and preprocess it (gain/bias, mirror, equalize)
//! 2. Detect faces and select one
//! 3. Derive both eye regions from the face box
//! 4. Locate each pupil inside its eye region
//! 5. Split each eye region at the pupil column into two corner regions
//!    and locate a corner in each
//! 6. Compose region-local points into full-frame [`LandmarkResult`]s
//!
//! ## Quick Start
//!
//! ```rust
//! use percent_eyes::{
//!     BoundingBox, GrayImage, LandmarkPipeline, LandmarkResult, PipelineConfig, TickOutcome,
//! };
//! use std::collections::VecDeque;
//!
//! // Any face detector works; here a fixed box stands in for one.
//! let detector = |_: &GrayImage| vec![BoundingBox::new(100, 50, 200, 200)];
//! let mut pipeline =
//!     LandmarkPipeline::with_reference_locators(PipelineConfig::default(), detector).unwrap();
//!
//! let mut frames: VecDeque<GrayImage> = VecDeque::new();
//! frames.push_back(GrayImage::from_fn(640, 480, |x, y| ((x + y) % 256) as u8));
//! let mut results: Vec<LandmarkResult> = Vec::new();
//!
//! // Called from the host loop with the time since the previous tick.
//! let outcome = pipeline.run_one_tick(1.0 / 30.0, &mut frames, &mut results);
//! assert_eq!(outcome, TickOutcome::Published);
//! println!("left pupil at {:?}", results[0].left.pupil);
//! ```
//!
//! ## Custom Locators
//!
//! Implement [`PupilLocator`] or [`CornerLocator`] (or pass a closure):
//!
//! ```rust
//! use percent_eyes::{GrayImage, ImageAccess, Point, PupilLocator};
//!
//! struct DarkestPixel;
//!
//! impl PupilLocator for DarkestPixel {
//!     fn locate(&self, roi: &GrayImage) -> Point {
//!         let mut best = (u8::MAX, Point::zero());
//!         for y in 0..roi.height() as i32 {
//!             for x in 0..roi.width() as i32 {
//!                 let v = roi.get_pixel(x, y);
//!                 if v < best.0 {
//!                     best = (v, Point::new(x, y));
//!                 }
//!             }
//!         }
//!         best.1
//!     }
//! }
//! ```

mod cadence;
mod compose;
mod config;
mod error;
mod frame;
mod gradient;
mod locator;
pub mod overlay;
mod pipeline;
mod regions;
mod selection;
mod types;

pub use cadence::{CadenceController, Tick};
pub use compose::{
    compose_eye, frame_to_region, region_to_frame, to_local, to_parent, Corner, EyeCorners,
    EyeLandmarks, LandmarkResult, LocalCorners,
};
pub use config::{CornerConfig, PipelineConfig, PreprocessConfig, SmoothingConfig};
pub use error::{Error, Result};
pub use frame::{GrayImage, ImageAccess};
pub use gradient::{CornerKernelLocator, GradientPupilLocator, GradientPupilParams};
pub use locator::{locate_corner, locate_pupil, CornerLocator, FaceDetector, PupilLocator};
pub use pipeline::{preprocess, FrameSource, LandmarkPipeline, ResultSink, TickOutcome};
pub use regions::{corner_regions, eye_regions, CornerRegions, Eye, EyeGeometry, EyeRegions, Side};
pub use selection::{select_face, SelectionPolicy};
pub use types::{BoundingBox, Point};
