//! The per-tick landmark pipeline.
//!
//! The host owns a [`LandmarkPipeline`] and calls
//! [`run_one_tick`](LandmarkPipeline::run_one_tick) from its own loop with the
//! time elapsed since the previous tick. The pipeline decides whether a cycle
//! is due, pulls a frame, runs every stage in order and publishes at most one
//! [`LandmarkResult`].
//!
//! All published coordinates refer to the preprocessed frame, so with
//! mirroring enabled they are in mirrored-frame space.

use std::collections::VecDeque;

use crate::cadence::{CadenceController, Tick};
use crate::compose::{compose_eye, EyeLandmarks, LandmarkResult, LocalCorners};
use crate::config::{PipelineConfig, PreprocessConfig};
use crate::error::Result;
use crate::frame::{GrayImage, ImageAccess};
use crate::gradient::{CornerKernelLocator, GradientPupilLocator};
use crate::locator::{locate_corner, locate_pupil, CornerLocator, FaceDetector, PupilLocator};
use crate::regions::{corner_regions, eye_regions, Eye, Side};
use crate::selection::select_face;
use crate::types::BoundingBox;

/// Supplies frames on demand.
pub trait FrameSource {
    /// The current frame, or `None` if nothing is available this cycle.
    fn next_frame(&mut self) -> Option<GrayImage>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Option<GrayImage>,
{
    fn next_frame(&mut self) -> Option<GrayImage> {
        self()
    }
}

impl FrameSource for VecDeque<GrayImage> {
    fn next_frame(&mut self) -> Option<GrayImage> {
        self.pop_front()
    }
}

/// Receives published results.
pub trait ResultSink {
    fn publish(&mut self, result: LandmarkResult);
}

impl ResultSink for Vec<LandmarkResult> {
    fn publish(&mut self, result: LandmarkResult) {
        self.push(result);
    }
}

impl<F> ResultSink for F
where
    F: FnMut(LandmarkResult),
{
    fn publish(&mut self, result: LandmarkResult) {
        self(result)
    }
}

/// What happened during one host tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No cycle was due.
    Skipped,
    /// A cycle was due but the source had no frame.
    NoFrame,
    /// The frame contained no face.
    NoFace,
    /// A result was handed to the sink.
    Published,
}

/// Apply the configured linear adjustment, mirroring and equalization.
pub fn preprocess(frame: &GrayImage, config: &PreprocessConfig) -> GrayImage {
    let mut out = frame.adjust(config.gain, config.bias);
    if config.mirror {
        out = out.flip_horizontal();
    }
    if config.equalize {
        out = out.equalize_histogram();
    }
    out
}

/// Face, eye, pupil and corner landmark pipeline driven by host ticks.
pub struct LandmarkPipeline<D, P, C> {
    config: PipelineConfig,
    cadence: CadenceController,
    detector: D,
    pupil_locator: P,
    corner_locator: C,
}

impl<D: FaceDetector> LandmarkPipeline<D, GradientPupilLocator, CornerKernelLocator> {
    /// Build a pipeline using the built-in pupil and corner locators.
    pub fn with_reference_locators(config: PipelineConfig, detector: D) -> Result<Self> {
        let pupil_locator = GradientPupilLocator::new(config.pupil);
        Self::new(config, detector, pupil_locator, CornerKernelLocator)
    }
}

impl<D, P, C> LandmarkPipeline<D, P, C>
where
    D: FaceDetector,
    P: PupilLocator,
    C: CornerLocator,
{
    /// Validate `config` and assemble the pipeline.
    pub fn new(config: PipelineConfig, detector: D, pupil_locator: P, corner_locator: C) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            "Landmark pipeline at {} Hz (corners: {}, smoothing: {})",
            config.refresh_rate_hz,
            config.corners.enabled,
            config.smoothing.enabled
        );

        Ok(Self {
            cadence: CadenceController::new(config.refresh_rate_hz),
            config,
            detector,
            pupil_locator,
            corner_locator,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cadence(&self) -> &CadenceController {
        &self.cadence
    }

    /// Advance by one host tick and run a cycle if one is due.
    pub fn run_one_tick<S, K>(&mut self, elapsed: f64, source: &mut S, sink: &mut K) -> TickOutcome
    where
        S: FrameSource + ?Sized,
        K: ResultSink + ?Sized,
    {
        if self.cadence.tick(elapsed) == Tick::Skip {
            return TickOutcome::Skipped;
        }

        let Some(frame) = source.next_frame() else {
            tracing::debug!("No frame available this cycle");
            return TickOutcome::NoFrame;
        };

        match self.process_frame(&frame) {
            Some(result) => {
                sink.publish(result);
                TickOutcome::Published
            }
            None => TickOutcome::NoFace,
        }
    }

    /// Run every stage on one raw frame, ignoring the cadence.
    pub fn process_frame(&mut self, frame: &GrayImage) -> Option<LandmarkResult> {
        let frame = preprocess(frame, &self.config.preprocess);

        let candidates = self.detector.detect(&frame);
        let Some(face) = select_face(&candidates, self.config.selection) else {
            tracing::debug!("No face in {}x{} frame", frame.width(), frame.height());
            return None;
        };
        tracing::debug!(
            "Selected face ({}, {}) {}x{} from {} candidate(s)",
            face.x,
            face.y,
            face.width,
            face.height,
            candidates.len()
        );

        Some(self.landmarks_for_face(&frame, &face))
    }

    /// Locate eye landmarks for a known face in an already preprocessed frame.
    pub fn landmarks_for_face(&self, frame: &GrayImage, face: &BoundingBox) -> LandmarkResult {
        let mut face_roi = frame.crop(face);
        if let Some(sigma) = self.config.smoothing.sigma(face.width) {
            face_roi = face_roi.gaussian_blur(sigma);
        }

        let regions = eye_regions(face, &self.config.eyes);
        let [left, right] =
            Eye::BOTH.map(|eye| self.eye_landmarks(eye, face, &face_roi, &regions.get(eye)));

        LandmarkResult {
            face: *face,
            left,
            right,
        }
    }

    fn eye_landmarks(
        &self,
        eye: Eye,
        face: &BoundingBox,
        face_roi: &GrayImage,
        region: &BoundingBox,
    ) -> EyeLandmarks {
        let pupil = locate_pupil(face_roi, region, &self.pupil_locator);

        let corners = self.config.corners.enabled.then(|| {
            let regions = corner_regions(region, pupil.x);
            let [left, right] = Side::BOTH.map(|side| {
                locate_corner(face_roi, &regions.side(side), eye, side, &self.corner_locator)
            });
            LocalCorners { regions, left, right }
        });

        let landmarks = compose_eye(eye, face, region, pupil, corners.as_ref());
        tracing::trace!(?eye, pupil = ?landmarks.pupil, "Eye located");
        landmarks
    }
}
