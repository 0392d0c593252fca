//! Seams to the detection and localization capabilities, plus the adapters
//! that feed them correctly cropped regions of interest.
//!
//! The capabilities themselves are traits so any detector or locator can be
//! plugged in. [`crate::gradient`] provides reference locators.

use crate::frame::{GrayImage, ImageAccess};
use crate::regions::{Eye, Side};
use crate::types::{BoundingBox, Point};

/// Finds candidate faces in a full frame.
pub trait FaceDetector {
    /// Candidate face boxes in full-frame coordinates, in no particular order.
    fn detect(&mut self, frame: &GrayImage) -> Vec<BoundingBox>;
}

/// Estimates the pupil center inside an eye region.
pub trait PupilLocator {
    /// Best-effort pupil center in `roi`-local coordinates. Always returns a point.
    fn locate(&self, roi: &GrayImage) -> Point;
}

/// Estimates an eye corner inside a corner region.
pub trait CornerLocator {
    /// Best-effort corner in `roi`-local coordinates. Always returns a point,
    /// including for zero-width regions.
    fn locate(&self, roi: &GrayImage, eye: Eye, side: Side) -> Point;
}

impl<F> FaceDetector for F
where
    F: FnMut(&GrayImage) -> Vec<BoundingBox>,
{
    fn detect(&mut self, frame: &GrayImage) -> Vec<BoundingBox> {
        self(frame)
    }
}

impl<F> PupilLocator for F
where
    F: Fn(&GrayImage) -> Point,
{
    fn locate(&self, roi: &GrayImage) -> Point {
        self(roi)
    }
}

impl<F> CornerLocator for F
where
    F: Fn(&GrayImage, Eye, Side) -> Point,
{
    fn locate(&self, roi: &GrayImage, eye: Eye, side: Side) -> Point {
        self(roi, eye, side)
    }
}

/// Run the pupil locator on one eye region of the face ROI.
///
/// `region` is face-local; the returned point is region-local.
pub fn locate_pupil<P>(face_roi: &GrayImage, region: &BoundingBox, locator: &P) -> Point
where
    P: PupilLocator + ?Sized,
{
    let roi = face_roi.crop(region);
    let point = locator.locate(&roi);
    clamp_to_roi(point, &roi, "pupil")
}

/// Run the corner locator on one corner region of the face ROI.
///
/// `region` is face-local; the returned point is region-local.
pub fn locate_corner<C>(
    face_roi: &GrayImage,
    region: &BoundingBox,
    eye: Eye,
    side: Side,
    locator: &C,
) -> Point
where
    C: CornerLocator + ?Sized,
{
    let roi = face_roi.crop(region);
    if roi.is_empty() {
        tracing::trace!(?eye, ?side, "Corner region is empty");
    }
    let point = locator.locate(&roi, eye, side);
    clamp_to_roi(point, &roi, "corner")
}

/// Pull a locator result back inside its ROI.
///
/// Dependent geometry (corner regions) is derived from these points, so an
/// out-of-range answer would otherwise produce negative region widths.
fn clamp_to_roi(point: Point, roi: &GrayImage, what: &str) -> Point {
    let max_x = (roi.width() as i32 - 1).max(0);
    let max_y = (roi.height() as i32 - 1).max(0);
    let clamped = Point::new(point.x.clamp(0, max_x), point.y.clamp(0, max_y));
    if clamped != point {
        tracing::warn!(
            "{} locator returned ({}, {}) outside {}x{} ROI, clamped to ({}, {})",
            what,
            point.x,
            point.y,
            roi.width(),
            roi.height(),
            clamped.x,
            clamped.y
        );
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn face() -> GrayImage {
        GrayImage::from_fn(200, 200, |x, y| ((x + 2 * y) % 256) as u8)
    }

    #[test]
    fn pupil_locator_sees_cropped_region() {
        let face = face();
        let region = BoundingBox::new(26, 50, 50, 30);
        let expected = face.crop(&region);

        let locator = |roi: &GrayImage| {
            assert_eq!(roi, &expected);
            Point::new(12, 9)
        };

        assert_eq!(locate_pupil(&face, &region, &locator), Point::new(12, 9));
    }

    #[test]
    fn corner_locator_receives_flags() {
        let face = face();
        let region = BoundingBox::new(46, 57, 30, 15);
        let seen = Cell::new(None);

        let locator = |roi: &GrayImage, eye: Eye, side: Side| {
            seen.set(Some((roi.width(), roi.height(), eye, side)));
            Point::new(3, 4)
        };

        let p = locate_corner(&face, &region, Eye::Left, Side::Right, &locator);
        assert_eq!(p, Point::new(3, 4));
        assert_eq!(seen.get(), Some((30, 15, Eye::Left, Side::Right)));
    }

    #[test]
    fn zero_width_corner_region_is_still_located() {
        let face = face();
        let region = BoundingBox::new(26, 57, 0, 15);
        let calls = Cell::new(0);

        let locator = |roi: &GrayImage, _: Eye, _: Side| {
            calls.set(calls.get() + 1);
            assert!(roi.is_empty());
            Point::zero()
        };

        let p = locate_corner(&face, &region, Eye::Left, Side::Left, &locator);
        assert_eq!(calls.get(), 1);
        assert_eq!(p, Point::zero());
    }

    #[test]
    fn out_of_range_results_are_clamped() {
        let face = face();
        let region = BoundingBox::new(0, 0, 50, 30);

        let wild = |_: &GrayImage| Point::new(80, -4);
        assert_eq!(locate_pupil(&face, &region, &wild), Point::new(49, 0));

        let empty = BoundingBox::new(10, 10, 0, 0);
        let far = |_: &GrayImage, _: Eye, _: Side| Point::new(7, 7);
        assert_eq!(
            locate_corner(&face, &empty, Eye::Right, Side::Left, &far),
            Point::zero()
        );
    }
}
