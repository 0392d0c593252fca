//! Composition of local coordinates into the full-frame reference space.
//!
//! Three frames are nested by pure translation:
//!
//! - region-local: origin at an eye or corner region's top-left,
//! - face-local: origin at the face box's top-left,
//! - full-frame: origin at the frame's top-left.
//!
//! Eye and corner regions are both face-local boxes, so a point inside either
//! reaches full-frame in exactly two hops: region origin, then face origin.

use serde::{Deserialize, Serialize};

use crate::regions::{CornerRegions, Eye, Side};
use crate::types::{BoundingBox, Point};

/// Express a point given relative to `parent`'s origin in `parent`'s own frame.
pub fn to_parent(local: Point, parent: &BoundingBox) -> Point {
    local + parent.origin()
}

/// Inverse of [`to_parent`].
pub fn to_local(point: Point, parent: &BoundingBox) -> Point {
    point - parent.origin()
}

/// Region-local point to full-frame, for a region expressed face-local.
pub fn region_to_frame(local: Point, region: &BoundingBox, face: &BoundingBox) -> Point {
    to_parent(to_parent(local, region), face)
}

/// Full-frame point back to region-local.
pub fn frame_to_region(point: Point, region: &BoundingBox, face: &BoundingBox) -> Point {
    to_local(to_local(point, face), region)
}

/// One located eye corner, full-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corner {
    pub side: Side,
    /// Search region the corner was found in.
    pub region: BoundingBox,
    pub point: Point,
}

/// Inner and outer corner of one eye, full-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeCorners {
    /// Toward the nose.
    pub inner: Corner,
    /// Toward the temple.
    pub outer: Corner,
}

/// Everything published for one eye, full-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeLandmarks {
    pub eye: Eye,
    /// Eye search region.
    pub region: BoundingBox,
    pub pupil: Point,
    /// Present when corner detection ran this cycle.
    pub corners: Option<EyeCorners>,
}

impl EyeLandmarks {
    /// Midpoint of the eye search region.
    pub fn region_center(&self) -> Point {
        self.region.center()
    }

    /// Pupil displacement from the region center, scaled so the region
    /// edges map to -1 and 1. Degenerate regions report 0 on that axis.
    pub fn pupil_offset(&self) -> (f32, f32) {
        let center = self.region_center();
        let half_w = self.region.width as f32 / 2.0;
        let half_h = self.region.height as f32 / 2.0;
        let nx = if half_w > 0.0 {
            (self.pupil.x - center.x) as f32 / half_w
        } else {
            0.0
        };
        let ny = if half_h > 0.0 {
            (self.pupil.y - center.y) as f32 / half_h
        } else {
            0.0
        };
        (nx.clamp(-1.0, 1.0), ny.clamp(-1.0, 1.0))
    }
}

/// The published output of one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkResult {
    /// The face the landmarks were derived from.
    pub face: BoundingBox,
    pub left: EyeLandmarks,
    pub right: EyeLandmarks,
}

impl LandmarkResult {
    pub fn eye(&self, eye: Eye) -> &EyeLandmarks {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }

    /// All located corners, in left-eye-then-right-eye order.
    pub fn corners(&self) -> impl Iterator<Item = &Corner> + '_ {
        [&self.left, &self.right]
            .into_iter()
            .filter_map(|e| e.corners.as_ref())
            .flat_map(|c| [&c.inner, &c.outer])
    }
}

/// Located corner points of one eye, still corner-region-local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalCorners {
    pub regions: CornerRegions,
    pub left: Point,
    pub right: Point,
}

impl LocalCorners {
    fn side(&self, side: Side) -> Point {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Compose one eye's local results into full-frame landmarks.
///
/// `region` and the corner regions are face-local; `pupil` is eye-region-local
/// and the corner points are corner-region-local. Corner regions already carry
/// the eye region's offset, so it is not added a second time.
pub fn compose_eye(
    eye: Eye,
    face: &BoundingBox,
    region: &BoundingBox,
    pupil: Point,
    corners: Option<&LocalCorners>,
) -> EyeLandmarks {
    let corner = |local: &LocalCorners, side: Side| {
        let corner_region = local.regions.side(side);
        Corner {
            side,
            region: corner_region.translate(face.origin()),
            point: region_to_frame(local.side(side), &corner_region, face),
        }
    };

    EyeLandmarks {
        eye,
        region: region.translate(face.origin()),
        pupil: region_to_frame(pupil, region, face),
        corners: corners.map(|local| EyeCorners {
            inner: corner(local, eye.inner_side()),
            outer: corner(local, eye.outer_side()),
        }),
    }
}
