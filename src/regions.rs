//! Proportional eye search regions and the corner regions derived from them.
//!
//! All boxes produced here are face-local: (0, 0) is the top-left corner of
//! the face bounding box.

use serde::{Deserialize, Serialize};

use crate::types::BoundingBox;

/// Which eye a region belongs to.
///
/// `Left` is the eye whose region sits at the smaller face-local x, which is
/// the subject's left eye once the capture has been mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    pub fn is_left(self) -> bool {
        self == Eye::Left
    }

    /// Side of the pupil holding the corner away from the nose.
    ///
    /// The two eyes mirror each other, so this is the only place the
    /// left/right asymmetry of corner geometry is encoded.
    pub fn outer_side(self) -> Side {
        match self {
            Eye::Left => Side::Right,
            Eye::Right => Side::Left,
        }
    }

    /// Side of the pupil holding the corner toward the nose.
    pub fn inner_side(self) -> Side {
        self.outer_side().opposite()
    }
}

/// Horizontal side of a corner region relative to the pupil column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn is_left(self) -> bool {
        self == Side::Left
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Eye region proportions, in percent of the face box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeGeometry {
    /// Region width as a percentage of face width.
    pub width_pct: f64,
    /// Region height as a percentage of face *width*.
    pub height_pct: f64,
    /// Region top as a percentage of face height.
    pub top_pct: f64,
    /// Horizontal inset from the face edge as a percentage of face width.
    pub side_pct: f64,
}

impl Default for EyeGeometry {
    fn default() -> Self {
        Self {
            width_pct: 35.0,
            height_pct: 30.0,
            top_pct: 25.0,
            side_pct: 13.0,
        }
    }
}

/// The two eye search regions of one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeRegions {
    pub left: BoundingBox,
    pub right: BoundingBox,
}

impl EyeRegions {
    pub fn get(&self, eye: Eye) -> BoundingBox {
        match eye {
            Eye::Left => self.left,
            Eye::Right => self.right,
        }
    }
}

/// Derive both eye search regions from a face box.
///
/// The region height scales off the face width, not its height. Percentages
/// are not clamped; keeping them in range is the configuration's job.
pub fn eye_regions(face: &BoundingBox, geometry: &EyeGeometry) -> EyeRegions {
    let face_width = face.width as f64;
    let face_height = face.height as f64;

    let region_width = (face_width * geometry.width_pct / 100.0) as i32;
    let region_height = (face_width * geometry.height_pct / 100.0) as i32;
    let region_top = (face_height * geometry.top_pct / 100.0) as i32;
    let inset = face_width * geometry.side_pct / 100.0;

    let left = BoundingBox::new(inset as i32, region_top, region_width, region_height);
    let right = BoundingBox::new(
        (face_width - region_width as f64 - inset) as i32,
        region_top,
        region_width,
        region_height,
    );

    EyeRegions { left, right }
}

/// Corner search regions on either side of one eye's pupil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CornerRegions {
    /// From the region's left edge up to the pupil column.
    pub left: BoundingBox,
    /// From the pupil column to the region's right edge.
    pub right: BoundingBox,
}

impl CornerRegions {
    pub fn side(&self, side: Side) -> BoundingBox {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn outer(&self, eye: Eye) -> BoundingBox {
        self.side(eye.outer_side())
    }

    pub fn inner(&self, eye: Eye) -> BoundingBox {
        self.side(eye.inner_side())
    }
}

/// Split an eye region at the pupil column into two corner regions.
///
/// `pupil_x` is eye-region-local. Both regions are half as tall as the eye
/// region and vertically centered in it. A pupil on the region edge yields a
/// zero-width region; that is valid and left to the corner locator.
pub fn corner_regions(region: &BoundingBox, pupil_x: i32) -> CornerRegions {
    let height = region.height / 2;
    let y = region.y + height / 2;

    let left = BoundingBox::new(region.x, y, pupil_x, height);
    let right = BoundingBox::new(region.x + pupil_x, y, region.width - pupil_x, height);

    CornerRegions { left, right }
}
