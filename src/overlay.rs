//! Debug visualization of a [`LandmarkResult`].
//!
//! Rendering is a pure function of the frame and the result; nothing here
//! feeds back into the pipeline.

use image::{Rgba, RgbaImage};

use crate::compose::{EyeLandmarks, LandmarkResult};
use crate::frame::{GrayImage, ImageAccess};
use crate::types::{BoundingBox, Point};

const FACE_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const EYE_COLOR: Rgba<u8> = Rgba([0, 128, 255, 255]);
const CORNER_REGION_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);
const PUPIL_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const CORNER_COLOR: Rgba<u8> = Rgba([255, 0, 255, 255]);

/// Draw the face box, eye and corner regions, pupils and corners over a copy
/// of `frame`.
///
/// `frame` should be the frame the result was computed on (after mirroring).
pub fn render(frame: &GrayImage, result: &LandmarkResult) -> RgbaImage {
    let mut img = RgbaImage::from_fn(frame.width(), frame.height(), |x, y| {
        let v = frame.get_pixel(x as i32, y as i32);
        Rgba([v, v, v, 255])
    });

    draw_rect(&mut img, &result.face, FACE_COLOR);
    for eye in [&result.left, &result.right] {
        draw_eye(&mut img, eye);
    }
    img
}

fn draw_eye(img: &mut RgbaImage, eye: &EyeLandmarks) {
    draw_rect(img, &eye.region, EYE_COLOR);

    if let Some(corners) = &eye.corners {
        for corner in [&corners.inner, &corners.outer] {
            draw_rect(img, &corner.region, CORNER_REGION_COLOR);
            draw_cross(img, corner.point, 3, CORNER_COLOR);
        }
    }

    let center = eye.region_center();
    draw_line(img, center, eye.pupil, PUPIL_COLOR);
    draw_circle(img, eye.pupil, 3, PUPIL_COLOR);
}

fn plot(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    let (img_w, img_h) = img.dimensions();
    if x >= 0 && x < img_w as i32 && y >= 0 && y < img_h as i32 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_rect(img: &mut RgbaImage, rect: &BoundingBox, color: Rgba<u8>) {
    if rect.is_empty() {
        return;
    }
    let (right, bottom) = (rect.right() - 1, rect.bottom() - 1);

    for x in rect.x..=right {
        plot(img, x, rect.y, color);
        plot(img, x, bottom, color);
    }
    for y in rect.y..=bottom {
        plot(img, rect.x, y, color);
        plot(img, right, y, color);
    }
}

fn draw_circle(img: &mut RgbaImage, center: Point, radius: i32, color: Rgba<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                plot(img, center.x + dx, center.y + dy, color);
            }
        }
    }
}

fn draw_cross(img: &mut RgbaImage, at: Point, arm: i32, color: Rgba<u8>) {
    for d in -arm..=arm {
        plot(img, at.x + d, at.y, color);
        plot(img, at.x, at.y + d, color);
    }
}

/// Bresenham line, clipped to the image.
fn draw_line(img: &mut RgbaImage, from: Point, to: Point, color: Rgba<u8>) {
    let dx = (to.x - from.x).abs();
    let dy = (to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx - dy;
    let (mut x, mut y) = (from.x, from.y);

    loop {
        plot(img, x, y, color);
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose_eye;
    use crate::compose::LocalCorners;
    use crate::regions::{corner_regions, Eye};

    fn result() -> LandmarkResult {
        let face = BoundingBox::new(20, 10, 100, 100);
        let left_region = BoundingBox::new(13, 25, 25, 15);
        let right_region = BoundingBox::new(62, 25, 25, 15);
        let local = LocalCorners {
            regions: corner_regions(&left_region, 12),
            left: Point::new(0, 3),
            right: Point::new(12, 3),
        };
        LandmarkResult {
            face,
            left: compose_eye(Eye::Left, &face, &left_region, Point::new(12, 7), Some(&local)),
            right: compose_eye(Eye::Right, &face, &right_region, Point::new(12, 7), None),
        }
    }

    #[test]
    fn keeps_frame_dimensions() {
        let frame = GrayImage::from_fn(160, 120, |_, _| 90);
        let img = render(&frame, &result());
        assert_eq!(img.dimensions(), (160, 120));
        assert_eq!(*img.get_pixel(0, 0), Rgba([90, 90, 90, 255]));
    }

    #[test]
    fn draws_face_box_and_pupils() {
        let frame = GrayImage::from_fn(160, 120, |_, _| 0);
        let result = result();
        let img = render(&frame, &result);

        assert_eq!(*img.get_pixel(20, 60), FACE_COLOR);
        assert_eq!(*img.get_pixel(119, 109), FACE_COLOR);
        let pupil = result.left.pupil;
        assert_eq!(*img.get_pixel(pupil.x as u32, pupil.y as u32), PUPIL_COLOR);
    }

    #[test]
    fn clips_shapes_outside_the_frame() {
        let frame = GrayImage::from_fn(30, 30, |_, _| 0);
        // Face and eyes extend past the right and bottom edges.
        let img = render(&frame, &result());
        assert_eq!(img.dimensions(), (30, 30));
    }
}
