//! Monocular distance estimation from bounding-box geometry.
//!
//! With a pinhole camera, an object of known real height `H` that spans
//! `h` pixels vertically sits at distance `H * f / h`, where `f` is the
//! vertical focal length in pixels (`camera_matrix[1][1]`).

use serde::{Deserialize, Serialize};

use crate::detect::BoundingBox;
use crate::error::EstimateError;

/// 3x3 camera intrinsic matrix, row-major.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraMatrix(pub [[f64; 3]; 3]);

impl CameraMatrix {
    /// Intrinsics with square pixels and principal point `(cx, cy)`.
    pub fn from_intrinsics(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self([[fx, 0.0, cx], [0.0, fy, cy], [0.0, 0.0, 1.0]])
    }

    /// Vertical focal length in pixels.
    pub fn focal_length_y(&self) -> f64 {
        self.0[1][1]
    }
}

impl Default for CameraMatrix {
    /// Roughly a 60 degree vertical FOV webcam at 640x480.
    fn default() -> Self {
        Self::from_intrinsics(800.0, 800.0, 320.0, 240.0)
    }
}

/// Distance estimator for one class of objects with a known real height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceEstimator {
    object_height_m: f64,
    focal_length_px: f64,
}

impl DistanceEstimator {
    pub fn new(camera_matrix: &CameraMatrix, object_height_m: f64) -> Result<Self, EstimateError> {
        let focal_length_px = camera_matrix.focal_length_y();
        if !(focal_length_px.is_finite() && focal_length_px > 0.0) {
            return Err(EstimateError::InvalidParameter(format!(
                "focal length must be positive, got {}",
                focal_length_px
            )));
        }
        if !(object_height_m.is_finite() && object_height_m > 0.0) {
            return Err(EstimateError::InvalidParameter(format!(
                "object height must be positive, got {}",
                object_height_m
            )));
        }
        Ok(Self {
            object_height_m,
            focal_length_px,
        })
    }

    pub fn object_height_m(&self) -> f64 {
        self.object_height_m
    }

    pub fn focal_length_px(&self) -> f64 {
        self.focal_length_px
    }

    /// Distance in metres to the object inside `bbox`.
    pub fn distance(&self, bbox: &BoundingBox) -> Result<f64, EstimateError> {
        estimate_distance(self.object_height_m, self.focal_length_px, bbox)
    }
}

/// `object_height * focal_length / pixel_height`.
///
/// A box with zero or negative pixel height has no meaningful distance and
/// is rejected rather than producing an infinite or negative value.
pub fn estimate_distance(
    object_height_m: f64,
    focal_length_px: f64,
    bbox: &BoundingBox,
) -> Result<f64, EstimateError> {
    let pixel_height = bbox.height();
    if pixel_height <= 0 {
        return Err(EstimateError::DegenerateBox {
            y_min: bbox.y_min,
            y_max: bbox.y_max,
            pixel_height,
        });
    }
    Ok((object_height_m * focal_length_px) / pixel_height as f64)
}

/// Integer centroid, rounding toward the min corner.
pub fn bbox_center(bbox: &BoundingBox) -> (i32, i32) {
    (
        midpoint(bbox.x_min, bbox.width()),
        midpoint(bbox.y_min, bbox.height()),
    )
}

fn midpoint(min: i32, extent: i64) -> i32 {
    // always between the two corners, so it fits back into i32
    (i64::from(min) + extent.div_euclid(2)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_box_at_six_point_eight_metres() -> Result<(), EstimateError> {
        let matrix = CameraMatrix::from_intrinsics(800.0, 800.0, 320.0, 240.0);
        let estimator = DistanceEstimator::new(&matrix, 1.7)?;
        let bbox = BoundingBox::new(100, 50, 300, 250);

        let distance = estimator.distance(&bbox)?;
        assert!((distance - 6.8).abs() < 1e-12);
        assert_eq!(bbox_center(&bbox), (200, 150));
        Ok(())
    }

    #[test]
    fn distance_matches_formula_exactly() {
        for (y_min, y_max) in [(0, 1), (10, 11), (3, 480), (-20, 7), (100, 333)] {
            let bbox = BoundingBox::new(0, y_min, 10, y_max);
            let expected = (1.5 * 912.5) / (y_max - y_min) as f64;
            assert_eq!(estimate_distance(1.5, 912.5, &bbox).unwrap(), expected);
        }
    }

    #[test]
    fn only_the_vertical_focal_term_is_used() -> Result<(), EstimateError> {
        let matrix = CameraMatrix([[1.0, 9.0, 9.0], [9.0, 500.0, 9.0], [9.0, 9.0, 9.0]]);
        let estimator = DistanceEstimator::new(&matrix, 2.0)?;
        assert_eq!(estimator.distance(&BoundingBox::new(0, 0, 5, 100))?, 10.0);
        Ok(())
    }

    #[test]
    fn zero_height_box_is_an_error() {
        let bbox = BoundingBox::new(10, 40, 20, 40);
        assert_eq!(
            estimate_distance(1.7, 800.0, &bbox),
            Err(EstimateError::DegenerateBox {
                y_min: 40,
                y_max: 40,
                pixel_height: 0
            })
        );
    }

    #[test]
    fn inverted_box_is_an_error() {
        let bbox = BoundingBox::new(10, 50, 20, 40);
        assert!(matches!(
            estimate_distance(1.7, 800.0, &bbox),
            Err(EstimateError::DegenerateBox { pixel_height: -10, .. })
        ));
    }

    #[test]
    fn center_uses_floor_division() {
        assert_eq!(bbox_center(&BoundingBox::new(0, 0, 3, 5)), (1, 2));
        assert_eq!(bbox_center(&BoundingBox::new(1, 1, 2, 2)), (1, 1));
        assert_eq!(bbox_center(&BoundingBox::new(-7, -3, 0, 0)), (-4, -2));
        // unordered x is not validated; floor still rounds toward -inf
        assert_eq!(bbox_center(&BoundingBox::new(5, 0, 2, 2)), (3, 1));
    }

    #[test]
    fn extreme_boxes_do_not_overflow() {
        let tall = BoundingBox::new(0, -2_000_000_000, 10, 2_000_000_000);
        let distance = estimate_distance(1.7, 800.0, &tall).unwrap();
        assert_eq!(distance, (1.7 * 800.0) / 4_000_000_000.0);
        assert_eq!(bbox_center(&tall), (5, 0));

        let wide = BoundingBox::new(-2_000_000_000, 0, 2_000_000_000, 10);
        assert_eq!(bbox_center(&wide), (0, 5));

        let full = BoundingBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(bbox_center(&full), (-1, -1));
        assert!(estimate_distance(1.7, 800.0, &full).unwrap() > 0.0);
    }

    #[test]
    fn rejects_non_positive_parameters() {
        let flat = CameraMatrix::from_intrinsics(800.0, 0.0, 0.0, 0.0);
        assert!(DistanceEstimator::new(&flat, 1.7).is_err());
        assert!(DistanceEstimator::new(&CameraMatrix::default(), 0.0).is_err());
        assert!(DistanceEstimator::new(&CameraMatrix::default(), f64::NAN).is_err());
    }

    #[test]
    fn camera_matrix_serializes_as_nested_rows() {
        let json = serde_json::to_string(&CameraMatrix::from_intrinsics(1.0, 2.0, 3.0, 4.0)).unwrap();
        assert_eq!(json, "[[1.0,0.0,3.0],[0.0,2.0,4.0],[0.0,0.0,1.0]]");
    }
}
