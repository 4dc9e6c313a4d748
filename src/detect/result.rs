use serde::{Deserialize, Serialize};

/// Axis-aligned box in integer pixel coordinates.
///
/// Serialized as `[x_min, y_min, x_max, y_max]`. Ordering of the corners is
/// not validated; detectors are trusted to emit `min < max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl BoundingBox {
    pub const fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Horizontal extent. Widened so extreme corners cannot overflow.
    pub fn width(&self) -> i64 {
        i64::from(self.x_max) - i64::from(self.x_min)
    }

    /// Vertical extent. Widened so extreme corners cannot overflow.
    pub fn height(&self) -> i64 {
        i64::from(self.y_max) - i64::from(self.y_min)
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from([x_min, y_min, x_max, y_max]: [i32; 4]) -> Self {
        Self::new(x_min, y_min, x_max, y_max)
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max]
    }
}

/// One raw detector hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub class_label: String,
    pub bounding_box: BoundingBox,
    pub confidence: f32,
}

impl Detection {
    pub fn new(
        class_id: usize,
        class_label: impl Into<String>,
        bounding_box: BoundingBox,
        confidence: f32,
    ) -> Self {
        Self {
            class_id,
            class_label: class_label.into(),
            bounding_box,
            confidence,
        }
    }
}
