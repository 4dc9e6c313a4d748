//! Per-frame object reports and their JSON form.
//!
//! ```json
//! {
//!     "objects": [
//!         {
//!             "class": "person",
//!             "bounding_box": [100, 50, 300, 250],
//!             "distance": 6.8,
//!             "center": [200, 150]
//!         }
//!     ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::detect::BoundingBox;
use crate::error::ReportError;

const JSON_INDENT: &[u8] = b"    ";

/// One detected object with its distance estimate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    #[serde(rename = "class")]
    pub class_label: String,
    pub bounding_box: BoundingBox,
    #[serde(rename = "distance")]
    pub distance_meters: f64,
    pub center: (i32, i32),
}

/// Everything detected in one frame, in detector order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectReport {
    pub objects: Vec<DetectedObject>,
}

impl ObjectReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, object: DetectedObject) {
        self.objects.push(object);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Pretty JSON with four-space indentation.
    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        let mut out = Vec::new();
        self.write_json(&mut out)?;
        // serde_json only ever emits UTF-8
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Write the report to `path`, replacing any existing file.
    pub fn save_to_json(&self, path: &Path) -> Result<(), ReportError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from_json(path: &Path) -> Result<Self, ReportError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn write_json<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        self.serialize(&mut serializer)?;
        Ok(())
    }
}
