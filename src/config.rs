use crate::error::Error;
use crate::matcher::DEFAULT_RATIO;
use crate::selector::DEFAULT_HIT_TOLERANCE;

use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Ratio test threshold, best distance must be below `ratio * second`
    pub ratio: f32,
    /// Half size of the corner grab area in pixels
    pub hit_tolerance: f32,
    /// Directory receiving one `<id>.txt` per tracker on export
    pub output_dir: PathBuf,
}

impl TrackerConfig {
    pub fn new(ratio: f32) -> Self {
        Self {
            ratio,
            ..Default::default()
        }
    }

    pub fn with_hit_tolerance(mut self, hit_tolerance: f32) -> Self {
        self.hit_tolerance = hit_tolerance;
        self
    }

    pub fn with_output_dir<P: Into<PathBuf>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Reads a JSON config, missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;

        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_RATIO,
            hit_tolerance: DEFAULT_HIT_TOLERANCE,
            output_dir: PathBuf::from("tracker_data"),
        }
    }
}
