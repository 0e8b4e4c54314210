use crate::error::Error;
use crate::feature::Features;
use crate::Detecting;

use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Properties of the loaded video, written into every tracker file
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoInfo {
    pub length: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Features per frame index, detected on first use.
///
/// Frame contents never change while a video is loaded, so an entry is never recomputed.
pub struct FeatureCache<D> {
    detector: D,
    frames: HashMap<usize, Rc<Features>>,
}

impl<D: Detecting> FeatureCache<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            frames: HashMap::new(),
        }
    }

    pub fn get_or_detect(&mut self, frame_idx: usize, image: &D::Image) -> Result<Rc<Features>, Error> {
        if let Some(features) = self.frames.get(&frame_idx) {
            return Ok(features.clone());
        }

        let features = Rc::new(self.detector.detect(image)?);
        debug!(frame = frame_idx, count = features.len(), "detected features");

        self.frames.insert(frame_idx, features.clone());
        Ok(features)
    }

    #[inline]
    pub fn get(&self, frame_idx: usize) -> Option<Rc<Features>> {
        self.frames.get(&frame_idx).cloned()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drops every entry, to be called when another video is loaded
    #[inline]
    pub fn clear(&mut self) {
        self.frames.clear()
    }
}
