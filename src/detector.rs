use crate::error::Error;
use crate::feature::Features;
use crate::Detecting;

use nalgebra as na;
use ndarray::prelude::*;
use opencv::{
    core::{self, KeyPoint, Mat, Ptr, Vector},
    features2d, imgproc,
    prelude::*,
};

const SIFT_DESCRIPTOR_SIZE: usize = 128;

pub struct SiftDetectorConfig {
    /// Best features to retain, 0 keeps all of them
    pub max_features: i32,
    pub octave_layers: i32,
    pub contrast_threshold: f64,
    pub edge_threshold: f64,
    pub sigma: f64,
}

impl SiftDetectorConfig {
    pub fn new(max_features: i32) -> Self {
        Self {
            max_features,
            octave_layers: 3,
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
            sigma: 1.6,
        }
    }
}

impl Default for SiftDetectorConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

pub struct SiftDetector {
    sift: Ptr<features2d::SIFT>,
}

impl SiftDetector {
    pub fn new(config: SiftDetectorConfig) -> Result<Self, Error> {
        let sift = features2d::SIFT::create(
            config.max_features,
            config.octave_layers,
            config.contrast_threshold,
            config.edge_threshold,
            config.sigma,
        )?;

        Ok(Self { sift })
    }
}

impl Detecting for SiftDetector {
    type Image = Mat;

    fn detect(&mut self, image: &Mat) -> Result<Features, Error> {
        let gray = if image.channels()? == 3 {
            let mut gray = Mat::default();
            imgproc::cvt_color(image, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
            gray
        } else {
            image.clone()
        };

        let mut keypoints = Vector::<KeyPoint>::new();
        let mut descriptors = Mat::default();
        let mask = Mat::default();

        self.sift
            .detect_and_compute(&gray, &mask, &mut keypoints, &mut descriptors, false)?;

        if keypoints.is_empty() {
            return Ok(Features::empty(SIFT_DESCRIPTOR_SIZE));
        }

        let points = keypoints
            .iter()
            .map(|kp| {
                let pt = kp.pt();
                na::Point2::new(pt.x, pt.y)
            })
            .collect();

        let (rows, cols) = (descriptors.rows() as usize, descriptors.cols() as usize);
        let mut data = Array2::<f32>::zeros((rows, cols));

        if descriptors.typ()? != core::CV_32F {
            let mut converted = Mat::default();
            descriptors.convert_to(&mut converted, core::CV_32F, 1.0, 0.0)?;
            descriptors = converted;
        }

        for (r, mut row) in data.outer_iter_mut().enumerate() {
            let src = descriptors.at_row::<f32>(r as i32)?;
            row.iter_mut().zip(src.iter()).for_each(|(d, s)| *d = *s);
        }

        Features::new(points, data)
    }
}
