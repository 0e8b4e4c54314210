use crate::error::Error;

use nalgebra as na;
use ndarray::prelude::*;

/// A single detected point of interest, borrowed from its `Features` set
#[derive(Debug, Clone, Copy)]
pub struct Feature<'a> {
    pub pos: na::Point2<f32>,
    pub descriptor: ArrayView1<'a, f32>,
}

/// Keypoint positions with one descriptor row per keypoint
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    points: Vec<na::Point2<f32>>,
    descriptors: Array2<f32>,
}

impl Features {
    pub fn new(points: Vec<na::Point2<f32>>, descriptors: Array2<f32>) -> Result<Self, Error> {
        if points.len() != descriptors.nrows() {
            return Err(Error::DescriptorShape {
                expected: points.len(),
                found: descriptors.nrows(),
            });
        }

        Ok(Self {
            points,
            descriptors,
        })
    }

    pub fn empty(width: usize) -> Self {
        Self {
            points: Vec::new(),
            descriptors: Array2::zeros((0, width)),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Descriptor length
    #[inline]
    pub fn width(&self) -> usize {
        self.descriptors.ncols()
    }

    #[inline]
    pub fn points(&self) -> &[na::Point2<f32>] {
        &self.points
    }

    #[inline]
    pub fn descriptors(&self) -> ArrayView2<'_, f32> {
        self.descriptors.view()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<Feature<'_>> {
        let pos = *self.points.get(idx)?;

        Some(Feature {
            pos,
            descriptor: self.descriptors.row(idx),
        })
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = Feature<'_>> {
        self.points
            .iter()
            .zip(self.descriptors.outer_iter())
            .map(|(&pos, descriptor)| Feature { pos, descriptor })
    }

    /// Copies the rows at `indexes`, keeping their order
    pub fn select(&self, indexes: &[usize]) -> Self {
        Self {
            points: indexes.iter().map(|&i| self.points[i]).collect(),
            descriptors: self.descriptors.select(Axis(0), indexes),
        }
    }
}
