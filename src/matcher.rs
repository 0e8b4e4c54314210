use crate::error::Error;
use crate::feature::Features;

use ndarray::prelude::*;

/// Lowe's ratio between the best and the second best descriptor distance
pub const DEFAULT_RATIO: f32 = 0.7;

const NEIGHBORS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub train_idx: usize,
    pub distance: f32,
}

/// Nearest neighbor search over descriptor rows.
///
/// Returns one list per query row, sorted ascending by distance, at most `k` long.
pub trait KnnMatching {
    fn knn_match(
        &self,
        query: ArrayView2<'_, f32>,
        train: ArrayView2<'_, f32>,
        k: usize,
    ) -> Result<Vec<Vec<Neighbor>>, Error>;
}

/// Exhaustive L2 search
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceMatcher;

impl KnnMatching for BruteForceMatcher {
    fn knn_match(
        &self,
        query: ArrayView2<'_, f32>,
        train: ArrayView2<'_, f32>,
        k: usize,
    ) -> Result<Vec<Vec<Neighbor>>, Error> {
        if query.ncols() != train.ncols() {
            return Err(Error::DescriptorShape {
                expected: query.ncols(),
                found: train.ncols(),
            });
        }

        let mut result = Vec::with_capacity(query.nrows());

        for q in query.outer_iter() {
            let mut neighbors: Vec<_> = train
                .outer_iter()
                .enumerate()
                .map(|(train_idx, t)| {
                    let distance = q
                        .iter()
                        .zip(t.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum::<f32>()
                        .sqrt();

                    Neighbor {
                        train_idx,
                        distance,
                    }
                })
                .collect();

            neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            neighbors.truncate(k);
            result.push(neighbors);
        }

        Ok(result)
    }
}

/// Matches reference features into a frame and keeps only unambiguous pairs
pub struct FrameMatcher<M> {
    matcher: M,
    ratio: f32,
}

impl<M: KnnMatching> FrameMatcher<M> {
    pub fn new(matcher: M, ratio: f32) -> Self {
        Self { matcher, ratio }
    }

    #[inline]
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Returns `(reference_idx, target_idx)` pairs which pass the ratio test
    pub fn match_features(
        &self,
        reference: &Features,
        target: &Features,
    ) -> Result<Vec<(usize, usize)>, Error> {
        if reference.is_empty() || target.is_empty() {
            return Ok(Vec::new());
        }

        let knn = self
            .matcher
            .knn_match(reference.descriptors(), target.descriptors(), NEIGHBORS)?;

        let mut matches = Vec::new();

        for (query_idx, neighbors) in knn.iter().enumerate() {
            if let [best, second, ..] = neighbors.as_slice() {
                if best.distance < self.ratio * second.distance {
                    if best.train_idx >= target.len() {
                        return Err(Error::InvalidMatch {
                            index: best.train_idx,
                            len: target.len(),
                        });
                    }

                    matches.push((query_idx, best.train_idx));
                }
            }
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra as na;
    use ndarray::array;

    struct Fixed(Vec<Vec<Neighbor>>);

    impl KnnMatching for Fixed {
        fn knn_match(
            &self,
            _query: ArrayView2<'_, f32>,
            _train: ArrayView2<'_, f32>,
            _k: usize,
        ) -> Result<Vec<Vec<Neighbor>>, Error> {
            Ok(self.0.clone())
        }
    }

    fn nb(train_idx: usize, distance: f32) -> Neighbor {
        Neighbor {
            train_idx,
            distance,
        }
    }

    fn features(descriptors: Array2<f32>) -> Features {
        let points = (0..descriptors.nrows())
            .map(|i| na::Point2::new(i as f32, 0.0))
            .collect();

        Features::new(points, descriptors).unwrap()
    }

    #[test]
    fn brute_force_sorts_by_distance() {
        let query = array![[0.0, 0.0]];
        let train = array![[3.0, 4.0], [1.0, 0.0], [0.0, 2.0]];

        let res = BruteForceMatcher
            .knn_match(query.view(), train.view(), 2)
            .unwrap();

        assert_eq!(res, vec![vec![nb(1, 1.0), nb(2, 2.0)]]);
    }

    #[test]
    fn brute_force_rejects_width_mismatch() {
        let res = BruteForceMatcher.knn_match(
            array![[0.0, 0.0]].view(),
            array![[0.0, 0.0, 0.0]].view(),
            2,
        );

        assert!(matches!(res, Err(Error::DescriptorShape { .. })));
    }

    #[test]
    fn ratio_test_is_strict() {
        let matcher = FrameMatcher::new(
            Fixed(vec![
                vec![nb(4, 0.5), nb(1, 1.0)],
                vec![nb(2, 0.7), nb(3, 1.0)],
                vec![nb(0, 0.9), nb(1, 1.0)],
            ]),
            DEFAULT_RATIO,
        );
        let reference = features(Array2::zeros((3, 2)));
        let target = features(Array2::zeros((5, 2)));

        let res = matcher.match_features(&reference, &target).unwrap();

        assert_eq!(res, vec![(0, 4)]);
    }

    #[test]
    fn out_of_range_target_is_an_error() {
        let matcher = FrameMatcher::new(
            Fixed(vec![vec![nb(0, 0.1), nb(1, 1.0)], vec![nb(99, 0.1), nb(0, 1.0)]]),
            DEFAULT_RATIO,
        );
        let reference = features(Array2::zeros((2, 2)));
        let target = features(Array2::zeros((2, 2)));

        assert!(matches!(
            matcher.match_features(&reference, &target),
            Err(Error::InvalidMatch { index: 99, len: 2 })
        ));
    }

    #[test]
    fn single_candidate_gives_no_match() {
        let matcher = FrameMatcher::new(BruteForceMatcher, DEFAULT_RATIO);
        let reference = features(array![[0.0, 0.0], [5.0, 5.0]]);
        let target = features(array![[0.0, 0.1]]);

        assert!(matcher.match_features(&reference, &target).unwrap().is_empty());
    }

    #[test]
    fn empty_sets_give_no_match() {
        let matcher = FrameMatcher::new(BruteForceMatcher, DEFAULT_RATIO);
        let some = features(array![[0.0, 0.0], [5.0, 5.0]]);

        assert!(matcher
            .match_features(&Features::empty(2), &some)
            .unwrap()
            .is_empty());
        assert!(matcher
            .match_features(&some, &Features::empty(2))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn distinct_descriptors_match_their_twins() {
        let matcher = FrameMatcher::new(BruteForceMatcher, DEFAULT_RATIO);
        let reference = features(array![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]]);
        let target = features(array![[0.0, 10.5], [20.0, 20.0], [10.2, 0.0], [0.1, 0.0]]);

        let res = matcher.match_features(&reference, &target).unwrap();

        assert_eq!(res, vec![(0, 3), (1, 2), (2, 0)]);
    }
}
