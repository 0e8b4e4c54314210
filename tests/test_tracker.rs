// tests/test_tracker.rs: Multi-session tracking through MotionTracker with stub backends.

use mtrack::error::Error;
use mtrack::matcher::Neighbor;
use mtrack::session::{Advisory, SelectionState};
use mtrack::{
    Detecting, Features, KnnMatching, MotionTracker, PointerEvent, PositionEstimate, TrackError,
    TrackerConfig, VideoInfo,
};
use nalgebra as na;
use ndarray::{Array2, ArrayView2};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

const BROKEN_FRAME: usize = 6;

/// Frames are identified by their index, features are looked up in a table
struct TableDetector {
    frames: HashMap<usize, Features>,
    calls: Rc<Cell<usize>>,
}

impl Detecting for TableDetector {
    type Image = usize;

    fn detect(&mut self, image: &usize) -> Result<Features, Error> {
        self.calls.set(self.calls.get() + 1);
        if *image == BROKEN_FRAME {
            return Err(Error::SourceUnavailable(format!("frame {}", image)));
        }

        Ok(self
            .frames
            .get(image)
            .cloned()
            .unwrap_or_else(|| Features::empty(2)))
    }
}

/// Returns canned neighbors, ignoring the descriptors
struct CannedMatcher(Vec<Vec<Neighbor>>);

impl KnnMatching for CannedMatcher {
    fn knn_match(
        &self,
        query: ArrayView2<'_, f32>,
        _train: ArrayView2<'_, f32>,
        _k: usize,
    ) -> Result<Vec<Vec<Neighbor>>, Error> {
        Ok(self.0.iter().take(query.nrows()).cloned().collect())
    }
}

fn pt(x: f32, y: f32) -> na::Point2<f32> {
    na::Point2::new(x, y)
}

fn nb(train_idx: usize, distance: f32) -> Neighbor {
    Neighbor {
        train_idx,
        distance,
    }
}

fn features(points: Vec<na::Point2<f32>>) -> Features {
    let n = points.len();
    let descriptors = Array2::from_shape_fn((n, 2), |(r, c)| (r * 2 + c) as f32);
    Features::new(points, descriptors).unwrap()
}

fn info() -> VideoInfo {
    VideoInfo {
        length: 10,
        width: 640,
        height: 480,
        fps: 25,
    }
}

fn detector(calls: &Rc<Cell<usize>>) -> TableDetector {
    let mut frames = HashMap::new();
    frames.insert(
        0,
        features(vec![
            pt(20.0, 20.0),
            pt(30.0, 30.0),
            pt(40.0, 25.0),
            pt(300.0, 300.0),
            pt(5.0, 400.0),
        ]),
    );
    frames.insert(
        1,
        features(vec![pt(100.0, 100.0), pt(102.0, 98.0), pt(500.0, 500.0)]),
    );

    TableDetector {
        frames,
        calls: calls.clone(),
    }
}

fn canned() -> CannedMatcher {
    CannedMatcher(vec![
        vec![nb(0, 1.0), nb(2, 10.0)],
        vec![nb(1, 1.0), nb(2, 10.0)],
        vec![nb(0, 9.0), nb(1, 10.0)],
    ])
}

fn select(tracker: &mut MotionTracker<TableDetector, CannedMatcher>, id: u32) {
    assert!(tracker.handle_pointer(id, PointerEvent::Down(pt(10.0, 10.0))));
    assert!(tracker.handle_pointer(id, PointerEvent::Move(pt(50.0, 50.0))));
    assert!(tracker.handle_pointer(id, PointerEvent::Up(pt(50.0, 50.0))));
}

#[test]
fn no_sessions_no_detection() {
    let calls = Rc::new(Cell::new(0));
    let mut tracker = MotionTracker::new(detector(&calls), canned(), info(), TrackerConfig::default());

    let findings = tracker.update(0, &0).unwrap();

    assert!(findings.is_empty());
    assert_eq!(calls.get(), 0);
}

#[test]
fn locates_selection_in_next_frame() {
    let calls = Rc::new(Cell::new(0));
    let mut tracker = MotionTracker::new(detector(&calls), canned(), info(), TrackerConfig::default());

    let id = tracker.add_session(0, &0).unwrap();
    assert_eq!(id, 0);

    // uncommitted sessions are not stepped
    assert!(tracker.update(0, &0).unwrap().is_empty());

    select(&mut tracker, id);
    let session = tracker.session(id).unwrap();
    assert_eq!(session.state(), SelectionState::Committed);
    assert_eq!(session.object_features().len(), 3);
    assert_eq!(session.advisory(), Advisory::FeatureCountKnown(3));

    let findings = tracker.update(1, &1).unwrap();
    assert_eq!(findings.len(), 1);

    let (found_id, res) = &findings[0];
    assert_eq!(*found_id, id);
    assert_eq!(res.as_ref().unwrap(), &PositionEstimate::new(101, 99, 1, 1));
    assert_eq!(
        tracker.session(id).unwrap().estimate_at(1),
        Some(&PositionEstimate::new(101, 99, 1, 1))
    );
}

#[test]
fn replaying_a_frame_is_idempotent() {
    let calls = Rc::new(Cell::new(0));
    let mut tracker = MotionTracker::new(detector(&calls), canned(), info(), TrackerConfig::default());
    let id = tracker.add_session(0, &0).unwrap();
    select(&mut tracker, id);

    tracker.update(1, &1).unwrap();
    let first = *tracker.session(id).unwrap().estimate_at(1).unwrap();

    tracker.update(1, &1).unwrap();
    let second = *tracker.session(id).unwrap().estimate_at(1).unwrap();

    assert_eq!(first, second);
    assert_eq!(tracker.session(id).unwrap().history().len(), 1);
    // frame 0 for the reference, frame 1 once
    assert_eq!(calls.get(), 2);
}

#[test]
fn sessions_are_independent() {
    let calls = Rc::new(Cell::new(0));
    let mut tracker = MotionTracker::new(detector(&calls), canned(), info(), TrackerConfig::default());

    let a = tracker.add_session(0, &0).unwrap();
    let b = tracker.add_session(0, &0).unwrap();
    assert_eq!((a, b), (0, 1));

    select(&mut tracker, a);

    // b selects an area without features
    tracker.handle_pointer(b, PointerEvent::Down(pt(100.0, 100.0)));
    tracker.handle_pointer(b, PointerEvent::Move(pt(200.0, 200.0)));
    tracker.handle_pointer(b, PointerEvent::Up(pt(200.0, 200.0)));

    let findings = tracker.update(1, &1).unwrap();
    assert_eq!(findings.len(), 2);
    assert!(findings[0].1.is_ok());
    assert!(matches!(findings[1].1, Err(TrackError::InsufficientFeatures)));

    assert_eq!(tracker.session(a).unwrap().history().len(), 1);
    assert!(tracker.session(b).unwrap().history().is_empty());
    assert_eq!(tracker.session(b).unwrap().advisory(), Advisory::NoFeatures);
}

#[test]
fn frame_without_features_is_no_match() {
    let calls = Rc::new(Cell::new(0));
    let mut tracker = MotionTracker::new(detector(&calls), canned(), info(), TrackerConfig::default());
    let id = tracker.add_session(0, &0).unwrap();
    select(&mut tracker, id);

    let findings = tracker.update(7, &7).unwrap();

    assert!(matches!(findings[0].1, Err(TrackError::NoMatch)));
    assert!(tracker.session(id).unwrap().estimate_at(7).is_none());
    assert_eq!(tracker.session(id).unwrap().advisory(), Advisory::NoMatch);
}

#[test]
fn unknown_session_ignores_pointer() {
    let calls = Rc::new(Cell::new(0));
    let mut tracker = MotionTracker::new(detector(&calls), canned(), info(), TrackerConfig::default());

    assert!(!tracker.handle_pointer(3, PointerEvent::Down(pt(0.0, 0.0))));
    assert!(tracker.session(3).is_none());
}

#[test]
fn failed_detection_does_not_stop_later_frames() {
    let calls = Rc::new(Cell::new(0));
    let mut tracker = MotionTracker::new(detector(&calls), canned(), info(), TrackerConfig::default());
    let id = tracker.add_session(0, &0).unwrap();
    select(&mut tracker, id);

    assert!(matches!(
        tracker.update(BROKEN_FRAME, &BROKEN_FRAME),
        Err(Error::SourceUnavailable(_))
    ));
    assert!(tracker.session(id).unwrap().estimate_at(BROKEN_FRAME).is_none());

    let findings = tracker.update(1, &1).unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(
        tracker.session(id).unwrap().estimate_at(1),
        Some(&PositionEstimate::new(101, 99, 1, 1))
    );
}
