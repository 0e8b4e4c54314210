use crate::error::Error;
use crate::estimate::{estimate, PositionEstimate};
use crate::feature::Features;
use crate::matcher::{FrameMatcher, KnnMatching};
use crate::partition::partition;
use crate::selector::Selection;

use nalgebra as na;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, warn};

const PROMPT: &str = "Click and drag to make a selection";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    /// No rectangle drawn yet
    Empty,
    /// A corner is being dragged or the rectangle is not committed yet
    Selecting,
    /// Features are partitioned, tracking is active
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(na::Point2<f32>),
    Up(na::Point2<f32>),
    Move(na::Point2<f32>),
}

/// User feedback of a session, rendered by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    Idle,
    FeatureCountKnown(usize),
    NoFeatures,
    NoMatch,
    Clear,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::Idle | Advisory::Clear => Ok(()),
            Advisory::FeatureCountKnown(n) => write!(f, "{} features found", n),
            Advisory::NoFeatures => f.write_str("No features found"),
            Advisory::NoMatch => f.write_str("No matches found, please modify selection"),
        }
    }
}

/// Reasons a frame gets no history entry. None of them stops the frame loop.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("selection was never committed")]
    NotCommitted,

    #[error("no object or background features")]
    InsufficientFeatures,

    #[error("no matches found")]
    NoMatch,

    #[error("backend failure: {0}")]
    Backend(#[from] Error),
}

/// One user selection and the positions it was found at
#[derive(Debug)]
pub struct TrackerSession {
    id: u32,
    reference_frame: usize,
    reference: Rc<Features>,
    hit_tolerance: f32,
    state: SelectionState,
    selection: Option<Selection>,
    committed: bool,
    object: Features,
    background: Features,
    history: BTreeMap<usize, PositionEstimate>,
    advisory: Advisory,
}

impl TrackerSession {
    /// `reference` are the features of `reference_frame`, the frame the selection is drawn on
    pub fn new(id: u32, reference_frame: usize, reference: Rc<Features>, hit_tolerance: f32) -> Self {
        let width = reference.width();

        Self {
            id,
            reference_frame,
            reference,
            hit_tolerance,
            state: SelectionState::Empty,
            selection: None,
            committed: false,
            object: Features::empty(width),
            background: Features::empty(width),
            history: BTreeMap::new(),
            advisory: Advisory::Idle,
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn reference_frame(&self) -> usize {
        self.reference_frame
    }

    #[inline]
    pub fn state(&self) -> SelectionState {
        self.state
    }

    #[inline]
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    #[inline]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    #[inline]
    pub fn object_features(&self) -> &Features {
        &self.object
    }

    #[inline]
    pub fn background_features(&self) -> &Features {
        &self.background
    }

    #[inline]
    pub fn history(&self) -> &BTreeMap<usize, PositionEstimate> {
        &self.history
    }

    #[inline]
    pub fn estimate_at(&self, frame_idx: usize) -> Option<&PositionEstimate> {
        self.history.get(&frame_idx)
    }

    #[inline]
    pub fn advisory(&self) -> Advisory {
        self.advisory
    }

    /// Prompt followed by the current advisory, if any
    pub fn status_text(&self) -> String {
        let advisory = self.advisory.to_string();

        if advisory.is_empty() {
            PROMPT.to_string()
        } else {
            format!("{}. {}", PROMPT, advisory)
        }
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down(p) => self.pointer_down(p),
            PointerEvent::Move(p) => self.pointer_move(p),
            PointerEvent::Up(_) => self.pointer_up(),
        }
    }

    fn pointer_down(&mut self, p: na::Point2<f32>) {
        let hit = self.selection.as_ref().and_then(|sel| sel.hit_test(p));

        match hit {
            Some(corner) => {
                if let Some(sel) = self.selection.as_mut() {
                    sel.grab(corner);
                }
            }
            None => self.selection = Some(Selection::begin(p, self.hit_tolerance)),
        }

        self.state = SelectionState::Selecting;
    }

    fn pointer_move(&mut self, p: na::Point2<f32>) {
        if let Some(sel) = self.selection.as_mut() {
            if let Some(corner) = sel.dragged() {
                sel.drag_to(corner, p);
            }
        }
    }

    fn pointer_up(&mut self) {
        if self.state != SelectionState::Selecting {
            return;
        }

        if let Some(sel) = self.selection.as_mut() {
            sel.end_drag();
        }

        self.commit();
    }

    /// Re-partitions the reference features with the current rectangle
    fn commit(&mut self) {
        let sel = match &self.selection {
            Some(sel) => sel,
            None => return,
        };

        let (object, background) = partition(&self.reference, sel);
        info!(
            session = self.id,
            object = object.len(),
            background = background.len(),
            "selection committed"
        );

        self.advisory = Advisory::FeatureCountKnown(object.len());
        self.object = object;
        self.background = background;
        self.committed = true;
        self.state = SelectionState::Committed;
    }

    /// Locates the selection in `frame` and records it under `frame_idx`.
    ///
    /// Failures leave the history untouched and update the advisory.
    pub fn track<M: KnnMatching>(
        &mut self,
        frame_idx: usize,
        frame: &Features,
        matcher: &FrameMatcher<M>,
    ) -> Result<PositionEstimate, TrackError> {
        if !self.committed {
            return Err(TrackError::NotCommitted);
        }

        if self.object.is_empty() || self.background.is_empty() {
            self.advisory = Advisory::NoFeatures;
            debug!(session = self.id, frame = frame_idx, "no features to track");
            return Err(TrackError::InsufficientFeatures);
        }

        let matches = matcher.match_features(&self.object, frame).map_err(|err| {
            warn!(session = self.id, frame = frame_idx, "matching failed: {}", err);
            err
        })?;

        let found = match estimate(frame, &matches) {
            Some(found) => found,
            None => {
                self.advisory = Advisory::NoMatch;
                debug!(session = self.id, frame = frame_idx, "no matches");
                return Err(TrackError::NoMatch);
            }
        };

        debug!(
            session = self.id,
            frame = frame_idx,
            matches = matches.len(),
            x = found.x,
            y = found.y,
            "located"
        );

        if matches!(self.advisory, Advisory::NoMatch | Advisory::NoFeatures) {
            self.advisory = Advisory::Clear;
        }

        self.history.insert(frame_idx, found);
        Ok(found)
    }
}
