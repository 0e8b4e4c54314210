pub mod bbox;
pub mod config;
#[cfg(feature = "opencv")]
pub mod detector;
pub mod error;
pub mod estimate;
pub mod export;
pub mod feature;
pub mod frame;
pub mod matcher;
pub mod math;
pub mod partition;
pub mod playback;
pub mod selector;
pub mod session;

pub use config::TrackerConfig;
pub use estimate::PositionEstimate;
pub use feature::{Feature, Features};
pub use frame::VideoInfo;
pub use matcher::{BruteForceMatcher, KnnMatching};
pub use session::{PointerEvent, TrackError, TrackerSession};

use error::Error;
use frame::FeatureCache;
use matcher::FrameMatcher;
use std::path::PathBuf;
use tracing::{info, warn};

/// Keypoint detection with descriptor extraction.
///
/// Positions must be in the pixel space of the image. Repeated calls on the
/// same image must give the same result.
pub trait Detecting {
    type Image;

    fn detect(&mut self, image: &Self::Image) -> Result<Features, Error>;
}

/// Owns every tracker session of one video and feeds them frame by frame
pub struct MotionTracker<D, M> {
    config: TrackerConfig,
    info: VideoInfo,
    cache: FeatureCache<D>,
    matcher: FrameMatcher<M>,
    sessions: Vec<TrackerSession>,
    next_id: u32,
}

impl<D: Detecting, M: KnnMatching> MotionTracker<D, M> {
    pub fn new(detector: D, matcher: M, info: VideoInfo, config: TrackerConfig) -> Self {
        Self {
            matcher: FrameMatcher::new(matcher, config.ratio),
            cache: FeatureCache::new(detector),
            sessions: Vec::new(),
            next_id: 0,
            config,
            info,
        }
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[inline]
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    #[inline]
    pub fn sessions(&self) -> &[TrackerSession] {
        &self.sessions
    }

    pub fn session(&self, id: u32) -> Option<&TrackerSession> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    pub fn session_mut(&mut self, id: u32) -> Option<&mut TrackerSession> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }

    /// Creates a session whose selection is drawn on frame `frame_idx`
    pub fn add_session(&mut self, frame_idx: usize, image: &D::Image) -> Result<u32, Error> {
        let reference = self.cache.get_or_detect(frame_idx, image)?;
        let id = self.next_id;
        self.next_id += 1;

        info!(
            session = id,
            frame = frame_idx,
            features = reference.len(),
            "tracker added"
        );

        self.sessions.push(TrackerSession::new(
            id,
            frame_idx,
            reference,
            self.config.hit_tolerance,
        ));

        Ok(id)
    }

    /// Routes a pointer event to session `id`, returns false for an unknown id
    pub fn handle_pointer(&mut self, id: u32, event: PointerEvent) -> bool {
        match self.session_mut(id) {
            Some(session) => {
                session.handle_pointer(event);
                true
            }
            None => false,
        }
    }

    /// Runs one tracking step of every committed session on frame `frame_idx`.
    ///
    /// Frame features are detected only when at least one session exists.
    pub fn update(
        &mut self,
        frame_idx: usize,
        image: &D::Image,
    ) -> Result<Vec<(u32, Result<PositionEstimate, TrackError>)>, Error> {
        if self.sessions.is_empty() {
            return Ok(Vec::new());
        }

        let features = self.cache.get_or_detect(frame_idx, image)?;
        let matcher = &self.matcher;

        Ok(self
            .sessions
            .iter_mut()
            .filter(|s| s.is_committed())
            .map(|s| (s.id(), s.track(frame_idx, &features, matcher)))
            .collect())
    }

    /// Saves every session into the configured output directory.
    ///
    /// A failing session does not prevent the others from being written.
    pub fn export_all(&self) -> Vec<(u32, Result<PathBuf, Error>)> {
        self.sessions
            .iter()
            .map(|s| {
                let res = export::save_session(&self.config.output_dir, &self.info, s);

                if let Err(err) = &res {
                    warn!(session = s.id(), "export failed: {}", err);
                }

                (s.id(), res)
            })
            .collect()
    }
}
