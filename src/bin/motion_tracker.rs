use anyhow::{Context, Result};
use clap::Parser;
use mtrack::detector::{SiftDetector, SiftDetectorConfig};
use mtrack::playback::{Command, Playback};
use mtrack::selector::Selection;
use mtrack::{
    BruteForceMatcher, PointerEvent, PositionEstimate, TrackError, TrackerConfig, VideoInfo,
};
use nalgebra as na;
use opencv::{
    core::{self, Mat},
    highgui, imgproc,
    prelude::*,
    videoio,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

const MAIN_WINDOW: &str = "Video Tracker";
const TEXT_FONT: i32 = imgproc::FONT_HERSHEY_COMPLEX_SMALL;
const TEXT_SCALE: f64 = 0.8;

type Tracker = mtrack::MotionTracker<SiftDetector, BruteForceMatcher>;
type EventQueue = Arc<Mutex<VecDeque<(u32, PointerEvent)>>>;

#[derive(Debug, Parser)]
#[command(name = "motion-tracker", about = "Track user selections through a video")]
struct Opts {
    /// Video file to track in
    #[arg(short, long)]
    input: PathBuf,

    /// JSON tracker config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where tracker files are written, overrides the config
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Ratio test threshold, overrides the config
    #[arg(short, long)]
    ratio: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppNotice {
    Default,
    Saved,
}

impl AppNotice {
    fn text(&self) -> &'static str {
        match self {
            AppNotice::Default => {
                "Press SPACE to play/pause. Press Q to open selection window. Press S to save tracker data"
            }
            AppNotice::Saved => {
                "Press SPACE to play/pause. Press Q to open selection window. Tracker data saved"
            }
        }
    }
}

fn query_window(id: u32) -> String {
    format!("Query {}", id)
}

fn load_video(input: &PathBuf) -> Result<(Vec<Mat>, VideoInfo)> {
    let mut cam = videoio::VideoCapture::from_file(&input.to_string_lossy(), videoio::CAP_ANY)?;

    if !videoio::VideoCapture::is_opened(&cam)? {
        return Err(mtrack::error::Error::SourceUnavailable(input.display().to_string()).into());
    }

    let info = VideoInfo {
        length: cam.get(videoio::CAP_PROP_FRAME_COUNT)? as u32,
        width: cam.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32,
        height: cam.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32,
        fps: cam.get(videoio::CAP_PROP_FPS)? as u32,
    };

    let mut frames = Vec::with_capacity(info.length as usize);
    let mut last_percent = u32::MAX;

    loop {
        let mut frame = Mat::default();

        if !cam.read(&mut frame)? || frame.cols() == 0 || frame.rows() == 0 {
            break;
        }

        frames.push(frame);

        let percent = (frames.len() as u32 * 100) / info.length.max(1);
        if percent != last_percent && percent % 10 == 0 {
            tracing::info!("loading video {}%", percent);
            last_percent = percent;
        }
    }

    if frames.is_empty() {
        return Err(mtrack::error::Error::SourceUnavailable(format!(
            "{}: no frames",
            input.display()
        ))
        .into());
    }

    let info = VideoInfo {
        length: frames.len() as u32,
        ..info
    };

    Ok((frames, info))
}

fn to_point(p: na::Point2<f32>) -> core::Point {
    core::Point::new(p.x.round() as i32, p.y.round() as i32)
}

fn green() -> core::Scalar {
    core::Scalar::new(0.0, 255.0, 0.0, 0.0)
}

fn draw_text_bar(frame: &mut Mat, text: &str) -> opencv::Result<()> {
    if text.is_empty() {
        return Ok(());
    }

    let mut baseline = 0;
    let size = imgproc::get_text_size(text, TEXT_FONT, TEXT_SCALE, 1, &mut baseline)?;
    let cx = frame.cols() / 2;
    let cy = frame.rows() - size.height - 30;

    let bar = core::Rect::new(
        (cx - size.width / 2 - 10).max(0),
        (cy - size.height / 2 - 10).max(0),
        (size.width + 20).min(frame.cols()),
        (size.height + 20).min(frame.rows()),
    );

    let mut overlay = frame.clone();
    imgproc::rectangle(
        &mut overlay,
        bar,
        core::Scalar::new(0.0, 0.0, 0.0, 0.0),
        imgproc::FILLED,
        imgproc::LINE_8,
        0,
    )?;

    let mut blended = Mat::default();
    core::add_weighted(&overlay, 0.5, &*frame, 0.5, 0.0, &mut blended, -1)?;
    *frame = blended;

    imgproc::put_text(
        frame,
        text,
        core::Point::new(cx - size.width / 2, cy + size.height / 2),
        TEXT_FONT,
        TEXT_SCALE,
        core::Scalar::new(255.0, 255.0, 255.0, 0.0),
        1,
        imgproc::LINE_8,
        false,
    )
}

fn draw_selection(frame: &mut Mat, sel: &Selection, id: u32) -> opencv::Result<()> {
    let bbox = sel.bounding_box();
    let area = bbox.as_ltwh();
    imgproc::rectangle(
        frame,
        core::Rect::new(
            area.left() as i32,
            area.top() as i32,
            area.width() as i32,
            area.height() as i32,
        ),
        green(),
        1,
        imgproc::LINE_8,
        0,
    )?;

    for corner in [sel.start(), sel.end()] {
        let c = to_point(corner);
        imgproc::rectangle_points(
            frame,
            core::Point::new(c.x - 3, c.y - 3),
            core::Point::new(c.x + 3, c.y + 3),
            green(),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )?;
    }

    imgproc::put_text(
        frame,
        &format!("Selection {}", id),
        core::Point::new(bbox.left() as i32 + 10, bbox.top() as i32 - 10),
        TEXT_FONT,
        TEXT_SCALE,
        green(),
        1,
        imgproc::LINE_8,
        false,
    )
}

fn draw_finding(frame: &mut Mat, id: u32, p: &PositionEstimate) -> opencv::Result<()> {
    imgproc::rectangle_points(
        frame,
        core::Point::new(p.x - 5, p.y - 5),
        core::Point::new(p.x + 5, p.y + 5),
        green(),
        1,
        imgproc::LINE_8,
        0,
    )?;

    imgproc::line(
        frame,
        core::Point::new(p.x - p.spread_x, p.y),
        core::Point::new(p.x + p.spread_x, p.y),
        green(),
        1,
        imgproc::LINE_8,
        0,
    )?;

    imgproc::line(
        frame,
        core::Point::new(p.x, p.y - p.spread_y),
        core::Point::new(p.x, p.y + p.spread_y),
        green(),
        1,
        imgproc::LINE_8,
        0,
    )?;

    imgproc::put_text(
        frame,
        &format!("Query {}", id),
        core::Point::new(p.x + 10, p.y - 10),
        TEXT_FONT,
        TEXT_SCALE,
        green(),
        1,
        imgproc::LINE_8,
        false,
    )
}

fn open_query_window(id: u32, events: &EventQueue) -> Result<()> {
    let name = query_window(id);
    highgui::named_window(&name, highgui::WINDOW_AUTOSIZE)?;

    let events = events.clone();
    highgui::set_mouse_callback(
        &name,
        Some(Box::new(move |event, x, y, _flags| {
            let p = na::Point2::new(x as f32, y as f32);
            let event = match event {
                highgui::EVENT_LBUTTONDOWN => PointerEvent::Down(p),
                highgui::EVENT_LBUTTONUP => PointerEvent::Up(p),
                highgui::EVENT_MOUSEMOVE => PointerEvent::Move(p),
                _ => return,
            };

            events.lock().push_back((id, event));
        })),
    )?;

    Ok(())
}

fn show_queries(tracker: &Tracker, frames: &[Mat]) -> Result<()> {
    for session in tracker.sessions() {
        let mut frame = frames[session.reference_frame()].clone();

        if let Some(sel) = session.selection() {
            draw_selection(&mut frame, sel, session.id())?;
        }

        draw_text_bar(&mut frame, &session.status_text())?;
        highgui::imshow(&query_window(session.id()), &frame)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let opts = Opts::parse();

    let mut config = match &opts.config {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TrackerConfig::default(),
    };

    if let Some(dir) = opts.output_dir {
        config.output_dir = dir;
    }

    if let Some(ratio) = opts.ratio {
        config.ratio = ratio;
    }

    let (frames, info) = load_video(&opts.input)?;
    tracing::info!(
        "video {}x{} {} frames at {} fps",
        info.width,
        info.height,
        info.length,
        info.fps
    );

    highgui::named_window(MAIN_WINDOW, highgui::WINDOW_AUTOSIZE)?;

    let detector = SiftDetector::new(SiftDetectorConfig::default())?;
    let mut tracker = Tracker::new(detector, BruteForceMatcher, info, config);
    let mut playback = Playback::new(frames.len());
    let mut notice = AppNotice::Default;
    let events: EventQueue = Arc::new(Mutex::new(VecDeque::new()));
    let delay = (1000 / info.fps.max(1)) as i32;

    loop {
        let pending: Vec<_> = events.lock().drain(..).collect();
        for (id, event) in pending {
            tracker.handle_pointer(id, event);
        }

        let frame_idx = playback.frame_idx();
        let findings = match tracker.update(frame_idx, &frames[frame_idx]) {
            Ok(findings) => findings,
            Err(err) => {
                tracing::warn!("frame {}: {}", frame_idx, err);
                Vec::new()
            }
        };

        show_queries(&tracker, &frames)?;

        let mut frame = frames[frame_idx].clone();
        for (id, res) in &findings {
            match res {
                Ok(p) => draw_finding(&mut frame, *id, p)?,
                Err(TrackError::Backend(err)) => tracing::warn!("tracker {}: {}", id, err),
                Err(_) => (),
            }
        }

        draw_text_bar(&mut frame, notice.text())?;
        highgui::imshow(MAIN_WINDOW, &frame)?;

        playback.advance();

        match Command::from_key(highgui::wait_key(delay)?) {
            Some(Command::Quit) => break,
            Some(Command::TogglePlayback) => {
                playback.toggle();
                notice = AppNotice::Default;
            }
            Some(Command::AddTracker) => {
                playback.pause();
                let idx = playback.frame_idx();
                let id = tracker.add_session(idx, &frames[idx])?;
                open_query_window(id, &events)?;
            }
            Some(Command::Export) => {
                playback.pause();

                if let Err(err) = std::fs::create_dir_all(&tracker.config().output_dir) {
                    tracing::error!("Failed to create output directory: {}", err);
                }

                for (id, res) in tracker.export_all() {
                    if let Err(err) = res {
                        tracing::error!("Error saving tracker {}: {}", id, err);
                    }
                }

                notice = AppNotice::Saved;
            }
            None => (),
        }

        if highgui::get_window_property(MAIN_WINDOW, highgui::WND_PROP_VISIBLE)? < 1.0 {
            break;
        }
    }

    Ok(())
}
