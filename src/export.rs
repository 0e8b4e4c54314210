use crate::error::Error;
use crate::estimate::PositionEstimate;
use crate::frame::VideoInfo;
use crate::session::TrackerSession;

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const COLUMNS: &str = "frame, x, y, stdx, stdy";

/// Contents of a tracker file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackerFile {
    pub info: VideoInfo,
    pub tracker_id: u32,
    /// Sorted by frame
    pub rows: Vec<(usize, PositionEstimate)>,
}

pub fn write_tracker<W: Write>(
    mut w: W,
    info: &VideoInfo,
    tracker_id: u32,
    history: &BTreeMap<usize, PositionEstimate>,
) -> io::Result<()> {
    writeln!(w, "# length (frames): {}", info.length)?;
    writeln!(w, "# width: {}", info.width)?;
    writeln!(w, "# height: {}", info.height)?;
    writeln!(w, "# fps: {}", info.fps)?;
    writeln!(w, "# tracker_id: {}", tracker_id)?;
    writeln!(w, "# Columns: {}", COLUMNS)?;

    for (frame, p) in history {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            frame, p.x, p.y, p.spread_x, p.spread_y
        )?;
    }

    w.flush()
}

fn parse_field<T: std::str::FromStr>(line: usize, name: &str, value: &str) -> Result<T, Error> {
    value.trim().parse().map_err(|_| Error::Parse {
        line,
        reason: format!("invalid {} `{}`", name, value),
    })
}

pub fn read_tracker<R: BufRead>(r: R) -> Result<TrackerFile, Error> {
    let mut file = TrackerFile::default();

    for (idx, line) in r.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;

        if line.trim().is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('#') {
            let (key, value) = header.split_once(':').ok_or_else(|| Error::Parse {
                line: lineno,
                reason: "expected `key: value` header".to_string(),
            })?;

            match key.trim() {
                "length (frames)" => file.info.length = parse_field(lineno, "length", value)?,
                "width" => file.info.width = parse_field(lineno, "width", value)?,
                "height" => file.info.height = parse_field(lineno, "height", value)?,
                "fps" => file.info.fps = parse_field(lineno, "fps", value)?,
                "tracker_id" => file.tracker_id = parse_field(lineno, "tracker_id", value)?,
                _ => (),
            }

            continue;
        }

        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() != 5 {
            return Err(Error::Parse {
                line: lineno,
                reason: format!("expected 5 columns, found {}", cols.len()),
            });
        }

        let frame = parse_field(lineno, "frame", cols[0])?;
        let estimate = PositionEstimate::new(
            parse_field(lineno, "x", cols[1])?,
            parse_field(lineno, "y", cols[2])?,
            parse_field(lineno, "stdx", cols[3])?,
            parse_field(lineno, "stdy", cols[4])?,
        );

        file.rows.push((frame, estimate));
    }

    Ok(file)
}

/// Writes `<dir>/<id>.txt`. The directory must exist.
pub fn save_session(dir: &Path, info: &VideoInfo, session: &TrackerSession) -> Result<PathBuf, Error> {
    let path = dir.join(format!("{}.txt", session.id()));
    let file = std::fs::File::create(&path)?;

    write_tracker(
        io::BufWriter::new(file),
        info,
        session.id(),
        session.history(),
    )?;

    info!(
        session = session.id(),
        rows = session.history().len(),
        path = %path.display(),
        "tracker saved"
    );

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> VideoInfo {
        VideoInfo {
            length: 120,
            width: 640,
            height: 480,
            fps: 30,
        }
    }

    #[test]
    fn writes_exact_format() {
        let mut history = BTreeMap::new();
        history.insert(12, PositionEstimate::new(101, 99, 1, 1));
        history.insert(3, PositionEstimate::new(5, 0, 5, 0));

        let mut out = Vec::new();
        write_tracker(&mut out, &info(), 2, &history).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "# length (frames): 120\n\
             # width: 640\n\
             # height: 480\n\
             # fps: 30\n\
             # tracker_id: 2\n\
             # Columns: frame, x, y, stdx, stdy\n\
             3\t5\t0\t5\t0\n\
             12\t101\t99\t1\t1\n"
        );
    }

    #[test]
    fn empty_history_has_header_only() {
        let mut out = Vec::new();
        write_tracker(&mut out, &info(), 0, &BTreeMap::new()).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 6);
        assert!(text.lines().all(|l| l.starts_with('#')));
    }

    #[test]
    fn reports_bad_row_line() {
        let text = "# tracker_id: 1\n4\t1\t2\t3\n";

        match read_tracker(text.as_bytes()) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn reports_bad_number() {
        let text = "4\t1\tx\t3\t4\n";

        assert!(matches!(
            read_tracker(text.as_bytes()),
            Err(Error::Parse { line: 1, .. })
        ));
    }
}
