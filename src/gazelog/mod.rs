//! Eye-tracker export reader
//!
//! The export is a tab-separated file: the first line names the columns,
//! every following line carries one data row. A file is a concatenation of
//! per-participant recording segments, not necessarily homogeneous, so the
//! reader yields one [`GazeRecording`] per segment.
//!
//! Row handling:
//! - the first data row of a segment establishes the identity record and
//!   opens a recording; the row is consumed by that alone,
//! - a row with a non-zero device-clock counter becomes a [`Sample`], its
//!   wall clock re-anchored on the identity record's recording date,
//! - a row with a zero counter is a discrete event; the first matching
//!   category among mouse/keyboard/studio/external wins,
//! - a studio event signalling a started recording segment also opens a
//!   stimuli snapshot from the same row,
//! - a row naming a different participant closes the current recording and
//!   opens the next one, reusing the same column mapping.
//!
//! Malformed rows are skipped with a warning, never fatal.

pub mod record;

use tracing::warn;

use crate::recording::{GazeRecording, Sample, SampleTime, Stimulus, Timed};
use crate::schema::{Columns, Row};
use record::{
    Camera, ExternalEvent, EyePosition, EyeStatus, GazeEventData, GazePoint, KeyPressEvent,
    MediaInfo, MouseEvent, RecordingInfo, RowTime, SceneInfo, SegmentInfo, StudioEvent,
};

const SEPARATOR: char = '\t';

/// Decode a whole export into the recordings it concatenates.
///
/// Pure function of the file contents; an empty or header-only file yields
/// no recordings.
pub fn read_gaze_log(text: &str) -> Vec<GazeRecording> {
    let mut lines = text.lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns = Columns::from_header(header, SEPARATOR);

    let mut recordings = Vec::new();
    let mut current: Option<GazeRecording> = None;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let row = columns.row(line, SEPARATOR);

        let Some(info) = RecordingInfo::decode(&row) else {
            warn!("skipping gaze log row without identity columns");
            continue;
        };

        match current.as_mut() {
            None => current = Some(GazeRecording::new(info)),
            Some(recording) if recording.info.participant != info.participant => {
                let finished = std::mem::replace(recording, GazeRecording::new(info));
                recordings.push(finished);
            }
            Some(recording) => ingest_row(recording, &row),
        }
    }

    if let Some(recording) = current {
        recordings.push(recording);
    }

    recordings
}

fn ingest_row(recording: &mut GazeRecording, row: &Row) {
    let Some(raw_time) = RowTime::decode(row) else {
        return;
    };
    let Some(local_time) = raw_time.local_time else {
        warn!("skipping gaze log row without a local timestamp");
        return;
    };

    // only the time of day is reliable per row
    let local_time = match recording.info.recording_date {
        Some(date) => date.and_time(local_time.time()),
        None => local_time,
    };

    let time = SampleTime {
        local_time,
        device_us: raw_time.device_us.unwrap_or(0),
        recording_ms: raw_time.recording_ms,
    };

    if time.device_us != 0 {
        recording.samples.push(Sample {
            time,
            gaze: GazePoint::decode(row),
            event: GazeEventData::decode(row),
            eye_pos: EyePosition::decode(row),
            eye: EyeStatus::decode(row),
            camera: Camera::decode(row),
        });
        return;
    }

    if let Some(data) = MouseEvent::decode(row) {
        recording.mouse.push(Timed { time, data });
    } else if let Some(data) = KeyPressEvent::decode(row) {
        recording.keyboard.push(Timed { time, data });
    } else if let Some(data) = StudioEvent::decode(row) {
        let opens_stimuli = data.event.as_deref() == Some(StudioEvent::SEGMENT_STARTED);
        recording.studio.push(Timed {
            time: time.clone(),
            data,
        });

        if opens_stimuli {
            recording.stimuli.push(Stimulus {
                time,
                media: MediaInfo::decode(row),
                scene: SceneInfo::decode(row),
                segment: SegmentInfo::decode(row),
            });
        }
    } else if let Some(data) = ExternalEvent::decode(row) {
        recording.external.push(Timed { time, data });
    }
}
