//! Gaze recording: samples, discrete events and stimuli of one capture
//!
//! A [`GazeRecording`] scopes everything decoded from one participant's
//! continuous recording segment. Gaze events are derived from the samples
//! once, on first access, and cached; slicing produces an independent
//! recording that shares no mutable state with its source and re-derives
//! its own events from the sliced samples.

use std::cell::OnceCell;

use chrono::NaiveDateTime;

use crate::events::{segment, GazeEvent, GazeEventKind};
use crate::gazelog::record::{
    Camera, EyePosition, EyeStatus, ExternalEvent, GazeEventData, GazePoint, KeyPressEvent,
    MediaInfo, MouseEvent, RecordingInfo, SceneInfo, SegmentInfo, StudioEvent,
};

/// Timestamp of one decoded row, after the wall clock has been anchored on
/// the recording date.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTime {
    /// Wall clock; only its time-of-day component came from the row itself
    pub local_time: NaiveDateTime,
    /// Eye-tracker microsecond counter; zero on discrete-event rows
    pub device_us: i64,
    /// Recording clock in milliseconds, when exported
    pub recording_ms: Option<f64>,
}

impl SampleTime {
    /// Wall-clock instant in epoch milliseconds, for comparison against
    /// trial-log timestamps.
    pub fn local_millis(&self) -> i64 {
        self.local_time.and_utc().timestamp_millis()
    }
}

/// One eye-tracker measurement instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: SampleTime,
    pub gaze: Option<GazePoint>,
    pub event: Option<GazeEventData>,
    pub eye_pos: Option<EyePosition>,
    pub eye: Option<EyeStatus>,
    pub camera: Option<Camera>,
}

/// A discrete (non-sample) event with the wall-clock instant it was logged at.
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub time: SampleTime,
    pub data: T,
}

/// Media/scene/segment snapshot opened when the recording software signals
/// a new segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Stimulus {
    pub time: SampleTime,
    pub media: Option<MediaInfo>,
    pub scene: Option<SceneInfo>,
    pub segment: Option<SegmentInfo>,
}

/// One participant's continuous eye-tracker capture segment.
#[derive(Debug, Clone)]
pub struct GazeRecording {
    pub info: RecordingInfo,
    pub samples: Vec<Sample>,
    pub mouse: Vec<Timed<MouseEvent>>,
    pub keyboard: Vec<Timed<KeyPressEvent>>,
    pub studio: Vec<Timed<StudioEvent>>,
    pub external: Vec<Timed<ExternalEvent>>,
    pub stimuli: Vec<Stimulus>,
    events: OnceCell<Vec<GazeEvent>>,
}

impl GazeRecording {
    pub fn new(info: RecordingInfo) -> Self {
        Self {
            info,
            samples: Vec::new(),
            mouse: Vec::new(),
            keyboard: Vec::new(),
            studio: Vec::new(),
            external: Vec::new(),
            stimuli: Vec::new(),
            events: OnceCell::new(),
        }
    }

    /// Participant named by the identity record, empty when unknown.
    pub fn participant(&self) -> &str {
        self.info.participant.as_deref().unwrap_or("")
    }

    /// True when the recording holds no samples at all.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The segmentation of this recording's samples into gaze events.
    ///
    /// Computed once on first access and cached; there is no other
    /// recomputation trigger.
    pub fn gaze_events(&self) -> &[GazeEvent] {
        self.events.get_or_init(|| segment(&self.samples))
    }

    pub fn fixations(&self) -> impl Iterator<Item = &GazeEvent> {
        self.gaze_events()
            .iter()
            .filter(|event| event.kind == GazeEventKind::Fixation)
    }

    pub fn saccades(&self) -> impl Iterator<Item = &GazeEvent> {
        self.gaze_events()
            .iter()
            .filter(|event| event.kind == GazeEventKind::Saccade)
    }

    pub fn unclassified(&self) -> impl Iterator<Item = &GazeEvent> {
        self.gaze_events()
            .iter()
            .filter(|event| event.kind == GazeEventKind::Unclassified)
    }

    /// An independent copy limited to the open wall-clock interval
    /// `(from_millis, to_millis)`.
    ///
    /// The copy owns its sample and event lists; its gaze events are
    /// re-derived from the sliced samples on first access.
    pub fn slice(&self, from_millis: i64, to_millis: i64) -> GazeRecording {
        let within = |time: &SampleTime| {
            let at = time.local_millis();
            from_millis < at && at < to_millis
        };

        GazeRecording {
            info: self.info.clone(),
            samples: self
                .samples
                .iter()
                .filter(|sample| within(&sample.time))
                .cloned()
                .collect(),
            mouse: filter_timed(&self.mouse, within),
            keyboard: filter_timed(&self.keyboard, within),
            studio: filter_timed(&self.studio, within),
            external: filter_timed(&self.external, within),
            stimuli: self
                .stimuli
                .iter()
                .filter(|stimulus| within(&stimulus.time))
                .cloned()
                .collect(),
            events: OnceCell::new(),
        }
    }
}

fn filter_timed<T: Clone>(
    events: &[Timed<T>],
    within: impl Fn(&SampleTime) -> bool,
) -> Vec<Timed<T>> {
    events
        .iter()
        .filter(|event| within(&event.time))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazelog::record::GazeEventData;
    use chrono::NaiveDate;

    fn sample(at_seconds: u32, tag: &str, duration_ms: f64) -> Sample {
        let local_time = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(10, 0, at_seconds)
            .unwrap();

        Sample {
            time: SampleTime {
                local_time,
                device_us: 1_000_000 * i64::from(at_seconds) + 1,
                recording_ms: None,
            },
            gaze: None,
            event: Some(GazeEventData {
                gaze_event_type: Some(tag.to_owned()),
                duration_ms: Some(duration_ms),
                fixation_index: Some(1),
                ..Default::default()
            }),
            eye_pos: None,
            eye: None,
            camera: None,
        }
    }

    fn recording(samples: Vec<Sample>) -> GazeRecording {
        let mut recording = GazeRecording::new(RecordingInfo {
            participant: Some("P01".into()),
            ..Default::default()
        });
        recording.samples = samples;
        recording
    }

    #[test]
    fn gaze_events_are_cached() {
        let recording = recording(vec![
            sample(0, "Fixation", 200.0),
            sample(1, "Fixation", 200.0),
        ]);

        let first = recording.gaze_events().as_ptr();
        let second = recording.gaze_events().as_ptr();
        assert_eq!(first, second);
        assert_eq!(recording.gaze_events().len(), 1);
    }

    #[test]
    fn slice_keeps_only_the_open_interval() {
        let recording = recording(vec![
            sample(0, "Fixation", 200.0),
            sample(5, "Saccade", 40.0),
            sample(10, "Fixation", 300.0),
        ]);

        let start = recording.samples[0].time.local_millis();
        let end = recording.samples[2].time.local_millis();
        let sliced = recording.slice(start, end);

        assert_eq!(sliced.samples.len(), 1);
        assert!(sliced
            .samples
            .iter()
            .all(|s| start < s.time.local_millis() && s.time.local_millis() < end));
    }

    #[test]
    fn slice_re_derives_its_own_events() {
        let recording = recording(vec![
            sample(0, "Fixation", 200.0),
            sample(5, "Saccade", 40.0),
            sample(10, "Fixation", 300.0),
        ]);

        // populate the source cache first
        assert_eq!(recording.gaze_events().len(), 3);

        let sliced = recording.slice(
            recording.samples[0].time.local_millis() - 1,
            recording.samples[1].time.local_millis() + 1,
        );
        assert_eq!(sliced.gaze_events().len(), 2);
    }
}
