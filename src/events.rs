//! Segmentation of gaze samples into classified events
//!
//! The tracker classifies every sample as part of a fixation, a saccade or
//! an unclassified span, and stamps each sample with the classification tag
//! plus the duration of the event it belongs to. A maximal run of
//! consecutive samples sharing the same (tag, duration) pair materializes as
//! exactly one [`GazeEvent`] carrying the run's samples, so segmentation is
//! a partition of the sample sequence, never a filter.

use crate::recording::{Sample, SampleTime};

/// Classification vocabulary of the tracker. Closed and fixed; an export
/// carrying any other tag is corrupt beyond recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GazeEventKind {
    Fixation,
    Saccade,
    Unclassified,
}

impl GazeEventKind {
    pub fn tag(&self) -> &'static str {
        match self {
            GazeEventKind::Fixation => "Fixation",
            GazeEventKind::Saccade => "Saccade",
            GazeEventKind::Unclassified => "Unclassified",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Fixation" => Some(GazeEventKind::Fixation),
            "Saccade" => Some(GazeEventKind::Saccade),
            "Unclassified" => Some(GazeEventKind::Unclassified),
            _ => None,
        }
    }
}

/// Fixation-only attributes, taken from the first sample of the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixationData {
    pub x: f64,
    pub y: f64,
    pub saccadic_amplitude: f64,
    pub absolute_direction: f64,
    pub relative_direction: f64,
}

/// A maximal run of consecutive samples sharing one classification.
#[derive(Debug, Clone, PartialEq)]
pub struct GazeEvent {
    pub kind: GazeEventKind,
    /// Tag-specific event index from the export; -1 for unclassified runs
    pub index: i64,
    pub duration_ms: f64,
    /// Timestamp of the run's first sample
    pub start: SampleTime,
    /// Present on fixations only
    pub fixation: Option<FixationData>,
    pub samples: Vec<Sample>,
}

/// Group samples into gaze events by scanning them in order.
///
/// A sample extends the open run while its (tag, duration) pair matches;
/// otherwise it starts a new run. Samples are expected in timestamp order,
/// as decoded from the export.
pub fn segment(samples: &[Sample]) -> Vec<GazeEvent> {
    let mut events: Vec<GazeEvent> = Vec::new();

    for sample in samples {
        let Some(data) = sample.event.as_ref() else {
            panic!("internal error: gaze sample carries no classification record");
        };
        let Some(tag) = data.gaze_event_type.as_deref() else {
            panic!("internal error: gaze sample carries no classification tag");
        };
        let duration_ms = data.duration_ms.unwrap_or_default();

        let extends = events
            .last()
            .is_some_and(|open| open.kind.tag() == tag && open.duration_ms == duration_ms);

        if extends {
            if let Some(open) = events.last_mut() {
                open.samples.push(sample.clone());
            }
            continue;
        }

        let Some(kind) = GazeEventKind::from_tag(tag) else {
            panic!("internal error: unknown gaze event classification \"{tag}\"");
        };

        let (index, fixation) = match kind {
            GazeEventKind::Fixation => (
                data.fixation_index.unwrap_or(-1),
                Some(FixationData {
                    x: data.fixation_x.unwrap_or_default(),
                    y: data.fixation_y.unwrap_or_default(),
                    saccadic_amplitude: data.saccadic_amplitude.unwrap_or_default(),
                    absolute_direction: data.absolute_direction.unwrap_or_default(),
                    relative_direction: data.relative_direction.unwrap_or_default(),
                }),
            ),
            GazeEventKind::Saccade => (data.saccade_index.unwrap_or(-1), None),
            GazeEventKind::Unclassified => (-1, None),
        };

        events.push(GazeEvent {
            kind,
            index,
            duration_ms,
            start: sample.time.clone(),
            fixation,
            samples: vec![sample.clone()],
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazelog::record::GazeEventData;
    use chrono::NaiveDate;

    fn sample(device_us: i64, tag: &str, duration_ms: f64, fixation_index: i64) -> Sample {
        Sample {
            time: SampleTime {
                local_time: NaiveDate::from_ymd_opt(2024, 2, 1)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
                device_us,
                recording_ms: None,
            },
            gaze: None,
            event: Some(GazeEventData {
                gaze_event_type: Some(tag.to_owned()),
                duration_ms: Some(duration_ms),
                fixation_index: Some(fixation_index),
                saccade_index: Some(fixation_index),
                fixation_x: Some(100.0),
                fixation_y: Some(200.0),
                saccadic_amplitude: Some(2.5),
                absolute_direction: Some(10.0),
                relative_direction: None,
                ..Default::default()
            }),
            eye_pos: None,
            eye: None,
            camera: None,
        }
    }

    #[test]
    fn runs_split_on_tag_or_duration_change() {
        let samples = vec![
            sample(0, "Fixation", 200.0, 1),
            sample(1, "Fixation", 200.0, 1),
            sample(2, "Fixation", 350.0, 2),
            sample(3, "Saccade", 40.0, 1),
            sample(4, "Unclassified", 90.0, -1),
        ];

        let events = segment(&samples);

        assert_eq!(events.len(), 4);
        assert_eq!(events[0].kind, GazeEventKind::Fixation);
        assert_eq!(events[0].samples.len(), 2);
        assert_eq!(events[1].duration_ms, 350.0);
        assert_eq!(events[2].kind, GazeEventKind::Saccade);
        assert_eq!(events[3].kind, GazeEventKind::Unclassified);
        assert_eq!(events[3].index, -1);
    }

    #[test]
    fn segmentation_is_a_partition() {
        let samples: Vec<Sample> = (0..20)
            .map(|i| {
                let tag = if i % 5 < 3 { "Fixation" } else { "Saccade" };
                sample(i, tag, f64::from(i as i32 / 5), 1)
            })
            .collect();

        let events = segment(&samples);

        let rebuilt: Vec<Sample> = events
            .iter()
            .flat_map(|event| event.samples.iter().cloned())
            .collect();
        assert_eq!(rebuilt, samples);
    }

    #[test]
    fn fixation_attributes_come_from_the_first_sample() {
        let events = segment(&[sample(0, "Fixation", 200.0, 7)]);

        assert_eq!(events[0].index, 7);
        let fixation = events[0].fixation.as_ref().unwrap();
        assert_eq!(fixation.x, 100.0);
        assert_eq!(fixation.y, 200.0);
        assert_eq!(fixation.saccadic_amplitude, 2.5);
        // unset relative direction reads as zero
        assert_eq!(fixation.relative_direction, 0.0);
    }

    #[test]
    #[should_panic(expected = "unknown gaze event classification")]
    fn unknown_classification_tag_is_fatal() {
        segment(&[sample(0, "Blink", 10.0, 1)]);
    }
}
