//! Trial-to-recording correlation
//!
//! The two logs are produced by independent machines with independent
//! clocks, so every trial timestamp is first shifted by a configurable
//! constant hour offset. Matching then uses one of two strategies:
//!
//! - positional, when the folder holds exactly one recording per trial:
//!   recording *i* is attached to trial *i*;
//! - participant-based, when every trial declares a participant code: each
//!   trial gets the recording whose identity names that participant,
//!   clipped to the open interval between the trial's `start` and `end`
//!   events when both were logged.
//!
//! Neither strategy applying, or a trial ending up with no (or an empty)
//! recording, is a structure error for the whole test, never a silent drop.

use crate::error::PipelineError;
use crate::recording::GazeRecording;
use crate::weblog::Trial;

/// Default clock offset between the two log sources, in hours.
pub const DEFAULT_HOUR_OFFSET: i64 = 2;

/// Attach a recording to every trial, or fail with the reason.
pub fn correlate(
    trials: &mut [Trial],
    recordings: &[GazeRecording],
    hour_offset: i64,
) -> Result<(), PipelineError> {
    for trial in trials.iter_mut() {
        trial.shift_hours(hour_offset);
    }

    if recordings.len() == trials.len() {
        for (trial, recording) in trials.iter_mut().zip(recordings) {
            trial.gaze = Some(recording.clone());
        }
    } else if trials
        .iter()
        .all(|trial| !trial.payload.participant_code.is_empty())
    {
        for trial in trials.iter_mut() {
            let matched = recordings
                .iter()
                .find(|recording| recording.participant() == trial.payload.participant_code);
            let Some(recording) = matched else {
                continue;
            };

            trial.gaze = Some(match (trial.start_event(), trial.end_event()) {
                (Some(start), Some(end)) => {
                    recording.slice(start.timestamp_millis(), end.timestamp_millis())
                }
                _ => recording.clone(),
            });
        }
    } else {
        return Err(PipelineError::Structure(
            "unsupported data structure".to_owned(),
        ));
    }

    let orphan = trials
        .iter()
        .find(|trial| trial.gaze.as_ref().map_or(true, GazeRecording::is_empty));
    if let Some(trial) = orphan {
        return Err(PipelineError::Structure(format!(
            "no gaze data for participant {}",
            trial.payload.participant_code
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazelog::record::{GazeEventData, RecordingInfo};
    use crate::recording::{Sample, SampleTime};
    use crate::weblog::{read_trial_log, TrialPayload};
    use chrono::NaiveDate;

    fn sample(hour: u32, second: u32) -> Sample {
        Sample {
            time: SampleTime {
                local_time: NaiveDate::from_ymd_opt(2024, 2, 1)
                    .unwrap()
                    .and_hms_opt(hour, 0, second)
                    .unwrap(),
                device_us: i64::from(hour * 3600 + second) * 1_000_000,
                recording_ms: None,
            },
            gaze: None,
            event: Some(GazeEventData {
                gaze_event_type: Some("Fixation".into()),
                duration_ms: Some(100.0),
                ..Default::default()
            }),
            eye_pos: None,
            eye: None,
            camera: None,
        }
    }

    fn recording(participant: &str, hour: u32, seconds: &[u32]) -> GazeRecording {
        let mut recording = GazeRecording::new(RecordingInfo {
            participant: Some(participant.to_owned()),
            ..Default::default()
        });
        recording.samples = seconds.iter().map(|s| sample(hour, *s)).collect();
        recording
    }

    fn trial(participant: &str) -> Trial {
        Trial::new(
            "2024-02-01T08:00:00Z".parse().unwrap(),
            TrialPayload {
                participant_code: participant.to_owned(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn positional_strategy_pairs_by_order() {
        let mut trials = vec![trial(""), trial("")];
        let recordings = vec![
            recording("P01", 10, &[1, 2]),
            recording("P02", 11, &[1, 2]),
        ];

        correlate(&mut trials, &recordings, 0).unwrap();

        assert_eq!(trials[0].gaze.as_ref().unwrap().participant(), "P01");
        assert_eq!(trials[1].gaze.as_ref().unwrap().participant(), "P02");
    }

    #[test]
    fn participant_strategy_matches_by_code() {
        let mut trials = vec![trial("P02")];
        let recordings = vec![
            recording("P01", 10, &[1, 2]),
            recording("P02", 11, &[1, 2]),
        ];

        correlate(&mut trials, &recordings, 0).unwrap();

        assert_eq!(trials[0].gaze.as_ref().unwrap().participant(), "P02");
    }

    #[test]
    fn participant_strategy_clips_to_the_event_interval() {
        // the trial logs start/end at 08:00 local; with the 2-hour offset
        // these land inside the 10:00 recording
        let mut trials = read_trial_log(concat!(
            "timestamp: 2024-02-01T07:59:00Z\n",
            r#"{"participantCode":"P01","events":[{"type":"start","timestamp":"2024-02-01T08:00:01Z"},{"type":"end","timestamp":"2024-02-01T08:00:20Z"}]}"#,
            "\n",
        ));
        let recordings = vec![
            recording("P01", 10, &[1, 5, 20, 30]),
            recording("P02", 11, &[1, 2]),
        ];

        correlate(&mut trials, &recordings, 2).unwrap();

        let gaze = trials[0].gaze.as_ref().unwrap();
        // open interval: the samples at :01 and :20 fall on the bounds
        assert_eq!(gaze.samples.len(), 1);
        let start = trials[0].start_event().unwrap().timestamp_millis();
        let end = trials[0].end_event().unwrap().timestamp_millis();
        assert!(gaze
            .samples
            .iter()
            .all(|s| start < s.time.local_millis() && s.time.local_millis() < end));
    }

    #[test]
    fn no_strategy_is_a_structure_error() {
        let mut trials = vec![trial(""), trial("")];
        let recordings = vec![recording("P01", 10, &[1])];

        let err = correlate(&mut trials, &recordings, 0).unwrap_err();
        assert!(matches!(err, PipelineError::Structure(_)));
        assert!(err.to_string().contains("unsupported data structure"));
    }

    #[test]
    fn unmatched_participant_is_named_in_the_error() {
        let mut trials = vec![trial("P07")];
        let recordings = vec![
            recording("P01", 10, &[1]),
            recording("P02", 11, &[1]),
        ];

        let err = correlate(&mut trials, &recordings, 0).unwrap_err();
        assert!(err.to_string().contains("no gaze data for participant P07"));
    }

    #[test]
    fn empty_clip_counts_as_missing_gaze() {
        // start/end interval excludes every sample
        let mut trials = read_trial_log(concat!(
            "timestamp: 2024-02-01T07:59:00Z\n",
            r#"{"participantCode":"P01","events":[{"type":"start","timestamp":"2024-02-01T23:00:00Z"},{"type":"end","timestamp":"2024-02-01T23:01:00Z"}]}"#,
            "\n",
        ));
        let recordings = vec![
            recording("P01", 10, &[1, 2]),
            recording("P02", 11, &[1, 2]),
        ];

        let err = correlate(&mut trials, &recordings, 0).unwrap_err();
        assert!(err.to_string().contains("no gaze data for participant P01"));
    }
}
