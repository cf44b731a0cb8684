//! Per-trial statistics
//!
//! Derives the numeric record for one correlated trial: the hit-rate
//! timeline, fixation duration histograms (fixed-range and time-windowed),
//! and saccade direction/amplitude distributions. Saccadic metrics are read
//! from the fixation events' saccadic attributes, which is where the tracker
//! export carries them.
//!
//! The time-windowed histogram is a reusable primitive: the target window
//! length is 20 seconds of device-clock time, the actual window count is the
//! rounded span/target ratio, and each window reduces to one value.

pub mod reference;

use serde::{Deserialize, Serialize};

use crate::recording::GazeRecording;
use crate::weblog::{HitTimeline, Trial, TrialEvent};

/// Fixation duration histogram boundaries, milliseconds.
pub const FIXATION_DURATION_RANGES_MS: [f64; 7] =
    [150.0, 300.0, 500.0, 750.0, 1000.0, 1500.0, f64::INFINITY];

/// Saccade amplitude histogram boundaries, degrees.
pub const SACCADE_AMPLITUDE_RANGES: [f64; 5] = [1.0, 2.0, 3.5, 7.0, f64::INFINITY];

/// Sector count of the angular (radar) distribution.
pub const RADAR_SECTOR_COUNT: usize = 8;

/// Target window length of time-windowed histograms, seconds.
pub const TIME_WINDOW_SECONDS: f64 = 20.0;

/// The derived numeric record of one trial. Immutable once computed and
/// keyed by trial id inside a test entry of the statistics store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Experiment type the trial belongs to
    #[serde(rename = "type")]
    pub trial_type: String,
    /// Participant group, for filtered reference aggregation
    pub group: String,
    pub hits: Hits,
    pub fixations: FixationStats,
    pub saccades: SaccadeStats,
}

/// Hit-rate timeline normalized to two parallel sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hits {
    pub correct: Vec<f64>,
    pub wrong: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixationStats {
    pub duration_ranges: Vec<f64>,
    pub duration_times: Histogram,
}

/// A time-windowed histogram: one reduced value per window plus the actual
/// window length in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    pub values: Vec<f64>,
    pub item_duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaccadeStats {
    pub directions: DirectionSeries,
    pub directions_radar: Vec<RadarSector>,
    pub amplitude_ranges: AmplitudeRanges,
    pub amplitude_times: Histogram,
}

/// Per-window forward/backward/other saccade counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionSeries {
    pub forward: Vec<f64>,
    pub backward: Vec<f64>,
    pub other: Vec<f64>,
    pub item_duration: f64,
}

/// One sector of the angular distribution, labelled by its center angle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadarSector {
    pub label: String,
    pub value: f64,
}

/// Amplitude histograms counted for forward and backward saccades only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeRanges {
    pub forward: Vec<f64>,
    pub backward: Vec<f64>,
}

/// A fixation flattened for statistics: device-clock instant, scroll-corrected
/// position, duration.
#[derive(Debug, Clone, PartialEq)]
pub struct FixationPoint {
    pub device_us: i64,
    pub x: f64,
    pub y: f64,
    pub duration_ms: f64,
}

/// A saccade flattened for statistics: device-clock instant, amplitude and
/// direction angles.
#[derive(Debug, Clone, PartialEq)]
pub struct SaccadeVector {
    pub device_us: i64,
    pub amplitude: f64,
    pub absolute_angle: f64,
    pub relative_angle: f64,
}

/// Compute the statistics of one correlated trial, optionally limited to
/// the open wall-clock window `(from_millis, to_millis)`.
///
/// Absent when the trial carries no gaze recording.
pub fn calculate(trial: &Trial, from_millis: Option<i64>, to_millis: Option<i64>) -> Option<Statistics> {
    let recording = trial.gaze.as_ref()?;

    let window;
    let recording = if from_millis.is_some() || to_millis.is_some() {
        window = recording.slice(
            from_millis.unwrap_or(i64::MIN),
            to_millis.unwrap_or(i64::MAX),
        );
        &window
    } else {
        recording
    };

    let fixations = fixation_points(recording, &trial.payload.events);
    let saccades = saccade_vectors(recording);

    Some(Statistics {
        trial_type: trial.experiment_type(),
        group: trial.group(),
        hits: hit_timeline(&trial.payload.hits_per_tenth),
        fixations: FixationStats {
            duration_ranges: fixation_duration_ranges(&fixations),
            duration_times: fixation_duration_times(&fixations),
        },
        saccades: SaccadeStats {
            directions: saccade_directions(&saccades),
            directions_radar: saccade_direction_radar(&saccades),
            amplitude_ranges: saccade_amplitude_ranges(&saccades),
            amplitude_times: saccade_amplitude_times(&saccades),
        },
    })
}

/// Normalize either hit-log shape into parallel correct/wrong sequences.
///
/// The legacy flat shape carries correct counts only; its wrong sequence
/// stays empty rather than being padded with zeros.
pub fn hit_timeline(hits: &HitTimeline) -> Hits {
    match hits {
        HitTimeline::Flat(values) => Hits {
            correct: values.clone(),
            wrong: Vec::new(),
        },
        HitTimeline::Paired(pairs) => Hits {
            correct: pairs.iter().map(|pair| pair.correct).collect(),
            wrong: pairs.iter().map(|pair| pair.wrong).collect(),
        },
    }
}

/// Flatten a recording's fixations, correcting each y position by the
/// scroll offset in effect at the fixation instant.
pub fn fixation_points(recording: &GazeRecording, events: &[TrialEvent]) -> Vec<FixationPoint> {
    let scrolls: Vec<(i64, f64)> = events
        .iter()
        .filter_map(|event| match event {
            TrialEvent::Scroll {
                timestamp,
                position,
            } => Some((timestamp.timestamp_millis(), *position)),
            _ => None,
        })
        .collect();

    let mut scroll_position = 0.0;
    let mut next_scroll = 0;

    recording
        .fixations()
        .map(|event| {
            let at = event.start.local_millis();
            while next_scroll < scrolls.len() && scrolls[next_scroll].0 < at {
                scroll_position = scrolls[next_scroll].1;
                next_scroll += 1;
            }

            let fixation = event.fixation.clone().unwrap_or_default();
            FixationPoint {
                device_us: event.start.device_us,
                x: fixation.x,
                y: fixation.y + scroll_position,
                duration_ms: event.duration_ms,
            }
        })
        .collect()
}

/// Flatten a recording's saccadic metrics, carried on its fixation events.
pub fn saccade_vectors(recording: &GazeRecording) -> Vec<SaccadeVector> {
    recording
        .fixations()
        .map(|event| {
            let fixation = event.fixation.clone().unwrap_or_default();
            SaccadeVector {
                device_us: event.start.device_us,
                amplitude: fixation.saccadic_amplitude,
                absolute_angle: fixation.absolute_direction,
                relative_angle: fixation.relative_direction,
            }
        })
        .collect()
}

/// Count fixations into the fixed duration ranges. Each fixation increments
/// the first bucket whose upper bound exceeds its duration.
pub fn fixation_duration_ranges(fixations: &[FixationPoint]) -> Vec<f64> {
    let mut counts = vec![0.0; FIXATION_DURATION_RANGES_MS.len()];

    for fixation in fixations {
        if let Some(index) = FIXATION_DURATION_RANGES_MS
            .iter()
            .position(|bound| fixation.duration_ms < *bound)
        {
            counts[index] += 1.0;
        }
    }

    counts
}

/// Mean fixation duration per time window, rounded to whole milliseconds.
pub fn fixation_duration_times(fixations: &[FixationPoint]) -> Histogram {
    let (values, item_duration) = windowed(
        TIME_WINDOW_SECONDS,
        fixations,
        |fixation| fixation.device_us,
        |bucket| mean(bucket.iter().map(|f| f.duration_ms)).round(),
    );

    Histogram {
        values,
        item_duration,
    }
}

#[derive(Default)]
struct DirectionCounts {
    forward: f64,
    backward: f64,
    other: f64,
}

enum Direction {
    Forward,
    Backward,
    Other,
}

/// A saccade is forward within 45° of 0°, backward within 45° of 180°,
/// otherwise other. Bounds are exclusive.
fn classify(absolute_angle: f64) -> Direction {
    if absolute_angle > 315.0 || absolute_angle < 45.0 {
        Direction::Forward
    } else if absolute_angle > 135.0 && absolute_angle < 225.0 {
        Direction::Backward
    } else {
        Direction::Other
    }
}

/// Forward/backward/other saccade counts per time window.
pub fn saccade_directions(saccades: &[SaccadeVector]) -> DirectionSeries {
    let (counts, item_duration) = windowed(
        TIME_WINDOW_SECONDS,
        saccades,
        |saccade| saccade.device_us,
        |bucket| {
            let mut counts = DirectionCounts::default();
            for saccade in bucket {
                match classify(saccade.absolute_angle) {
                    Direction::Forward => counts.forward += 1.0,
                    Direction::Backward => counts.backward += 1.0,
                    Direction::Other => counts.other += 1.0,
                }
            }
            counts
        },
    );

    DirectionSeries {
        forward: counts.iter().map(|c| c.forward).collect(),
        backward: counts.iter().map(|c| c.backward).collect(),
        other: counts.iter().map(|c| c.other).collect(),
        item_duration,
    }
}

/// Fixed 8-sector angular distribution of saccade directions.
///
/// Sectors are 45° wide and centered on multiples of 45°, wrapping at the
/// 0°/360° boundary. The emitted ordering anchors 0° to its display
/// position: sectors are counted in angle order, reversed, and the last
/// three moved to the front.
pub fn saccade_direction_radar(saccades: &[SaccadeVector]) -> Vec<RadarSector> {
    let sector_angle = 360.0 / RADAR_SECTOR_COUNT as f64;

    let mut sectors: Vec<RadarSector> = (0..RADAR_SECTOR_COUNT)
        .map(|i| RadarSector {
            label: format!("{}\u{b0}", i * 45),
            value: 0.0,
        })
        .collect();

    for saccade in saccades {
        let mut index =
            ((saccade.absolute_angle + sector_angle / 2.0) / sector_angle).floor().max(0.0) as usize;
        if index >= RADAR_SECTOR_COUNT {
            index = 0;
        }
        sectors[index].value += 1.0;
    }

    sectors.reverse();
    sectors.rotate_right(3);

    sectors
}

/// Amplitude range counts for forward and backward saccades; saccades in
/// the other direction class are excluded.
pub fn saccade_amplitude_ranges(saccades: &[SaccadeVector]) -> AmplitudeRanges {
    let mut forward = vec![0.0; SACCADE_AMPLITUDE_RANGES.len()];
    let mut backward = vec![0.0; SACCADE_AMPLITUDE_RANGES.len()];

    for saccade in saccades {
        let Some(index) = SACCADE_AMPLITUDE_RANGES
            .iter()
            .position(|bound| saccade.amplitude < *bound)
        else {
            continue;
        };
        match classify(saccade.absolute_angle) {
            Direction::Forward => forward[index] += 1.0,
            Direction::Backward => backward[index] += 1.0,
            Direction::Other => {}
        }
    }

    AmplitudeRanges { forward, backward }
}

/// Mean saccade amplitude per time window.
pub fn saccade_amplitude_times(saccades: &[SaccadeVector]) -> Histogram {
    let (values, item_duration) = windowed(
        TIME_WINDOW_SECONDS,
        saccades,
        |saccade| saccade.device_us,
        |bucket| mean(bucket.iter().map(|s| s.amplitude)),
    );

    Histogram {
        values,
        item_duration,
    }
}

/// Partition timestamped items into consecutive near-equal time windows and
/// reduce each window to one value.
///
/// The window count is the rounded span/target ratio, at least one; the
/// actual window length gains one microsecond so rounding cannot leave the
/// final item in an empty trailing window. Returns the reduced values and
/// the actual window length in seconds.
pub fn windowed<T, R>(
    target_seconds: f64,
    items: &[T],
    device_us: impl Fn(&T) -> i64,
    mut reduce: impl FnMut(&[&T]) -> R,
) -> (Vec<R>, f64) {
    let (Some(first), Some(last)) = (items.first(), items.last()) else {
        return (Vec::new(), 0.0);
    };

    let start = device_us(first) as f64;
    let span = device_us(last) as f64 - start;
    let windows = (span / (target_seconds * 1e6)).round().max(1.0);
    let window_us = span / windows + 1.0;

    let mut values = Vec::new();
    let mut bucket: Vec<&T> = Vec::new();
    let mut upper = start + window_us;

    for item in items {
        if device_us(item) as f64 > upper {
            upper += window_us;
            values.push(reduce(&bucket));
            bucket.clear();
        }
        bucket.push(item);
    }
    values.push(reduce(&bucket));

    (values, window_us / 1e6)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weblog::{HitPair, HitTimeline};
    use pretty_assertions::assert_eq;

    fn fixation(device_s: f64, duration_ms: f64) -> FixationPoint {
        FixationPoint {
            device_us: (device_s * 1e6) as i64,
            x: 0.0,
            y: 0.0,
            duration_ms,
        }
    }

    fn saccade(device_s: f64, amplitude: f64, angle: f64) -> SaccadeVector {
        SaccadeVector {
            device_us: (device_s * 1e6) as i64,
            amplitude,
            absolute_angle: angle,
            relative_angle: 0.0,
        }
    }

    #[test]
    fn hit_timeline_normalizes_both_shapes() {
        let paired = hit_timeline(&HitTimeline::Paired(vec![
            HitPair {
                correct: 2.0,
                wrong: 1.0,
            },
            HitPair {
                correct: 3.0,
                wrong: 0.0,
            },
        ]));
        assert_eq!(paired.correct, vec![2.0, 3.0]);
        assert_eq!(paired.wrong, vec![1.0, 0.0]);

        let flat = hit_timeline(&HitTimeline::Flat(vec![1.0, 2.0]));
        assert_eq!(flat.correct, vec![1.0, 2.0]);
        assert!(flat.wrong.is_empty());
    }

    #[test]
    fn duration_ranges_bucket_by_first_exceeding_bound() {
        let fixations = vec![
            fixation(0.0, 100.0),  // < 150
            fixation(1.0, 150.0),  // < 300
            fixation(2.0, 299.0),  // < 300
            fixation(3.0, 900.0),  // < 1000
            fixation(4.0, 5000.0), // < inf
        ];

        let counts = fixation_duration_ranges(&fixations);

        assert_eq!(counts, vec![1.0, 2.0, 0.0, 0.0, 1.0, 0.0, 1.0]);
        let total: f64 = counts.iter().sum();
        assert_eq!(total, fixations.len() as f64);
    }

    #[test]
    fn windowed_splits_the_span_into_rounded_count() {
        let fixations: Vec<FixationPoint> = (0..=6)
            .map(|i| fixation(f64::from(i) * 10.0, f64::from(100 * (i + 1))))
            .collect();

        let histogram = fixation_duration_times(&fixations);

        // 60 s span at a 20 s target: three windows
        assert_eq!(histogram.values.len(), 3);
        assert!((histogram.item_duration - 20.0).abs() < 0.001);
        // windows hold items 0-2, 3-4, 5-6; means are rounded
        assert_eq!(histogram.values, vec![200.0, 450.0, 650.0]);
    }

    #[test]
    fn windowed_handles_degenerate_spans() {
        let (values, duration) = windowed(
            TIME_WINDOW_SECONDS,
            &[fixation(0.0, 100.0), fixation(1.0, 300.0)],
            |f| f.device_us,
            |bucket| bucket.len() as f64,
        );

        // sub-target span collapses to a single window
        assert_eq!(values, vec![2.0]);
        assert!(duration > 0.0);

        let (empty, item_duration) =
            windowed(TIME_WINDOW_SECONDS, &[] as &[FixationPoint], |f| f.device_us, |b| {
                b.len() as f64
            });
        assert!(empty.is_empty());
        assert_eq!(item_duration, 0.0);
    }

    #[test]
    fn direction_bounds_are_exclusive() {
        let saccades = vec![
            saccade(0.0, 1.5, 0.0),    // forward
            saccade(1.0, 1.5, 44.9),   // forward
            saccade(2.0, 1.5, 45.0),   // other
            saccade(3.0, 1.5, 135.0),  // other
            saccade(4.0, 1.5, 180.0),  // backward
            saccade(5.0, 1.5, 225.0),  // other
            saccade(6.0, 1.5, 315.0),  // other
            saccade(7.0, 1.5, 315.1),  // forward
        ];

        let series = saccade_directions(&saccades);

        assert_eq!(series.forward.iter().sum::<f64>(), 3.0);
        assert_eq!(series.backward.iter().sum::<f64>(), 1.0);
        assert_eq!(series.other.iter().sum::<f64>(), 4.0);
    }

    #[test]
    fn radar_counts_every_saccade_and_reorders_sectors() {
        let saccades = vec![
            saccade(0.0, 1.0, 0.0),   // sector 0
            saccade(1.0, 1.0, 350.0), // wraps into sector 0
            saccade(2.0, 1.0, 50.0),  // sector 1 (45)
            saccade(3.0, 1.0, 180.0), // sector 4 (180)
            saccade(4.0, 1.0, 250.0), // sector 6 (270°)
        ];

        let radar = saccade_direction_radar(&saccades);

        let labels: Vec<&str> = radar.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["90°", "45°", "0°", "315°", "270°", "225°", "180°", "135°"]
        );

        let total: f64 = radar.iter().map(|s| s.value).sum();
        assert_eq!(total, saccades.len() as f64);

        let value_of = |label: &str| {
            radar
                .iter()
                .find(|s| s.label == label)
                .map(|s| s.value)
                .unwrap()
        };
        assert_eq!(value_of("0°"), 2.0);
        assert_eq!(value_of("45°"), 1.0);
        assert_eq!(value_of("180°"), 1.0);
        assert_eq!(value_of("270°"), 1.0);
    }

    #[test]
    fn amplitude_ranges_skip_other_directions() {
        let saccades = vec![
            saccade(0.0, 0.5, 10.0),  // forward, < 1
            saccade(1.0, 2.5, 10.0),  // forward, < 3.5
            saccade(2.0, 5.0, 180.0), // backward, < 7
            saccade(3.0, 9.0, 90.0),  // other: excluded
        ];

        let ranges = saccade_amplitude_ranges(&saccades);

        assert_eq!(ranges.forward, vec![1.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(ranges.backward, vec![0.0, 0.0, 0.0, 1.0, 0.0]);
        let counted: f64 =
            ranges.forward.iter().sum::<f64>() + ranges.backward.iter().sum::<f64>();
        assert_eq!(counted, 3.0);
    }

    #[test]
    fn amplitude_times_average_without_rounding() {
        let saccades = vec![
            saccade(0.0, 1.0, 0.0),
            saccade(1.0, 2.0, 0.0),
        ];

        let histogram = saccade_amplitude_times(&saccades);

        assert_eq!(histogram.values, vec![1.5]);
    }
}
