//! Cross-trial reference aggregation
//!
//! The reference is the running mean of previously persisted statistics of
//! one experiment type, optionally filtered by participant group, excluding
//! the trial it is compared against. It is recomputed on demand from the
//! store and never persisted itself.
//!
//! Array fields are summed pointwise and divided by the candidate count.
//! Two arrays of different lengths cannot be compared: the mismatch
//! degrades that field alone to unavailable (with a warning) instead of
//! failing the whole aggregate. Radar sectors are keyed by their angle
//! label and aggregated per key, not by array position.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{RadarSector, Statistics};
use crate::store::StatisticsStore;

/// The running mean of statistics across prior trials of one type. Fields
/// whose candidates disagreed on length are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(rename = "type")]
    pub trial_type: String,
    pub hits: ReferenceHits,
    pub fixations: ReferenceFixations,
    pub saccades: ReferenceSaccades,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceHits {
    pub correct: Option<Vec<f64>>,
    pub wrong: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceFixations {
    pub duration_ranges: Option<Vec<f64>>,
    pub duration_times: ReferenceHistogram,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceHistogram {
    pub values: Option<Vec<f64>>,
    pub item_duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSaccades {
    pub directions: ReferenceDirections,
    pub directions_radar: Vec<RadarSector>,
    pub amplitude_ranges: ReferenceAmplitudeRanges,
    pub amplitude_times: ReferenceHistogram,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDirections {
    pub forward: Option<Vec<f64>>,
    pub backward: Option<Vec<f64>>,
    pub other: Option<Vec<f64>>,
    pub item_duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceAmplitudeRanges {
    pub forward: Option<Vec<f64>>,
    pub backward: Option<Vec<f64>>,
}

/// The reference to compare one trial against: the mean over the other
/// persisted trials of its experiment type.
pub fn for_trial(
    store: &StatisticsStore,
    trial: &crate::weblog::Trial,
    group: Option<&str>,
) -> Option<Reference> {
    means(store, &trial.id, &trial.experiment_type(), group)
}

/// Mean statistics of all persisted trials of `trial_type`, excluding
/// `trial_id`, optionally limited to one participant group.
///
/// Absent when no other trial of the type has been persisted.
pub fn means(
    store: &StatisticsStore,
    trial_id: &str,
    trial_type: &str,
    group: Option<&str>,
) -> Option<Reference> {
    let candidates: Vec<&Statistics> = store
        .trials_of_type(trial_type, trial_id)
        .into_iter()
        .filter(|stats| group.map_or(true, |g| stats.group == g))
        .collect();

    let (first, rest) = candidates.split_first()?;
    let mut reference = seed(trial_type, first);

    for stats in rest.iter().copied() {
        accumulate(&mut reference, stats);
    }

    divide(&mut reference, candidates.len() as f64);

    Some(reference)
}

fn seed(trial_type: &str, first: &Statistics) -> Reference {
    Reference {
        trial_type: trial_type.to_owned(),
        hits: ReferenceHits {
            correct: Some(first.hits.correct.clone()),
            wrong: Some(first.hits.wrong.clone()),
        },
        fixations: ReferenceFixations {
            duration_ranges: Some(first.fixations.duration_ranges.clone()),
            duration_times: ReferenceHistogram {
                values: Some(first.fixations.duration_times.values.clone()),
                item_duration: first.fixations.duration_times.item_duration,
            },
        },
        saccades: ReferenceSaccades {
            directions: ReferenceDirections {
                forward: Some(first.saccades.directions.forward.clone()),
                backward: Some(first.saccades.directions.backward.clone()),
                other: Some(first.saccades.directions.other.clone()),
                item_duration: first.saccades.directions.item_duration,
            },
            directions_radar: first.saccades.directions_radar.clone(),
            amplitude_ranges: ReferenceAmplitudeRanges {
                forward: Some(first.saccades.amplitude_ranges.forward.clone()),
                backward: Some(first.saccades.amplitude_ranges.backward.clone()),
            },
            amplitude_times: ReferenceHistogram {
                values: Some(first.saccades.amplitude_times.values.clone()),
                item_duration: first.saccades.amplitude_times.item_duration,
            },
        },
    }
}

fn accumulate(reference: &mut Reference, stats: &Statistics) {
    add_array(&mut reference.hits.correct, &stats.hits.correct);
    add_array(&mut reference.hits.wrong, &stats.hits.wrong);
    add_array(
        &mut reference.fixations.duration_ranges,
        &stats.fixations.duration_ranges,
    );
    add_array(
        &mut reference.fixations.duration_times.values,
        &stats.fixations.duration_times.values,
    );
    add_array(
        &mut reference.saccades.directions.forward,
        &stats.saccades.directions.forward,
    );
    add_array(
        &mut reference.saccades.directions.backward,
        &stats.saccades.directions.backward,
    );
    add_array(
        &mut reference.saccades.directions.other,
        &stats.saccades.directions.other,
    );
    add_radar(
        &mut reference.saccades.directions_radar,
        &stats.saccades.directions_radar,
    );
    add_array(
        &mut reference.saccades.amplitude_ranges.forward,
        &stats.saccades.amplitude_ranges.forward,
    );
    add_array(
        &mut reference.saccades.amplitude_ranges.backward,
        &stats.saccades.amplitude_ranges.backward,
    );
    add_array(
        &mut reference.saccades.amplitude_times.values,
        &stats.saccades.amplitude_times.values,
    );
}

fn divide(reference: &mut Reference, count: f64) {
    divide_array(&mut reference.hits.correct, count);
    divide_array(&mut reference.hits.wrong, count);
    divide_array(&mut reference.fixations.duration_ranges, count);
    divide_array(&mut reference.fixations.duration_times.values, count);
    divide_array(&mut reference.saccades.directions.forward, count);
    divide_array(&mut reference.saccades.directions.backward, count);
    divide_array(&mut reference.saccades.directions.other, count);
    for sector in &mut reference.saccades.directions_radar {
        sector.value /= count;
    }
    divide_array(&mut reference.saccades.amplitude_ranges.forward, count);
    divide_array(&mut reference.saccades.amplitude_ranges.backward, count);
    divide_array(&mut reference.saccades.amplitude_times.values, count);
}

fn add_array(dest: &mut Option<Vec<f64>>, src: &[f64]) {
    let Some(values) = dest.as_mut() else {
        return;
    };

    if values.len() != src.len() {
        warn!(
            dest = values.len(),
            src = src.len(),
            "statistics are not equivalent, dropping field from the reference"
        );
        *dest = None;
        return;
    }

    for (dest_value, src_value) in values.iter_mut().zip(src) {
        *dest_value += src_value;
    }
}

fn add_radar(dest: &mut Vec<RadarSector>, src: &[RadarSector]) {
    for sector in src {
        match dest.iter_mut().find(|d| d.label == sector.label) {
            Some(existing) => existing.value += sector.value,
            None => dest.push(sector.clone()),
        }
    }
}

fn divide_array(dest: &mut Option<Vec<f64>>, count: f64) {
    if let Some(values) = dest.as_mut() {
        for value in values {
            *value /= count;
        }
    }
}
