//! A loaded test: the trials of one experiment folder
//!
//! The set of trials decoded and correlated from one folder, exposed to
//! the surrounding service layer. A `Test` is replaced wholesale on each
//! selection; nothing mutates it in place.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::PipelineError;
use crate::stats::Statistics;
use crate::weblog::Trial;

const TABLE_SEPARATOR: char = ',';

/// The trials loaded from one experiment folder.
#[derive(Debug, Clone, Default)]
pub struct Test {
    pub folder: String,
    pub trials: Vec<Trial>,
}

impl Test {
    pub fn has_trial(&self, id: &str) -> bool {
        self.trials.iter().any(|trial| trial.id == id)
    }

    pub fn trial(&self, id: &str) -> Result<&Trial, PipelineError> {
        self.trials
            .iter()
            .find(|trial| trial.id == id)
            .ok_or_else(|| PipelineError::NotFound("trial", id.to_owned()))
    }

    /// Map every trial through `f`, in order.
    pub fn transform<T>(&self, f: impl FnMut(&Trial) -> T) -> Vec<T> {
        self.trials.iter().map(f).collect()
    }

    /// Render the trials as delimited text, one row per trial.
    ///
    /// Leading columns are the trial's timestamp, experiment type and
    /// participant; the remaining columns are the flattened field names of
    /// its statistics record, taken from the first trial that has one.
    pub fn trials_as_table(&self, stats_by_id: &BTreeMap<String, Statistics>) -> String {
        if self.trials.is_empty() {
            return String::new();
        }

        let mut header = String::new();
        let mut rows = Vec::new();

        for trial in &self.trials {
            let meta = trial.meta();
            let mut cells = vec![
                meta.timestamp.to_rfc3339(),
                meta.trial_type,
                meta.participant,
            ];

            if let Some(statistics) = stats_by_id.get(&trial.id) {
                let flat = flatten_statistics(statistics);

                if header.is_empty() {
                    let mut columns = vec![
                        "timestamp".to_owned(),
                        "test".to_owned(),
                        "participant".to_owned(),
                    ];
                    columns.extend(flat.iter().map(|(key, _)| key.clone()));
                    header = join(&columns);
                }

                cells.extend(flat.into_iter().map(|(_, value)| value));
            }

            rows.push(join(&cells));
        }

        if !header.is_empty() {
            rows.insert(0, header);
        }

        rows.join("\r\n")
    }
}

fn join(cells: &[String]) -> String {
    cells.join(&TABLE_SEPARATOR.to_string())
}

/// Flatten a statistics record into (dotted key, rendered value) pairs;
/// array elements get index-suffixed keys.
fn flatten_statistics(statistics: &Statistics) -> Vec<(String, String)> {
    let mut flat = Vec::new();
    if let Ok(value) = serde_json::to_value(statistics) {
        flatten(&value, "", &mut flat);
    }
    flat
}

fn flatten(value: &Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten(nested, &nest(prefix, key), out);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten(nested, &nest(prefix, &index.to_string()), out);
            }
        }
        Value::Null => out.push((prefix.to_owned(), String::new())),
        Value::String(text) => out.push((prefix.to_owned(), text.clone())),
        other => out.push((prefix.to_owned(), other.to_string())),
    }
}

fn nest(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{FixationStats, Histogram, Hits, SaccadeStats};
    use crate::weblog::read_trial_log;

    fn test() -> Test {
        let trials = read_trial_log(concat!(
            "timestamp: 2024-02-01T08:00:00Z\n",
            r#"{"resultWord":"sanaa","participantCode":"P01"}"#,
            "\n",
            "timestamp: 2024-02-01T09:00:00Z\n",
            r#"{"resultWord":"sanaa","participantCode":"P02"}"#,
            "\n",
        ));

        Test {
            folder: "exp1".to_owned(),
            trials,
        }
    }

    fn statistics() -> Statistics {
        Statistics {
            trial_type: "sanaa".to_owned(),
            group: "default".to_owned(),
            hits: Hits {
                correct: vec![1.0, 2.0],
                wrong: vec![0.0, 1.0],
            },
            fixations: FixationStats {
                duration_ranges: vec![3.0; 7],
                duration_times: Histogram {
                    values: vec![250.0],
                    item_duration: 20.0,
                },
            },
            saccades: SaccadeStats::default(),
        }
    }

    #[test]
    fn trials_are_found_by_id() {
        let test = test();
        let id = test.trials[0].id.clone();

        assert!(test.has_trial(&id));
        assert_eq!(test.trial(&id).unwrap().payload.participant_code, "P01");

        let err = test.trial("00000000").unwrap_err();
        assert!(matches!(err, PipelineError::NotFound("trial", _)));
    }

    #[test]
    fn transform_maps_in_order() {
        let participants = test().transform(|trial| trial.participant());
        assert_eq!(participants, vec!["P01", "P02"]);
    }

    #[test]
    fn table_flattens_statistics_columns() {
        let test = test();
        let mut stats_by_id = BTreeMap::new();
        stats_by_id.insert(test.trials[0].id.clone(), statistics());
        stats_by_id.insert(test.trials[1].id.clone(), statistics());

        let table = test.trials_as_table(&stats_by_id);
        let lines: Vec<&str> = table.split("\r\n").collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,test,participant,"));
        assert!(lines[0].contains("fixations.durationRanges.0"));
        assert!(lines[0].contains("fixations.durationTimes.itemDuration"));
        assert!(lines[1].contains("sanaa,P01"));
        assert!(lines[2].contains("sanaa,P02"));
    }

    #[test]
    fn empty_test_renders_an_empty_table() {
        let empty = Test::default();
        assert_eq!(empty.trials_as_table(&BTreeMap::new()), "");
    }
}
