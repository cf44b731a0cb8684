//! Pipeline orchestration
//!
//! The public entry point for the surrounding service layer: load the
//! trials of one experiment folder, correlate them with the folder's gaze
//! exports, and answer store reconciliation requests by computing and
//! appending statistics.
//!
//! Everything here is synchronous and blocking; a folder is one
//! coarse-grained unit of work, and callers needing responsiveness offload
//! the whole call.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::correlate::{correlate, DEFAULT_HOUR_OFFSET};
use crate::error::PipelineError;
use crate::folder;
use crate::gazelog::read_gaze_log;
use crate::stats;
use crate::store::StatisticsStore;
use crate::test::Test;
use crate::weblog::read_trial_log;

/// Extension of the behavioral trial log files.
const TRIAL_LOG_EXTENSION: &str = "txt";
/// Extension of the eye-tracker export files.
const GAZE_LOG_EXTENSION: &str = "tsv";

/// External configuration of the pipeline: where the experiment folders
/// live and the constant clock offset between the two log sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    pub data_root: PathBuf,
    /// Hours added to every trial timestamp before correlation
    pub time_correction: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("./data"),
            time_correction: DEFAULT_HOUR_OFFSET,
        }
    }
}

/// The ingestion/correlation/statistics pipeline over one data root.
///
/// Holds no cross-call state: each [`Pipeline::load_test`] builds its test
/// from scratch, so the pipeline is re-entrant and safe to share with a
/// session object.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Names of the experiment folders under the data root.
    pub fn tests(&self) -> Result<Vec<String>, PipelineError> {
        Ok(folder::subfolders(&self.config.data_root)?)
    }

    /// Load and correlate the trials of one experiment folder.
    ///
    /// The folder must hold exactly one trial log; every trial must end up
    /// with a non-empty gaze recording. Any violation is returned as a
    /// typed failure with its human-readable cause.
    pub fn load_test(&self, name: &str) -> Result<Test, PipelineError> {
        let folder_path = self.config.data_root.join(name);
        info!(folder = %folder_path.display(), "loading test");

        let trial_logs = folder::files_with_extension(&folder_path, TRIAL_LOG_EXTENSION)?;
        if trial_logs.is_empty() {
            return Err(PipelineError::Structure(format!(
                "no weblog files in the folder {}",
                folder_path.display()
            )));
        }
        if trial_logs.len() > 1 {
            return Err(PipelineError::Structure(format!(
                "several weblogs found in {}, invalid data structure",
                folder_path.display()
            )));
        }

        let text = fs::read_to_string(&trial_logs[0])?;
        let mut trials = read_trial_log(&text);
        if trials.is_empty() {
            return Err(PipelineError::Decode("weblog file is corrupted".to_owned()));
        }

        let mut recordings = Vec::new();
        for path in folder::files_with_extension(&folder_path, GAZE_LOG_EXTENSION)? {
            let text = fs::read_to_string(&path)?;
            recordings.extend(read_gaze_log(&text));
        }

        correlate(&mut trials, &recordings, self.config.time_correction)?;

        Ok(Test {
            folder: name.to_owned(),
            trials,
        })
    }

    /// Answer one store request: load the folder's test, compute statistics
    /// per trial and append them. Returns how many trials were appended.
    pub fn compute_folder(
        &self,
        store: &mut StatisticsStore,
        name: &str,
    ) -> Result<usize, PipelineError> {
        let test = self.load_test(name)?;
        let mut appended = 0;

        for trial in &test.trials {
            match stats::calculate(trial, None, None) {
                Some(statistics) => {
                    store.append(&test.folder, &trial.id, statistics)?;
                    appended += 1;
                }
                None => warn!(trial = %trial.id, "trial has no gaze data, skipping statistics"),
            }
        }

        Ok(appended)
    }
}
