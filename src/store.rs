//! Persistent statistics store
//!
//! A flat key-value persistence layer mapping experiment-folder name →
//! trial id → [`Statistics`], held in memory and mirrored to one JSON file
//! whose layout matches the in-memory shape exactly. The file is loaded
//! eagerly when the store opens and written back on every append
//! (save-on-push). Single-writer discipline is assumed; reads and writes
//! are never interleaved with a concurrent writer.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::PipelineError;
use crate::folder;
use crate::stats::Statistics;

/// Statistics of one experiment folder, keyed by trial id.
pub type TrialStatistics = BTreeMap<String, Statistics>;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    /// Store entries removed because their folder disappeared
    pub removed: usize,
    /// Folders newly registered and requested for computation
    pub appended: usize,
    /// The folder names whose statistics the caller should now compute
    /// and append
    pub requested: Vec<String>,
}

/// Disk-backed mapping of experiment folders to their trial statistics.
pub struct StatisticsStore {
    db_path: PathBuf,
    data_root: PathBuf,
    tests: BTreeMap<String, TrialStatistics>,
}

impl StatisticsStore {
    /// Open the store over `data_root`, eagerly loading anything previously
    /// persisted at `db_path`. A missing database file is an empty store.
    pub fn open(
        db_path: impl Into<PathBuf>,
        data_root: impl Into<PathBuf>,
    ) -> Result<Self, PipelineError> {
        let db_path = db_path.into();

        let tests = match fs::read_to_string(&db_path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            db_path,
            data_root: data_root.into(),
            tests,
        })
    }

    /// Persist statistics for one trial of one experiment folder.
    pub fn append(
        &mut self,
        test: &str,
        trial: &str,
        statistics: Statistics,
    ) -> Result<(), PipelineError> {
        self.tests
            .entry(test.to_owned())
            .or_default()
            .insert(trial.to_owned(), statistics);
        self.save()
    }

    /// Reconcile the store against the experiment folders on disk.
    ///
    /// Entries whose folder no longer exists are removed; folders present
    /// on disk but absent from the store are registered empty and returned
    /// as requests for the caller to compute (via [`Self::append`]). A
    /// second pass with unchanged folders requests nothing.
    pub fn update(&mut self) -> Result<UpdateReport, PipelineError> {
        let folders = folder::subfolders(&self.data_root)?;

        let stale: Vec<String> = self
            .tests
            .keys()
            .filter(|name| !folders.contains(*name))
            .cloned()
            .collect();
        for name in &stale {
            self.tests.remove(name);
        }

        let requested: Vec<String> = folders
            .into_iter()
            .filter(|name| !self.tests.contains_key(name))
            .collect();
        for name in &requested {
            self.tests.insert(name.clone(), TrialStatistics::new());
            info!(folder = %name, "statistics requested for new folder");
        }

        self.save()?;

        Ok(UpdateReport {
            removed: stale.len(),
            appended: requested.len(),
            requested,
        })
    }

    /// Statistics of one experiment folder, if any were persisted.
    pub fn test(&self, name: &str) -> Option<&TrialStatistics> {
        self.tests.get(name)
    }

    /// All persisted statistics of one experiment type, excluding the
    /// named trial.
    pub fn trials_of_type(&self, trial_type: &str, exclude_trial: &str) -> Vec<&Statistics> {
        self.tests
            .values()
            .flat_map(|trials| trials.iter())
            .filter(|(id, stats)| id.as_str() != exclude_trial && stats.trial_type == trial_type)
            .map(|(_, stats)| stats)
            .collect()
    }

    /// Root folder the store reconciles against.
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    fn save(&self) -> Result<(), PipelineError> {
        let text = serde_json::to_string_pretty(&self.tests)?;
        fs::write(&self.db_path, text)?;
        Ok(())
    }
}
