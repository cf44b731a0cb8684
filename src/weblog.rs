//! Behavioral trial log reader
//!
//! The web harness appends two kinds of lines to its log: `timestamp: <value>`
//! lines carrying the wall clock to stamp on whatever comes next, and
//! single-line JSON payloads describing one completed trial. Reading is a
//! pure function of the file contents; no partial-failure state survives a
//! line, so the same file always decodes to the same trials.
//!
//! Trial identity is derived, not random: the first 8 hex characters of a
//! SHA-256 digest of the stamped timestamp's string form. Collisions are
//! negligible at per-folder trial counts; the id is not meant to be unique
//! across folders.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::recording::GazeRecording;

/// Geometry of the rendered content region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentArea {
    pub width: f64,
    pub top: f64,
    pub height: f64,
    pub left: f64,
}

/// Bounding box of one clickable target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    pub width: f64,
    pub top: f64,
    pub height: f64,
    pub left: f64,
}

/// Presentation settings the harness rendered the trial with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplaySettings {
    pub duration: f64,
    pub content_width: f64,
    pub content_left: f64,
    pub font_size: f64,
    pub word_spacing: f64,
    pub foreground: String,
    pub background: String,
    pub cursor: String,
    pub letter_spacing: f64,
    pub line_height: f64,
}

/// One clickable target and whether the participant marked it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Clickable {
    pub index: i64,
    pub clicked: bool,
    pub bounds: Option<Bounds>,
}

/// One decimal-window entry of the evolved hit log shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HitPair {
    pub correct: f64,
    pub wrong: f64,
}

/// The hit counter timeline, which changed shape as the harness evolved:
/// older captures logged a flat numeric sequence, newer ones log
/// correct/wrong pairs. The shape is disambiguated structurally and
/// normalized once, at the statistics boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HitTimeline {
    Flat(Vec<f64>),
    Paired(Vec<HitPair>),
}

impl Default for HitTimeline {
    fn default() -> Self {
        HitTimeline::Flat(Vec::new())
    }
}

/// A discrete UI event logged during the trial, tagged by its `type` field.
/// Event types outside the known vocabulary decode into [`TrialEvent::Other`]
/// so an evolved harness cannot break the reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TrialEvent {
    Building {
        timestamp: DateTime<Utc>,
        #[serde(default)]
        test: String,
    },
    Clicked {
        timestamp: DateTime<Utc>,
        #[serde(default)]
        index: i64,
    },
    Scroll {
        timestamp: DateTime<Utc>,
        #[serde(default)]
        position: f64,
    },
    VeroNavigation {
        timestamp: DateTime<Utc>,
        #[serde(default)]
        target: String,
    },
    VeroNavigationData {
        timestamp: DateTime<Utc>,
        #[serde(default)]
        variable: String,
        #[serde(default)]
        value: String,
    },
    UiAdjustment {
        timestamp: DateTime<Utc>,
        #[serde(default)]
        enable: String,
        #[serde(default)]
        target: String,
    },
    Start {
        timestamp: DateTime<Utc>,
    },
    End {
        timestamp: DateTime<Utc>,
    },
    #[serde(untagged)]
    Other {
        timestamp: DateTime<Utc>,
        #[serde(rename = "type")]
        kind: String,
    },
}

impl TrialEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TrialEvent::Building { timestamp, .. }
            | TrialEvent::Clicked { timestamp, .. }
            | TrialEvent::Scroll { timestamp, .. }
            | TrialEvent::VeroNavigation { timestamp, .. }
            | TrialEvent::VeroNavigationData { timestamp, .. }
            | TrialEvent::UiAdjustment { timestamp, .. }
            | TrialEvent::Start { timestamp }
            | TrialEvent::End { timestamp }
            | TrialEvent::Other { timestamp, .. } => *timestamp,
        }
    }

    fn shift_hours(&mut self, hours: i64) {
        match self {
            TrialEvent::Building { timestamp, .. }
            | TrialEvent::Clicked { timestamp, .. }
            | TrialEvent::Scroll { timestamp, .. }
            | TrialEvent::VeroNavigation { timestamp, .. }
            | TrialEvent::VeroNavigationData { timestamp, .. }
            | TrialEvent::UiAdjustment { timestamp, .. }
            | TrialEvent::Start { timestamp }
            | TrialEvent::End { timestamp }
            | TrialEvent::Other { timestamp, .. } => *timestamp += Duration::hours(hours),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Euler angles with an explicit rotation order, as the harness logs them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderedVec3 {
    #[serde(rename = "_order")]
    pub order: String,
    #[serde(rename = "_x")]
    pub x: f64,
    #[serde(rename = "_y")]
    pub y: f64,
    #[serde(rename = "_z")]
    pub z: f64,
}

/// One head-pose sample logged by the harness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadSample {
    pub timestamp: Option<DateTime<Utc>>,
    pub pos: Option<Vec3>,
    pub euler: Option<OrderedVec3>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeadAxisTotal {
    pub total: f64,
    pub per_second: f64,
    pub unit: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadTotals {
    pub roll: Option<HeadAxisTotal>,
    pub pitch: Option<HeadAxisTotal>,
    pub heading: Option<HeadAxisTotal>,
    pub movement: Option<HeadAxisTotal>,
}

/// The structured payload of one trial, as the harness wrote it.
///
/// Every field is optional in the log; absent fields take their zero-value
/// defaults, matching what the harness itself omits for older captures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrialPayload {
    pub content_area: Option<ContentArea>,
    pub window_width: f64,
    pub window_height: f64,
    pub doc_height: f64,
    pub scrolls: f64,
    pub max_scroll: f64,
    pub settings: Option<DisplaySettings>,
    pub hits_per_tenth: HitTimeline,
    pub clickables: Vec<Clickable>,
    pub max_hist_per_tenth: f64,
    pub marked: Vec<i64>,
    pub marked_wrong: Vec<i64>,
    pub last_marked: i64,
    pub misses: f64,
    pub marks: f64,
    pub marks_wrong: f64,
    pub instruction: String,
    pub result_word: String,
    pub participant_code: String,
    pub participant_group: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: f64,
    pub events: Vec<TrialEvent>,
    pub head_data: Vec<HeadSample>,
    pub head_totals: Option<HeadTotals>,
}

/// Identity and classification of a trial, for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialMeta {
    #[serde(rename = "_id")]
    pub id: String,
    pub participant: String,
    pub group: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub trial_type: String,
}

/// Flat per-trial summary: the scalar payload fields plus the mark rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialSummary {
    pub rate: f64,
    pub participant_code: String,
    #[serde(rename = "type")]
    pub trial_type: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: f64,
    pub content_area: Option<ContentArea>,
    pub window_width: f64,
    pub window_height: f64,
    pub doc_height: f64,
    pub settings: Option<DisplaySettings>,
    pub instruction: String,
    pub misses: f64,
    pub marks: f64,
    pub marks_wrong: f64,
    pub max_hist_per_tenth: f64,
    pub scrolls: f64,
    pub max_scroll: f64,
    pub head_totals: Option<HeadTotals>,
}

/// One behavioral run: derived identity, wall-clock stamp, the raw payload,
/// and (after correlation) the matching gaze recording.
#[derive(Debug, Clone)]
pub struct Trial {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: TrialPayload,
    pub gaze: Option<GazeRecording>,
}

impl Trial {
    pub fn new(timestamp: DateTime<Utc>, payload: TrialPayload) -> Self {
        Self {
            id: derive_id(&timestamp),
            timestamp,
            payload,
            gaze: None,
        }
    }

    /// Participant code, falling back to the matched recording's identity.
    pub fn participant(&self) -> String {
        if !self.payload.participant_code.is_empty() {
            return self.payload.participant_code.clone();
        }
        self.gaze
            .as_ref()
            .and_then(|gaze| gaze.info.participant.clone())
            .unwrap_or_default()
    }

    pub fn group(&self) -> String {
        if self.payload.participant_group.is_empty() {
            "default".to_owned()
        } else {
            self.payload.participant_group.clone()
        }
    }

    /// The experiment type this trial belongs to: the result word, else the
    /// test named by the `building` event, else the recording name.
    pub fn experiment_type(&self) -> String {
        if !self.payload.result_word.is_empty() {
            return self.payload.result_word.clone();
        }
        for event in &self.payload.events {
            if let TrialEvent::Building { test, .. } = event {
                return test.clone();
            }
        }
        self.gaze
            .as_ref()
            .and_then(|gaze| gaze.info.recording_name.clone())
            .unwrap_or_default()
    }

    pub fn meta(&self) -> TrialMeta {
        TrialMeta {
            id: self.id.clone(),
            participant: self.participant(),
            group: self.group(),
            timestamp: self.timestamp,
            trial_type: self.experiment_type(),
        }
    }

    pub fn summary(&self) -> TrialSummary {
        let payload = &self.payload;
        let rate = if payload.clickables.is_empty() {
            0.0
        } else {
            payload.marks / payload.clickables.len() as f64
        };

        TrialSummary {
            rate,
            participant_code: payload.participant_code.clone(),
            trial_type: self.experiment_type(),
            start_time: payload.start_time,
            end_time: payload.end_time,
            duration: payload.duration,
            content_area: payload.content_area.clone(),
            window_width: payload.window_width,
            window_height: payload.window_height,
            doc_height: payload.doc_height,
            settings: payload.settings.clone(),
            instruction: payload.instruction.clone(),
            misses: payload.misses,
            marks: payload.marks,
            marks_wrong: payload.marks_wrong,
            max_hist_per_tenth: payload.max_hist_per_tenth,
            scrolls: payload.scrolls,
            max_scroll: payload.max_scroll,
            head_totals: payload.head_totals.clone(),
        }
    }

    /// The stamp of the trial's `start` discrete event, if logged.
    pub fn start_event(&self) -> Option<DateTime<Utc>> {
        self.payload.events.iter().find_map(|event| match event {
            TrialEvent::Start { timestamp } => Some(*timestamp),
            _ => None,
        })
    }

    /// The stamp of the trial's `end` discrete event, if logged.
    pub fn end_event(&self) -> Option<DateTime<Utc>> {
        self.payload.events.iter().find_map(|event| match event {
            TrialEvent::End { timestamp } => Some(*timestamp),
            _ => None,
        })
    }

    /// Shift every timestamp this trial carries by a constant hour offset,
    /// compensating the independent clocks of the two log sources.
    pub fn shift_hours(&mut self, hours: i64) {
        if hours == 0 {
            return;
        }
        let delta = Duration::hours(hours);

        self.timestamp += delta;
        if let Some(start) = self.payload.start_time.as_mut() {
            *start += delta;
        }
        if let Some(end) = self.payload.end_time.as_mut() {
            *end += delta;
        }
        for event in &mut self.payload.events {
            event.shift_hours(hours);
        }
        for head in &mut self.payload.head_data {
            if let Some(timestamp) = head.timestamp.as_mut() {
                *timestamp += delta;
            }
        }
    }
}

fn derive_id(timestamp: &DateTime<Utc>) -> String {
    let digest = Sha256::digest(timestamp.to_rfc3339().as_bytes());
    digest[..4].iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Decode a whole trial log into its trials.
///
/// Undecodable payload rows and unsupported lines are warned about and
/// skipped; they never abort the read.
pub fn read_trial_log(text: &str) -> Vec<Trial> {
    let mut trials = Vec::new();
    let mut pending: Option<DateTime<Utc>> = None;

    for line in text.lines() {
        if line.starts_with('{') {
            let payload = match serde_json::from_str::<TrialPayload>(line) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(%err, "skipping undecodable trial payload");
                    continue;
                }
            };
            match pending {
                Some(timestamp) => trials.push(Trial::new(timestamp, payload)),
                None => warn!("skipping trial payload with no preceding timestamp line"),
            }
        } else if let Some(value) = line.strip_prefix("timestamp: ") {
            match parse_stamp(value.trim()) {
                Some(timestamp) => pending = Some(timestamp),
                None => warn!(value, "skipping unparseable timestamp line"),
            }
        } else if !line.trim().is_empty() {
            warn!(line, "unsupported line in trial log");
        }
    }

    trials
}

fn parse_stamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(value) {
        return Some(stamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
