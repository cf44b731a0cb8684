//! Capture-category records of the eye-tracker export
//!
//! Every data row of the export carries cells for several logical capture
//! categories side by side; which categories are actually populated decides
//! how the reader treats the row. Each record type below decodes its own
//! column subset and reports structural emptiness by decoding to `None`.

use chrono::{NaiveDate, NaiveDateTime};

use crate::schema::Row;

/// Screen or media dimensions written as `WxH`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    pub fn parse(value: &str) -> Option<Self> {
        let (width, height) = value.split_once('x')?;
        Some(Self {
            width: width.trim().parse().ok()?,
            height: height.trim().parse().ok()?,
        })
    }
}

/// Identity columns repeated on every export row.
///
/// The first data row of a recording segment is consumed entirely by this
/// record; a row whose participant differs from the open recording's closes
/// it and opens the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingInfo {
    pub export_date: Option<NaiveDate>,
    pub studio_version: Option<String>,
    pub project: Option<String>,
    pub test_name: Option<String>,
    pub participant: Option<String>,
    pub group: Option<String>,
    pub recording_name: Option<String>,
    pub recording_date: Option<NaiveDate>,
    pub recording_duration_ms: Option<f64>,
    pub resolution: Option<ScreenSize>,
    pub presentation_sequence: Option<String>,
    pub fixation_filter: Option<String>,
}

impl RecordingInfo {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            export_date: row.date("ExportDate"),
            studio_version: row.text("StudioVersionRec"),
            project: row.text("StudioProjectName"),
            test_name: row.text("StudioTestName"),
            participant: row.text("ParticipantName"),
            group: row.text("GroupValue"),
            recording_name: row.text("RecordingName"),
            recording_date: row.date("RecordingDate"),
            recording_duration_ms: row.number("RecordingDuration"),
            resolution: row.raw("RecordingResolution").and_then(ScreenSize::parse),
            presentation_sequence: row.text("PresentationSequence"),
            fixation_filter: row.text("FixationFilter"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// Per-row timestamp columns: recording clock, wall clock and the device
/// (eye-tracker) microsecond counter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowTime {
    pub recording_ms: Option<f64>,
    pub local_time: Option<NaiveDateTime>,
    pub device_us: Option<i64>,
}

impl RowTime {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            recording_ms: row.number("RecordingTimestamp"),
            local_time: row.clock("LocalTimeStamp"),
            device_us: row.integer("EyeTrackerTimestamp"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// Raw gaze point coordinates in the export's coordinate systems.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GazePoint {
    pub index: Option<i64>,
    pub left_x_adcs_px: Option<f64>,
    pub left_y_adcs_px: Option<f64>,
    pub right_x_adcs_px: Option<f64>,
    pub right_y_adcs_px: Option<f64>,
    pub x_adcs_px: Option<f64>,
    pub y_adcs_px: Option<f64>,
    pub x_mcs_px: Option<f64>,
    pub y_mcs_px: Option<f64>,
    pub left_x_adcs_mm: Option<f64>,
    pub left_y_adcs_mm: Option<f64>,
    pub right_x_adcs_mm: Option<f64>,
    pub right_y_adcs_mm: Option<f64>,
    pub strict_average_x_adcs_mm: Option<f64>,
    pub strict_average_y_adcs_mm: Option<f64>,
}

impl GazePoint {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            index: row.integer("GazePointIndex"),
            left_x_adcs_px: row.number("GazePointLeftXADCSpx"),
            left_y_adcs_px: row.number("GazePointLeftYADCSpx"),
            right_x_adcs_px: row.number("GazePointRightXADCSpx"),
            right_y_adcs_px: row.number("GazePointRightYADCSpx"),
            x_adcs_px: row.number("GazePointXADCSpx"),
            y_adcs_px: row.number("GazePointYADCSpx"),
            x_mcs_px: row.number("GazePointXMCSpx"),
            y_mcs_px: row.number("GazePointYMCSpx"),
            left_x_adcs_mm: row.number("GazePointLeftXADCSmm"),
            left_y_adcs_mm: row.number("GazePointLeftYADCSmm"),
            right_x_adcs_mm: row.number("GazePointRightXADCSmm"),
            right_y_adcs_mm: row.number("GazePointRightYADCSmm"),
            strict_average_x_adcs_mm: row.number("StrictAverageGazePointXADCSmm"),
            strict_average_y_adcs_mm: row.number("StrictAverageGazePointYADCSmm"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// Classification columns valid at one sample instant: the tag, its
/// duration, and the fixation-only saccadic attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GazeEventData {
    pub fixation_index: Option<i64>,
    pub saccade_index: Option<i64>,
    pub gaze_event_type: Option<String>,
    pub duration_ms: Option<f64>,
    pub fixation_x: Option<f64>,
    pub fixation_y: Option<f64>,
    pub saccadic_amplitude: Option<f64>,
    pub absolute_direction: Option<f64>,
    pub relative_direction: Option<f64>,
}

impl GazeEventData {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            fixation_index: row.integer("FixationIndex"),
            saccade_index: row.integer("SaccadeIndex"),
            gaze_event_type: row.text("GazeEventType"),
            duration_ms: row.number("GazeEventDuration"),
            fixation_x: row.number("FixationPointXMCSpx"),
            fixation_y: row.number("FixationPointYMCSpx"),
            saccadic_amplitude: row.number("SaccadicAmplitude"),
            absolute_direction: row.number("AbsoluteSaccadicDirection"),
            relative_direction: row.number("RelativeSaccadicDirection"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// Eye position in tracker space, millimeters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EyePosition {
    pub left_x_mm: Option<f64>,
    pub left_y_mm: Option<f64>,
    pub left_z_mm: Option<f64>,
    pub right_x_mm: Option<f64>,
    pub right_y_mm: Option<f64>,
    pub right_z_mm: Option<f64>,
}

impl EyePosition {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            left_x_mm: row.number("EyePosLeftXADCSmm"),
            left_y_mm: row.number("EyePosLeftYADCSmm"),
            left_z_mm: row.number("EyePosLeftZADCSmm"),
            right_x_mm: row.number("EyePosRightXADCSmm"),
            right_y_mm: row.number("EyePosRightYADCSmm"),
            right_z_mm: row.number("EyePosRightZADCSmm"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// Per-eye distance, pupil size and validity codes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EyeStatus {
    pub distance_left: Option<f64>,
    pub distance_right: Option<f64>,
    pub pupil_left: Option<f64>,
    pub pupil_right: Option<f64>,
    pub validity_left: Option<i64>,
    pub validity_right: Option<i64>,
}

impl EyeStatus {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            distance_left: row.number("DistanceLeft"),
            distance_right: row.number("DistanceRight"),
            pupil_left: row.number("PupilLeft"),
            pupil_right: row.number("PupilRight"),
            validity_left: row.integer("ValidityLeft"),
            validity_right: row.integer("ValidityRight"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// Camera-space eye coordinates, written by older tracker software only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Camera {
    pub left_x: Option<f64>,
    pub left_y: Option<f64>,
    pub right_x: Option<f64>,
    pub right_y: Option<f64>,
}

impl Camera {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            left_x: row.number("CamLeftX"),
            left_y: row.number("CamLeftY"),
            right_x: row.number("CamRightX"),
            right_y: row.number("CamRightY"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// Pointer event columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MouseEvent {
    pub index: Option<i64>,
    pub event: Option<String>,
    pub x_adcs_px: Option<f64>,
    pub y_adcs_px: Option<f64>,
    pub x_mcs_px: Option<f64>,
    pub y_mcs_px: Option<f64>,
}

impl MouseEvent {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            index: row.integer("MouseEventIndex"),
            event: row.text("MouseEvent"),
            x_adcs_px: row.number("MouseEventXADCSpx"),
            y_adcs_px: row.number("MouseEventYADCSpx"),
            x_mcs_px: row.number("MouseEventXMCSpx"),
            y_mcs_px: row.number("MouseEventYMCSpx"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// Keyboard event columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyPressEvent {
    pub index: Option<i64>,
    pub event: Option<String>,
}

impl KeyPressEvent {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            index: row.integer("KeyPressEventIndex"),
            event: row.text("KeyPressEvent"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// Application (recording software) event columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudioEvent {
    pub index: Option<i64>,
    pub event: Option<String>,
    pub data: Option<String>,
}

impl StudioEvent {
    /// Event value signalling that a recording segment has started; the
    /// same row then also carries a stimuli snapshot.
    pub const SEGMENT_STARTED: &'static str = "ScreenRecStarted";

    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            index: row.integer("StudioEventIndex"),
            event: row.text("StudioEvent"),
            data: row.text("StudioEventData"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// External trigger event columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalEvent {
    pub index: Option<i64>,
    pub event: Option<String>,
    pub value: Option<String>,
    pub marker_value: Option<f64>,
}

impl ExternalEvent {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            index: row.integer("ExternalEventIndex"),
            event: row.text("ExternalEvent"),
            value: row.text("ExternalEventValue"),
            marker_value: row.number("EventMarkerValue"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// Media placement columns of a stimuli snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    pub name: Option<String>,
    pub pos_x_px: Option<f64>,
    pub pos_y_px: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl MediaInfo {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            name: row.text("MediaName"),
            pos_x_px: row.number("MediaPosXADCSpx"),
            pos_y_px: row.number("MediaPosYADCSpx"),
            width: row.number("MediaWidth"),
            height: row.number("MediaHeight"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// Scene columns of a stimuli snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneInfo {
    pub name: Option<String>,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub duration: Option<f64>,
}

impl SceneInfo {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            name: row.text("SceneName"),
            start: row.number("SceneSegmentStart"),
            end: row.number("SceneSegmentEnd"),
            duration: row.number("SceneSegmentDuration"),
        };

        (record != Self::default()).then_some(record)
    }
}

/// Segment columns of a stimuli snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentInfo {
    pub name: Option<String>,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub duration: Option<f64>,
}

impl SegmentInfo {
    pub fn decode(row: &Row) -> Option<Self> {
        let record = Self {
            name: row.text("SegmentName"),
            start: row.number("SegmentStart"),
            end: row.number("SegmentEnd"),
            duration: row.number("SegmentDuration"),
        };

        (record != Self::default()).then_some(record)
    }
}
