//! Schema-driven decoding of tabular log rows
//!
//! The eye-tracker export is a tab-separated file whose header names the
//! columns of many capture categories at once. [`Columns`] maps sanitized
//! column names to indices and [`Row`] gives typed, presence-aware access to
//! one data line: a blank or absent cell reads as unset, and every capture
//! record decodes through a `decode(&Row) -> Option<Self>` constructor that
//! yields `None` when all of its fields are unset. Emptiness is therefore a
//! structural property, distinct from a row that legitimately encodes zero.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Sanitized column-name to index mapping built from a header line.
#[derive(Debug, Clone)]
pub struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    /// Build the column map from the header line.
    ///
    /// Column names are sanitized by stripping whitespace and bracket
    /// characters, so `GazePointX (ADCSpx)` is addressed as
    /// `GazePointXADCSpx`.
    pub fn from_header(header: &str, separator: char) -> Self {
        let index = header
            .split(separator)
            .enumerate()
            .map(|(i, name)| (sanitize(name), i))
            .collect();

        Self { index }
    }

    /// View one data line through this column mapping.
    pub fn row<'a>(&'a self, line: &'a str, separator: char) -> Row<'a> {
        Row {
            columns: self,
            cells: line.split(separator).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '[' | ']'))
        .collect()
}

/// One data row of a tabular log, addressed by sanitized column name.
#[derive(Debug)]
pub struct Row<'a> {
    columns: &'a Columns,
    cells: Vec<&'a str>,
}

impl<'a> Row<'a> {
    /// The raw cell under the named column, if the column exists and the
    /// cell is non-blank.
    pub fn raw(&self, column: &str) -> Option<&'a str> {
        let index = *self.columns.index.get(column)?;
        let cell = self.cells.get(index)?.trim();
        (!cell.is_empty()).then_some(cell)
    }

    pub fn text(&self, column: &str) -> Option<String> {
        self.raw(column).map(str::to_owned)
    }

    /// Numeric cell; tolerates a decimal comma as written by some locales.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.raw(column)?.replacen(',', ".", 1).parse().ok()
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        self.raw(column)?.parse().ok()
    }

    /// Date cell in day/month/year order, e.g. `31/12/2019`.
    pub fn date(&self, column: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.raw(column)?, "%d/%m/%Y").ok()
    }

    /// Time-of-day cell `H.M.S.mmm`, e.g. `23.59.59.999`.
    ///
    /// Only the time of day is reliable per row; the result is anchored on
    /// the epoch date until the reader rewrites it to the recording date.
    pub fn clock(&self, column: &str) -> Option<NaiveDateTime> {
        let time = NaiveTime::parse_from_str(self.raw(column)?, "%H.%M.%S%.3f").ok()?;
        Some(NaiveDate::from_ymd_opt(1970, 1, 1)?.and_time(time))
    }
}
