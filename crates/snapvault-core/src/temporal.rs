//! # Capture Dates
//!
//! Snapshots and audit entries are stamped with a calendar date, not a
//! time of day. [`CaptureDate`] wraps `chrono::NaiveDate` and renders as
//! `YYYY-MM-DD` everywhere: file names, log entries, CLI output.
//!
//! The current date comes from a [`Clock`] so that the store can be driven
//! deterministically in tests. [`SystemClock`] reads the local calendar
//! date, matching the date an operator sees when the capture runs.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::VaultError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar date in `YYYY-MM-DD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureDate(NaiveDate);

impl CaptureDate {
    /// Build from year, month, day.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, VaultError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| VaultError::naming(format!("{year}-{month}-{day}"), "not a calendar date"))
    }

    /// Parse a strict `YYYY-MM-DD` string.
    pub fn parse(s: &str) -> Result<Self, VaultError> {
        // chrono accepts unpadded fields; the naming convention does not.
        if s.len() != 10 {
            return Err(VaultError::naming(s, "date must be YYYY-MM-DD"));
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Self)
            .map_err(|e| VaultError::naming(s, format!("date must be YYYY-MM-DD: {e}")))
    }

    /// Today's local calendar date.
    pub fn today() -> Self {
        SystemClock.today()
    }

    /// Access the inner `NaiveDate`.
    pub fn as_naive(&self) -> &NaiveDate {
        &self.0
    }
}

impl From<NaiveDate> for CaptureDate {
    fn from(d: NaiveDate) -> Self {
        Self(d)
    }
}

impl std::fmt::Display for CaptureDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl std::str::FromStr for CaptureDate {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Source of the current calendar date.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The date to stamp on a capture made now.
    fn today(&self) -> CaptureDate;
}

/// The local system calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> CaptureDate {
        CaptureDate(Local::now().date_naive())
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub CaptureDate);

impl Clock for FixedClock {
    fn today(&self) -> CaptureDate {
        self.0
    }
}
