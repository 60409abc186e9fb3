pub mod agent;
pub mod config;
pub mod error;
pub mod monitors;
pub mod payload;
pub mod snapshot;
pub mod storage;
pub mod util;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reachability of the radiation monitor as seen by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    #[default]
    Offline,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Online => write!(f, "online"),
            Status::Offline => write!(f, "offline"),
        }
    }
}

/// A validated and converted reading from the radiation monitor
///
/// Every poll cycle produces a fresh record; records are never mutated
/// after conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    /// Epoch seconds of the measurement
    pub timestamp: i64,

    /// Local time of the measurement, `MM/DD/YYYY HH:MM:SS`
    pub date: String,

    /// Counts per second
    pub cps: u64,

    /// Counts per minute
    pub cpm: u64,

    /// Dose rate in µSv/h as reported by the device
    pub micro_sv_per_hr: f64,

    /// Dose rate in Sv/h, derived from `micro_sv_per_hr`
    pub sv_per_hr: f64,

    /// Device counting mode, lower case
    pub mode: String,

    pub status: Status,
}

impl MeasurementRecord {
    /// Dose rate in µSv/h rounded to two decimals for display
    pub fn micro_sv_display(&self) -> String {
        format!("{:.2}", self.micro_sv_per_hr)
    }
}
