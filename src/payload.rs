//! Parsing and conversion of the radiation monitor's data string
//!
//! The device answers with a single framed line:
//!
//! ```text
//! $,UTC=17:09:33 06/22/2021,CPS=0,CPM=26,uSv/hr=0.14,Mode=SLOW,#
//! ```
//!
//! [`parse`] checks the framing and the field set and produces a
//! [`FieldRecord`]. [`convert`] turns those raw strings into a
//! [`MeasurementRecord`]. Either step rejects the whole payload; nothing
//! partial is ever handed downstream.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use tracing::trace;

use crate::config::ClockSource;
use crate::error::{CycleError, CycleResult};
use crate::util::format_date;
use crate::{MeasurementRecord, Status};

const START_SENTINEL: char = '$';
const END_SENTINEL: char = '#';
const DELIMITER: char = ',';

const UTC_KEY: &str = "UTC";
const CPS_KEY: &str = "CPS";
const CPM_KEY: &str = "CPM";
const DOSE_KEY: &str = "uSv/hr";
const MODE_KEY: &str = "Mode";

/// Number of `key=value` tokens in a valid payload
pub const EXPECTED_FIELDS: usize = 5;

/// Device timestamp layout, always UTC
const DEVICE_TIME_FORMAT: &str = "%H:%M:%S %m/%d/%Y";

/// Scale from µSv/h to Sv/h
pub const MICRO: f64 = 1.0e-6;

/// The five raw fields of one device reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    pub utc: String,
    pub cps: String,
    pub cpm: String,
    pub micro_sv_per_hr: String,
    pub mode: String,
}

/// Split a framed payload into its fields
///
/// Tokens without `=` are skipped. Exactly [`EXPECTED_FIELDS`] `key=value`
/// tokens carrying the expected keys must remain.
pub fn parse(raw: &str) -> CycleResult<FieldRecord> {
    let body = raw
        .strip_prefix(START_SENTINEL)
        .and_then(|rest| rest.strip_suffix(END_SENTINEL))
        .ok_or_else(|| CycleError::Protocol("missing frame sentinels".to_string()))?;

    let tokens: Vec<(&str, &str)> = body
        .split(DELIMITER)
        .filter_map(|token| token.split_once('='))
        .collect();

    if tokens.len() != EXPECTED_FIELDS {
        return Err(CycleError::Protocol(format!(
            "corrupted data string: {} fields, expected {EXPECTED_FIELDS}",
            tokens.len()
        )));
    }

    let mut utc = None;
    let mut cps = None;
    let mut cpm = None;
    let mut dose = None;
    let mut mode = None;

    for (key, value) in tokens {
        let slot = match key {
            UTC_KEY => &mut utc,
            CPS_KEY => &mut cps,
            CPM_KEY => &mut cpm,
            DOSE_KEY => &mut dose,
            MODE_KEY => &mut mode,
            other => {
                return Err(CycleError::Protocol(format!(
                    "corrupted data string: unknown field `{other}`"
                )));
            }
        };

        if slot.replace(value.to_string()).is_some() {
            return Err(CycleError::Protocol(format!(
                "corrupted data string: duplicate field `{key}`"
            )));
        }
    }

    // five distinct known keys out of five tokens means every slot is filled
    match (utc, cps, cpm, dose, mode) {
        (Some(utc), Some(cps), Some(cpm), Some(micro_sv_per_hr), Some(mode)) => {
            Ok(FieldRecord {
                utc,
                cps,
                cpm,
                micro_sv_per_hr,
                mode,
            })
        }
        _ => Err(CycleError::Protocol(
            "corrupted data string: missing field".to_string(),
        )),
    }
}

/// Convert a device timestamp to epoch seconds using UTC calendar rules
pub fn utc_epoch(timestamp: &str) -> CycleResult<i64> {
    NaiveDateTime::parse_from_str(timestamp.trim(), DEVICE_TIME_FORMAT)
        .map(|time| time.and_utc().timestamp())
        .map_err(|e| CycleError::Conversion(format!("invalid timestamp `{timestamp}`: {e}")))
}

/// Convert parsed fields into a measurement record
pub fn convert(fields: FieldRecord, clock: ClockSource) -> CycleResult<MeasurementRecord> {
    let timestamp = match clock {
        ClockSource::Device => utc_epoch(&fields.utc)?,
        ClockSource::Server => Utc::now().timestamp(),
    };

    let date = DateTime::from_timestamp(timestamp, 0)
        .map(|time| format_date(&time.with_timezone(&Local)))
        .ok_or_else(|| CycleError::Conversion(format!("timestamp {timestamp} out of range")))?;

    let cps = parse_count(CPS_KEY, &fields.cps)?;
    let cpm = parse_count(CPM_KEY, &fields.cpm)?;

    let micro_sv_per_hr: f64 = fields.micro_sv_per_hr.trim().parse().map_err(|e| {
        CycleError::Conversion(format!(
            "{DOSE_KEY}: `{}` is not a number: {e}",
            fields.micro_sv_per_hr
        ))
    })?;

    if !micro_sv_per_hr.is_finite() || micro_sv_per_hr < 0.0 {
        return Err(CycleError::Conversion(format!(
            "{DOSE_KEY}: {micro_sv_per_hr} out of range"
        )));
    }

    let record = MeasurementRecord {
        timestamp,
        date,
        cps,
        cpm,
        micro_sv_per_hr,
        sv_per_hr: micro_sv_per_hr * MICRO,
        mode: fields.mode.trim().to_lowercase(),
        status: Status::Online,
    };

    trace!("converted record: {record:?}");

    Ok(record)
}

fn parse_count(key: &str, value: &str) -> CycleResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| CycleError::Conversion(format!("{key}: `{value}` is not a count: {e}")))
}
