//! JSON snapshot of the latest reading for the web pages
//!
//! The file holds a single-element array and is replaced wholesale on every
//! write: the content goes to a sibling temp file first which is then
//! renamed over the target, so readers never see a half-written file.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::util::local_date_now;
use crate::{MeasurementRecord, Status};

/// Externally visible view of one reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub date: String,

    #[serde(rename = "CPM")]
    pub cpm: String,

    #[serde(rename = "CPS")]
    pub cps: String,

    #[serde(rename = "uSvPerHr")]
    pub micro_sv_per_hr: String,

    pub mode: String,

    pub status: Status,
}

impl Snapshot {
    pub fn from_record(record: &MeasurementRecord) -> Self {
        Self {
            date: record.date.clone(),
            cpm: record.cpm.to_string(),
            cps: record.cps.to_string(),
            micro_sv_per_hr: record.micro_sv_display(),
            mode: record.mode.clone(),
            status: record.status,
        }
    }

    /// Blanked record stamped with the current local time
    pub fn offline() -> Self {
        Self {
            date: local_date_now(),
            cpm: String::new(),
            cps: String::new(),
            micro_sv_per_hr: String::new(),
            mode: String::new(),
            status: Status::Offline,
        }
    }

    /// File content: `[{...}]` followed by a newline
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&[self]).map(|mut json| {
            json.push('\n');
            json
        })
    }
}

/// Owner of the snapshot file and the optional raw input file
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    output_file: PathBuf,
    input_file: Option<PathBuf>,
}

impl SnapshotWriter {
    pub fn new(output_file: impl Into<PathBuf>, input_file: Option<PathBuf>) -> Self {
        Self {
            output_file: output_file.into(),
            input_file,
        }
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    pub fn input_file(&self) -> Option<&Path> {
        self.input_file.as_deref()
    }

    #[instrument(skip_all, fields(status = %snapshot.status))]
    pub async fn write(&self, snapshot: &Snapshot) -> io::Result<()> {
        let json = snapshot.to_json().map_err(io::Error::other)?;
        replace_file(&self.output_file, json.as_bytes()).await?;
        trace!("wrote snapshot to {}", self.output_file.display());
        Ok(())
    }

    /// Store the raw device payload for mirror servers, if configured
    pub async fn write_raw(&self, payload: &str) -> io::Result<()> {
        let Some(input_file) = &self.input_file else {
            return Ok(());
        };

        let content = format!("{payload}\n");
        replace_file(input_file, content.as_bytes()).await
    }

    /// Delete both files so readers see absence instead of stale data
    pub async fn remove(&self) -> io::Result<()> {
        remove_if_exists(&self.output_file).await?;
        if let Some(input_file) = &self.input_file {
            remove_if_exists(input_file).await?;
        }
        debug!("removed output files");
        Ok(())
    }
}

async fn replace_file(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    tokio::fs::write(&temp_path, content).await?;
    tokio::fs::rename(&temp_path, path).await
}

async fn remove_if_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
