use chrono::{DateTime, Local};

const DEVICE_URL: &str = "RADMON_DEVICE_URL";

const DEFAULT_DEVICE_URL: &str = "http://radmon.local";

pub fn get_device_url() -> String {
    std::env::var(DEVICE_URL).unwrap_or_else(|_| DEFAULT_DEVICE_URL.to_string())
}

const CONFIG_FILE: &str = "RADMON_CONFIG";

pub fn get_config_file() -> Option<String> {
    std::env::var(CONFIG_FILE).ok()
}

const DATE_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Format a point in time the way the snapshot consumers expect it
pub fn format_date(time: &DateTime<Local>) -> String {
    time.format(DATE_FORMAT).to_string()
}

/// Local wall clock formatted for the snapshot
pub fn local_date_now() -> String {
    format_date(&Local::now())
}
