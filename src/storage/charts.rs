//! Chart definitions rendered from the round-robin database

use std::path::Path;

/// How far back a chart looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    Day,
    FourWeeks,
    TwelveMonths,
}

impl Lookback {
    /// rrdtool start specification relative to the end time
    pub fn start(&self) -> &'static str {
        match self {
            Lookback::Day => "end-1day",
            Lookback::FourWeeks => "end-4weeks",
            Lookback::TwelveMonths => "end-12months",
        }
    }

    /// Moving-average window for the trend line, in seconds
    pub fn trend_window(&self) -> u64 {
        match self {
            Lookback::Day => 7_200,
            Lookback::FourWeeks => 172_800,
            Lookback::TwelveMonths => 604_800,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendMode {
    DataOnly,
    TrendOnly,
    DataAndTrend,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    /// rrdtool picks the range
    Default,

    /// Auto-scale the vertical axis
    Auto,

    /// Fixed vertical range (rigid)
    Fixed { lower: f64, upper: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSpec {
    /// Output file name without extension
    pub name: &'static str,

    /// Data source in the database
    pub data_source: &'static str,

    pub label: &'static str,
    pub title: &'static str,
    pub lookback: Lookback,
    pub trend: TrendMode,
    pub scale: Scale,
}

const CPM_LABEL: &str = "counts per minute";
const SV_LABEL: &str = "Sv per hour";

/// The charts published next to the snapshot
pub const CHARTS: [ChartSpec; 6] = [
    ChartSpec {
        name: "24hr_cpm",
        data_source: "CPM",
        label: CPM_LABEL,
        title: "CPM - Last 24 Hours",
        lookback: Lookback::Day,
        trend: TrendMode::DataAndTrend,
        scale: Scale::Default,
    },
    ChartSpec {
        name: "24hr_svperhr",
        data_source: "SvperHr",
        label: SV_LABEL,
        title: "Sv/Hr - Last 24 Hours",
        lookback: Lookback::Day,
        trend: TrendMode::DataAndTrend,
        scale: Scale::Default,
    },
    ChartSpec {
        name: "4wk_cpm",
        data_source: "CPM",
        label: CPM_LABEL,
        title: "CPM - Last 4 Weeks",
        lookback: Lookback::FourWeeks,
        trend: TrendMode::DataAndTrend,
        scale: Scale::Default,
    },
    ChartSpec {
        name: "4wk_svperhr",
        data_source: "SvperHr",
        label: SV_LABEL,
        title: "Sv/Hr - Last 4 Weeks",
        lookback: Lookback::FourWeeks,
        trend: TrendMode::DataAndTrend,
        scale: Scale::Default,
    },
    ChartSpec {
        name: "12m_cpm",
        data_source: "CPM",
        label: CPM_LABEL,
        title: "CPM - Past Year",
        lookback: Lookback::TwelveMonths,
        trend: TrendMode::DataAndTrend,
        scale: Scale::Default,
    },
    ChartSpec {
        name: "12m_svperhr",
        data_source: "SvperHr",
        label: SV_LABEL,
        title: "Sv/Hr - Past Year",
        lookback: Lookback::TwelveMonths,
        trend: TrendMode::DataAndTrend,
        scale: Scale::Default,
    },
];

const DATA_COLOR: &str = "#0400ff";
const TREND_COLOR: &str = "#ff0000";

impl ChartSpec {
    /// Arguments for `rrdtool graph` (without the program name)
    pub fn graph_args(&self, rrd_file: &Path, charts_dir: &Path, width: u32, height: u32) -> Vec<String> {
        let output = charts_dir.join(format!("{}.png", self.name));

        let mut args = vec![
            "graph".to_string(),
            output.display().to_string(),
            "-a".to_string(),
            "PNG".to_string(),
            "-s".to_string(),
            self.lookback.start().to_string(),
            "-e".to_string(),
            "now".to_string(),
            "-w".to_string(),
            width.to_string(),
            "-h".to_string(),
            height.to_string(),
        ];

        match self.scale {
            Scale::Fixed { lower, upper } if lower < upper => {
                args.extend([
                    "-l".to_string(),
                    lower.to_string(),
                    "-u".to_string(),
                    upper.to_string(),
                    "-r".to_string(),
                ]);
            }
            Scale::Auto => args.push("-A".to_string()),
            _ => {}
        }
        args.push("-Y".to_string());

        args.extend([
            "-v".to_string(),
            self.label.to_string(),
            "-t".to_string(),
            self.title.to_string(),
            format!("DEF:dSeries={}:{}:LAST", rrd_file.display(), self.data_source),
        ]);

        let trend = format!(
            "CDEF:smoothed=dSeries,{},TREND",
            self.lookback.trend_window()
        );
        match self.trend {
            TrendMode::DataOnly => {
                args.push(format!("LINE1:dSeries{DATA_COLOR}"));
            }
            TrendMode::TrendOnly => {
                args.push(trend);
                args.push(format!("LINE3:smoothed{TREND_COLOR}"));
            }
            TrendMode::DataAndTrend => {
                args.push(format!("LINE1:dSeries{DATA_COLOR}"));
                args.push(trend);
                args.push(format!("LINE3:smoothed{TREND_COLOR}"));
            }
        }

        args
    }
}
