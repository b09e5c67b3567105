use crate::error::{ApAnalyticsError, Result};
use chrono::{Local, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CLEANED_FILE: &str = "ap_clean.csv";
pub const KPI_SUMMARY_CSV_FILE: &str = "kpis_summary.csv";
pub const KPI_SUMMARY_JSON_FILE: &str = "kpis_summary.json";
pub const CURRENCY_BREAKDOWN_FILE: &str = "kpi_currency_breakdown.csv";
pub const AGING_FILE: &str = "aging_open.csv";
pub const TOP_VENDORS_FILE: &str = "top_vendors.csv";
pub const CASH_FORECAST_FILE: &str = "cash_weekly.csv";

fn default_top_vendor_limit() -> usize {
    10
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

/// Where the run's artifacts are written. File names are fixed; only the directory moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutputLayout {
    #[serde(default = "default_processed_dir")]
    #[schemars(description = "Directory receiving the cleaned dataset, KPI and report files")]
    pub processed_dir: PathBuf,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            processed_dir: default_processed_dir(),
        }
    }
}

impl OutputLayout {
    pub fn new(processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            processed_dir: processed_dir.into(),
        }
    }

    pub fn cleaned_path(&self) -> PathBuf {
        self.processed_dir.join(CLEANED_FILE)
    }

    pub fn kpi_summary_csv_path(&self) -> PathBuf {
        self.processed_dir.join(KPI_SUMMARY_CSV_FILE)
    }

    pub fn kpi_summary_json_path(&self) -> PathBuf {
        self.processed_dir.join(KPI_SUMMARY_JSON_FILE)
    }

    pub fn currency_breakdown_path(&self) -> PathBuf {
        self.processed_dir.join(CURRENCY_BREAKDOWN_FILE)
    }

    pub fn aging_path(&self) -> PathBuf {
        self.processed_dir.join(AGING_FILE)
    }

    pub fn top_vendors_path(&self) -> PathBuf {
        self.processed_dir.join(TOP_VENDORS_FILE)
    }

    pub fn cash_forecast_path(&self) -> PathBuf {
        self.processed_dir.join(CASH_FORECAST_FILE)
    }
}

/// Everything a run needs from its caller. Nothing is read from ambient process state
/// except the current date, and only when `as_of` is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PipelineConfig {
    #[serde(default)]
    #[schemars(
        description = "Reference date (YYYY-MM-DD) for overdue, days-past-due and aging. Defaults to today."
    )]
    pub as_of: Option<NaiveDate>,

    #[serde(default = "default_top_vendor_limit")]
    #[schemars(description = "Number of vendors in the top-vendors report (default 10)")]
    pub top_vendor_limit: usize,

    #[serde(default)]
    pub output: OutputLayout,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            as_of: None,
            top_vendor_limit: default_top_vendor_limit(),
            output: OutputLayout::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_vendor_limit == 0 {
            return Err(ApAnalyticsError::InvalidConfig(
                "top_vendor_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolve_as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(PipelineConfig);
        serde_json::to_string_pretty(&schema)
    }
}
