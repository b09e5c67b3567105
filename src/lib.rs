//! # AP Analytics
//!
//! A library for turning raw accounts-payable invoice exports (spreadsheet dumps, CSV, JSON
//! records) into a validated, deduplicated dataset and a fixed suite of KPIs and reports.
//!
//! ## Core Concepts
//!
//! - **Raw table**: untrusted rows of loosely typed cells ([`RawValue`]) with named columns
//! - **Validation**: row-level rules; failing rows are dropped and counted, never repaired
//! - **Cleaned dataset**: normalized rows with a unique (APID, Vendor, InvoiceDate, Amount) key
//! - **KPIs**: spend, open/overdue exposure, days past due, vendor and currency concentration
//! - **Reports**: aging buckets, top vendors, weekly cash-out forecast
//! - **As-of date**: the reference date for everything "overdue"; injectable for reproducibility
//!
//! ## Example
//!
//! ```rust,ignore
//! use ap_analytics::*;
//! use chrono::NaiveDate;
//!
//! let csv = "APID,Vendor,InvoiceDate,DueDate,Amount,Currency,Status\n\
//!            A1,Acme,2024-04-01,2024-05-01,100,USD,Open\n";
//! let raw = RawTable::from_csv_reader(csv.as_bytes()).unwrap();
//!
//! let config = PipelineConfig::default().with_as_of(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
//! let output = run_pipeline(&raw, &config).unwrap();
//!
//! assert_eq!(output.analysis.kpis.overdue_invoices, 1);
//! assert_eq!(output.analysis.kpis.max_days_past_due, Some(31));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod filter;
pub mod ingestion;
pub mod normalize;
pub mod reports;
pub mod schema;
pub mod table;
pub mod utils;

pub use config::{OutputLayout, PipelineConfig};
pub use engine::{compute_kpis, CurrencyTotal, KpiEngine, KpiSnapshot, StatusTotal};
pub use error::{ApAnalyticsError, Result};
pub use export::*;
pub use filter::InvoiceFilter;
pub use ingestion::{
    validate_row, validate_table, ColumnMap, RejectionReason, ValidatedRow, ValidationOutcome,
    ValidationReport,
};
pub use normalize::{deduplicate, normalize_and_deduplicate, normalize_row, CleanedDataset};
pub use reports::*;
pub use schema::*;
pub use table::{RawTable, RawValue};

use chrono::NaiveDate;
use log::{debug, info, warn};

/// Output of the cleaning stages: the canonical dataset plus the row ledger.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub dataset: CleanedDataset,
    pub report: ValidationReport,
}

/// KPIs and reports computed from one dataset at one as-of date.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub as_of: NaiveDate,
    pub kpis: KpiSnapshot,
    pub reports: ReportSet,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub cleaning: CleaningOutcome,
    pub analysis: Analysis,
}

pub struct ApPipeline {
    config: PipelineConfig,
}

impl ApPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validation, normalization and deduplication. Only a structurally unusable table
    /// (e.g. a missing required column) is an error; bad rows are dropped and counted.
    pub fn clean(raw: &RawTable) -> Result<CleaningOutcome> {
        info!(
            "Cleaning {} raw rows across {} columns",
            raw.len(),
            raw.headers().len()
        );

        let validation = validate_table(raw)?;
        let mut report = validation.report;

        let (dataset, duplicates_removed) = normalize_and_deduplicate(validation.rows);
        report.duplicates_removed = duplicates_removed;
        report.rows_cleaned = dataset.len();

        debug!(
            "Rejections: missing_apid={} missing_vendor={} invalid_invoice_date={} invalid_due_date={} \
             invalid_amount={} invalid_currency={} due_before_invoice={}",
            report.missing_apid,
            report.missing_vendor,
            report.invalid_invoice_date,
            report.invalid_due_date,
            report.invalid_amount,
            report.invalid_currency,
            report.due_before_invoice
        );

        if dataset.is_empty() {
            warn!("No invoices survived cleaning ({} raw rows)", report.rows_total);
        }

        info!(
            "Cleaning complete: {} total, {} rejected, {} duplicates, {} cleaned",
            report.rows_total, report.rows_rejected, report.duplicates_removed, report.rows_cleaned
        );

        Ok(CleaningOutcome { dataset, report })
    }

    pub fn analyze(&self, dataset: &CleanedDataset) -> Analysis {
        let as_of = self.config.resolve_as_of();
        let limit = self.config.top_vendor_limit;

        Analysis {
            as_of,
            kpis: KpiEngine::new(as_of, limit).compute(dataset),
            reports: ReportSet::build(dataset, as_of, limit),
        }
    }

    pub fn analyze_filtered(&self, dataset: &CleanedDataset, filter: &InvoiceFilter) -> Analysis {
        let subset = filter.apply(dataset);
        debug!(
            "Filter kept {} of {} invoices",
            subset.len(),
            dataset.len()
        );
        self.analyze(&subset)
    }

    pub fn run(&self, raw: &RawTable) -> Result<PipelineOutput> {
        let cleaning = Self::clean(raw)?;
        let analysis = self.analyze(&cleaning.dataset);
        Ok(PipelineOutput { cleaning, analysis })
    }

    /// Runs the pipeline and writes every artifact under the configured output layout.
    pub fn run_and_persist(&self, raw: &RawTable) -> Result<PipelineOutput> {
        let output = self.run(raw)?;
        write_artifacts(&self.config.output, &output)?;
        Ok(output)
    }
}

pub fn clean_invoices(raw: &RawTable) -> Result<CleaningOutcome> {
    ApPipeline::clean(raw)
}

pub fn run_pipeline(raw: &RawTable, config: &PipelineConfig) -> Result<PipelineOutput> {
    ApPipeline::new(config.clone())?.run(raw)
}
