use crate::config::OutputLayout;
use crate::engine::KpiSnapshot;
use crate::error::Result;
use crate::normalize::CleanedDataset;
use crate::reports::{AgingRow, CashForecastRow, VendorSpend};
use crate::schema::columns;
use crate::PipelineOutput;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const CLEANED_HEADERS: [&str; 9] = [
    columns::APID,
    columns::VENDOR,
    columns::INVOICE_DATE,
    columns::DUE_DATE,
    columns::AMOUNT,
    columns::CURRENCY,
    columns::STATUS,
    columns::PAID_DATE,
    columns::TERMS,
];
pub const AGING_HEADERS: [&str; 3] = ["AgingBucket", "Count", "Amount"];
pub const TOP_VENDOR_HEADERS: [&str; 3] = ["Vendor", "Amount", "CountInvoices"];
pub const CASH_FORECAST_HEADERS: [&str; 2] = ["DueWeek", "Amount"];
pub const CURRENCY_BREAKDOWN_HEADERS: [&str; 3] = ["Currency", "Count", "Amount"];

/// Header first, then one record per row. An empty table still gets its header.
fn write_table<W: Write, T: Serialize>(writer: W, headers: &[&str], rows: &[T]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(headers)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_cleaned_csv<W: Write>(dataset: &CleanedDataset, writer: W) -> Result<()> {
    write_table(writer, &CLEANED_HEADERS, dataset.invoices())
}

pub fn write_aging_csv<W: Write>(rows: &[AgingRow], writer: W) -> Result<()> {
    write_table(writer, &AGING_HEADERS, rows)
}

pub fn write_top_vendors_csv<W: Write>(rows: &[VendorSpend], writer: W) -> Result<()> {
    write_table(writer, &TOP_VENDOR_HEADERS, rows)
}

pub fn write_cash_forecast_csv<W: Write>(rows: &[CashForecastRow], writer: W) -> Result<()> {
    write_table(writer, &CASH_FORECAST_HEADERS, rows)
}

pub fn write_currency_breakdown_csv<W: Write>(kpis: &KpiSnapshot, writer: W) -> Result<()> {
    write_table(writer, &CURRENCY_BREAKDOWN_HEADERS, &kpis.currency_breakdown)
}

/// One header row of KPI names and one row of values; `null` becomes an empty cell.
pub fn write_kpi_summary_csv<W: Write>(kpis: &KpiSnapshot, writer: W) -> Result<()> {
    let flat = kpis.to_flat_map();
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(flat.keys())?;
    csv_writer.write_record(flat.values().map(|value| match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }))?;
    csv_writer.flush()?;
    Ok(())
}

pub fn write_kpi_summary_json<W: Write>(kpis: &KpiSnapshot, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, kpis)?;
    writeln!(writer)?;
    Ok(())
}

/// Writes to a sibling temp file, then renames over `path`, so readers never observe a
/// partially written artifact.
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp_path = temp_path_for(path);

    let result = write_file(&tmp_path, write)
        .and_then(|()| fs::rename(&tmp_path, path).map_err(Into::into));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// `kpis_summary.csv` -> `kpis_summary.csv.tmp`, so artifacts sharing a stem never share a
/// temp file.
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.tmp", file_name))
}

fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Persists every artifact of a run under `layout` and returns the written paths.
pub fn write_artifacts(layout: &OutputLayout, output: &PipelineOutput) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&layout.processed_dir)?;

    let kpis = &output.analysis.kpis;
    let reports = &output.analysis.reports;
    let mut written = Vec::new();

    let path = layout.cleaned_path();
    write_atomically(&path, |w| write_cleaned_csv(&output.cleaning.dataset, w))?;
    written.push(path);

    let path = layout.kpi_summary_csv_path();
    write_atomically(&path, |w| write_kpi_summary_csv(kpis, w))?;
    written.push(path);

    let path = layout.kpi_summary_json_path();
    write_atomically(&path, |w| write_kpi_summary_json(kpis, w))?;
    written.push(path);

    let path = layout.currency_breakdown_path();
    write_atomically(&path, |w| write_currency_breakdown_csv(kpis, w))?;
    written.push(path);

    let path = layout.aging_path();
    write_atomically(&path, |w| write_aging_csv(&reports.aging, w))?;
    written.push(path);

    let path = layout.top_vendors_path();
    write_atomically(&path, |w| write_top_vendors_csv(&reports.top_vendors, w))?;
    written.push(path);

    let path = layout.cash_forecast_path();
    write_atomically(&path, |w| write_cash_forecast_csv(&reports.cash_forecast, w))?;
    written.push(path);

    info!(
        "Wrote {} artifacts to {}",
        written.len(),
        layout.processed_dir.display()
    );

    Ok(written)
}
