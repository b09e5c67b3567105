use ap_analytics::*;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;

const HEADER: &str = "APID,Vendor,InvoiceDate,DueDate,Amount,Currency,Status,PaidDate,Terms\n";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dec(text: &str) -> Decimal {
    Decimal::from_str(text).unwrap()
}

fn table(body: &str) -> RawTable {
    let csv = format!("{}{}", HEADER, body);
    RawTable::from_csv_reader(csv.as_bytes()).unwrap()
}

fn config() -> PipelineConfig {
    PipelineConfig::default().with_as_of(date(2024, 6, 1))
}

/// A messy export: one duplicate, one missing APID, one due-before-invoice, one bad currency,
/// one non-positive amount, plus open, paid and odd-status rows across four vendors.
fn messy_export() -> &'static str {
    "AP-001,Acme Supplies,2024-03-01,2024-03-31,1200.00,USD,Open,,Net 30\n\
     AP-002,Acme Supplies,2024-04-01,2024-05-01,800,usd,Paid,2024-05-05,Net 30\n\
     AP-003,Globex,2024-04-15,2024-05-15,\"2,500.50\",EUR,Open,,Net 30\n\
     AP-004,Globex,2024-05-01,2024-06-10,300,EUR,Open,,Net 40\n\
     AP-005,Initech,2024-05-20,2024-06-19,450,GBP,Pending,,\n\
     AP-006,Umbrella,2024-01-10,2024-02-09,90,CAD,Paid,2024-02-01,Net 30\n\
     AP-001,Acme Supplies,2024-03-01,2024-03-31,1200,USD,Paid,2024-04-10,Net 30\n\
     ,Acme Supplies,2024-03-01,2024-03-31,50,USD,Open,,\n\
     AP-007,Globex,2024-04-10,2024-04-01,75,EUR,Open,,\n\
     AP-008,Initech,2024-04-10,2024-05-10,75,XYZ,Open,,\n\
     AP-009,Initech,2024-04-10,2024-05-10,-20,USD,Open,,\n"
}

#[test]
fn test_messy_export_end_to_end() -> anyhow::Result<()> {
    let output = run_pipeline(&table(messy_export()), &config())?;

    let report = &output.cleaning.report;
    assert_eq!(report.rows_total, 11);
    assert_eq!(report.rows_rejected, 4);
    assert_eq!(report.missing_apid, 1);
    assert_eq!(report.due_before_invoice, 1);
    assert_eq!(report.invalid_currency, 1);
    assert_eq!(report.invalid_amount, 1);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(report.rows_cleaned, 6);

    let kpis = &output.analysis.kpis;
    assert_eq!(kpis.total_invoices, 6);
    assert_eq!(kpis.total_spend, dec("5340.50"));
    assert_eq!(kpis.open_invoices, 3);
    assert_eq!(kpis.open_amount, dec("4000.50"));
    assert_eq!(kpis.vendor_count, 4);
    assert_eq!(kpis.top_vendor_name.as_deref(), Some("Globex"));
    assert_eq!(kpis.top_vendor_amount, Some(dec("2800.50")));

    // AP-001 is 62 days past due, AP-003 is 17
    assert_eq!(kpis.overdue_invoices, 2);
    assert_eq!(kpis.overdue_amount, dec("3700.50"));
    assert_eq!(kpis.max_days_past_due, Some(62));
    assert_eq!(kpis.avg_days_past_due, Some(39.5));

    let buckets: Vec<&str> = kpis
        .status_distribution
        .iter()
        .map(|s| s.bucket.label())
        .collect();
    assert_eq!(buckets, vec!["Open", "Paid", "Other"]);

    Ok(())
}

#[test]
fn test_cleaned_invariants_hold() -> anyhow::Result<()> {
    let output = run_pipeline(&table(messy_export()), &config())?;

    let mut keys = HashSet::new();
    for invoice in &output.cleaning.dataset {
        assert!(!invoice.apid.is_empty());
        assert!(!invoice.vendor.is_empty());
        assert!(invoice.amount > Decimal::ZERO);
        assert!(invoice.due_date >= invoice.invoice_date);
        assert!(Currency::ALL.contains(&invoice.currency));
        assert!(keys.insert(invoice.composite_key()));
    }

    Ok(())
}

#[test]
fn test_first_duplicate_survives() -> anyhow::Result<()> {
    let outcome = clean_invoices(&table(messy_export()))?;

    let ap001: Vec<&Invoice> = outcome
        .dataset
        .iter()
        .filter(|i| i.apid == "AP-001")
        .collect();
    assert_eq!(ap001.len(), 1);
    assert_eq!(ap001[0].status, InvoiceStatus::Open);
    assert_eq!(ap001[0].paid_date, None);

    Ok(())
}

#[test]
fn test_report_totals_conserve_amounts() -> anyhow::Result<()> {
    let output = run_pipeline(&table(messy_export()), &config())?;
    let kpis = &output.analysis.kpis;
    let reports = &output.analysis.reports;

    let currency_sum: Decimal = kpis.currency_breakdown.iter().map(|c| c.amount).sum();
    let status_sum: Decimal = kpis.status_distribution.iter().map(|s| s.amount).sum();
    assert_eq!(currency_sum, kpis.total_spend);
    assert_eq!(status_sum, kpis.total_spend);

    let aging_sum: Decimal = reports.aging.iter().map(|r| r.amount).sum();
    let aging_count: usize = reports.aging.iter().map(|r| r.count).sum();
    assert_eq!(aging_sum, kpis.open_amount);
    assert_eq!(aging_count, kpis.open_invoices);

    let cash_sum: Decimal = reports.cash_forecast.iter().map(|r| r.amount).sum();
    assert_eq!(cash_sum, kpis.open_amount);

    let vendor_sum: Decimal = reports.top_vendors.iter().map(|v| v.amount).sum();
    assert_eq!(vendor_sum, kpis.total_spend);

    Ok(())
}

#[test]
fn test_aging_has_every_bucket() -> anyhow::Result<()> {
    let output = run_pipeline(&table(messy_export()), &config())?;

    let labels: Vec<String> = output
        .analysis
        .reports
        .aging
        .iter()
        .map(|r| r.bucket.to_string())
        .collect();
    assert_eq!(labels, vec!["Current", "1-30", "31-60", "61-90", "90+"]);

    let counts: Vec<usize> = output.analysis.reports.aging.iter().map(|r| r.count).collect();
    // AP-004 not yet due, AP-003 at 17 days, AP-001 at 62 days; AP-005 is not open
    assert_eq!(counts, vec![1, 1, 0, 1, 0]);

    Ok(())
}

#[test]
fn test_cash_forecast_has_no_gaps() -> anyhow::Result<()> {
    let output = run_pipeline(&table(messy_export()), &config())?;
    let weeks = &output.analysis.reports.cash_forecast;

    assert!(!weeks.is_empty());
    for row in weeks {
        assert_eq!(row.week_start.weekday(), Weekday::Mon);
    }
    for pair in weeks.windows(2) {
        assert_eq!(pair[1].week_start - pair[0].week_start, Duration::days(7));
    }

    // earliest open due date is 2024-03-31 (a Sunday), latest is 2024-06-10 (a Monday)
    assert_eq!(weeks.first().unwrap().week_start, date(2024, 3, 25));
    assert_eq!(weeks.last().unwrap().week_start, date(2024, 6, 10));
    assert!(weeks.iter().any(|w| w.amount == Decimal::ZERO));

    Ok(())
}

#[test]
fn test_missing_apid_row_is_dropped() -> anyhow::Result<()> {
    let outcome = clean_invoices(&table(
        ",Acme,2024-01-01,2024-01-31,100,USD,Open,,\n\
         A2,Acme,2024-01-01,2024-01-31,100,USD,Open,,\n",
    ))?;

    assert_eq!(outcome.report.missing_apid, 1);
    assert_eq!(outcome.report.rows_rejected, 1);
    assert_eq!(outcome.dataset.len(), 1);
    assert_eq!(outcome.dataset.invoices()[0].apid, "A2");

    Ok(())
}

#[test]
fn test_due_before_invoice_is_dropped() -> anyhow::Result<()> {
    let outcome = clean_invoices(&table("A1,Acme,2024-03-10,2024-03-01,100,USD,Open,,\n"))?;

    assert_eq!(outcome.report.due_before_invoice, 1);
    assert!(outcome.dataset.is_empty());

    Ok(())
}

#[test]
fn test_unknown_currency_is_dropped() -> anyhow::Result<()> {
    let outcome = clean_invoices(&table("A1,Acme,2024-03-01,2024-03-31,100,XYZ,Open,,\n"))?;

    assert_eq!(outcome.report.invalid_currency, 1);
    assert!(outcome.dataset.is_empty());

    Ok(())
}

#[test]
fn test_top_vendors_ordering_and_limit() -> anyhow::Result<()> {
    let raw = table(
        "1,Small,2024-01-01,2024-01-31,300,USD,Paid,,\n\
         2,Big,2024-01-01,2024-01-31,900,USD,Paid,,\n\
         3,Mid,2024-01-01,2024-01-31,500,USD,Paid,,\n",
    );
    let config = PipelineConfig {
        top_vendor_limit: 2,
        ..config()
    };

    let output = run_pipeline(&raw, &config)?;
    let vendors: Vec<(&str, Decimal)> = output
        .analysis
        .reports
        .top_vendors
        .iter()
        .map(|v| (v.vendor.as_str(), v.amount))
        .collect();
    assert_eq!(
        vendors,
        vec![("Big", Decimal::from(900)), ("Mid", Decimal::from(500))]
    );

    Ok(())
}

#[test]
fn test_overdue_invoice_days_past_due() -> anyhow::Result<()> {
    let output = run_pipeline(
        &table("A1,Acme,2024-04-01,2024-05-01,100,USD,Open,,\n"),
        &config(),
    )?;

    let kpis = &output.analysis.kpis;
    assert_eq!(kpis.overdue_invoices, 1);
    assert_eq!(kpis.overdue_amount, Decimal::from(100));
    assert_eq!(kpis.max_days_past_due, Some(31));
    assert_eq!(kpis.avg_days_past_due, Some(31.0));

    let days_1_to_30 = &output.analysis.reports.aging[1];
    let days_31_to_60 = &output.analysis.reports.aging[2];
    assert_eq!(days_1_to_30.count, 0);
    assert_eq!(days_31_to_60.count, 1);

    Ok(())
}

#[test]
fn test_missing_required_column_is_fatal() {
    let csv = "APID,Vendor,InvoiceDate,DueDate,Amount,Status\n\
               A1,Acme,2024-01-01,2024-01-31,100,Open\n";
    let raw = RawTable::from_csv_reader(csv.as_bytes()).unwrap();

    let result = clean_invoices(&raw);
    assert!(matches!(result, Err(ApAnalyticsError::MissingColumn(ref c)) if c == "Currency"));
}

#[test]
fn test_malformed_csv_is_fatal() {
    let csv = format!("{}A1,Acme,2024-01-01\n", HEADER);
    assert!(RawTable::from_csv_reader(csv.as_bytes()).is_err());
}

#[test]
fn test_empty_input_yields_empty_reports() -> anyhow::Result<()> {
    let output = run_pipeline(&table(""), &config())?;

    assert!(output.cleaning.dataset.is_empty());
    let kpis = &output.analysis.kpis;
    assert_eq!(kpis.total_invoices, 0);
    assert_eq!(kpis.total_spend, Decimal::ZERO);
    assert_eq!(kpis.avg_days_past_due, None);
    assert_eq!(kpis.max_days_past_due, None);
    assert_eq!(kpis.top_vendor_name, None);

    let reports = &output.analysis.reports;
    assert_eq!(reports.aging.len(), 5);
    assert!(reports.aging.iter().all(|r| r.count == 0));
    assert!(reports.top_vendors.is_empty());
    assert!(reports.cash_forecast.is_empty());

    Ok(())
}

#[test]
fn test_json_records_match_csv() -> anyhow::Result<()> {
    let json = r#"[
        {"APID": 1001.0, "Vendor": "Acme", "InvoiceDate": "2024-04-01", "DueDate": "2024-05-01",
         "Amount": 100, "Currency": "USD", "Status": "Open"},
        {"APID": "1001", "Vendor": "Acme", "InvoiceDate": "2024-04-01", "DueDate": "2024-05-01",
         "Amount": "100.00", "Currency": "usd", "Status": "Open"}
    ]"#;

    let outcome = clean_invoices(&RawTable::from_json_records(json)?)?;
    assert_eq!(outcome.dataset.len(), 1);
    assert_eq!(outcome.report.duplicates_removed, 1);
    assert_eq!(outcome.dataset.invoices()[0].apid, "1001");

    Ok(())
}

#[test]
fn test_out_of_range_amounts_are_rejected_not_fatal() -> anyhow::Result<()> {
    let output = run_pipeline(
        &table(
            "A1,Acme,2024-04-01,2024-05-01,1000000000000000000000000000,USD,Open,,\n\
             A2,Acme,2024-04-01,2024-05-01,50000000000000000000000000000,USD,Paid,,\n\
             A3,Globex,2024-04-01,2024-05-01,50000000000000000000000000000,USD,Paid,,\n",
        ),
        &config(),
    )?;

    assert_eq!(output.cleaning.report.invalid_amount, 3);
    assert!(output.cleaning.dataset.is_empty());
    assert_eq!(output.analysis.kpis.total_spend, Decimal::ZERO);

    Ok(())
}

#[test]
fn test_largest_amounts_aggregate_without_overflow() -> anyhow::Result<()> {
    let body: String = (0..50)
        .map(|i| format!("A{},Vendor{},2024-04-01,2024-05-01,1000000000000000,USD,Open,,\n", i, i % 3))
        .collect();
    let output = run_pipeline(&table(&body), &config())?;

    let kpis = &output.analysis.kpis;
    assert_eq!(kpis.total_invoices, 50);
    assert_eq!(kpis.total_spend, MAX_INVOICE_AMOUNT * Decimal::from(50));
    assert_eq!(kpis.overdue_amount, kpis.total_spend);
    assert!((kpis.overdue_amount_pct.unwrap() - 100.0).abs() < 1e-9);
    assert!((kpis.top_vendor_share_pct.unwrap() - 100.0).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_empty_json_export_yields_empty_reports() -> anyhow::Result<()> {
    let output = run_pipeline(&RawTable::from_json_records("[]")?, &config())?;

    assert_eq!(output.cleaning.report.rows_total, 0);
    assert!(output.cleaning.dataset.is_empty());
    assert_eq!(output.analysis.reports.aging.len(), 5);
    assert!(output
        .analysis
        .reports
        .aging
        .iter()
        .all(|r| r.count == 0 && r.amount == Decimal::ZERO));

    Ok(())
}

#[test]
fn test_filtered_analysis() -> anyhow::Result<()> {
    let pipeline = ApPipeline::new(config())?;
    let cleaning = ApPipeline::clean(&table(messy_export()))?;

    let filter = InvoiceFilter::between(date(2024, 4, 1), date(2024, 4, 30)).with_vendor("Globex");
    let analysis = pipeline.analyze_filtered(&cleaning.dataset, &filter);

    assert_eq!(analysis.kpis.total_invoices, 1);
    assert_eq!(analysis.kpis.total_spend, dec("2500.50"));
    assert_eq!(analysis.reports.top_vendors.len(), 1);

    Ok(())
}

#[test]
fn test_artifacts_are_written_and_reproducible() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = PipelineConfig {
        output: OutputLayout::new(dir.path().join("processed")),
        ..config()
    };
    let pipeline = ApPipeline::new(config.clone())?;
    let raw = table(messy_export());

    pipeline.run_and_persist(&raw)?;
    let first = std::fs::read_to_string(config.output.cleaned_path())?;

    let output = pipeline.run_and_persist(&raw)?;
    let second = std::fs::read_to_string(config.output.cleaned_path())?;
    assert_eq!(first, second);
    assert!(first.starts_with(HEADER.trim_end()));
    assert_eq!(first.lines().count(), output.cleaning.dataset.len() + 1);

    for path in [
        config.output.kpi_summary_csv_path(),
        config.output.kpi_summary_json_path(),
        config.output.currency_breakdown_path(),
        config.output.aging_path(),
        config.output.top_vendors_path(),
        config.output.cash_forecast_path(),
    ] {
        assert!(path.exists(), "missing {}", path.display());
    }

    let aging = std::fs::read_to_string(config.output.aging_path())?;
    assert!(aging.starts_with("AgingBucket,Count,Amount\nCurrent,1,"));

    let kpis: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(config.output.kpi_summary_json_path())?)?;
    assert_eq!(kpis["total_invoices"], 6);
    assert_eq!(kpis["as_of"], "2024-06-01");

    Ok(())
}

#[test]
fn test_schema_generation() {
    let schema = KpiSnapshot::schema_as_json().unwrap();
    assert!(schema.contains("overdue_invoices"));
    assert!(schema.contains("currency_breakdown"));
}
