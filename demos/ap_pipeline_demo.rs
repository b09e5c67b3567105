use ap_analytics::{run_pipeline, write_artifacts, OutputLayout, PipelineConfig, RawTable};
use chrono::NaiveDate;

const EXPORT: &str = "\
APID,Vendor,InvoiceDate,DueDate,Amount,Currency,Status,PaidDate,Terms
INV-1001,Northwind Traders,2024-02-01,2024-03-02,\"4,200.00\",USD,Open,,Net 30
INV-1002,Northwind Traders,2024-03-05,2024-04-04,1750.25,USD,Paid,2024-04-10,Net 30
INV-1003,Contoso Ltd,2024-04-12,2024-05-12,980,EUR,Open,,Net 30
INV-1004,Contoso Ltd,2024-05-20,2024-07-04,2300,EUR,Open,,Net 45
INV-1005,Fabrikam,2024-05-01,2024-05-31,615.40,GBP,Open,,Net 30
INV-1006,Fabrikam,2024-01-15,2024-02-14,320,GBP,Paid,2024-02-20,Net 30
INV-1007,Litware,2024-05-10,2024-06-09,1500,CAD,Disputed,,Net 30
INV-1001,Northwind Traders,2024-02-01,2024-03-02,4200,USD,Open,,Net 30
,Litware,2024-05-10,2024-06-09,125,CAD,Open,,
INV-1008,Litware,2024-05-10,2024-05-01,90,CAD,Open,,
INV-1009,Tailspin,2024-05-10,2024-06-09,410,XYZ,Open,,
";

fn main() {
    let raw = RawTable::from_csv_reader(EXPORT.as_bytes()).expect("embedded export should parse");

    let config = PipelineConfig {
        top_vendor_limit: 3,
        output: OutputLayout::new(std::env::temp_dir().join("ap_pipeline_demo")),
        ..PipelineConfig::default()
    }
    .with_as_of(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());

    let output = run_pipeline(&raw, &config).expect("pipeline should run");

    let report = &output.cleaning.report;
    println!("📥 Ingestion");
    println!("  rows in:            {}", report.rows_total);
    println!("  rejected:           {}", report.rows_rejected);
    println!("    missing APID:     {}", report.missing_apid);
    println!("    due < invoice:    {}", report.due_before_invoice);
    println!("    bad currency:     {}", report.invalid_currency);
    println!("  duplicates removed: {}", report.duplicates_removed);
    println!("  cleaned:            {}", report.rows_cleaned);

    let kpis = &output.analysis.kpis;
    println!("\n📊 KPIs as of {}", kpis.as_of);
    println!("  total spend:        {}", kpis.total_spend);
    println!(
        "  open:               {} invoices, {}",
        kpis.open_invoices, kpis.open_amount
    );
    println!(
        "  overdue:            {} invoices, {}",
        kpis.overdue_invoices, kpis.overdue_amount
    );
    println!("  avg days past due:  {:?}", kpis.avg_days_past_due);
    println!("  max days past due:  {:?}", kpis.max_days_past_due);
    println!("  cash out next 30d:  {}", kpis.cash_out_next_30);
    for currency in &kpis.currency_breakdown {
        println!(
            "  {}: {} invoices, {}",
            currency.currency, currency.count, currency.amount
        );
    }

    let reports = &output.analysis.reports;
    println!("\n⏳ Aging (open invoices)");
    for row in &reports.aging {
        println!("  {:<8} {:>3}  {}", row.bucket, row.count, row.amount);
    }

    println!("\n🏆 Top vendors");
    for vendor in &reports.top_vendors {
        println!(
            "  {:<20} {:>10}  ({} invoices)",
            vendor.vendor, vendor.amount, vendor.invoice_count
        );
    }

    println!("\n💸 Weekly cash-out");
    for week in &reports.cash_forecast {
        println!("  week of {}  {}", week.week_start, week.amount);
    }

    match write_artifacts(&config.output, &output) {
        Ok(paths) => {
            println!("\n✅ Wrote {} artifacts:", paths.len());
            for path in paths {
                println!("  {}", path.display());
            }
        }
        Err(e) => eprintln!("\n❌ Failed to write artifacts: {}", e),
    }
}
