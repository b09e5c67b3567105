use crate::normalize::CleanedDataset;
use crate::schema::Invoice;
use crate::utils::{days_between, week_start};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Days-past-due bands for open invoices.
///
/// | Bucket  | Days past due        |
/// |---------|----------------------|
/// | Current | 0 (not yet due)      |
/// | 1-30    | 1 ..= 30             |
/// | 31-60   | 31 ..= 60            |
/// | 61-90   | 61 ..= 90            |
/// | 90+     | 91 and over          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgingBucket {
    Current,
    Days1To30,
    Days31To60,
    Days61To90,
    Over90,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 5] = [
        AgingBucket::Current,
        AgingBucket::Days1To30,
        AgingBucket::Days31To60,
        AgingBucket::Days61To90,
        AgingBucket::Over90,
    ];

    /// Negative values (due in the future) are Current.
    pub fn for_days_past_due(days: i64) -> Self {
        match days {
            i64::MIN..=0 => AgingBucket::Current,
            1..=30 => AgingBucket::Days1To30,
            31..=60 => AgingBucket::Days31To60,
            61..=90 => AgingBucket::Days61To90,
            _ => AgingBucket::Over90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgingBucket::Current => "Current",
            AgingBucket::Days1To30 => "1-30",
            AgingBucket::Days31To60 => "31-60",
            AgingBucket::Days61To90 => "61-90",
            AgingBucket::Over90 => "90+",
        }
    }
}

impl fmt::Display for AgingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for AgingBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgingRow {
    #[serde(rename = "AgingBucket")]
    pub bucket: AgingBucket,
    pub count: usize,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VendorSpend {
    pub vendor: String,
    pub amount: Decimal,
    #[serde(rename = "CountInvoices")]
    pub invoice_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CashForecastRow {
    /// Monday starting the week.
    #[serde(rename = "DueWeek")]
    pub week_start: NaiveDate,
    pub amount: Decimal,
}

/// All three reports for one dataset and as-of date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSet {
    pub aging: Vec<AgingRow>,
    pub top_vendors: Vec<VendorSpend>,
    pub cash_forecast: Vec<CashForecastRow>,
}

impl ReportSet {
    pub fn build(dataset: &CleanedDataset, as_of: NaiveDate, top_vendor_limit: usize) -> Self {
        Self {
            aging: aging_report(dataset, as_of),
            top_vendors: top_vendors(dataset, top_vendor_limit),
            cash_forecast: weekly_cash_forecast(dataset),
        }
    }
}

/// Days past due as of `as_of`, floored at zero.
pub fn days_past_due(invoice: &Invoice, as_of: NaiveDate) -> i64 {
    days_between(invoice.due_date, as_of).max(0)
}

/// Open invoices grouped by aging bucket. Every bucket appears, in order, even when empty.
pub fn aging_report(dataset: &CleanedDataset, as_of: NaiveDate) -> Vec<AgingRow> {
    let mut totals: BTreeMap<AgingBucket, (usize, Decimal)> = AgingBucket::ALL
        .into_iter()
        .map(|bucket| (bucket, (0, Decimal::ZERO)))
        .collect();

    for invoice in dataset.open_invoices() {
        let bucket = AgingBucket::for_days_past_due(days_past_due(invoice, as_of));
        let entry = totals.entry(bucket).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += invoice.amount;
    }

    totals
        .into_iter()
        .map(|(bucket, (count, amount))| AgingRow {
            bucket,
            count,
            amount,
        })
        .collect()
}

/// Spend per vendor over every invoice, largest first, ties by vendor name ascending.
pub fn vendor_totals(dataset: &CleanedDataset) -> Vec<VendorSpend> {
    let mut totals: BTreeMap<&str, (Decimal, usize)> = BTreeMap::new();
    for invoice in dataset {
        let entry = totals.entry(invoice.vendor.as_str()).or_insert((Decimal::ZERO, 0));
        entry.0 += invoice.amount;
        entry.1 += 1;
    }

    let mut vendors: Vec<VendorSpend> = totals
        .into_iter()
        .map(|(vendor, (amount, invoice_count))| VendorSpend {
            vendor: vendor.to_string(),
            amount,
            invoice_count,
        })
        .collect();

    vendors.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.vendor.cmp(&b.vendor)));
    vendors
}

pub fn top_vendors(dataset: &CleanedDataset, limit: usize) -> Vec<VendorSpend> {
    let mut vendors = vendor_totals(dataset);
    vendors.truncate(limit);
    vendors
}

/// Amount of open invoices falling due in each Monday-start week, from the week of the
/// earliest due date to the week of the latest. Weeks with nothing due appear with zero.
pub fn weekly_cash_forecast(dataset: &CleanedDataset) -> Vec<CashForecastRow> {
    let mut by_week: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for invoice in dataset.open_invoices() {
        *by_week
            .entry(week_start(invoice.due_date))
            .or_insert(Decimal::ZERO) += invoice.amount;
    }

    let (first, last) = match (by_week.keys().next(), by_week.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Vec::new(),
    };

    let mut rows = Vec::new();
    let mut week = first;
    while week <= last {
        rows.push(CashForecastRow {
            week_start: week,
            amount: by_week.get(&week).copied().unwrap_or(Decimal::ZERO),
        });
        week += Duration::days(7);
    }

    rows
}
