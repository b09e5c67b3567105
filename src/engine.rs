use crate::normalize::CleanedDataset;
use crate::reports::vendor_totals;
use crate::schema::{Currency, Invoice, StatusBucket};
use crate::utils::{days_between, mean, median, parse_terms_days, percentage};
use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CurrencyTotal {
    pub currency: Currency,
    pub count: usize,
    #[schemars(with = "String")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct StatusTotal {
    pub bucket: StatusBucket,
    pub count: usize,
    #[schemars(with = "String")]
    pub amount: Decimal,
}

/// Every KPI for one cleaned dataset at one as-of date.
///
/// Averages, medians and percentages over an empty set are `None` (serialized as `null`),
/// never zero: "no overdue invoices" is not the same as "overdue by 0 days on average".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KpiSnapshot {
    #[schemars(description = "Reference date for overdue and days-past-due figures")]
    pub as_of: NaiveDate,

    pub total_invoices: usize,
    #[schemars(with = "String")]
    pub total_spend: Decimal,

    pub open_invoices: usize,
    #[schemars(with = "String")]
    pub open_amount: Decimal,

    #[schemars(description = "Open invoices whose due date is before the as-of date")]
    pub overdue_invoices: usize,
    #[schemars(with = "String")]
    pub overdue_amount: Decimal,
    #[schemars(description = "Overdue amount as a percentage of open amount")]
    pub overdue_amount_pct: Option<f64>,

    pub avg_days_past_due: Option<f64>,
    pub max_days_past_due: Option<i64>,

    pub vendor_count: usize,
    pub top_vendor_name: Option<String>,
    #[schemars(with = "Option<String>")]
    pub top_vendor_amount: Option<Decimal>,
    #[schemars(description = "Share of total spend held by the top vendors (top-vendor limit)")]
    pub top_vendor_share_pct: Option<f64>,

    pub currency_breakdown: Vec<CurrencyTotal>,
    #[schemars(description = "Open and Paid always present; Other only when such statuses exist")]
    pub status_distribution: Vec<StatusTotal>,

    #[schemars(description = "PaidDate minus InvoiceDate, over invoices with a PaidDate")]
    pub days_to_pay_avg: Option<f64>,
    pub days_to_pay_median: Option<f64>,
    #[schemars(description = "PaidDate minus DueDate, over invoices with a PaidDate")]
    pub delay_vs_due_avg: Option<f64>,
    pub delay_vs_due_pct_late: Option<f64>,

    #[schemars(with = "String")]
    pub cash_out_next_7: Decimal,
    #[schemars(with = "String")]
    pub cash_out_next_30: Decimal,

    pub terms_days_avg: Option<f64>,
    pub terms_days_median: Option<f64>,
}

impl KpiSnapshot {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(KpiSnapshot)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    /// Flat KPI name -> value mapping for dashboards and the one-row summary CSV.
    ///
    /// Amounts become JSON numbers. Breakdown entries are flattened into
    /// `currency_count.<CODE>`, `currency_amount.<CODE>`, `status_count.<Bucket>` and
    /// `status_amount.<Bucket>`.
    pub fn to_flat_map(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        let mut put = |key: &str, value: Value| {
            map.insert(key.to_string(), value);
        };

        put("as_of", Value::from(self.as_of.format("%Y-%m-%d").to_string()));
        put("total_invoices", Value::from(self.total_invoices));
        put("total_spend", decimal_value(self.total_spend));
        put("open_invoices", Value::from(self.open_invoices));
        put("open_amount", decimal_value(self.open_amount));
        put("overdue_invoices", Value::from(self.overdue_invoices));
        put("overdue_amount", decimal_value(self.overdue_amount));
        put("overdue_amount_pct", Value::from(self.overdue_amount_pct));
        put("avg_days_past_due", Value::from(self.avg_days_past_due));
        put("max_days_past_due", Value::from(self.max_days_past_due));
        put("vendor_count", Value::from(self.vendor_count));
        put("top_vendor_name", Value::from(self.top_vendor_name.clone()));
        put(
            "top_vendor_amount",
            self.top_vendor_amount.map(decimal_value).unwrap_or(Value::Null),
        );
        put("top_vendor_share_pct", Value::from(self.top_vendor_share_pct));
        put("days_to_pay_avg", Value::from(self.days_to_pay_avg));
        put("days_to_pay_median", Value::from(self.days_to_pay_median));
        put("delay_vs_due_avg", Value::from(self.delay_vs_due_avg));
        put("delay_vs_due_pct_late", Value::from(self.delay_vs_due_pct_late));
        put("cash_out_next_7", decimal_value(self.cash_out_next_7));
        put("cash_out_next_30", decimal_value(self.cash_out_next_30));
        put("terms_days_avg", Value::from(self.terms_days_avg));
        put("terms_days_median", Value::from(self.terms_days_median));

        for entry in &self.currency_breakdown {
            put(
                &format!("currency_count.{}", entry.currency),
                Value::from(entry.count),
            );
            put(
                &format!("currency_amount.{}", entry.currency),
                decimal_value(entry.amount),
            );
        }

        for entry in &self.status_distribution {
            put(
                &format!("status_count.{}", entry.bucket.label()),
                Value::from(entry.count),
            );
            put(
                &format!("status_amount.{}", entry.bucket.label()),
                decimal_value(entry.amount),
            );
        }

        map
    }
}

fn decimal_value(amount: Decimal) -> Value {
    amount.to_f64().map(Value::from).unwrap_or(Value::Null)
}

/// Computes KPIs against a fixed as-of date. Holds no state between calls.
pub struct KpiEngine {
    as_of: NaiveDate,
    top_vendor_limit: usize,
}

impl KpiEngine {
    pub fn new(as_of: NaiveDate, top_vendor_limit: usize) -> Self {
        Self {
            as_of,
            top_vendor_limit,
        }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Open and due strictly before the as-of date.
    pub fn is_overdue(&self, invoice: &Invoice) -> bool {
        invoice.is_open() && invoice.due_date < self.as_of
    }

    pub fn compute(&self, dataset: &CleanedDataset) -> KpiSnapshot {
        if dataset.is_empty() {
            warn!("Computing KPIs over an empty dataset");
        }

        let invoices = dataset.invoices();
        let total_spend: Decimal = invoices.iter().map(|i| i.amount).sum();

        let open: Vec<&Invoice> = dataset.open_invoices().collect();
        let open_amount: Decimal = open.iter().map(|i| i.amount).sum();

        let overdue: Vec<&Invoice> = open
            .iter()
            .copied()
            .filter(|i| self.is_overdue(i))
            .collect();
        let overdue_amount: Decimal = overdue.iter().map(|i| i.amount).sum();
        let days_past_due: Vec<i64> = overdue
            .iter()
            .map(|i| days_between(i.due_date, self.as_of))
            .collect();
        let dpd_values: Vec<f64> = days_past_due.iter().map(|d| *d as f64).collect();

        let vendor_count = invoices
            .iter()
            .map(|i| i.vendor.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let vendors = vendor_totals(dataset);
        let top_vendor = vendors.first();
        let top_vendor_spend: Decimal = vendors
            .iter()
            .take(self.top_vendor_limit)
            .map(|v| v.amount)
            .sum();

        let (days_to_pay, delay_vs_due) = self.payment_timing(invoices);
        let late = delay_vs_due.iter().filter(|d| **d > 0.0).count();
        let pct_late = if delay_vs_due.is_empty() {
            None
        } else {
            Some(late as f64 / delay_vs_due.len() as f64 * 100.0)
        };

        let terms_days: Vec<f64> = invoices
            .iter()
            .filter_map(|i| i.terms.as_deref().and_then(parse_terms_days))
            .map(f64::from)
            .collect();

        let snapshot = KpiSnapshot {
            as_of: self.as_of,
            total_invoices: invoices.len(),
            total_spend,
            open_invoices: open.len(),
            open_amount,
            overdue_invoices: overdue.len(),
            overdue_amount,
            overdue_amount_pct: percentage(overdue_amount, open_amount),
            avg_days_past_due: mean(&dpd_values),
            max_days_past_due: days_past_due.iter().max().copied(),
            vendor_count,
            top_vendor_name: top_vendor.map(|v| v.vendor.clone()),
            top_vendor_amount: top_vendor.map(|v| v.amount),
            top_vendor_share_pct: percentage(top_vendor_spend, total_spend),
            currency_breakdown: currency_breakdown(invoices),
            status_distribution: status_distribution(invoices),
            days_to_pay_avg: mean(&days_to_pay),
            days_to_pay_median: median(&days_to_pay),
            delay_vs_due_avg: mean(&delay_vs_due),
            delay_vs_due_pct_late: pct_late,
            cash_out_next_7: self.cash_out_within(&open, 7),
            cash_out_next_30: self.cash_out_within(&open, 30),
            terms_days_avg: mean(&terms_days),
            terms_days_median: median(&terms_days),
        };

        debug!(
            "KPIs as of {}: {} invoices, {} open, {} overdue",
            self.as_of, snapshot.total_invoices, snapshot.open_invoices, snapshot.overdue_invoices
        );

        snapshot
    }

    /// (days to pay, days paid after due) for every invoice carrying a PaidDate.
    fn payment_timing(&self, invoices: &[Invoice]) -> (Vec<f64>, Vec<f64>) {
        invoices
            .iter()
            .filter_map(|i| i.paid_date.map(|paid| (i, paid)))
            .map(|(i, paid)| {
                (
                    days_between(i.invoice_date, paid) as f64,
                    days_between(i.due_date, paid) as f64,
                )
            })
            .unzip()
    }

    /// Open amount falling due between the as-of date and `horizon_days` after it, inclusive.
    fn cash_out_within(&self, open: &[&Invoice], horizon_days: i64) -> Decimal {
        open.iter()
            .filter(|i| (0..=horizon_days).contains(&days_between(self.as_of, i.due_date)))
            .map(|i| i.amount)
            .sum()
    }
}

pub fn currency_breakdown(invoices: &[Invoice]) -> Vec<CurrencyTotal> {
    let mut totals: BTreeMap<Currency, (usize, Decimal)> = BTreeMap::new();
    for invoice in invoices {
        let entry = totals.entry(invoice.currency).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += invoice.amount;
    }

    totals
        .into_iter()
        .map(|(currency, (count, amount))| CurrencyTotal {
            currency,
            count,
            amount,
        })
        .collect()
}

pub fn status_distribution(invoices: &[Invoice]) -> Vec<StatusTotal> {
    let mut totals: BTreeMap<StatusBucket, (usize, Decimal)> = BTreeMap::new();
    totals.insert(StatusBucket::Open, (0, Decimal::ZERO));
    totals.insert(StatusBucket::Paid, (0, Decimal::ZERO));

    for invoice in invoices {
        let entry = totals
            .entry(invoice.status.bucket())
            .or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += invoice.amount;
    }

    totals
        .into_iter()
        .map(|(bucket, (count, amount))| StatusTotal {
            bucket,
            count,
            amount,
        })
        .collect()
}

pub fn compute_kpis(
    dataset: &CleanedDataset,
    as_of: NaiveDate,
    top_vendor_limit: usize,
) -> KpiSnapshot {
    KpiEngine::new(as_of, top_vendor_limit).compute(dataset)
}
