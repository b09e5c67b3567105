use crate::error::{ApAnalyticsError, Result};
use crate::schema::{columns, Currency, InvoiceStatus, MAX_INVOICE_AMOUNT};
use crate::table::{RawTable, RawValue};
use crate::utils::{cell_text, parse_amount_cell, parse_date_cell};
use chrono::NaiveDateTime;
use log::{debug, info};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

static NULL_CELL: RawValue = RawValue::Null;

/// Why a raw row was dropped. Rejections are outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    MissingApid,
    MissingVendor,
    InvalidInvoiceDate,
    InvalidDueDate,
    /// Zero, negative, above `MAX_INVOICE_AMOUNT` or not a number.
    InvalidAmount,
    InvalidCurrency,
    DueBeforeInvoice,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectionReason::MissingApid => "APID is missing",
            RejectionReason::MissingVendor => "Vendor is missing",
            RejectionReason::InvalidInvoiceDate => "InvoiceDate is not a valid date",
            RejectionReason::InvalidDueDate => "DueDate is not a valid date",
            RejectionReason::InvalidAmount => "Amount is zero, negative, out of range or not a number",
            RejectionReason::InvalidCurrency => "Currency is not an accepted code",
            RejectionReason::DueBeforeInvoice => "DueDate precedes InvoiceDate",
        };
        f.write_str(text)
    }
}

/// Row counts for one cleaning run.
///
/// Rule counters are independent: a row breaking two rules increments both, so they can sum
/// to more than `rows_rejected`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    pub rows_total: usize,
    pub rows_rejected: usize,
    pub missing_apid: usize,
    pub missing_vendor: usize,
    pub invalid_invoice_date: usize,
    pub invalid_due_date: usize,
    pub invalid_amount: usize,
    pub invalid_currency: usize,
    pub due_before_invoice: usize,
    /// Rows that passed validation but lost to an earlier row with the same composite key.
    pub duplicates_removed: usize,
    pub rows_cleaned: usize,
}

impl ValidationReport {
    fn record(&mut self, reasons: &[RejectionReason]) {
        self.rows_rejected += 1;
        for reason in reasons {
            let counter = match reason {
                RejectionReason::MissingApid => &mut self.missing_apid,
                RejectionReason::MissingVendor => &mut self.missing_vendor,
                RejectionReason::InvalidInvoiceDate => &mut self.invalid_invoice_date,
                RejectionReason::InvalidDueDate => &mut self.invalid_due_date,
                RejectionReason::InvalidAmount => &mut self.invalid_amount,
                RejectionReason::InvalidCurrency => &mut self.invalid_currency,
                RejectionReason::DueBeforeInvoice => &mut self.due_before_invoice,
            };
            *counter += 1;
        }
    }

    pub fn count_for(&self, reason: RejectionReason) -> usize {
        match reason {
            RejectionReason::MissingApid => self.missing_apid,
            RejectionReason::MissingVendor => self.missing_vendor,
            RejectionReason::InvalidInvoiceDate => self.invalid_invoice_date,
            RejectionReason::InvalidDueDate => self.invalid_due_date,
            RejectionReason::InvalidAmount => self.invalid_amount,
            RejectionReason::InvalidCurrency => self.invalid_currency,
            RejectionReason::DueBeforeInvoice => self.due_before_invoice,
        }
    }
}

/// A row that passed every rule, with typed values but not yet normalized
/// (dates still carry their time of day).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    /// Position in the raw table; dedup keeps the lowest.
    pub row_index: usize,
    pub apid: String,
    pub vendor: String,
    pub invoice_date: NaiveDateTime,
    pub due_date: NaiveDateTime,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: InvoiceStatus,
    pub paid_date: Option<NaiveDateTime>,
    pub terms: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub rows: Vec<ValidatedRow>,
    pub report: ValidationReport,
}

/// Positions of the known columns in a raw table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    apid: usize,
    vendor: usize,
    invoice_date: usize,
    due_date: usize,
    amount: usize,
    currency: usize,
    status: usize,
    paid_date: Option<usize>,
    terms: Option<usize>,
}

impl ColumnMap {
    /// A missing required column means the input is not an invoice table at all.
    pub fn resolve(table: &RawTable) -> Result<Self> {
        let required = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| ApAnalyticsError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            apid: required(columns::APID)?,
            vendor: required(columns::VENDOR)?,
            invoice_date: required(columns::INVOICE_DATE)?,
            due_date: required(columns::DUE_DATE)?,
            amount: required(columns::AMOUNT)?,
            currency: required(columns::CURRENCY)?,
            status: required(columns::STATUS)?,
            paid_date: table.column_index(columns::PAID_DATE),
            terms: table.column_index(columns::TERMS),
        })
    }
}

/// Applies every row rule and keeps the rows that pass all of them.
pub fn validate_table(table: &RawTable) -> Result<ValidationOutcome> {
    let column_map = ColumnMap::resolve(table)?;

    let mut report = ValidationReport {
        rows_total: table.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(table.len());

    for (idx, raw_row) in table.rows().iter().enumerate() {
        match validate_row(raw_row, &column_map, idx) {
            Ok(row) => rows.push(row),
            Err(reasons) => {
                debug!(
                    "Rejected row #{}: {}",
                    idx,
                    reasons
                        .iter()
                        .map(|r| r.to_string())
                        .collect::<Vec<_>>()
                        .join("; ")
                );
                report.record(&reasons);
            }
        }
    }

    info!(
        "Validation kept {} of {} rows ({} rejected)",
        rows.len(),
        report.rows_total,
        report.rows_rejected
    );

    Ok(ValidationOutcome { rows, report })
}

/// Checks one raw row. Every rule is evaluated so the caller sees all violations.
pub fn validate_row(
    row: &[RawValue],
    column_map: &ColumnMap,
    row_index: usize,
) -> std::result::Result<ValidatedRow, Vec<RejectionReason>> {
    let cell = |idx: usize| row.get(idx).unwrap_or(&NULL_CELL);
    let mut reasons = Vec::new();

    let apid = cell_text(cell(column_map.apid));
    if apid.is_none() {
        reasons.push(RejectionReason::MissingApid);
    }

    let vendor = cell_text(cell(column_map.vendor));
    if vendor.is_none() {
        reasons.push(RejectionReason::MissingVendor);
    }

    let invoice_date = parse_date_cell(cell(column_map.invoice_date));
    if invoice_date.is_none() {
        reasons.push(RejectionReason::InvalidInvoiceDate);
    }

    let due_date = parse_date_cell(cell(column_map.due_date));
    if due_date.is_none() {
        reasons.push(RejectionReason::InvalidDueDate);
    }

    let amount = parse_amount_cell(cell(column_map.amount))
        .filter(|a| *a > Decimal::ZERO && *a <= MAX_INVOICE_AMOUNT);
    if amount.is_none() {
        reasons.push(RejectionReason::InvalidAmount);
    }

    let currency = cell_text(cell(column_map.currency)).and_then(|c| Currency::from_code(&c));
    if currency.is_none() {
        reasons.push(RejectionReason::InvalidCurrency);
    }

    if let (Some(invoice), Some(due)) = (invoice_date, due_date) {
        if due.date() < invoice.date() {
            reasons.push(RejectionReason::DueBeforeInvoice);
        }
    }

    match (apid, vendor, invoice_date, due_date, amount, currency) {
        (Some(apid), Some(vendor), Some(invoice_date), Some(due_date), Some(amount), Some(currency))
            if reasons.is_empty() =>
        {
            let status = cell_text(cell(column_map.status))
                .map(|s| InvoiceStatus::parse(&s))
                .unwrap_or_else(|| InvoiceStatus::Other(String::new()));

            Ok(ValidatedRow {
                row_index,
                apid,
                vendor,
                invoice_date,
                due_date,
                amount,
                currency,
                status,
                paid_date: column_map
                    .paid_date
                    .and_then(|idx| parse_date_cell(cell(idx))),
                terms: column_map.terms.and_then(|idx| cell_text(cell(idx))),
            })
        }
        _ => Err(reasons),
    }
}
