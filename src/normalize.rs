use crate::ingestion::ValidatedRow;
use crate::schema::{CompositeKey, Invoice};
use log::{debug, info};
use std::collections::HashSet;

/// The canonical, deduplicated invoice table handed to the KPI and report engine.
///
/// Only this crate builds one, so every row satisfies the cleaned-data invariants: APID and
/// Vendor present, Amount > 0, DueDate >= InvoiceDate, an accepted currency, and a unique
/// composite key. Rows keep their input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedDataset {
    invoices: Vec<Invoice>,
}

impl CleanedDataset {
    pub(crate) fn from_invoices(invoices: Vec<Invoice>) -> Self {
        Self { invoices }
    }

    pub fn invoices(&self) -> &[Invoice] {
        &self.invoices
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Invoice> {
        self.invoices.iter()
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    pub fn open_invoices(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.iter().filter(|invoice| invoice.is_open())
    }
}

impl<'a> IntoIterator for &'a CleanedDataset {
    type Item = &'a Invoice;
    type IntoIter = std::slice::Iter<'a, Invoice>;

    fn into_iter(self) -> Self::IntoIter {
        self.invoices.iter()
    }
}

/// Puts a validated row into canonical form: time of day dropped from every date, the
/// amount rescaled without trailing zeros (`100.00` and `100` are the same amount), and the
/// currency already held as its upper-case code.
pub fn normalize_row(row: ValidatedRow) -> Invoice {
    Invoice {
        apid: row.apid,
        vendor: row.vendor,
        invoice_date: row.invoice_date.date(),
        due_date: row.due_date.date(),
        amount: row.amount.normalize(),
        currency: row.currency,
        status: row.status,
        paid_date: row.paid_date.map(|dt| dt.date()),
        terms: row.terms,
    }
}

/// Drops every invoice whose composite key was already seen. The first occurrence in input
/// order survives. Returns the survivors and the number of rows removed.
pub fn deduplicate(invoices: Vec<Invoice>) -> (Vec<Invoice>, usize) {
    let mut seen: HashSet<CompositeKey> = HashSet::with_capacity(invoices.len());
    let mut kept = Vec::with_capacity(invoices.len());
    let mut removed = 0;

    for invoice in invoices {
        if seen.insert(invoice.composite_key()) {
            kept.push(invoice);
        } else {
            debug!(
                "Dropping duplicate invoice {} from {} ({} on {})",
                invoice.apid, invoice.vendor, invoice.amount, invoice.invoice_date
            );
            removed += 1;
        }
    }

    (kept, removed)
}

/// Normalizes validated rows in input order and deduplicates them.
pub fn normalize_and_deduplicate(mut rows: Vec<ValidatedRow>) -> (CleanedDataset, usize) {
    rows.sort_by_key(|row| row.row_index);

    let normalized: Vec<Invoice> = rows.into_iter().map(normalize_row).collect();
    let (invoices, removed) = deduplicate(normalized);

    info!(
        "Normalization produced {} invoices ({} duplicates removed)",
        invoices.len(),
        removed
    );

    (CleanedDataset::from_invoices(invoices), removed)
}
