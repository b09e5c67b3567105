use crate::normalize::CleanedDataset;
use crate::schema::{Currency, Invoice};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Dashboard-style slice of a cleaned dataset, applied before KPIs or reports.
///
/// Empty vendor/currency sets mean "all"; date bounds are inclusive on InvoiceDate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFilter {
    #[serde(default)]
    pub invoice_date_from: Option<NaiveDate>,
    #[serde(default)]
    pub invoice_date_to: Option<NaiveDate>,
    #[serde(default)]
    pub vendors: BTreeSet<String>,
    #[serde(default)]
    pub currencies: BTreeSet<Currency>,
}

impl InvoiceFilter {
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            invoice_date_from: Some(from),
            invoice_date_to: Some(to),
            ..Default::default()
        }
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendors.insert(vendor.into());
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currencies.insert(currency);
        self
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        if let Some(from) = self.invoice_date_from {
            if invoice.invoice_date < from {
                return false;
            }
        }
        if let Some(to) = self.invoice_date_to {
            if invoice.invoice_date > to {
                return false;
            }
        }
        if !self.vendors.is_empty() && !self.vendors.contains(&invoice.vendor) {
            return false;
        }
        if !self.currencies.is_empty() && !self.currencies.contains(&invoice.currency) {
            return false;
        }
        true
    }

    /// A filtered subset keeps the cleaned-data invariants, so it is a dataset in its own right.
    pub fn apply(&self, dataset: &CleanedDataset) -> CleanedDataset {
        CleanedDataset::from_invoices(
            dataset
                .iter()
                .filter(|invoice| self.matches(invoice))
                .cloned()
                .collect(),
        )
    }
}
