use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Column names of the raw invoice table. Matching is exact (after trimming whitespace).
pub mod columns {
    pub const APID: &str = "APID";
    pub const VENDOR: &str = "Vendor";
    pub const INVOICE_DATE: &str = "InvoiceDate";
    pub const DUE_DATE: &str = "DueDate";
    pub const AMOUNT: &str = "Amount";
    pub const CURRENCY: &str = "Currency";
    pub const STATUS: &str = "Status";
    pub const PAID_DATE: &str = "PaidDate";
    pub const TERMS: &str = "Terms";

    pub const REQUIRED: [&str; 7] = [
        APID,
        VENDOR,
        INVOICE_DATE,
        DUE_DATE,
        AMOUNT,
        CURRENCY,
        STATUS,
    ];
}

/// Largest amount accepted on a single invoice (one quadrillion). Keeps every total over a
/// dataset well inside `Decimal` range.
pub const MAX_INVOICE_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Currencies accepted on an invoice. Codes are validated, never converted.
///
/// Declared alphabetically so the derived ordering sorts by ISO code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[schemars(description = "Australian dollar")]
    Aud,
    #[schemars(description = "Canadian dollar")]
    Cad,
    #[schemars(description = "Euro")]
    Eur,
    #[schemars(description = "Pound sterling")]
    Gbp,
    #[schemars(description = "Japanese yen")]
    Jpy,
    #[schemars(description = "US dollar")]
    Usd,
}

impl Currency {
    pub const ALL: [Currency; 6] = [
        Currency::Aud,
        Currency::Cad,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Usd,
    ];

    /// Case-insensitive lookup of a three-letter code. Unknown codes are `None`, not coerced.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|currency| currency.code().eq_ignore_ascii_case(code))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Aud => "AUD",
            Currency::Cad => "CAD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Workflow status as exported by the AP system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InvoiceStatus {
    Open,
    Paid,
    /// Anything else, kept verbatim (trimmed). A missing status is `Other("")`.
    Other(String),
}

impl InvoiceStatus {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case("open") {
            InvoiceStatus::Open
        } else if text.eq_ignore_ascii_case("paid") {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Other(text.to_string())
        }
    }

    pub fn bucket(&self) -> StatusBucket {
        match self {
            InvoiceStatus::Open => StatusBucket::Open,
            InvoiceStatus::Paid => StatusBucket::Paid,
            InvoiceStatus::Other(_) => StatusBucket::Other,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, InvoiceStatus::Open)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Open => f.write_str("Open"),
            InvoiceStatus::Paid => f.write_str("Paid"),
            InvoiceStatus::Other(text) => f.write_str(text),
        }
    }
}

impl Serialize for InvoiceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The Open/Paid distribution collapses every other status into `Other`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum StatusBucket {
    Open,
    Paid,
    #[schemars(description = "Any status other than Open or Paid (e.g. Disputed, OnHold, blank)")]
    Other,
}

impl StatusBucket {
    pub fn label(&self) -> &'static str {
        match self {
            StatusBucket::Open => "Open",
            StatusBucket::Paid => "Paid",
            StatusBucket::Other => "Other",
        }
    }
}

/// One row of the cleaned dataset.
///
/// Field order is the column order of the cleaned CSV artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    #[serde(rename = "APID")]
    pub apid: String,
    #[serde(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "InvoiceDate")]
    pub invoice_date: NaiveDate,
    #[serde(rename = "DueDate")]
    pub due_date: NaiveDate,
    #[serde(rename = "Amount")]
    pub amount: Decimal,
    #[serde(rename = "Currency")]
    pub currency: Currency,
    #[serde(rename = "Status")]
    pub status: InvoiceStatus,
    #[serde(rename = "PaidDate")]
    pub paid_date: Option<NaiveDate>,
    #[serde(rename = "Terms")]
    pub terms: Option<String>,
}

impl Invoice {
    pub fn composite_key(&self) -> CompositeKey {
        CompositeKey {
            apid: self.apid.clone(),
            vendor: self.vendor.clone(),
            invoice_date: self.invoice_date,
            amount: self.amount,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

/// (APID, Vendor, InvoiceDate, Amount): two invoices sharing it are the same invoice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    pub apid: String,
    pub vendor: String,
    pub invoice_date: NaiveDate,
    pub amount: Decimal,
}
