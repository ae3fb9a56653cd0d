//! # Document Numbering
//!
//! Human-readable numbers for orders and purchase orders.
//!
//! ## Format
//! ```text
//!   ORD-20240115-3F2A9C1B
//!   ─┬─ ───┬──── ───┬────
//!    │     │        └── first 8 hex chars of a random UUID, upper-case
//!    │     └─────────── creation date (UTC), YYYYMMDD
//!    └───────────────── prefix: ORD for orders, PO for purchase orders
//! ```
//!
//! The random token is not guaranteed unique. The database carries a unique
//! index on the number column and depot-db regenerates on collision.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

/// Length of the random token.
pub const TOKEN_LEN: usize = 8;

/// Which kind of document a number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Order,
    PurchaseOrder,
}

impl DocumentKind {
    pub const fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Order => "ORD",
            DocumentKind::PurchaseOrder => "PO",
        }
    }
}

/// Formats a document number from its parts.
pub fn format_document_number(kind: DocumentKind, date: NaiveDate, token: &str) -> String {
    format!("{}-{}-{}", kind.prefix(), date.format("%Y%m%d"), token)
}

/// Generates a fresh number dated today (UTC).
pub fn generate_document_number(kind: DocumentKind) -> String {
    let token = Uuid::new_v4().simple().to_string()[..TOKEN_LEN].to_uppercase();
    format_document_number(kind, Utc::now().date_naive(), &token)
}

/// Splits a document number into its date and token.
///
/// Returns `None` when the prefix, date or token is malformed.
pub fn parse_document_number(kind: DocumentKind, number: &str) -> Option<(NaiveDate, &str)> {
    let rest = number.strip_prefix(kind.prefix())?.strip_prefix('-')?;
    let (date, token) = rest.split_once('-')?;

    if date.len() != 8 || token.len() != TOKEN_LEN {
        return None;
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
    {
        return None;
    }

    let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    Some((date, token))
}

pub fn is_valid_document_number(kind: DocumentKind, number: &str) -> bool {
    parse_document_number(kind, number).is_some()
}
