//! # Error Types
//!
//! Domain-specific error types for depot-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  depot-core errors (this file)                                          │
//! │  ├── CoreError        - Ledger / order rule violations                  │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  depot-db errors (separate crate)                                       │
//! │  └── DbError          - Database failures, wraps CoreError              │
//! │                                                                         │
//! │  Every error classifies into one ErrorKind for the API layer:           │
//! │      NotFound | Validation | Conflict | Internal                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Caller-facing classification of a failure.
///
/// The HTTP layer maps these to status codes (404, 400/422, 409, 500).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// A referenced product, inventory row, order or PO does not exist.
    NotFound,
    /// Malformed input or a rule violation; nothing was written.
    Validation,
    /// Duplicate unique key or a concurrent write won the race.
    Conflict,
    /// Anything else (database unavailable, corrupted row, ...).
    Internal,
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule errors raised by the ledger and order logic.
///
/// Lookups happen in depot-db, so "not found" lives on `DbError`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The mutation would drive a stock counter below zero while the
    /// ledger runs with `NegativeStockPolicy::Reject`.
    ///
    /// ## User Workflow
    /// ```text
    /// Inventory: current=3 reserved=0
    ///      │
    ///      ▼
    /// sale quantity=5
    ///      │
    ///      ▼
    /// InsufficientStock { current_stock: -2, reserved_stock: -5, .. }
    ///      │
    ///      ▼
    /// Nothing written, UI shows "not enough stock"
    /// ```
    #[error(
        "Insufficient stock for product {product_id}: would leave current {current_stock}, \
         reserved {reserved_stock}, available {available_stock}"
    )]
    InsufficientStock {
        product_id: String,
        current_stock: i64,
        reserved_stock: i64,
        available_stock: i64,
    },

    /// A counter would leave the `i64` range.
    #[error("Stock counters for product {product_id} would overflow")]
    StockOverflow { product_id: String },

    /// Order / purchase-order status change not allowed by the state machine.
    #[error("{entity} {id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        entity: String,
        id: String,
        from: String,
        to: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies this error for the API layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InsufficientStock { .. }
            | CoreError::StockOverflow { .. }
            | CoreError::InvalidStatusTransition { .. }
            | CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any mutation, so a failed validation never leaves
/// partial writes behind.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, bad SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            current_stock: -2,
            reserved_stock: 0,
            available_stock: -2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-1: would leave current -2, reserved 0, available -2"
        );

        let err = CoreError::InvalidStatusTransition {
            entity: "Order".to_string(),
            id: "o-1".to_string(),
            from: "delivered".to_string(),
            to: "pending".to_string(),
        };
        assert_eq!(err.to_string(), "Order o-1 cannot move from delivered to pending");

        let err = CoreError::StockOverflow {
            product_id: "p-1".to_string(),
        };
        assert_eq!(err.to_string(), "Stock counters for product p-1 would overflow");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");

        let err = ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CoreError::InsufficientStock {
                product_id: "p".into(),
                current_stock: -1,
                reserved_stock: 0,
                available_stock: -1,
            }
            .kind(),
            ErrorKind::Validation
        );
    }
}
