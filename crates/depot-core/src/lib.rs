//! # depot-core: Pure Inventory Logic for Depot
//!
//! Stock ledger rules, order lifecycle and validation as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Depot Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │             HTTP / auth layer (outside this workspace)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    depot-db (Database Layer)                    │   │
//! │  │     repositories, SQL transactions, compare-and-swap writes     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ asks "what are the next counters?"     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ depot-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  ledger  │ │  order   │ │numbering │ │ types/validation │  │   │
//! │  │   │ counters │ │ statuses │ │ ORD / PO │ │  inputs, rows    │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`ledger`] - Stock counters and how each movement changes them
//! - [`order`] - Order status machine and document totals
//! - [`numbering`] - `ORD-…` / `PO-…` document numbers
//! - [`types`] - Entities and inputs
//! - [`money`] - Integer-cent money
//! - [`error`] - Domain error types
//! - [`validation`] - Input rules
//!
//! ## Example Usage
//!
//! ```rust
//! use depot_core::ledger::{plan_transaction, NegativeStockPolicy, StockLevels, TransactionKind};
//!
//! let levels = StockLevels::new(100, 10);
//! let movement = plan_transaction(
//!     "product-id",
//!     levels,
//!     TransactionKind::Sale,
//!     10,
//!     NegativeStockPolicy::Allow,
//! )
//! .unwrap();
//!
//! assert_eq!(movement.next, StockLevels::new(90, 0));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod numbering;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use ledger::{NegativeStockPolicy, StockLevels, StockMovement, TransactionKind};
pub use money::Money;
pub use numbering::DocumentKind;
pub use order::{OrderStatus, ReservationEffect, StatusChange};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum stock level given to products created without one.
pub const DEFAULT_MIN_STOCK_LEVEL: i64 = 0;

/// Maximum stock level given to products created without one.
pub const DEFAULT_MAX_STOCK_LEVEL: i64 = 1000;

/// Maximum lines on a single order or purchase order.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity on a single order line.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Maximum quantity of one ledger transaction, and the largest value a
/// manual correction may set a counter to.
pub const MAX_TRANSACTION_QUANTITY: i64 = 1_000_000_000;

/// Maximum unit price or cost, in cents ($100,000,000.00).
///
/// With [`MAX_LINE_QUANTITY`] and [`MAX_ORDER_ITEMS`] this keeps every
/// document total well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;
