//! # Money Module
//!
//! Integer-cent money for order and purchase-order totals.
//!
//! ## Where Money Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderItem.unit_price_cents × quantity ──► OrderItem.total_price_cents  │
//! │                                                  │                      │
//! │                                     Σ line totals ▼                     │
//! │                                          Order.total_cents              │
//! │                                                                         │
//! │  PurchaseOrderItem.unit_cost_cents × quantity ──► total_cost_cents      │
//! │                                     Σ line totals ──► PO.total_cents    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use depot_core::money::Money;
//!
//! let unit = Money::from_cents(9999); // $99.99
//! let line = unit.checked_line_total(2).unwrap();
//! assert_eq!(line.cents(), 19998);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use ts_rs::TS;

/// A monetary value in the smallest currency unit (cents).
///
/// Signed so that credit notes and corrections can be represented,
/// although validation rejects negative prices on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Total for a line of `quantity` units at this unit price, or `None`
    /// if it does not fit in `i64` cents.
    ///
    /// ## Example
    /// ```rust
    /// use depot_core::money::Money;
    ///
    /// let unit_cost = Money::from_cents(250);
    /// assert_eq!(unit_cost.checked_line_total(4).unwrap().cents(), 1000);
    /// assert!(Money::from_cents(i64::MAX).checked_line_total(2).is_none());
    /// ```
    #[inline]
    pub const fn checked_line_total(&self, quantity: i64) -> Option<Self> {
        match self.0.checked_mul(quantity) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Line total clamped to the `i64` range. Stored totals go through
    /// [`checked_line_total`](Self::checked_line_total) instead.
    #[inline]
    pub const fn line_total(&self, quantity: i64) -> Self {
        Money(self.0.saturating_mul(quantity))
    }
}

/// Debug-friendly display (`$12.34`). Frontends format for locale themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
