//! # Order Lifecycle
//!
//! Status machine shared by customer orders and purchase orders.
//!
//! ## Transitions
//! ```text
//!   pending ──► confirmed ──► shipped ──► delivered
//!      │            │            │
//!      └────────────┴────────────┴──────► cancelled
//!
//!   delivered and cancelled are terminal.
//!   Setting the status an order already has is a no-op.
//! ```
//!
//! ## Reservations
//! A customer order reserves stock for each line when it is created. The
//! reservation is released exactly once: either when the order moves to
//! `cancelled`, or when a non-cancelled order is deleted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of an order or purchase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether an order in this status still holds its stock reservations.
    #[inline]
    pub fn holds_reservation(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next {
            return true;
        }

        match (self, next) {
            (from, OrderStatus::Cancelled) => !from.is_terminal(),
            (OrderStatus::Pending, OrderStatus::Confirmed)
            | (OrderStatus::Confirmed, OrderStatus::Shipped)
            | (OrderStatus::Shipped, OrderStatus::Delivered) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Transitions
// =============================================================================

/// What a status change means for the order's stock reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationEffect {
    Keep,
    Release,
}

/// A checked status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub reservations: ReservationEffect,
}

impl StatusChange {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Validates moving `entity` `id` from `from` to `to`.
///
/// ## Errors
/// `InvalidStatusTransition` when the state machine forbids the move.
pub fn plan_status_change(
    entity: &str,
    id: &str,
    from: OrderStatus,
    to: OrderStatus,
) -> CoreResult<StatusChange> {
    if !from.can_transition_to(to) {
        return Err(CoreError::InvalidStatusTransition {
            entity: entity.to_string(),
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    let reservations = if from.holds_reservation() && !to.holds_reservation() {
        ReservationEffect::Release
    } else {
        ReservationEffect::Keep
    };

    Ok(StatusChange {
        from,
        to,
        reservations,
    })
}

// =============================================================================
// Totals
// =============================================================================

/// Sums `(unit_cents, quantity)` pairs into a document total.
///
/// `None` when a line or the running total leaves the `i64` range.
pub fn document_total<I>(lines: I) -> Option<Money>
where
    I: IntoIterator<Item = (i64, i64)>,
{
    lines
        .into_iter()
        .try_fold(Money::zero(), |total, (unit_cents, quantity)| {
            total.checked_add(Money::from_cents(unit_cents).checked_line_total(quantity)?)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_same_status_is_noop() {
        for status in OrderStatus::ALL {
            let change = plan_status_change("Order", "o-1", status, status).unwrap();
            assert!(change.is_noop());
            assert_eq!(change.reservations, ReservationEffect::Keep);
        }
    }

    #[test]
    fn test_cancel_releases_reservations() {
        for from in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
        ] {
            let change = plan_status_change("Order", "o-1", from, OrderStatus::Cancelled).unwrap();
            assert_eq!(change.reservations, ReservationEffect::Release);
        }
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = plan_status_change(
            "Order",
            "o-1",
            OrderStatus::Delivered,
            OrderStatus::Pending,
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "Order o-1 cannot move from delivered to pending");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("lost".parse::<OrderStatus>().is_err());
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_document_total() {
        let total = document_total([(9999, 2), (500, 1)]).unwrap();
        assert_eq!(total.cents(), 20498);
        assert!(document_total(Vec::new()).unwrap().is_zero());

        assert!(document_total([(i64::MAX / 2 + 1, 2)]).is_none());
        assert!(document_total([(i64::MAX, 1), (1, 1)]).is_none());
    }
}
