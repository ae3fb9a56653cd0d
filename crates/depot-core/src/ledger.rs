//! # Stock Ledger
//!
//! Pure arithmetic behind every inventory mutation.
//!
//! ## Counter Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  current_stock    physical units on hand                                │
//! │  reserved_stock   units promised to open orders                         │
//! │  available_stock  current_stock - reserved_stock   (always derived)     │
//! │                                                                         │
//! │  kind        current            reserved            available           │
//! │  ─────────   ────────────────   ─────────────────   ─────────────────   │
//! │  purchase    + quantity         unchanged           recomputed          │
//! │  sale        - quantity         - quantity          recomputed          │
//! │  return      + quantity         unchanged           recomputed          │
//! │  adjustment  = quantity         unchanged           recomputed          │
//! │  reserve     unchanged          + quantity          recomputed          │
//! │  release     unchanged          - quantity          recomputed          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this module touches the database. depot-db reads the current
//! counters, asks this module for the next ones and writes them back with a
//! compare-and-swap, so the rules above live in exactly one place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Transaction Kind
// =============================================================================

/// Kind of stock movement recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum TransactionKind {
    /// Goods received from a supplier.
    Purchase,
    /// Goods shipped out against a reservation.
    Sale,
    /// Goods coming back from a customer.
    Return,
    /// Stock count correction; `quantity` is the new absolute level.
    Adjustment,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 4] = [
        TransactionKind::Purchase,
        TransactionKind::Sale,
        TransactionKind::Return,
        TransactionKind::Adjustment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Sale => "sale",
            TransactionKind::Return => "return",
            TransactionKind::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "transaction_type".to_string(),
                allowed: TransactionKind::ALL
                    .iter()
                    .map(|k| k.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Negative Stock Policy
// =============================================================================

/// Whether a mutation may drive a stock counter below zero.
///
/// `Allow` keeps the historical behaviour: overselling is recorded as
/// negative stock and fixed later with an adjustment. `Reject` refuses any
/// mutation that would leave current, reserved or available below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum NegativeStockPolicy {
    #[default]
    Allow,
    Reject,
}

impl NegativeStockPolicy {
    /// Checks the counters a mutation would produce.
    pub fn check(&self, product_id: &str, next: &StockLevels) -> CoreResult<()> {
        match self {
            NegativeStockPolicy::Allow => Ok(()),
            NegativeStockPolicy::Reject if next.has_negative() => {
                Err(CoreError::InsufficientStock {
                    product_id: product_id.to_string(),
                    current_stock: next.current,
                    reserved_stock: next.reserved,
                    available_stock: next.available,
                })
            }
            NegativeStockPolicy::Reject => Ok(()),
        }
    }
}

impl fmt::Display for NegativeStockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegativeStockPolicy::Allow => f.write_str("allow"),
            NegativeStockPolicy::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for NegativeStockPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(NegativeStockPolicy::Allow),
            "reject" => Ok(NegativeStockPolicy::Reject),
            _ => Err(ValidationError::NotAllowed {
                field: "negative_stock".to_string(),
                allowed: vec!["allow".to_string(), "reject".to_string()],
            }),
        }
    }
}

// =============================================================================
// Stock Levels
// =============================================================================

/// The three counters of one inventory row.
///
/// Construct through [`StockLevels::new`] or [`StockLevels::checked_new`]
/// so that `available` is always `current - reserved`. Every mutation below
/// is checked and yields `None` rather than wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockLevels {
    pub current: i64,
    pub reserved: i64,
    pub available: i64,
}

impl StockLevels {
    pub const fn new(current: i64, reserved: i64) -> Self {
        StockLevels {
            current,
            reserved,
            available: current - reserved,
        }
    }

    /// Like [`new`](Self::new), but `None` when `available` does not fit.
    pub const fn checked_new(current: i64, reserved: i64) -> Option<Self> {
        match current.checked_sub(reserved) {
            Some(available) => Some(StockLevels {
                current,
                reserved,
                available,
            }),
            None => None,
        }
    }

    pub const fn zero() -> Self {
        StockLevels::new(0, 0)
    }

    /// True when `available == current - reserved`.
    ///
    /// Rows read back from storage are checked with this in tests; a row
    /// written by anything other than this module could break it.
    pub const fn is_consistent(&self) -> bool {
        match self.current.checked_sub(self.reserved) {
            Some(available) => available == self.available,
            None => false,
        }
    }

    pub const fn has_negative(&self) -> bool {
        self.current < 0 || self.reserved < 0 || self.available < 0
    }

    /// Applies a ledger transaction, `None` on `i64` overflow.
    pub fn apply(&self, kind: TransactionKind, quantity: i64) -> Option<Self> {
        match kind {
            TransactionKind::Purchase | TransactionKind::Return => {
                StockLevels::checked_new(self.current.checked_add(quantity)?, self.reserved)
            }
            TransactionKind::Sale => StockLevels::checked_new(
                self.current.checked_sub(quantity)?,
                self.reserved.checked_sub(quantity)?,
            ),
            TransactionKind::Adjustment => StockLevels::checked_new(quantity, self.reserved),
        }
    }

    pub fn reserve(&self, quantity: i64) -> Option<Self> {
        StockLevels::checked_new(self.current, self.reserved.checked_add(quantity)?)
    }

    pub fn release(&self, quantity: i64) -> Option<Self> {
        StockLevels::checked_new(self.current, self.reserved.checked_sub(quantity)?)
    }
}

impl Default for StockLevels {
    fn default() -> Self {
        StockLevels::zero()
    }
}

// =============================================================================
// Planning
// =============================================================================

/// A validated movement: what the counters were and what they become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockMovement {
    pub kind: TransactionKind,
    pub quantity: i64,
    pub previous: StockLevels,
    pub next: StockLevels,
}

impl StockMovement {
    /// A zero quantity purchase, sale or return changes nothing but is
    /// still recorded in the audit log.
    pub fn is_noop(&self) -> bool {
        self.previous == self.next
    }
}

fn overflow(product_id: &str) -> CoreError {
    CoreError::StockOverflow {
        product_id: product_id.to_string(),
    }
}

/// Plans a ledger transaction against the given counters.
///
/// ## Errors
/// - `Validation` when `quantity` is negative or above
///   [`MAX_TRANSACTION_QUANTITY`](crate::MAX_TRANSACTION_QUANTITY)
/// - `StockOverflow` when a counter would leave the `i64` range
/// - `InsufficientStock` when `policy` is `Reject` and a counter would
///   go below zero
pub fn plan_transaction(
    product_id: &str,
    levels: StockLevels,
    kind: TransactionKind,
    quantity: i64,
    policy: NegativeStockPolicy,
) -> CoreResult<StockMovement> {
    crate::validation::validate_transaction_quantity(quantity)?;

    let next = levels
        .apply(kind, quantity)
        .ok_or_else(|| overflow(product_id))?;
    policy.check(product_id, &next)?;

    Ok(StockMovement {
        kind,
        quantity,
        previous: levels,
        next,
    })
}

/// Plans reserving `quantity` units for an order line.
pub fn plan_reservation(
    product_id: &str,
    levels: StockLevels,
    quantity: i64,
    policy: NegativeStockPolicy,
) -> CoreResult<StockLevels> {
    let next = levels.reserve(quantity).ok_or_else(|| overflow(product_id))?;
    policy.check(product_id, &next)?;
    Ok(next)
}

/// Plans releasing a reservation of `quantity` units.
///
/// Under `Reject` a release that would take `reserved` below zero fails,
/// which happens when a sale already consumed the reservation.
pub fn plan_release(
    product_id: &str,
    levels: StockLevels,
    quantity: i64,
    policy: NegativeStockPolicy,
) -> CoreResult<StockLevels> {
    let next = levels.release(quantity).ok_or_else(|| overflow(product_id))?;
    policy.check(product_id, &next)?;
    Ok(next)
}

/// Low stock means on-hand stock at or below the product's minimum.
#[inline]
pub fn is_low_stock(current_stock: i64, min_stock_level: i64) -> bool {
    current_stock <= min_stock_level
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_purchase_then_sale() {
        let start = StockLevels::zero();

        let after_purchase = plan_transaction(
            "p-1",
            start,
            TransactionKind::Purchase,
            100,
            NegativeStockPolicy::Allow,
        )
        .unwrap();
        assert_eq!(after_purchase.next, StockLevels::new(100, 0));

        let reserved = plan_reservation("p-1", after_purchase.next, 10, NegativeStockPolicy::Allow)
            .unwrap();
        assert_eq!(reserved, StockLevels::new(100, 10));
        assert_eq!(reserved.available, 90);

        let after_sale = plan_transaction(
            "p-1",
            reserved,
            TransactionKind::Sale,
            10,
            NegativeStockPolicy::Allow,
        )
        .unwrap();
        assert_eq!(after_sale.next, StockLevels::new(90, 0));
        assert_eq!(after_sale.next.available, 90);
    }

    #[test]
    fn test_adjustment_sets_absolute_level() {
        let levels = StockLevels::new(40, 5);
        let movement = plan_transaction(
            "p-1",
            levels,
            TransactionKind::Adjustment,
            12,
            NegativeStockPolicy::Allow,
        )
        .unwrap();

        assert_eq!(movement.next.current, 12);
        assert_eq!(movement.next.reserved, 5);
        assert_eq!(movement.next.available, 7);
        assert_eq!(movement.previous, levels);
    }

    #[test]
    fn test_return_adds_stock() {
        let next = StockLevels::new(3, 1).apply(TransactionKind::Return, 2);
        assert_eq!(next, Some(StockLevels::new(5, 1)));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let near_max = StockLevels::new(i64::MAX - 1, 0);
        let err = plan_transaction(
            "p-1",
            near_max,
            TransactionKind::Purchase,
            5,
            NegativeStockPolicy::Allow,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::StockOverflow { .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Validation);

        let deep = StockLevels::new(i64::MIN + 1, 0);
        assert!(plan_transaction("p-1", deep, TransactionKind::Sale, 5, NegativeStockPolicy::Allow)
            .is_err());
        assert!(plan_reservation("p-1", StockLevels::new(0, i64::MAX), 1, NegativeStockPolicy::Allow)
            .is_err());
        assert!(StockLevels::checked_new(0, i64::MIN).is_none());
    }

    #[test]
    fn test_quantity_above_limit_rejected() {
        let err = plan_transaction(
            "p-1",
            StockLevels::new(10, 0),
            TransactionKind::Purchase,
            i64::MAX,
            NegativeStockPolicy::Allow,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let err = plan_transaction(
            "p-1",
            StockLevels::zero(),
            TransactionKind::Purchase,
            -1,
            NegativeStockPolicy::Allow,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_zero_quantity_is_noop() {
        let levels = StockLevels::new(8, 2);
        for kind in [
            TransactionKind::Purchase,
            TransactionKind::Sale,
            TransactionKind::Return,
        ] {
            let movement =
                plan_transaction("p-1", levels, kind, 0, NegativeStockPolicy::Reject).unwrap();
            assert!(movement.is_noop(), "{kind} with quantity 0 changed stock");
        }
    }

    #[test]
    fn test_allow_policy_permits_oversell() {
        let movement = plan_transaction(
            "p-1",
            StockLevels::new(3, 0),
            TransactionKind::Sale,
            5,
            NegativeStockPolicy::Allow,
        )
        .unwrap();
        assert_eq!(movement.next, StockLevels::new(-2, -5));
    }

    #[test]
    fn test_reject_policy_blocks_oversell() {
        let err = plan_transaction(
            "p-1",
            StockLevels::new(3, 0),
            TransactionKind::Sale,
            5,
            NegativeStockPolicy::Reject,
        )
        .unwrap_err();

        match err {
            CoreError::InsufficientStock {
                product_id,
                current_stock,
                ..
            } => {
                assert_eq!(product_id, "p-1");
                assert_eq!(current_stock, -2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reject_policy_blocks_over_reservation() {
        let levels = StockLevels::new(5, 4);
        assert!(plan_reservation("p-1", levels, 1, NegativeStockPolicy::Reject).is_ok());
        assert!(plan_reservation("p-1", levels, 2, NegativeStockPolicy::Reject).is_err());
        assert!(plan_reservation("p-1", levels, 2, NegativeStockPolicy::Allow).is_ok());
    }

    #[test]
    fn test_release_below_zero() {
        let levels = StockLevels::new(10, 0);
        assert_eq!(
            plan_release("p-1", levels, 3, NegativeStockPolicy::Allow).unwrap(),
            StockLevels::new(10, -3)
        );
        assert!(plan_release("p-1", levels, 3, NegativeStockPolicy::Reject).is_err());
    }

    #[test]
    fn test_low_stock_is_inclusive() {
        assert!(is_low_stock(5, 5));
        assert!(is_low_stock(4, 5));
        assert!(!is_low_stock(6, 5));
        assert!(is_low_stock(0, 0));
    }

    #[test]
    fn test_transaction_kind_parsing() {
        assert_eq!("sale".parse::<TransactionKind>().unwrap(), TransactionKind::Sale);
        assert_eq!(TransactionKind::Return.to_string(), "return");

        let err = "refund".parse::<TransactionKind>().unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { .. }));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            " Reject ".parse::<NegativeStockPolicy>().unwrap(),
            NegativeStockPolicy::Reject
        );
        assert_eq!(NegativeStockPolicy::default(), NegativeStockPolicy::Allow);
        assert!("strict".parse::<NegativeStockPolicy>().is_err());
    }

    fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
        prop_oneof![
            Just(TransactionKind::Purchase),
            Just(TransactionKind::Sale),
            Just(TransactionKind::Return),
            Just(TransactionKind::Adjustment),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn prop_available_always_derived(
            current in -10_000i64..10_000,
            reserved in -10_000i64..10_000,
            steps in proptest::collection::vec((kind_strategy(), 0i64..1_000), 0..32),
        ) {
            let mut levels = StockLevels::new(current, reserved);
            for (kind, quantity) in steps {
                levels = plan_transaction("p", levels, kind, quantity, NegativeStockPolicy::Allow)
                    .unwrap()
                    .next;
                prop_assert!(levels.is_consistent());
            }
        }

        #[test]
        fn prop_reserve_then_release_restores(
            current in 0i64..10_000,
            reserved in 0i64..10_000,
            quantity in 0i64..1_000,
        ) {
            let start = StockLevels::new(current, reserved);
            let reserved_levels =
                plan_reservation("p", start, quantity, NegativeStockPolicy::Allow).unwrap();
            let released =
                plan_release("p", reserved_levels, quantity, NegativeStockPolicy::Allow).unwrap();
            prop_assert_eq!(released, start);
        }

        #[test]
        fn prop_reject_never_produces_negative(
            current in 0i64..1_000,
            reserved_part in 0i64..1_000,
            kind in kind_strategy(),
            quantity in 0i64..2_000,
        ) {
            let start = StockLevels::new(current, reserved_part.min(current));
            if let Ok(movement) =
                plan_transaction("p", start, kind, quantity, NegativeStockPolicy::Reject)
            {
                prop_assert!(!movement.next.has_negative());
            }
        }
    }
}
