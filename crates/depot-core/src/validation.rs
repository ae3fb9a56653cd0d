//! # Validation Module
//!
//! Input validation for products, ledger transactions and orders.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: API layer (outside this workspace)                            │
//! │  └── Deserialization: unknown enum values never reach us                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Field rules (lengths, signs, ranges)                               │
//! │  └── Whole-input rules (order has items, min <= max)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── UNIQUE (sku, order_number, po_number, inventory.product_id)        │
//! │  └── Foreign keys                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every validator runs before a write, so a rejected input leaves the
//! database untouched.
//!
//! ## Usage
//! ```rust
//! use depot_core::validation::{validate_sku, validate_order_quantity};
//!
//! validate_sku("WIDGET-1").unwrap();
//! validate_order_quantity(5).unwrap();
//! assert!(validate_order_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{NewOrder, NewProduct, NewPurchaseOrder, ProductUpdate};
use crate::{MAX_LINE_QUANTITY, MAX_ORDER_ITEMS, MAX_PRICE_CENTS, MAX_TRANSACTION_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use depot_core::validation::validate_sku;
///
/// assert!(validate_sku("WIDGET-1").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name: non-empty, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an opaque reference id (customer, supplier, product, user).
pub fn validate_required_id(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > 100 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates a search term.
///
/// ## Returns
/// The trimmed term. An empty term is allowed and matches everything.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the quantity on an order or purchase-order line.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_order_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a ledger transaction quantity.
///
/// Zero is accepted (a no-op that is still audited); negative is not.
/// For adjustments the quantity is the new absolute level, so the same rule
/// applies.
pub fn validate_transaction_quantity(qty: i64) -> ValidationResult<()> {
    validate_stock_count("quantity", qty)
}

/// Validates a stock figure supplied by a caller: `0..=MAX_TRANSACTION_QUANTITY`.
pub fn validate_stock_count(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if value > MAX_TRANSACTION_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_TRANSACTION_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a money amount in cents: `0..=MAX_PRICE_CENTS`.
///
/// ## Example
/// ```rust
/// use depot_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("unit_price", 1099).is_ok());
/// assert!(validate_price_cents("unit_price", 0).is_ok());
/// assert!(validate_price_cents("unit_price", -100).is_err());
/// assert!(validate_price_cents("unit_price", i64::MAX).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates min/max stock thresholds: both non-negative and `min <= max`.
pub fn validate_stock_levels(min: i64, max: i64) -> ValidationResult<()> {
    if min < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "min_stock_level".to_string(),
        });
    }

    if max < min {
        return Err(ValidationError::OutOfRange {
            field: "max_stock_level".to_string(),
            min,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates the number of lines on an order.
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if count > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        });
    }

    Ok(())
}

/// Error for a computed amount that does not fit in `i64` cents.
pub(crate) fn amount_out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
}

// =============================================================================
// Input Validators
// =============================================================================

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_sku(&product.sku)?;
    validate_product_name(&product.name)?;
    validate_price_cents("price", product.price_cents)?;
    validate_price_cents("cost", product.cost_cents)?;
    validate_stock_levels(product.min_stock_level, product.max_stock_level)
}

/// Validates the fields an update touches.
///
/// Threshold consistency is checked by the caller against the merged
/// product, since only one side of `min <= max` may be changing.
pub fn validate_product_update(update: &ProductUpdate) -> ValidationResult<()> {
    if let Some(sku) = &update.sku {
        validate_sku(sku)?;
    }
    if let Some(name) = &update.name {
        validate_product_name(name)?;
    }
    if let Some(price) = update.price_cents {
        validate_price_cents("price", price)?;
    }
    if let Some(cost) = update.cost_cents {
        validate_price_cents("cost", cost)?;
    }
    Ok(())
}

/// Validates a new customer order.
///
/// ## Rules
/// - `customer_id` present
/// - 1..=[`MAX_ORDER_ITEMS`] lines
/// - every line has a product, a positive quantity and a non-negative price
pub fn validate_new_order(order: &NewOrder) -> ValidationResult<()> {
    validate_required_id("customer_id", &order.customer_id)?;
    validate_item_count(order.items.len())?;

    for item in &order.items {
        validate_required_id("product_id", &item.product_id)?;
        validate_order_quantity(item.quantity)?;
        validate_price_cents("unit_price", item.unit_price_cents)?;
    }

    Ok(())
}

pub fn validate_new_purchase_order(po: &NewPurchaseOrder) -> ValidationResult<()> {
    validate_required_id("supplier_id", &po.supplier_id)?;
    validate_item_count(po.items.len())?;

    for item in &po.items {
        validate_required_id("product_id", &item.product_id)?;
        validate_order_quantity(item.quantity)?;
        validate_price_cents("unit_cost", item.unit_cost_cents)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewOrderItem, NewPurchaseOrderItem};

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("WIDGET-1").is_ok());
        assert!(validate_sku("ABC_123").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("HAS SPACE").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Widget").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_order_quantity() {
        assert!(validate_order_quantity(1).is_ok());
        assert!(validate_order_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_order_quantity(0).is_err());
        assert!(validate_order_quantity(-1).is_err());
        assert!(validate_order_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_transaction_quantity() {
        assert!(validate_transaction_quantity(0).is_ok());
        assert!(validate_transaction_quantity(100).is_ok());
        assert!(matches!(
            validate_transaction_quantity(-5),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
        assert!(validate_transaction_quantity(MAX_TRANSACTION_QUANTITY).is_ok());
        assert!(matches!(
            validate_transaction_quantity(MAX_TRANSACTION_QUANTITY + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_transaction_quantity(i64::MAX).is_err());
        assert!(validate_stock_count("reserved_stock", i64::MIN).is_err());
    }

    #[test]
    fn test_validate_price_bounds() {
        assert!(validate_price_cents("unit_price", MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents("unit_price", MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_stock_levels() {
        assert!(validate_stock_levels(0, 1000).is_ok());
        assert!(validate_stock_levels(10, 10).is_ok());
        assert!(validate_stock_levels(-1, 10).is_err());
        assert!(validate_stock_levels(20, 10).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let product = NewProduct::new("WIDGET-1", "Widget", 9999, 4500);
        assert!(validate_new_product(&product).is_ok());

        let bad = NewProduct::new("WIDGET-1", "Widget", -1, 4500);
        assert!(validate_new_product(&bad).is_err());

        let bad = NewProduct::new("WIDGET-1", "Widget", 1, 1).with_stock_levels(50, 10);
        assert!(validate_new_product(&bad).is_err());
    }

    #[test]
    fn test_validate_new_order() {
        let order = NewOrder {
            customer_id: "c-1".to_string(),
            notes: None,
            items: vec![NewOrderItem::new("p-1", 2, 9999)],
        };
        assert!(validate_new_order(&order).is_ok());

        let empty = NewOrder {
            items: vec![],
            ..order.clone()
        };
        assert!(matches!(
            validate_new_order(&empty),
            Err(ValidationError::Required { .. })
        ));

        let zero_qty = NewOrder {
            items: vec![NewOrderItem::new("p-1", 0, 9999)],
            ..order.clone()
        };
        assert!(validate_new_order(&zero_qty).is_err());

        let negative_price = NewOrder {
            items: vec![NewOrderItem::new("p-1", 1, -1)],
            ..order.clone()
        };
        assert!(validate_new_order(&negative_price).is_err());

        let no_customer = NewOrder {
            customer_id: " ".to_string(),
            ..order
        };
        assert!(validate_new_order(&no_customer).is_err());
    }

    #[test]
    fn test_validate_new_purchase_order() {
        let po = NewPurchaseOrder {
            supplier_id: "s-1".to_string(),
            expected_delivery: None,
            notes: None,
            items: vec![NewPurchaseOrderItem::new("p-1", 10, 450)],
        };
        assert!(validate_new_purchase_order(&po).is_ok());

        let too_many = NewPurchaseOrder {
            items: (0..=MAX_ORDER_ITEMS)
                .map(|i| NewPurchaseOrderItem::new(format!("p-{i}"), 1, 1))
                .collect(),
            ..po
        };
        assert!(validate_new_purchase_order(&too_many).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  widget  ").unwrap(), "widget");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"a".repeat(101)).is_err());
    }
}
