//! # Domain Types
//!
//! Entities persisted by depot-db and the inputs used to create or change them.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐ 1   1 ┌─────────────────┐ 1   * ┌────────────────┐ │
//! │  │    Product      │───────│   Inventory     │───────│ Inventory-     │ │
//! │  │  id, sku        │       │  current        │       │ Transaction    │ │
//! │  │  min/max level  │       │  reserved       │       │ (audit log)    │ │
//! │  └─────────────────┘       │  available      │       └────────────────┘ │
//! │          ▲                 └─────────────────┘                          │
//! │          │ product_id                                                   │
//! │  ┌───────┴─────────┐ *   1 ┌─────────────────┐                          │
//! │  │   OrderItem     │───────│     Order       │  ORD-YYYYMMDD-XXXXXXXX   │
//! │  └─────────────────┘       └─────────────────┘                          │
//! │  ┌─────────────────┐ *   1 ┌─────────────────┐                          │
//! │  │ PurchaseOrder-  │───────│ PurchaseOrder   │  PO-YYYYMMDD-XXXXXXXX    │
//! │  │ Item            │       └─────────────────┘                          │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity
//! Products, orders and purchase orders carry a UUID v4 `id` used for
//! relations plus a human-readable business key (`sku`, `order_number`,
//! `po_number`). Customer, supplier, category and user ids are opaque
//! strings owned by other services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::{StockLevels, TransactionKind};
use crate::money::Money;
use crate::order::OrderStatus;
use crate::validation::{amount_out_of_range, ValidationResult};
use crate::{DEFAULT_MAX_STOCK_LEVEL, DEFAULT_MIN_STOCK_LEVEL};

/// `reference_type` written on movements caused by customer orders.
pub const REFERENCE_ORDER: &str = "order";

/// `reference_type` written on movements caused by receiving a purchase order.
pub const REFERENCE_PURCHASE_ORDER: &str = "purchase_order";

/// `reference_type` written on movements caused by a direct inventory edit.
pub const REFERENCE_MANUAL: &str = "manual";

// =============================================================================
// Product
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    Discontinued,
}

/// A stocked product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    pub name: String,
    pub description: Option<String>,

    /// Selling price in cents.
    pub price_cents: i64,

    /// Purchase cost in cents.
    pub cost_cents: i64,

    pub category_id: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub status: ProductStatus,

    /// At or below this on-hand level the product shows up as low stock.
    pub min_stock_level: i64,
    pub max_stock_level: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    pub fn is_low_stock(&self, current_stock: i64) -> bool {
        crate::ledger::is_low_stock(current_stock, self.min_stock_level)
    }
}

fn default_min_stock_level() -> i64 {
    DEFAULT_MIN_STOCK_LEVEL
}

fn default_max_stock_level() -> i64 {
    DEFAULT_MAX_STOCK_LEVEL
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_cents: i64,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default = "default_min_stock_level")]
    pub min_stock_level: i64,
    #[serde(default = "default_max_stock_level")]
    pub max_stock_level: i64,
}

impl NewProduct {
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        price_cents: i64,
        cost_cents: i64,
    ) -> Self {
        NewProduct {
            sku: sku.into(),
            name: name.into(),
            description: None,
            price_cents,
            cost_cents,
            category_id: None,
            brand: None,
            model: None,
            status: ProductStatus::Active,
            min_stock_level: DEFAULT_MIN_STOCK_LEVEL,
            max_stock_level: DEFAULT_MAX_STOCK_LEVEL,
        }
    }

    pub fn with_stock_levels(mut self, min: i64, max: i64) -> Self {
        self.min_stock_level = min;
        self.max_stock_level = max;
        self
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }
}

/// Partial product update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub category_id: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub status: Option<ProductStatus>,
    pub min_stock_level: Option<i64>,
    pub max_stock_level: Option<i64>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.price_cents.is_none()
            && self.cost_cents.is_none()
            && self.category_id.is_none()
            && self.brand.is_none()
            && self.model.is_none()
            && self.status.is_none()
            && self.min_stock_level.is_none()
            && self.max_stock_level.is_none()
    }

    /// Applies the update to a copy of `product`.
    pub fn apply_to(&self, product: &Product) -> Product {
        let mut next = product.clone();
        if let Some(sku) = &self.sku {
            next.sku = sku.trim().to_string();
        }
        if let Some(name) = &self.name {
            next.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            next.description = Some(description.clone());
        }
        if let Some(price) = self.price_cents {
            next.price_cents = price;
        }
        if let Some(cost) = self.cost_cents {
            next.cost_cents = cost;
        }
        if let Some(category) = &self.category_id {
            next.category_id = Some(category.clone());
        }
        if let Some(brand) = &self.brand {
            next.brand = Some(brand.clone());
        }
        if let Some(model) = &self.model {
            next.model = Some(model.clone());
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(min) = self.min_stock_level {
            next.min_stock_level = min;
        }
        if let Some(max) = self.max_stock_level {
            next.max_stock_level = max;
        }
        next
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Stock counters for one product. Exactly one row per product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Inventory {
    pub id: String,
    pub product_id: String,
    pub current_stock: i64,
    pub reserved_stock: i64,
    /// Always `current_stock - reserved_stock`.
    pub available_stock: i64,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

impl Inventory {
    #[inline]
    pub fn levels(&self) -> StockLevels {
        StockLevels {
            current: self.current_stock,
            reserved: self.reserved_stock,
            available: self.available_stock,
        }
    }
}

/// Direct correction of inventory counters.
///
/// A changed `current_stock` is recorded in the ledger as an adjustment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryUpdate {
    pub current_stock: Option<i64>,
    pub reserved_stock: Option<i64>,
}

impl InventoryUpdate {
    pub fn is_empty(&self) -> bool {
        self.current_stock.is_none() && self.reserved_stock.is_none()
    }

    /// The counters after the correction, or `None` if `available` would
    /// not fit in `i64`.
    pub fn apply_to(&self, levels: StockLevels) -> Option<StockLevels> {
        StockLevels::checked_new(
            self.current_stock.unwrap_or(levels.current),
            self.reserved_stock.unwrap_or(levels.reserved),
        )
    }
}

// =============================================================================
// Inventory Transactions
// =============================================================================

/// One audited stock movement. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryTransaction {
    pub id: String,
    pub product_id: String,
    pub transaction_type: TransactionKind,
    pub quantity: i64,
    /// `current_stock` before the movement.
    pub previous_stock: i64,
    /// `current_stock` after the movement.
    pub new_stock: i64,
    pub reference_id: Option<String>,
    pub reference_type: Option<String>,
    pub notes: Option<String>,
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for a ledger transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTransaction {
    pub product_id: String,
    pub transaction_type: TransactionKind,
    pub quantity: i64,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub reference_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTransaction {
    pub fn new(product_id: impl Into<String>, kind: TransactionKind, quantity: i64) -> Self {
        NewTransaction {
            product_id: product_id.into(),
            transaction_type: kind,
            quantity,
            reference_id: None,
            reference_type: None,
            notes: None,
        }
    }

    pub fn with_reference(
        mut self,
        reference_type: impl Into<String>,
        reference_id: impl Into<String>,
    ) -> Self {
        self.reference_type = Some(reference_type.into());
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A product whose on-hand stock is at or below its minimum level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LowStockItem {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub min_stock_level: i64,
    pub max_stock_level: i64,
    pub current_stock: i64,
    pub reserved_stock: i64,
    pub available_stock: i64,
}

impl LowStockItem {
    /// Units needed to bring on-hand stock back up to the maximum level.
    pub fn reorder_quantity(&self) -> i64 {
        (self.max_stock_level - self.current_stock).max(0)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A customer order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// `ORD-YYYYMMDD-XXXXXXXX`, unique.
    pub order_number: String,
    pub customer_id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// `unit_price_cents × quantity`.
    pub total_price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrderItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl NewOrderItem {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        NewOrderItem {
            product_id: product_id.into(),
            quantity,
            unit_price_cents,
        }
    }

    pub fn line_total(&self) -> ValidationResult<Money> {
        Money::from_cents(self.unit_price_cents)
            .checked_line_total(self.quantity)
            .ok_or_else(|| amount_out_of_range("total_price"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrder {
    pub customer_id: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn total(&self) -> ValidationResult<Money> {
        crate::order::document_total(
            self.items
                .iter()
                .map(|item| (item.unit_price_cents, item.quantity)),
        )
        .ok_or_else(|| amount_out_of_range("total"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
}

/// An order with its line items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// =============================================================================
// Purchase Orders
// =============================================================================

/// An order placed with a supplier. Stock moves only when it is received.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrder {
    pub id: String,
    /// `PO-YYYYMMDD-XXXXXXXX`, unique.
    pub po_number: String,
    pub supplier_id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    #[ts(as = "Option<String>")]
    pub expected_delivery: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrderItem {
    pub id: String,
    pub purchase_order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub total_cost_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchaseOrderItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

impl NewPurchaseOrderItem {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_cost_cents: i64) -> Self {
        NewPurchaseOrderItem {
            product_id: product_id.into(),
            quantity,
            unit_cost_cents,
        }
    }

    pub fn line_total(&self) -> ValidationResult<Money> {
        Money::from_cents(self.unit_cost_cents)
            .checked_line_total(self.quantity)
            .ok_or_else(|| amount_out_of_range("total_cost"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchaseOrder {
    pub supplier_id: String,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expected_delivery: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<NewPurchaseOrderItem>,
}

impl NewPurchaseOrder {
    pub fn total(&self) -> ValidationResult<Money> {
        crate::order::document_total(
            self.items
                .iter()
                .map(|item| (item.unit_cost_cents, item.quantity)),
        )
        .ok_or_else(|| amount_out_of_range("total"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseOrderUpdate {
    pub status: Option<OrderStatus>,
    #[ts(as = "Option<String>")]
    pub expected_delivery: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseOrderDetail {
    pub purchase_order: PurchaseOrder,
    pub items: Vec<PurchaseOrderItem>,
}
