//! # Order Types
//!
//! Orders, their items, and the status transition table every status
//! change goes through.
//!
//! ```text
//! Pending          ─► Processing | Cancelled
//! Processing       ─► Shipped | Cancelled
//! Shipped          ─► Delivered | Cancelled
//! Delivered        ─► ReturnRequested | Returned
//! ReturnRequested  ─► Returned | Delivered (return rejected)
//! Cancelled, Returned: terminal
//! ```

use crate::money::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customers may ask for a return this many days after delivery
pub const RETURN_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    ReturnRequested,
    Returned,
}

/// Items move through the same states as their order
pub type ItemStatus = OrderStatus;

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::ReturnRequested => "return_requested",
            OrderStatus::Returned => "returned",
        }
    }

    /// The transition table
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
                | (Shipped, Cancelled)
                | (Delivered, ReturnRequested)
                | (Delivered, Returned)
                | (ReturnRequested, Returned)
                | (ReturnRequested, Delivered)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }

    /// Entering this status gives stock and money back
    pub fn releases_stock(self) -> bool {
        self.is_terminal()
    }

    /// Counted towards active revenue
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Position on the way to delivery, `None` off that path
    pub fn progress(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            _ => None,
        }
    }

    /// Already at or past `next` on the way to delivery
    pub fn has_reached(self, next: OrderStatus) -> bool {
        match (self.progress(), next.progress()) {
            (Some(at), Some(wanted)) => at >= wanted,
            _ => self == next,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    Wallet,
    Online,
}

/// Who is asking for a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Customer(Uuid),
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    /// Product name (denormalized for display)
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub unit_price: Price,
    pub quantity: u32,
    pub status: ItemStatus,
    pub returnable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_reason: Option<String>,
}

impl OrderItem {
    pub fn total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }

    /// Not yet cancelled or returned
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<OrderItem>,
    pub subtotal: Price,
    pub discount: Price,
    pub delivery_charge: Price,
    pub final_amount: Price,
    pub refunded_amount: Price,
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// The latest gateway order opened for this order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_order_id: Option<String>,
    /// Every gateway order opened for this order, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gateway_order_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    /// Captures that arrived after the order was already paid
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_payment_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    /// Placed from the cart (rather than a buy-now)
    pub from_cart: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    /// What can still be refunded
    pub fn refundable(&self) -> Price {
        self.final_amount.saturating_sub(self.refunded_amount)
    }

    /// Refund owed for one item: its share of the final amount after the
    /// coupon discount, capped by what remains refundable
    pub fn item_refund(&self, item: &OrderItem) -> Price {
        if self.subtotal.amount <= 0 {
            return Price::zero(self.final_amount.currency);
        }
        let share = item
            .total()
            .scale(self.final_amount.amount, self.subtotal.amount);
        Price::from_minor(share.amount, self.final_amount.currency).min(self.refundable())
    }

    /// Payment was taken and money can go back to the wallet
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }

    /// Whether `gateway_order_id` was opened for this order
    pub fn owns_gateway_order(&self, gateway_order_id: &str) -> bool {
        self.gateway_order_ids.iter().any(|id| id == gateway_order_id)
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn item(&self, product_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Whether the return window is still open at `now`
    pub fn within_return_window(&self, now: DateTime<Utc>) -> bool {
        self.delivered_at
            .map(|at| now - at <= chrono::Duration::days(RETURN_WINDOW_DAYS))
            .unwrap_or(false)
    }

    /// The order status implied by its items, if they agree on one
    pub fn status_from_items(&self) -> Option<OrderStatus> {
        let live: Vec<ItemStatus> = self
            .items
            .iter()
            .map(|i| i.status)
            .filter(|s| *s != OrderStatus::Cancelled)
            .collect();
        let first = match live.first() {
            None => return Some(OrderStatus::Cancelled),
            Some(first) => *first,
        };
        if live.iter().all(|s| *s == OrderStatus::Returned) {
            Some(OrderStatus::Returned)
        } else if live
            .iter()
            .all(|s| matches!(s, OrderStatus::Returned | OrderStatus::ReturnRequested))
        {
            Some(OrderStatus::ReturnRequested)
        } else if live.iter().all(|s| *s == first) {
            Some(first)
        } else {
            None
        }
    }
}

/// Outcome of a lifecycle operation
#[derive(Debug, Clone, Serialize)]
pub struct OrderUpdate {
    pub order: Order,
    /// Amount credited to the wallet by this change
    pub refunded: Price,
}
