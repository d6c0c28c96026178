//! # Order Lifecycle
//!
//! Every order and item status change, with its effects, goes through
//! here. A change is validated against the transition table and the
//! actor's rights first; only then are stock, the wallet and the order
//! touched, all under one write guard.
//!
//! Effects of entering `Cancelled` or `Returned`:
//! - open items are restocked exactly once and take the same status
//! - the remaining refundable amount goes to the customer's wallet when
//!   the order was paid
//!
//! An order only moves when each of its open items can make the same
//! move; items shipped or delivered ahead of the order stay where they are.
//! Items cancelled before the payment is taken are credited once it is.
//!
//! Refunds never exceed an order's final amount.

use crate::error::{ShopError, ShopResult};
use crate::money::Price;
use crate::order::{Actor, Order, OrderItem, OrderStatus, OrderUpdate, PaymentMethod, PaymentStatus};
use crate::store::{Page, Shop, ShopState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

pub const ORDER_PAGE_SIZE: usize = 6;

/// One item a customer wants to cancel or return
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRequest {
    pub product_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderStatusView {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}

/// Order counts and revenue over a set of orders
#[derive(Debug, Clone, Serialize)]
pub struct OrderStats {
    pub total_orders: usize,
    /// Final amounts of orders not cancelled or returned
    pub active_revenue: Price,
    pub total_revenue: Price,
    pub pending_orders: usize,
    pub delivered_orders: usize,
}

impl OrderStats {
    pub fn over<'a>(orders: impl Iterator<Item = &'a Order>, zero: Price) -> Self {
        let mut stats = OrderStats {
            total_orders: 0,
            active_revenue: zero,
            total_revenue: zero,
            pending_orders: 0,
            delivered_orders: 0,
        };
        for order in orders {
            stats.total_orders += 1;
            stats.total_revenue = stats.total_revenue.plus(order.final_amount);
            if order.status.is_active() {
                stats.active_revenue = stats.active_revenue.plus(order.final_amount);
            }
            match order.status {
                OrderStatus::Pending => stats.pending_orders += 1,
                OrderStatus::Delivered => stats.delivered_orders += 1,
                _ => {}
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminOrders {
    pub stats: OrderStats,
    pub orders: Page<Order>,
}

fn required_reason(reason: Option<String>) -> ShopResult<String> {
    match reason.map(|r| r.trim().to_string()) {
        Some(r) if !r.is_empty() => Ok(r),
        _ => Err(ShopError::InvalidRequest("A reason is required".into())),
    }
}

fn sorted_newest(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    orders
}

impl ShopState {
    /// Put an item's units back on the shelf
    fn restock(&mut self, item: &OrderItem) {
        if let Some(product) = self.products.get_mut(&item.product_id) {
            product.stock += item.quantity;
            product.sales_count = product.sales_count.saturating_sub(item.quantity);
        }
    }

    /// Credit up to `amount` to the customer's wallet for a paid order
    pub(crate) fn refund_to_wallet(&mut self, order: &mut Order, amount: Price, description: &str) -> Price {
        let zero = Price::zero(order.final_amount.currency);
        if !order.is_paid() {
            return zero;
        }
        let amount = amount.min(order.refundable());
        if amount.amount <= 0 {
            return zero;
        }
        self.wallet_mut(order.customer_id, amount.currency)
            .credit_refund(amount, order.id, description);
        order.refunded_amount = order.refunded_amount.plus(amount);
        if order.refundable().is_zero() {
            order.payment_status = PaymentStatus::Refunded;
        }
        info!(order_id = %order.id, amount = amount.amount, "Refund credited to wallet");
        amount
    }

    /// Credit the share of every item cancelled while the order was unpaid
    pub(crate) fn refund_cancelled_items(&mut self, order: &mut Order) -> Price {
        let mut refunded = Price::zero(order.final_amount.currency);
        let cancelled: Vec<usize> = order
            .items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.status == OrderStatus::Cancelled)
            .map(|(idx, _)| idx)
            .collect();
        for idx in cancelled {
            let share = order.item_refund(&order.items[idx]);
            let credited = self.refund_to_wallet(order, share, "Refund for cancelled item");
            refunded = refunded.plus(credited);
        }
        refunded
    }

    /// Stamp delivery. Cash on delivery is collected here, so items
    /// cancelled earlier are credited now.
    fn mark_delivered(&mut self, order: &mut Order, now: DateTime<Utc>) -> Price {
        order.delivered_at.get_or_insert(now);
        let collected_now = order.payment_method == PaymentMethod::Cod
            && order.payment_status == PaymentStatus::Pending;
        if collected_now {
            order.payment_status = PaymentStatus::Completed;
            return self.refund_cancelled_items(order);
        }
        Price::zero(order.final_amount.currency)
    }

    /// Move a whole order to `next`. The caller has validated the change.
    fn apply_order_transition(
        &mut self,
        order: &mut Order,
        next: OrderStatus,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Price {
        let mut refunded = Price::zero(order.final_amount.currency);
        for item in order
            .items
            .iter_mut()
            .filter(|i| i.is_open() && !i.status.has_reached(next))
        {
            if next.releases_stock() {
                self.restock(item);
            }
            item.status = next;
        }
        match next {
            OrderStatus::Cancelled => {
                order.cancellation_reason = reason;
                let remaining = order.refundable();
                refunded = self.refund_to_wallet(order, remaining, "Refund for cancelled order");
            }
            OrderStatus::Returned => {
                if reason.is_some() {
                    order.return_reason = reason;
                }
                let remaining = order.refundable();
                refunded = self.refund_to_wallet(order, remaining, "Refund for returned order");
            }
            OrderStatus::ReturnRequested => order.return_reason = reason,
            OrderStatus::Delivered => refunded = self.mark_delivered(order, now),
            _ => {}
        }
        order.status = next;
        refunded
    }

    /// Bring the order status in line with its items after item changes.
    /// Closing the order this way refunds whatever is still refundable.
    fn settle_from_items(&mut self, order: &mut Order, now: DateTime<Utc>) -> Price {
        let zero = Price::zero(order.final_amount.currency);
        let next = match order.status_from_items() {
            Some(next) if next != order.status => next,
            _ => return zero,
        };
        order.status = next;
        let remaining = order.refundable();
        match next {
            OrderStatus::Cancelled => {
                if order.cancellation_reason.is_none() {
                    order.cancellation_reason = order
                        .items
                        .iter()
                        .find_map(|i| i.cancellation_reason.clone());
                }
                self.refund_to_wallet(order, remaining, "Refund for cancelled order")
            }
            OrderStatus::Returned => self.refund_to_wallet(order, remaining, "Refund for returned order"),
            OrderStatus::Delivered => self.mark_delivered(order, now),
            _ => zero,
        }
    }

    fn check_order_transition(
        &self,
        actor: Actor,
        order: &Order,
        next: OrderStatus,
        reason: &Option<String>,
        now: DateTime<Utc>,
    ) -> ShopResult<()> {
        if !order.status.can_transition_to(next) {
            return Err(ShopError::InvalidTransition {
                from: order.status,
                to: next,
            });
        }
        // Items moved on their own must be able to follow the order
        let stuck = order.items.iter().find(|i| {
            i.is_open() && !i.status.has_reached(next) && !i.status.can_transition_to(next)
        });
        if let Some(item) = stuck {
            return Err(ShopError::NotPermitted(format!(
                "{} is {} and cannot become {}",
                item.name, item.status, next
            )));
        }
        match actor {
            Actor::Admin => {
                if next == OrderStatus::ReturnRequested {
                    return Err(ShopError::NotPermitted(
                        "Only the customer can request a return".into(),
                    ));
                }
            }
            Actor::Customer(customer_id) => {
                if order.customer_id != customer_id {
                    return Err(ShopError::not_found("Order", order.id));
                }
                self.active_customer(customer_id)?;
                required_reason(reason.clone())?;
                match (order.status, next) {
                    (OrderStatus::Pending, OrderStatus::Cancelled) => {}
                    (OrderStatus::Delivered, OrderStatus::ReturnRequested) => {
                        if !order.within_return_window(now) {
                            return Err(ShopError::NotPermitted(
                                "Return window has closed".into(),
                            ));
                        }
                        if order.items.iter().any(|i| i.is_open() && !i.returnable) {
                            return Err(ShopError::NotPermitted(
                                "Order contains items that cannot be returned".into(),
                            ));
                        }
                    }
                    _ => {
                        return Err(ShopError::NotPermitted(format!(
                            "Customers cannot move an order from {} to {}",
                            order.status, next
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

impl Shop {
    /// Change an order's status on behalf of `actor`
    pub fn transition_order(
        &self,
        actor: Actor,
        order_id: Uuid,
        next: OrderStatus,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> ShopResult<OrderUpdate> {
        let mut state = self.write()?;
        let mut order = state.order(order_id)?.clone();
        state.check_order_transition(actor, &order, next, &reason, now)?;
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

        let from = order.status;
        let refunded = state.apply_order_transition(&mut order, next, reason, now);
        info!(
            order_id = %order_id,
            from = %from,
            to = %next,
            refunded = refunded.amount,
            "Order status changed"
        );
        state.orders.insert(order_id, order.clone());
        Ok(OrderUpdate { order, refunded })
    }

    /// Admin status change
    pub fn update_order_status(&self, order_id: Uuid, next: OrderStatus) -> ShopResult<OrderUpdate> {
        self.transition_order(Actor::Admin, order_id, next, None, Utc::now())
    }

    /// Customer cancels a pending order
    pub fn cancel_order(&self, customer_id: Uuid, order_id: Uuid, reason: &str) -> ShopResult<OrderUpdate> {
        self.transition_order(
            Actor::Customer(customer_id),
            order_id,
            OrderStatus::Cancelled,
            Some(reason.to_string()),
            Utc::now(),
        )
    }

    /// Customer asks to return a delivered order
    pub fn request_return(&self, customer_id: Uuid, order_id: Uuid, reason: &str) -> ShopResult<OrderUpdate> {
        self.transition_order(
            Actor::Customer(customer_id),
            order_id,
            OrderStatus::ReturnRequested,
            Some(reason.to_string()),
            Utc::now(),
        )
    }

    /// Customer cancels some items of a pending or processing order
    pub fn cancel_items(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
        requests: Vec<ItemRequest>,
    ) -> ShopResult<OrderUpdate> {
        let now = Utc::now();
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        let mut order = state.owned_order(customer_id, order_id)?.clone();
        if !matches!(order.status, OrderStatus::Pending | OrderStatus::Processing) {
            return Err(ShopError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }
        let requests = validate_item_requests(&order, requests, |item| {
            item.status == order.status
        })?;

        let mut refunded = Price::zero(order.final_amount.currency);
        for (idx, reason) in requests {
            let item = order.items[idx].clone();
            state.restock(&item);
            order.items[idx].status = OrderStatus::Cancelled;
            order.items[idx].cancellation_reason = Some(reason);
            let share = order.item_refund(&item);
            let credited = state.refund_to_wallet(&mut order, share, "Refund for cancelled item");
            refunded = refunded.plus(credited);
        }
        refunded = refunded.plus(state.settle_from_items(&mut order, now));
        info!(order_id = %order_id, status = %order.status, "Order items cancelled");
        state.orders.insert(order_id, order.clone());
        Ok(OrderUpdate { order, refunded })
    }

    /// Customer asks to return some delivered items
    pub fn request_item_returns(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
        requests: Vec<ItemRequest>,
    ) -> ShopResult<OrderUpdate> {
        let now = Utc::now();
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        let mut order = state.owned_order(customer_id, order_id)?.clone();
        if order.status != OrderStatus::Delivered {
            return Err(ShopError::InvalidTransition {
                from: order.status,
                to: OrderStatus::ReturnRequested,
            });
        }
        if !order.within_return_window(now) {
            return Err(ShopError::NotPermitted("Return window has closed".into()));
        }
        let requests = validate_item_requests(&order, requests, |item| {
            item.status == OrderStatus::Delivered
        })?;
        if let Some((idx, _)) = requests.iter().find(|(idx, _)| !order.items[*idx].returnable) {
            return Err(ShopError::NotPermitted(format!(
                "{} cannot be returned",
                order.items[*idx].name
            )));
        }

        for (idx, reason) in requests {
            order.items[idx].status = OrderStatus::ReturnRequested;
            order.items[idx].return_reason = Some(reason);
        }
        let refunded = state.settle_from_items(&mut order, now);
        state.orders.insert(order_id, order.clone());
        Ok(OrderUpdate { order, refunded })
    }

    /// Admin moves a single item: approve or reject a return, cancel it,
    /// or ship and deliver it ahead of the rest
    pub fn update_item_status(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        next: OrderStatus,
    ) -> ShopResult<OrderUpdate> {
        let now = Utc::now();
        let mut state = self.write()?;
        let mut order = state.order(order_id)?.clone();
        let idx = order
            .items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or_else(|| ShopError::not_found("Order item", product_id))?;
        let current = order.items[idx].status;
        if !current.can_transition_to(next) {
            return Err(ShopError::InvalidTransition { from: current, to: next });
        }
        if next == OrderStatus::ReturnRequested {
            return Err(ShopError::NotPermitted(
                "Only the customer can request a return".into(),
            ));
        }

        let item = order.items[idx].clone();
        order.items[idx].status = next;
        let mut refunded = Price::zero(order.final_amount.currency);
        if next.releases_stock() {
            state.restock(&item);
            let share = order.item_refund(&item);
            let description = if next == OrderStatus::Returned {
                "Refund for returned item"
            } else {
                "Refund for cancelled item"
            };
            refunded = state.refund_to_wallet(&mut order, share, description);
        }
        refunded = refunded.plus(state.settle_from_items(&mut order, now));
        info!(
            order_id = %order_id,
            product_id = %product_id,
            from = %current,
            to = %next,
            "Order item status changed"
        );
        state.orders.insert(order_id, order.clone());
        Ok(OrderUpdate { order, refunded })
    }

    /// Remove an order. Customers may only remove their own closed orders.
    pub fn delete_order(&self, actor: Actor, order_id: Uuid) -> ShopResult<()> {
        let mut state = self.write()?;
        let order = state.order(order_id)?;
        if let Actor::Customer(customer_id) = actor {
            if order.customer_id != customer_id {
                return Err(ShopError::not_found("Order", order_id));
            }
            if !order.status.is_terminal() {
                return Err(ShopError::NotPermitted(
                    "Only cancelled or returned orders can be deleted".into(),
                ));
            }
        }
        state.orders.remove(&order_id);
        warn!(order_id = %order_id, "Order deleted");
        Ok(())
    }

    // ---- queries ----

    pub fn order(&self, order_id: Uuid) -> ShopResult<Order> {
        self.read()?.order(order_id).cloned()
    }

    pub fn customer_order(&self, customer_id: Uuid, order_id: Uuid) -> ShopResult<Order> {
        let state = self.read()?;
        state.active_customer(customer_id)?;
        state.owned_order(customer_id, order_id).cloned()
    }

    pub fn order_status(&self, customer_id: Uuid, order_id: Uuid) -> ShopResult<OrderStatusView> {
        let order = self.customer_order(customer_id, order_id)?;
        Ok(OrderStatusView {
            order_id: order.id,
            status: order.status,
            payment_status: order.payment_status,
        })
    }

    /// A customer's orders, newest first
    pub fn order_history(&self, customer_id: Uuid, page: usize) -> ShopResult<Page<Order>> {
        let state = self.read()?;
        state.active_customer(customer_id)?;
        let orders = state
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        Ok(Page::paginate(sorted_newest(orders), page, ORDER_PAGE_SIZE))
    }

    /// Back-office order listing with revenue stats
    pub fn admin_orders(&self, page: usize) -> ShopResult<AdminOrders> {
        let state = self.read()?;
        let stats = OrderStats::over(state.orders.values(), Price::zero(self.currency()));
        let orders = sorted_newest(state.orders.values().cloned().collect());
        Ok(AdminOrders {
            stats,
            orders: Page::paginate(orders, page, ORDER_PAGE_SIZE),
        })
    }

    pub fn cancelled_orders(&self) -> ShopResult<Vec<Order>> {
        let state = self.read()?;
        Ok(sorted_newest(
            state
                .orders
                .values()
                .filter(|o| o.status == OrderStatus::Cancelled)
                .cloned()
                .collect(),
        ))
    }
}

/// Resolve item requests to item indexes. Every product must be in the
/// order, appear once, pass `eligible`, and carry a reason.
fn validate_item_requests(
    order: &Order,
    requests: Vec<ItemRequest>,
    eligible: impl Fn(&OrderItem) -> bool,
) -> ShopResult<Vec<(usize, String)>> {
    if requests.is_empty() {
        return Err(ShopError::InvalidRequest("No items selected".into()));
    }
    let mut resolved: Vec<(usize, String)> = Vec::with_capacity(requests.len());
    for request in requests {
        let reason = required_reason(Some(request.reason))?;
        let idx = order
            .items
            .iter()
            .position(|i| i.product_id == request.product_id)
            .ok_or_else(|| ShopError::not_found("Order item", request.product_id))?;
        if resolved.iter().any(|(seen, _)| *seen == idx) {
            return Err(ShopError::InvalidRequest(format!(
                "Item {} listed twice",
                request.product_id
            )));
        }
        if !eligible(&order.items[idx]) {
            return Err(ShopError::InvalidRequest(format!(
                "{} is {} and cannot be changed",
                order.items[idx].name, order.items[idx].status
            )));
        }
        resolved.push((idx, reason));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::PaymentMethod;
    use crate::testkit::*;

    #[test]
    fn test_customer_cancel_refunds_wallet_order() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Lamp", 800_00, 800_00, 5);
        kit.fund(customer, 2000_00);

        let order = kit.buy(customer, address, p, 2, PaymentMethod::Wallet);
        assert_eq!(kit.stock(p), 3);
        assert_eq!(kit.balance(customer), 400_00);

        let update = kit.shop.cancel_order(customer, order.id, "Changed my mind").unwrap();
        assert_eq!(update.refunded.amount, 1600_00);
        assert_eq!(update.order.status, OrderStatus::Cancelled);
        assert_eq!(update.order.payment_status, PaymentStatus::Refunded);
        assert!(update.order.items.iter().all(|i| i.status == OrderStatus::Cancelled));
        assert_eq!(kit.stock(p), 5);
        assert_eq!(kit.balance(customer), 2000_00);
    }

    #[test]
    fn test_cod_cancel_restocks_without_refund() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Mug", 300_00, 300_00, 4);
        let order = kit.buy(customer, address, p, 1, PaymentMethod::Cod);

        let update = kit.shop.cancel_order(customer, order.id, "Ordered by mistake").unwrap();
        assert!(update.refunded.is_zero());
        assert_eq!(update.order.payment_status, PaymentStatus::Pending);
        assert_eq!(kit.stock(p), 4);
        assert_eq!(kit.shop.product(p).unwrap().product.sales_count, 0);
    }

    #[test]
    fn test_customer_cancel_rules() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let (stranger, _) = kit.customer("Ravi");
        let p = kit.product("Mug", 300_00, 300_00, 4);
        let order = kit.buy(customer, address, p, 1, PaymentMethod::Cod);

        assert!(matches!(
            kit.shop.cancel_order(customer, order.id, "  ").unwrap_err(),
            ShopError::InvalidRequest(_)
        ));
        assert!(matches!(
            kit.shop.cancel_order(stranger, order.id, "mine now").unwrap_err(),
            ShopError::NotFound { .. }
        ));

        kit.shop.update_order_status(order.id, OrderStatus::Processing).unwrap();
        assert!(matches!(
            kit.shop.cancel_order(customer, order.id, "late").unwrap_err(),
            ShopError::NotPermitted(_)
        ));
    }

    #[test]
    fn test_restock_happens_once() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Vase", 1000_00, 1000_00, 3);
        let order = kit.buy(customer, address, p, 2, PaymentMethod::Cod);

        kit.shop.update_order_status(order.id, OrderStatus::Cancelled).unwrap();
        assert_eq!(kit.stock(p), 3);
        let err = kit
            .shop
            .update_order_status(order.id, OrderStatus::Cancelled)
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidTransition { .. }));
        assert_eq!(kit.stock(p), 3);
    }

    #[test]
    fn test_admin_walks_order_to_delivered() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Vase", 600_00, 600_00, 3);
        let order = kit.buy(customer, address, p, 1, PaymentMethod::Cod);

        assert!(kit.shop.update_order_status(order.id, OrderStatus::Delivered).is_err());
        for next in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
            kit.shop.update_order_status(order.id, next).unwrap();
        }
        let order = kit.shop.order(order.id).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.delivered_at.is_some());
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert!(order.items.iter().all(|i| i.status == OrderStatus::Delivered));
        assert!(kit.shop.update_order_status(order.id, OrderStatus::ReturnRequested).is_err());
    }

    #[test]
    fn test_return_flow_refunds_cod_after_delivery() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Kettle", 900_00, 900_00, 2);
        let order = kit.buy(customer, address, p, 1, PaymentMethod::Cod);
        kit.deliver(order.id);

        let update = kit.shop.request_return(customer, order.id, "Damaged").unwrap();
        assert_eq!(update.order.status, OrderStatus::ReturnRequested);
        assert!(update.refunded.is_zero());

        // rejected, then requested again and approved
        kit.shop.update_order_status(order.id, OrderStatus::Delivered).unwrap();
        kit.shop.request_return(customer, order.id, "Still damaged").unwrap();
        let update = kit.shop.update_order_status(order.id, OrderStatus::Returned).unwrap();
        assert_eq!(update.refunded.amount, 900_00);
        assert_eq!(update.order.return_reason.as_deref(), Some("Still damaged"));
        assert_eq!(kit.stock(p), 2);
        assert_eq!(kit.balance(customer), 900_00);
    }

    #[test]
    fn test_return_window_enforced() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Kettle", 900_00, 900_00, 2);
        let order = kit.buy(customer, address, p, 1, PaymentMethod::Cod);
        kit.deliver(order.id);
        kit.shop
            .write()
            .unwrap()
            .orders
            .get_mut(&order.id)
            .unwrap()
            .delivered_at = Some(Utc::now() - chrono::Duration::days(31));

        assert!(matches!(
            kit.shop.request_return(customer, order.id, "Too late").unwrap_err(),
            ShopError::NotPermitted(_)
        ));
    }

    #[test]
    fn test_item_cancel_partial_refund_and_close() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let a = kit.product("Pen", 600_00, 600_00, 5);
        let b = kit.product("Ink", 400_00, 400_00, 5);
        kit.fund(customer, 5000_00);
        kit.shop.create_coupon(coupon_input("TEN", 10, 0)).unwrap();
        kit.shop.add_to_cart(customer, a).unwrap();
        kit.shop.add_to_cart(customer, b).unwrap();
        let order = kit.place_from_cart(customer, address, PaymentMethod::Wallet, Some("TEN"));
        assert_eq!(order.final_amount.amount, 900_00);

        let update = kit
            .shop
            .cancel_items(customer, order.id, vec![ItemRequest { product_id: a, reason: "dup".into() }])
            .unwrap();
        assert_eq!(update.refunded.amount, 540_00);
        assert_eq!(update.order.status, OrderStatus::Pending);
        assert_eq!(kit.stock(a), 5);

        let update = kit
            .shop
            .cancel_items(customer, order.id, vec![ItemRequest { product_id: b, reason: "dup".into() }])
            .unwrap();
        assert_eq!(update.refunded.amount, 360_00);
        assert_eq!(update.order.status, OrderStatus::Cancelled);
        assert_eq!(update.order.refunded_amount.amount, 900_00);
        assert_eq!(update.order.payment_status, PaymentStatus::Refunded);
        assert_eq!(update.order.cancellation_reason.as_deref(), Some("dup"));
    }

    #[test]
    fn test_cod_delivery_credits_items_cancelled_earlier() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let a = kit.product("Pen", 600_00, 600_00, 5);
        let b = kit.product("Ink", 400_00, 400_00, 5);
        kit.shop.add_to_cart(customer, a).unwrap();
        kit.shop.add_to_cart(customer, b).unwrap();
        let order = kit.place_from_cart(customer, address, PaymentMethod::Cod, None);

        let update = kit
            .shop
            .cancel_items(customer, order.id, vec![ItemRequest { product_id: a, reason: "dup".into() }])
            .unwrap();
        assert!(update.refunded.is_zero());

        kit.shop.update_order_status(order.id, OrderStatus::Processing).unwrap();
        kit.shop.update_order_status(order.id, OrderStatus::Shipped).unwrap();
        let update = kit.shop.update_order_status(order.id, OrderStatus::Delivered).unwrap();
        assert_eq!(update.refunded.amount, 600_00);
        assert_eq!(update.order.payment_status, PaymentStatus::Completed);
        assert_eq!(update.order.refunded_amount.amount, 600_00);
        assert_eq!(kit.balance(customer), 600_00);
    }

    #[test]
    fn test_order_move_respects_items_ahead() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let a = kit.product("Cup", 300_00, 300_00, 5);
        let b = kit.product("Saucer", 200_00, 200_00, 5);
        kit.fund(customer, 1000_00);
        kit.shop.add_to_cart(customer, a).unwrap();
        kit.shop.add_to_cart(customer, b).unwrap();
        let order = kit.place_from_cart(customer, address, PaymentMethod::Wallet, None);

        // a ships ahead; moving the order on leaves it shipped
        kit.shop.update_item_status(order.id, a, OrderStatus::Processing).unwrap();
        kit.shop.update_item_status(order.id, a, OrderStatus::Shipped).unwrap();
        let update = kit.shop.update_order_status(order.id, OrderStatus::Processing).unwrap();
        assert_eq!(update.order.item(a).unwrap().status, OrderStatus::Shipped);
        assert_eq!(update.order.item(b).unwrap().status, OrderStatus::Processing);

        kit.shop.update_order_status(order.id, OrderStatus::Shipped).unwrap();
        kit.shop.update_item_status(order.id, a, OrderStatus::Delivered).unwrap();

        // a delivered item cannot be cancelled with the order
        assert!(matches!(
            kit.shop.update_order_status(order.id, OrderStatus::Cancelled).unwrap_err(),
            ShopError::NotPermitted(_)
        ));
        let order = kit.shop.order(order.id).unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.item(a).unwrap().status, OrderStatus::Delivered);
        assert!(order.refunded_amount.is_zero());
        assert_eq!(kit.stock(a), 4);
        assert_eq!(kit.balance(customer), 500_00);

        let update = kit.shop.update_order_status(order.id, OrderStatus::Delivered).unwrap();
        assert!(update.order.items.iter().all(|i| i.status == OrderStatus::Delivered));
    }

    #[test]
    fn test_refunds_never_exceed_final_amount() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let ids: Vec<Uuid> = (0..3)
            .map(|i| kit.product(&format!("Item {i}"), 333_33, 333_33, 5))
            .collect();
        kit.fund(customer, 5000_00);
        kit.shop.create_coupon(coupon_input("SEVEN", 7, 0)).unwrap();
        for id in &ids {
            kit.shop.add_to_cart(customer, *id).unwrap();
        }
        let order = kit.place_from_cart(customer, address, PaymentMethod::Wallet, Some("SEVEN"));

        for id in &ids {
            kit.shop.update_item_status(order.id, *id, OrderStatus::Cancelled).unwrap();
        }
        let order = kit.shop.order(order.id).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.refunded_amount, order.final_amount);
        assert_eq!(kit.balance(customer), 5000_00);
    }

    #[test]
    fn test_item_returns_then_admin_approval() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let a = kit.product("Cup", 200_00, 200_00, 5);
        let b = kit.product("Saucer", 100_00, 100_00, 5);
        kit.shop.add_to_cart(customer, a).unwrap();
        kit.shop.add_to_cart(customer, b).unwrap();
        let order = kit.place_from_cart(customer, address, PaymentMethod::Cod, None);
        kit.deliver(order.id);

        let update = kit
            .shop
            .request_item_returns(customer, order.id, vec![ItemRequest { product_id: a, reason: "chipped".into() }])
            .unwrap();
        assert_eq!(update.order.status, OrderStatus::Delivered);

        let update = kit.shop.update_item_status(order.id, a, OrderStatus::Returned).unwrap();
        assert_eq!(update.refunded.amount, 200_00);
        assert_eq!(update.order.status, OrderStatus::Delivered);
        assert_eq!(kit.stock(a), 5);

        // returning an item twice is refused
        assert!(kit.shop.update_item_status(order.id, a, OrderStatus::Returned).is_err());

        kit.shop
            .request_item_returns(customer, order.id, vec![ItemRequest { product_id: b, reason: "set".into() }])
            .unwrap();
        let update = kit.shop.update_item_status(order.id, b, OrderStatus::Returned).unwrap();
        assert_eq!(update.order.status, OrderStatus::Returned);
        assert_eq!(update.order.payment_status, PaymentStatus::Refunded);
        assert_eq!(kit.balance(customer), 300_00);
    }

    #[test]
    fn test_non_returnable_item_refused() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let mut input = kit.new_product("Socks", 100_00);
        input.returnable = false;
        let p = kit.shop.add_product(input).unwrap().id;
        let order = kit.buy(customer, address, p, 1, PaymentMethod::Cod);
        kit.deliver(order.id);

        assert!(kit.shop.request_return(customer, order.id, "no").is_err());
        assert!(kit
            .shop
            .request_item_returns(customer, order.id, vec![ItemRequest { product_id: p, reason: "no".into() }])
            .is_err());
    }

    #[test]
    fn test_delete_order_rules() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Mug", 300_00, 300_00, 4);
        let order = kit.buy(customer, address, p, 1, PaymentMethod::Cod);

        assert!(matches!(
            kit.shop.delete_order(Actor::Customer(customer), order.id).unwrap_err(),
            ShopError::NotPermitted(_)
        ));
        kit.shop.cancel_order(customer, order.id, "oops").unwrap();
        kit.shop.delete_order(Actor::Customer(customer), order.id).unwrap();
        assert!(kit.shop.order(order.id).is_err());

        let other = kit.buy(customer, address, p, 1, PaymentMethod::Cod);
        kit.shop.delete_order(Actor::Admin, other.id).unwrap();
    }

    #[test]
    fn test_order_history_and_admin_stats() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Mug", 100_00, 100_00, 50);
        let mut ids = Vec::new();
        for _ in 0..7 {
            ids.push(kit.buy(customer, address, p, 1, PaymentMethod::Cod).id);
        }
        kit.shop.cancel_order(customer, ids[0], "nope").unwrap();

        let history = kit.shop.order_history(customer, 1).unwrap();
        assert_eq!(history.items.len(), ORDER_PAGE_SIZE);
        assert_eq!(history.total, 7);

        let admin = kit.shop.admin_orders(1).unwrap();
        assert_eq!(admin.stats.total_orders, 7);
        assert_eq!(admin.stats.active_revenue.amount, 600_00);
        assert_eq!(admin.stats.total_revenue.amount, 700_00);
        assert_eq!(admin.stats.pending_orders, 6);
        assert_eq!(kit.shop.cancelled_orders().unwrap().len(), 1);
    }
}
