//! # Checkout
//!
//! Turns a cart (or a single buy-now product) into an order. Totals are
//! always computed here from stored prices. Stock, the wallet, the
//! coupon ledger and the cart change together under one write guard.
//!
//! Online orders are created with a pending payment; the API attaches the
//! gateway order and confirms the payment once the gateway signature has
//! been verified. An order whose final amount is zero is paid on placement
//! whatever the method, so it never reaches the gateway.

use crate::cart::{CartView, MAX_QTY_PER_PRODUCT};
use crate::coupon::Coupon;
use crate::customer::Address;
use crate::error::{ShopError, ShopResult};
use crate::money::Price;
use crate::order::{Order, OrderItem, OrderStatus, OrderUpdate, PaymentMethod, PaymentStatus};
use crate::store::Shop;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Cash on delivery is refused above this final amount (₹1000)
pub const COD_LIMIT_MINOR: i64 = 1000_00;

/// Smallest amount the payment gateway will open an order for (₹1)
pub const ONLINE_MINIMUM_MINOR: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct BuyNow {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrder {
    pub address_id: Uuid,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub buy_now: Option<BuyNow>,
}

/// Everything the checkout page shows
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSummary {
    pub cart: CartView,
    pub addresses: Vec<Address>,
    pub wallet_balance: Price,
    pub coupons: Vec<Coupon>,
    pub cod_allowed: bool,
}

struct Line {
    item: OrderItem,
    stock: u32,
}

impl Shop {
    pub fn checkout_summary(&self, customer_id: Uuid, now: DateTime<Utc>) -> ShopResult<CheckoutSummary> {
        let cart = self.cart(customer_id)?;
        let addresses = self.addresses(customer_id)?;
        let coupons = self.available_coupons(now)?;
        let state = self.read()?;
        let wallet_balance = state.wallet_balance(customer_id, self.currency());
        Ok(CheckoutSummary {
            cod_allowed: cart.total.amount <= COD_LIMIT_MINOR,
            cart,
            addresses,
            wallet_balance,
            coupons,
        })
    }

    /// Place an order from the cart or a buy-now product
    pub fn place_order(&self, customer_id: Uuid, request: PlaceOrder, now: DateTime<Utc>) -> ShopResult<Order> {
        let currency = self.currency();
        let mut state = self.write()?;
        state.active_customer(customer_id)?;

        let shipping_address = state
            .addresses
            .get(&customer_id)
            .and_then(|book| book.iter().find(|a| a.id == request.address_id))
            .map(Address::shipping_label)
            .ok_or_else(|| ShopError::not_found("Address", request.address_id))?;

        // Lines with the stock they draw on
        let from_cart = request.buy_now.is_none();
        let wanted: Vec<(Uuid, u32, Option<Price>)> = match &request.buy_now {
            Some(buy) => {
                if buy.quantity == 0 || buy.quantity > MAX_QTY_PER_PRODUCT {
                    return Err(ShopError::QuantityLimit {
                        max: MAX_QTY_PER_PRODUCT,
                    });
                }
                vec![(buy.product_id, buy.quantity, None)]
            }
            None => state
                .carts
                .get(&customer_id)
                .map(|items| {
                    items
                        .iter()
                        .map(|i| (i.product_id, i.quantity, Some(i.unit_price)))
                        .collect()
                })
                .unwrap_or_default(),
        };
        if wanted.is_empty() {
            return Err(ShopError::InvalidRequest("Cart is empty".into()));
        }

        let mut lines = Vec::with_capacity(wanted.len());
        for (product_id, quantity, cart_price) in wanted {
            let product = state.product(product_id)?;
            if !state.is_purchasable(product) {
                return Err(ShopError::InvalidRequest(format!(
                    "{} is no longer available",
                    product.name
                )));
            }
            if product.stock < quantity {
                return Err(ShopError::OutOfStock {
                    product: product.name.clone(),
                    available: product.stock,
                });
            }
            let unit_price = cart_price.unwrap_or_else(|| state.effective_price(product).0);
            lines.push(Line {
                item: OrderItem {
                    product_id,
                    name: product.name.clone(),
                    image: product.images.first().cloned(),
                    unit_price,
                    quantity,
                    status: OrderStatus::Pending,
                    returnable: product.returnable,
                    cancellation_reason: None,
                    return_reason: None,
                },
                stock: product.stock,
            });
        }

        let subtotal = lines
            .iter()
            .fold(Price::zero(currency), |acc, l| acc.plus(l.item.total()));
        let (discount, coupon_code) = match request.coupon_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                let coupon = state.validate_coupon(customer_id, code, subtotal, now.date_naive())?;
                (coupon.discount_on(subtotal), Some(coupon.code.clone()))
            }
            _ => (Price::zero(currency), None),
        };
        let delivery_charge = Price::zero(currency);
        let final_amount = subtotal.saturating_sub(discount).plus(delivery_charge);

        if request.payment_method == PaymentMethod::Cod && final_amount.amount > COD_LIMIT_MINOR {
            return Err(ShopError::PaymentNotAllowed(format!(
                "Cash on delivery is not available for orders above {}",
                Price::from_minor(COD_LIMIT_MINOR, currency).display()
            )));
        }
        if request.payment_method == PaymentMethod::Online
            && final_amount.amount > 0
            && final_amount.amount < ONLINE_MINIMUM_MINOR
        {
            return Err(ShopError::PaymentNotAllowed(format!(
                "Online payment needs at least {}",
                Price::from_minor(ONLINE_MINIMUM_MINOR, currency).display()
            )));
        }
        if request.payment_method == PaymentMethod::Wallet {
            let available = state.wallet_balance(customer_id, currency);
            if available.amount < final_amount.amount {
                return Err(ShopError::InsufficientBalance {
                    required: final_amount,
                    available,
                });
            }
        }

        // Validated: apply every effect
        let order_id = Uuid::new_v4();
        for line in &lines {
            let product = state.product_mut(line.item.product_id)?;
            product.stock = line.stock - line.item.quantity;
            product.sales_count += line.item.quantity;
        }
        let payment_status = match request.payment_method {
            _ if final_amount.is_zero() => PaymentStatus::Completed,
            PaymentMethod::Wallet => {
                state
                    .wallet_mut(customer_id, currency)
                    .debit_purchase(final_amount, order_id)?;
                PaymentStatus::Completed
            }
            PaymentMethod::Cod | PaymentMethod::Online => PaymentStatus::Pending,
        };
        if let Some(code) = &coupon_code {
            state.redeem_coupon(customer_id, code);
        }
        let awaits_gateway =
            request.payment_method == PaymentMethod::Online && payment_status == PaymentStatus::Pending;
        if from_cart && !awaits_gateway {
            state.carts.remove(&customer_id);
        }

        let order = Order {
            id: order_id,
            customer_id,
            items: lines.into_iter().map(|l| l.item).collect(),
            subtotal,
            discount,
            delivery_charge,
            final_amount,
            refunded_amount: Price::zero(currency),
            shipping_address,
            payment_method: request.payment_method,
            payment_status,
            gateway_order_id: None,
            gateway_order_ids: Vec::new(),
            payment_id: None,
            duplicate_payment_ids: Vec::new(),
            coupon_code,
            status: OrderStatus::Pending,
            from_cart,
            cancellation_reason: None,
            return_reason: None,
            created_at: now,
            delivered_at: None,
        };
        state.orders.insert(order.id, order.clone());
        info!(
            order_id = %order.id,
            customer_id = %customer_id,
            amount = order.final_amount.amount,
            method = ?order.payment_method,
            "Order placed"
        );
        Ok(order)
    }

    /// Remember the gateway order created for an online payment. Earlier
    /// gateway orders of the same order stay valid for a late capture.
    pub fn attach_gateway_order(&self, order_id: Uuid, gateway_order_id: &str) -> ShopResult<Order> {
        let mut state = self.write()?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ShopError::not_found("Order", order_id))?;
        if order.payment_method != PaymentMethod::Online {
            return Err(ShopError::PaymentNotAllowed(
                "Order is not paid online".into(),
            ));
        }
        if !order.owns_gateway_order(gateway_order_id) {
            order.gateway_order_ids.push(gateway_order_id.to_string());
        }
        order.gateway_order_id = Some(gateway_order_id.to_string());
        Ok(order.clone())
    }

    /// Record the outcome of an online payment whose signature has been
    /// verified. Replaying the confirmation of a paid order is a no-op; a
    /// second capture on another gateway order goes back to the wallet.
    pub fn confirm_online_payment(
        &self,
        order_id: Uuid,
        gateway_order_id: &str,
        payment_id: &str,
        captured: bool,
    ) -> ShopResult<OrderUpdate> {
        let mut state = self.write()?;
        let mut order = state.order(order_id)?.clone();
        let zero = Price::zero(order.final_amount.currency);
        if order.payment_method != PaymentMethod::Online {
            return Err(ShopError::PaymentNotAllowed(
                "Order is not paid online".into(),
            ));
        }
        if !order.owns_gateway_order(gateway_order_id) {
            return Err(ShopError::SignatureMismatch(
                "Gateway order does not belong to this order".into(),
            ));
        }
        if matches!(order.payment_status, PaymentStatus::Completed | PaymentStatus::Refunded) {
            let duplicate = captured
                && order.payment_id.as_deref() != Some(payment_id)
                && !order.duplicate_payment_ids.iter().any(|p| p == payment_id);
            if !duplicate {
                return Ok(OrderUpdate { order, refunded: zero });
            }
            let amount = order.final_amount;
            state
                .wallet_mut(order.customer_id, amount.currency)
                .credit_refund(amount, order.id, "Refund for duplicate payment");
            order.duplicate_payment_ids.push(payment_id.to_string());
            warn!(order_id = %order_id, payment_id, "Duplicate capture returned to wallet");
            state.orders.insert(order_id, order.clone());
            return Ok(OrderUpdate { order, refunded: amount });
        }

        order.payment_id = Some(payment_id.to_string());
        let mut refunded = zero;
        if captured {
            order.payment_status = PaymentStatus::Completed;
            if order.from_cart {
                state.carts.remove(&order.customer_id);
            }
            // Paid after the customer already cancelled: the money goes back
            refunded = if order.status == OrderStatus::Cancelled {
                let remaining = order.refundable();
                state.refund_to_wallet(&mut order, remaining, "Refund for cancelled order")
            } else {
                state.refund_cancelled_items(&mut order)
            };
            info!(order_id = %order_id, payment_id, "Online payment captured");
        } else {
            order.payment_status = PaymentStatus::Failed;
            warn!(order_id = %order_id, payment_id, "Online payment not captured");
        }
        state.orders.insert(order_id, order.clone());
        Ok(OrderUpdate { order, refunded })
    }

    /// An online order the customer may pay again
    pub fn retryable_order(&self, customer_id: Uuid, order_id: Uuid) -> ShopResult<Order> {
        let state = self.read()?;
        state.active_customer(customer_id)?;
        let order = state.owned_order(customer_id, order_id)?;
        if order.payment_method != PaymentMethod::Online {
            return Err(ShopError::PaymentNotAllowed(
                "Only online orders can be retried".into(),
            ));
        }
        if matches!(order.payment_status, PaymentStatus::Completed | PaymentStatus::Refunded) {
            return Err(ShopError::Conflict("Order is already paid".into()));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(ShopError::InvalidRequest("Order is cancelled".into()));
        }
        Ok(order.clone())
    }

    pub fn order_by_gateway_order(&self, gateway_order_id: &str) -> ShopResult<Option<Order>> {
        let state = self.read()?;
        Ok(state
            .orders
            .values()
            .find(|o| o.owns_gateway_order(gateway_order_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::*;

    #[test]
    fn test_cod_limit() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Chair", 1200_00, 1200_00, 3);
        let request = PlaceOrder {
            address_id: address,
            payment_method: PaymentMethod::Cod,
            coupon_code: None,
            buy_now: Some(BuyNow { product_id: p, quantity: 1 }),
        };
        let err = kit.shop.place_order(customer, request, Utc::now()).unwrap_err();
        assert!(matches!(err, ShopError::PaymentNotAllowed(_)));
        assert_eq!(kit.stock(p), 3);
    }

    #[test]
    fn test_cod_allowed_at_limit_after_coupon() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Chair", 1250_00, 1250_00, 3);
        kit.shop.create_coupon(coupon_input("QUARTER", 20, 0)).unwrap();
        kit.shop.add_to_cart(customer, p).unwrap();

        let order = kit.place_from_cart(customer, address, PaymentMethod::Cod, Some("quarter"));
        assert_eq!(order.final_amount.amount, 1000_00);
        assert_eq!(order.coupon_code.as_deref(), Some("QUARTER"));
        assert!(kit.shop.cart(customer).unwrap().items.is_empty());

        // coupon is spent
        kit.shop.add_to_cart(customer, p).unwrap();
        let request = PlaceOrder {
            address_id: address,
            payment_method: PaymentMethod::Online,
            coupon_code: Some("QUARTER".into()),
            buy_now: None,
        };
        assert!(matches!(
            kit.shop.place_order(customer, request, Utc::now()).unwrap_err(),
            ShopError::CouponRejected(_)
        ));
    }

    #[test]
    fn test_wallet_order_needs_balance() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Desk", 3000_00, 3000_00, 3);
        kit.fund(customer, 1000_00);
        let request = PlaceOrder {
            address_id: address,
            payment_method: PaymentMethod::Wallet,
            coupon_code: None,
            buy_now: Some(BuyNow { product_id: p, quantity: 1 }),
        };
        assert!(matches!(
            kit.shop.place_order(customer, request, Utc::now()).unwrap_err(),
            ShopError::InsufficientBalance { .. }
        ));
        assert_eq!(kit.stock(p), 3);
        assert_eq!(kit.balance(customer), 1000_00);
    }

    #[test]
    fn test_stock_and_sales_count_move_together() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Lamp", 100_00, 100_00, 3);
        kit.buy(customer, address, p, 2, PaymentMethod::Cod);
        let summary = kit.shop.product(p).unwrap();
        assert_eq!(summary.product.stock, 1);
        assert_eq!(summary.product.sales_count, 2);

        let request = PlaceOrder {
            address_id: address,
            payment_method: PaymentMethod::Cod,
            coupon_code: None,
            buy_now: Some(BuyNow { product_id: p, quantity: 2 }),
        };
        assert!(matches!(
            kit.shop.place_order(customer, request, Utc::now()).unwrap_err(),
            ShopError::OutOfStock { available: 1, .. }
        ));
    }

    #[test]
    fn test_buy_now_uses_effective_price_and_keeps_cart() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Clock", 500_00, 400_00, 5);
        let other = kit.product("Frame", 100_00, 100_00, 5);
        kit.shop.add_product_offer(p, 50).unwrap();
        kit.shop.add_to_cart(customer, other).unwrap();

        let order = kit.buy(customer, address, p, 2, PaymentMethod::Cod);
        assert_eq!(order.subtotal.amount, 400_00);
        assert!(!order.from_cart);
        assert_eq!(kit.shop.cart(customer).unwrap().items.len(), 1);
    }

    #[test]
    fn test_empty_cart_and_unknown_address() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let request = PlaceOrder {
            address_id: address,
            payment_method: PaymentMethod::Cod,
            coupon_code: None,
            buy_now: None,
        };
        assert!(matches!(
            kit.shop.place_order(customer, request, Utc::now()).unwrap_err(),
            ShopError::InvalidRequest(_)
        ));
        let request = PlaceOrder {
            address_id: Uuid::new_v4(),
            payment_method: PaymentMethod::Cod,
            coupon_code: None,
            buy_now: None,
        };
        assert!(matches!(
            kit.shop.place_order(customer, request, Utc::now()).unwrap_err(),
            ShopError::NotFound { .. }
        ));
    }

    #[test]
    fn test_online_payment_confirmation() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Rug", 2500_00, 2500_00, 2);
        kit.shop.add_to_cart(customer, p).unwrap();
        let order = kit.place_from_cart(customer, address, PaymentMethod::Online, None);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        // cart kept until the payment is captured
        assert_eq!(kit.shop.cart(customer).unwrap().items.len(), 1);

        kit.shop.attach_gateway_order(order.id, "order_RZP1").unwrap();
        assert!(matches!(
            kit.shop
                .confirm_online_payment(order.id, "order_OTHER", "pay_1", true)
                .unwrap_err(),
            ShopError::SignatureMismatch(_)
        ));

        let failed = kit
            .shop
            .confirm_online_payment(order.id, "order_RZP1", "pay_1", false)
            .unwrap();
        assert_eq!(failed.order.payment_status, PaymentStatus::Failed);
        assert_eq!(failed.order.status, OrderStatus::Pending);
        assert!(kit.shop.retryable_order(customer, order.id).is_ok());

        let paid = kit
            .shop
            .confirm_online_payment(order.id, "order_RZP1", "pay_2", true)
            .unwrap();
        assert_eq!(paid.order.payment_status, PaymentStatus::Completed);
        assert_eq!(paid.order.payment_id.as_deref(), Some("pay_2"));
        assert!(kit.shop.cart(customer).unwrap().items.is_empty());
        assert!(kit.shop.retryable_order(customer, order.id).is_err());

        // replayed confirmation changes nothing
        let again = kit
            .shop
            .confirm_online_payment(order.id, "order_RZP1", "pay_3", true)
            .unwrap();
        assert_eq!(again.order.payment_id.as_deref(), Some("pay_2"));
        assert!(kit.shop.order_by_gateway_order("order_RZP1").unwrap().is_some());
    }

    #[test]
    fn test_capture_after_cancel_refunds() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Rug", 2500_00, 2500_00, 2);
        let order = kit.buy(customer, address, p, 1, PaymentMethod::Online);
        kit.shop.attach_gateway_order(order.id, "order_RZP2").unwrap();
        kit.shop.cancel_order(customer, order.id, "Too slow").unwrap();

        let update = kit
            .shop
            .confirm_online_payment(order.id, "order_RZP2", "pay_9", true)
            .unwrap();
        assert_eq!(update.refunded.amount, 2500_00);
        assert_eq!(update.order.payment_status, PaymentStatus::Refunded);
        assert_eq!(kit.balance(customer), 2500_00);
    }

    fn cart_of_two(kit: &Kit, customer: Uuid) -> (Uuid, Uuid) {
        let a = kit.product("Lamp", 600_00, 600_00, 5);
        let b = kit.product("Shade", 400_00, 400_00, 5);
        kit.shop.add_to_cart(customer, a).unwrap();
        kit.shop.add_to_cart(customer, b).unwrap();
        (a, b)
    }

    #[test]
    fn test_capture_credits_items_cancelled_before_payment() {
        use crate::lifecycle::ItemRequest;
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let (a, _) = cart_of_two(&kit, customer);
        let order = kit.place_from_cart(customer, address, PaymentMethod::Online, None);
        kit.shop.attach_gateway_order(order.id, "order_SPLIT").unwrap();

        let update = kit
            .shop
            .cancel_items(customer, order.id, vec![ItemRequest { product_id: a, reason: "dup".into() }])
            .unwrap();
        assert!(update.refunded.is_zero());

        let paid = kit
            .shop
            .confirm_online_payment(order.id, "order_SPLIT", "pay_split", true)
            .unwrap();
        assert_eq!(paid.refunded.amount, 600_00);
        assert_eq!(paid.order.payment_status, PaymentStatus::Completed);
        assert_eq!(paid.order.refunded_amount.amount, 600_00);
        assert_eq!(kit.balance(customer), 600_00);

        kit.deliver(order.id);
        let order = kit.shop.order(order.id).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.refunded_amount.amount, 600_00);
        assert_eq!(kit.balance(customer), 600_00);
    }

    #[test]
    fn test_zero_total_order_is_paid_on_placement() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Rug", 2500_00, 2500_00, 3);
        kit.shop.create_coupon(coupon_input("FREE", 100, 0)).unwrap();
        kit.shop.add_to_cart(customer, p).unwrap();

        let order = kit.place_from_cart(customer, address, PaymentMethod::Online, Some("FREE"));
        assert!(order.final_amount.is_zero());
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert!(order.gateway_order_id.is_none());
        assert!(kit.shop.cart(customer).unwrap().items.is_empty());
        assert_eq!(kit.stock(p), 2);
        assert!(matches!(
            kit.shop.retryable_order(customer, order.id).unwrap_err(),
            ShopError::Conflict(_)
        ));

        // cancelling gives the stock back and credits nothing
        let update = kit.shop.cancel_order(customer, order.id, "Not needed").unwrap();
        assert!(update.refunded.is_zero());
        assert_eq!(kit.stock(p), 3);
        assert_eq!(kit.balance(customer), 0);
    }

    #[test]
    fn test_online_below_gateway_minimum_refused() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Sticker", 50, 50, 3);
        let request = PlaceOrder {
            address_id: address,
            payment_method: PaymentMethod::Online,
            coupon_code: None,
            buy_now: Some(BuyNow { product_id: p, quantity: 1 }),
        };
        assert!(matches!(
            kit.shop.place_order(customer, request, Utc::now()).unwrap_err(),
            ShopError::PaymentNotAllowed(_)
        ));
        assert_eq!(kit.stock(p), 3);
    }

    #[test]
    fn test_late_capture_on_earlier_gateway_order() {
        let kit = Kit::new();
        let (customer, address) = kit.customer("Asha");
        let p = kit.product("Rug", 2500_00, 2500_00, 2);
        let order = kit.buy(customer, address, p, 1, PaymentMethod::Online);
        kit.shop.attach_gateway_order(order.id, "order_FIRST").unwrap();
        kit.shop
            .confirm_online_payment(order.id, "order_FIRST", "pay_first", false)
            .unwrap();
        kit.shop.retryable_order(customer, order.id).unwrap();
        let retried = kit.shop.attach_gateway_order(order.id, "order_SECOND").unwrap();
        assert_eq!(retried.gateway_order_id.as_deref(), Some("order_SECOND"));
        assert_eq!(retried.gateway_order_ids, vec!["order_FIRST", "order_SECOND"]);

        let found = kit.shop.order_by_gateway_order("order_FIRST").unwrap().unwrap();
        assert_eq!(found.id, order.id);
        let paid = kit
            .shop
            .confirm_online_payment(order.id, "order_FIRST", "pay_late", true)
            .unwrap();
        assert_eq!(paid.order.payment_status, PaymentStatus::Completed);
        assert_eq!(paid.order.payment_id.as_deref(), Some("pay_late"));

        // the retry is captured too: that money goes back, once
        let dup = kit
            .shop
            .confirm_online_payment(order.id, "order_SECOND", "pay_retry", true)
            .unwrap();
        assert_eq!(dup.refunded.amount, 2500_00);
        assert_eq!(kit.balance(customer), 2500_00);
        let replay = kit
            .shop
            .confirm_online_payment(order.id, "order_SECOND", "pay_retry", true)
            .unwrap();
        assert!(replay.refunded.is_zero());
        assert_eq!(kit.balance(customer), 2500_00);
        assert_eq!(replay.order.payment_id.as_deref(), Some("pay_late"));
    }

    #[test]
    fn test_checkout_summary() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        let p = kit.product("Rug", 2500_00, 2500_00, 2);
        kit.shop.add_to_cart(customer, p).unwrap();
        let summary = kit.shop.checkout_summary(customer, Utc::now()).unwrap();
        assert!(!summary.cod_allowed);
        assert_eq!(summary.addresses.len(), 1);
        assert!(summary.wallet_balance.is_zero());
    }
}
