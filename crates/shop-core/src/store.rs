//! # Shop Store
//!
//! The in-process document store behind every storefront and back-office
//! operation. All collections live in one [`ShopState`] guarded by a single
//! `RwLock`, so an operation that touches an order, product stock, a wallet
//! and a cart holds one write guard for the whole change.
//!
//! Operations are implemented as `impl Shop` blocks in their own modules
//! (`catalog`, `cart`, `checkout`, `lifecycle`, ...).

use crate::cart::CartItem;
use crate::catalog::{Brand, Category, Product};
use crate::content::{Banner, Review};
use crate::coupon::Coupon;
use crate::customer::{Address, Customer};
use crate::error::{ShopError, ShopResult};
use crate::money::{Currency, Price};
use crate::order::Order;
use crate::wallet::{TopUp, Wallet};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Every collection the shop keeps
#[derive(Debug, Default)]
pub(crate) struct ShopState {
    pub categories: HashMap<Uuid, Category>,
    pub brands: HashMap<Uuid, Brand>,
    pub products: HashMap<Uuid, Product>,
    pub customers: HashMap<Uuid, Customer>,
    pub addresses: HashMap<Uuid, Vec<Address>>,
    pub carts: HashMap<Uuid, Vec<CartItem>>,
    pub wishlists: HashMap<Uuid, Vec<Uuid>>,
    pub coupons: HashMap<Uuid, Coupon>,
    /// Upper-cased coupon codes each customer has redeemed
    pub redemptions: HashMap<Uuid, HashSet<String>>,
    pub wallets: HashMap<Uuid, Wallet>,
    /// Wallet top-ups keyed by gateway order id
    pub top_ups: HashMap<String, TopUp>,
    pub orders: HashMap<Uuid, Order>,
    pub banners: HashMap<Uuid, Banner>,
    pub reviews: Vec<Review>,
}

impl ShopState {
    pub fn customer(&self, id: Uuid) -> ShopResult<&Customer> {
        self.customers
            .get(&id)
            .ok_or_else(|| ShopError::not_found("Customer", id))
    }

    /// A customer that exists and is not blocked
    pub fn active_customer(&self, id: Uuid) -> ShopResult<&Customer> {
        let customer = self.customer(id)?;
        if customer.blocked {
            return Err(ShopError::CustomerBlocked {
                customer_id: id.to_string(),
            });
        }
        Ok(customer)
    }

    pub fn product(&self, id: Uuid) -> ShopResult<&Product> {
        self.products
            .get(&id)
            .ok_or_else(|| ShopError::not_found("Product", id))
    }

    pub fn product_mut(&mut self, id: Uuid) -> ShopResult<&mut Product> {
        self.products
            .get_mut(&id)
            .ok_or_else(|| ShopError::not_found("Product", id))
    }

    pub fn category(&self, id: Uuid) -> ShopResult<&Category> {
        self.categories
            .get(&id)
            .ok_or_else(|| ShopError::not_found("Category", id))
    }

    pub fn brand(&self, id: Uuid) -> ShopResult<&Brand> {
        self.brands
            .get(&id)
            .ok_or_else(|| ShopError::not_found("Brand", id))
    }

    pub fn order(&self, id: Uuid) -> ShopResult<&Order> {
        self.orders
            .get(&id)
            .ok_or_else(|| ShopError::not_found("Order", id))
    }

    /// An order that belongs to `customer_id`. Other customers' orders
    /// read as missing.
    pub fn owned_order(&self, customer_id: Uuid, id: Uuid) -> ShopResult<&Order> {
        match self.orders.get(&id) {
            Some(order) if order.customer_id == customer_id => Ok(order),
            _ => Err(ShopError::not_found("Order", id)),
        }
    }

    pub fn wallet_mut(&mut self, customer_id: Uuid, currency: Currency) -> &mut Wallet {
        self.wallets
            .entry(customer_id)
            .or_insert_with(|| Wallet::new(customer_id, currency))
    }

    pub fn wallet_balance(&self, customer_id: Uuid, currency: Currency) -> Price {
        self.wallets
            .get(&customer_id)
            .map(|w| w.balance)
            .unwrap_or_else(|| Price::zero(currency))
    }
}

/// The shop: every collection plus the store currency
#[derive(Debug)]
pub struct Shop {
    state: RwLock<ShopState>,
    currency: Currency,
}

impl Shop {
    pub fn new(currency: Currency) -> Self {
        Self {
            state: RwLock::new(ShopState::default()),
            currency,
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub(crate) fn price(&self, minor: i64) -> Price {
        Price::from_minor(minor, self.currency)
    }

    pub(crate) fn read(&self) -> ShopResult<RwLockReadGuard<'_, ShopState>> {
        self.state
            .read()
            .map_err(|_| ShopError::Internal("shop state lock poisoned".into()))
    }

    pub(crate) fn write(&self) -> ShopResult<RwLockWriteGuard<'_, ShopState>> {
        self.state
            .write()
            .map_err(|_| ShopError::Internal("shop state lock poisoned".into()))
    }
}

impl Default for Shop {
    fn default() -> Self {
        Self::new(Currency::default())
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Cut `items` (already sorted) into the requested page. Page 0 is
    /// served as page 1.
    pub fn paginate(items: Vec<T>, page: usize, per_page: usize) -> Self {
        let page = page.max(1);
        let total = items.len();
        let total_pages = total.div_ceil(per_page.max(1));
        let items = items
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();
        Self {
            items,
            page,
            per_page,
            total,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

/// Case-insensitive substring search; an empty or missing needle matches
pub(crate) fn matches_search(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim) {
        Some(n) if !n.is_empty() => haystack.to_lowercase().contains(&n.to_lowercase()),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate() {
        let page = Page::paginate((1..=13).collect::<Vec<_>>(), 2, 6);
        assert_eq!(page.items, vec![7, 8, 9, 10, 11, 12]);
        assert_eq!(page.total, 13);
        assert_eq!(page.total_pages, 3);

        let last = Page::paginate((1..=13).collect::<Vec<_>>(), 3, 6);
        assert_eq!(last.items, vec![13]);
    }

    #[test]
    fn test_paginate_page_zero_and_past_end() {
        let first = Page::paginate(vec!["a", "b"], 0, 4);
        assert_eq!(first.page, 1);
        assert_eq!(first.items, vec!["a", "b"]);

        let empty = Page::paginate(vec!["a", "b"], 5, 4);
        assert!(empty.items.is_empty());
        assert_eq!(empty.total_pages, 1);
    }

    #[test]
    fn test_matches_search() {
        assert!(matches_search("Cotton Shirt", Some("shirt")));
        assert!(matches_search("Cotton Shirt", Some("  ")));
        assert!(matches_search("Cotton Shirt", None));
        assert!(!matches_search("Cotton Shirt", Some("denim")));
    }

    #[test]
    fn test_blocked_customer_is_rejected() {
        let shop = Shop::default();
        let id = shop
            .register_customer("Asha", "asha@example.com", None)
            .unwrap()
            .id;
        shop.set_customer_blocked(id, true).unwrap();

        let state = shop.read().unwrap();
        assert!(matches!(
            state.active_customer(id),
            Err(ShopError::CustomerBlocked { .. })
        ));
        assert!(matches!(
            state.active_customer(Uuid::new_v4()),
            Err(ShopError::NotFound { .. })
        ));
    }
}
