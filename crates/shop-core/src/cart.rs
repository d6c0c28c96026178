//! # Cart & Wishlist
//!
//! A customer's cart holds at most [`MAX_QTY_PER_PRODUCT`] units of each
//! product. The unit price is fixed when the product first enters the
//! cart.

use crate::catalog::ProductSummary;
use crate::error::{ShopError, ShopResult};
use crate::money::{Currency, Price};
use crate::store::{Shop, ShopState};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

pub const MAX_QTY_PER_PRODUCT: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price: Price,
}

impl CartItem {
    pub fn total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// A cart line joined with live product data
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub unit_price: Price,
    pub quantity: u32,
    pub line_total: Price,
    pub stock: u32,
    pub out_of_stock: bool,
    /// Largest quantity the customer may pick for this line
    pub max_allowed: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: Price,
    pub item_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WishlistToggle {
    Added,
    Removed,
}

impl ShopState {
    pub fn cart_view(&self, customer_id: Uuid, currency: Currency) -> CartView {
        let items: Vec<CartLine> = self
            .carts
            .get(&customer_id)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let product = self.products.get(&item.product_id)?;
                        Some(CartLine {
                            product_id: item.product_id,
                            name: product.name.clone(),
                            image: product.images.first().cloned(),
                            unit_price: item.unit_price,
                            quantity: item.quantity,
                            line_total: item.total(),
                            stock: product.stock,
                            out_of_stock: product.stock == 0,
                            max_allowed: product.stock.min(MAX_QTY_PER_PRODUCT),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        let total = items
            .iter()
            .fold(Price::zero(currency), |acc, line| acc.plus(line.line_total));
        let item_count = items.iter().map(|l| l.quantity).sum();
        CartView {
            items,
            total,
            item_count,
        }
    }
}

impl Shop {
    pub fn cart(&self, customer_id: Uuid) -> ShopResult<CartView> {
        let state = self.read()?;
        state.active_customer(customer_id)?;
        Ok(state.cart_view(customer_id, self.currency()))
    }

    /// Add one unit of a product. A product already in the cart is
    /// incremented by one.
    pub fn add_to_cart(&self, customer_id: Uuid, product_id: Uuid) -> ShopResult<CartView> {
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        let product = state.product(product_id)?;
        if !state.is_purchasable(product) {
            return Err(ShopError::InvalidRequest(
                "Product is not available".into(),
            ));
        }
        if product.stock == 0 {
            return Err(ShopError::OutOfStock {
                product: product.name.clone(),
                available: 0,
            });
        }
        let (unit_price, _) = state.effective_price(product);
        let (name, stock) = (product.name.clone(), product.stock);

        let cart = state.carts.entry(customer_id).or_default();
        match cart.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                if item.quantity >= MAX_QTY_PER_PRODUCT {
                    return Err(ShopError::QuantityLimit {
                        max: MAX_QTY_PER_PRODUCT,
                    });
                }
                if item.quantity + 1 > stock {
                    return Err(ShopError::OutOfStock {
                        product: name,
                        available: stock,
                    });
                }
                item.quantity += 1;
            }
            None => cart.push(CartItem {
                product_id,
                quantity: 1,
                unit_price,
            }),
        }
        debug!(customer_id = %customer_id, product_id = %product_id, "Added to cart");
        Ok(state.cart_view(customer_id, self.currency()))
    }

    pub fn update_cart_quantity(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: u32,
    ) -> ShopResult<CartView> {
        if quantity == 0 || quantity > MAX_QTY_PER_PRODUCT {
            return Err(ShopError::QuantityLimit {
                max: MAX_QTY_PER_PRODUCT,
            });
        }
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        let product = state.product(product_id)?;
        if quantity > product.stock {
            return Err(ShopError::OutOfStock {
                product: product.name.clone(),
                available: product.stock,
            });
        }
        let item = state
            .carts
            .get_mut(&customer_id)
            .and_then(|cart| cart.iter_mut().find(|i| i.product_id == product_id))
            .ok_or_else(|| ShopError::not_found("Cart item", product_id))?;
        item.quantity = quantity;
        Ok(state.cart_view(customer_id, self.currency()))
    }

    pub fn remove_from_cart(&self, customer_id: Uuid, product_id: Uuid) -> ShopResult<CartView> {
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        let cart = state.carts.entry(customer_id).or_default();
        let before = cart.len();
        cart.retain(|i| i.product_id != product_id);
        if cart.len() == before {
            return Err(ShopError::not_found("Cart item", product_id));
        }
        Ok(state.cart_view(customer_id, self.currency()))
    }

    // ---- wishlist ----

    pub fn wishlist(&self, customer_id: Uuid) -> ShopResult<Vec<ProductSummary>> {
        let state = self.read()?;
        state.active_customer(customer_id)?;
        Ok(state
            .wishlists
            .get(&customer_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.products.get(id))
                    .map(|p| state.summarize(p))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn toggle_wishlist(&self, customer_id: Uuid, product_id: Uuid) -> ShopResult<WishlistToggle> {
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        state.product(product_id)?;
        let list = state.wishlists.entry(customer_id).or_default();
        if let Some(pos) = list.iter().position(|id| *id == product_id) {
            list.remove(pos);
            Ok(WishlistToggle::Removed)
        } else {
            list.push(product_id);
            Ok(WishlistToggle::Added)
        }
    }

    pub fn remove_from_wishlist(&self, customer_id: Uuid, product_id: Uuid) -> ShopResult<()> {
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        let list = state.wishlists.entry(customer_id).or_default();
        let before = list.len();
        list.retain(|id| *id != product_id);
        if list.len() == before {
            return Err(ShopError::not_found("Wishlist item", product_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::*;

    #[test]
    fn test_add_increments_and_limits() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        let p = kit.product("Sneaker", 2000_00, 1500_00, 10);

        for _ in 0..MAX_QTY_PER_PRODUCT {
            kit.shop.add_to_cart(customer, p).unwrap();
        }
        let cart = kit.shop.cart(customer).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.item_count, 5);
        assert_eq!(cart.total.amount, 7500_00);

        let err = kit.shop.add_to_cart(customer, p).unwrap_err();
        assert!(matches!(err, ShopError::QuantityLimit { max: 5 }));
    }

    #[test]
    fn test_add_respects_stock() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        let p = kit.product("Watch", 5000_00, 5000_00, 2);
        let none = kit.product("Bag", 900_00, 900_00, 0);

        kit.shop.add_to_cart(customer, p).unwrap();
        kit.shop.add_to_cart(customer, p).unwrap();
        assert!(matches!(
            kit.shop.add_to_cart(customer, p).unwrap_err(),
            ShopError::OutOfStock { available: 2, .. }
        ));
        assert!(kit.shop.add_to_cart(customer, none).is_err());

        let cart = kit.shop.cart(customer).unwrap();
        assert_eq!(cart.items[0].max_allowed, 2);
    }

    #[test]
    fn test_unit_price_fixed_at_first_add() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        let p = kit.product("Scarf", 1000_00, 1000_00, 10);
        kit.shop.add_to_cart(customer, p).unwrap();
        kit.shop.add_product_offer(p, 50).unwrap();
        kit.shop.add_to_cart(customer, p).unwrap();

        let cart = kit.shop.cart(customer).unwrap();
        assert_eq!(cart.items[0].unit_price.amount, 1000_00);
        assert_eq!(cart.total.amount, 2000_00);
    }

    #[test]
    fn test_update_quantity_bounds() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        let p = kit.product("Belt", 500_00, 500_00, 3);
        kit.shop.add_to_cart(customer, p).unwrap();

        assert_eq!(kit.shop.update_cart_quantity(customer, p, 3).unwrap().item_count, 3);
        assert!(kit.shop.update_cart_quantity(customer, p, 0).is_err());
        assert!(kit.shop.update_cart_quantity(customer, p, 4).is_err());
        assert!(kit.shop.update_cart_quantity(customer, p, 6).is_err());

        kit.shop.remove_from_cart(customer, p).unwrap();
        assert!(kit.shop.remove_from_cart(customer, p).is_err());
    }

    #[test]
    fn test_wishlist_toggle() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        let p = kit.product("Ring", 700_00, 700_00, 1);

        assert_eq!(kit.shop.toggle_wishlist(customer, p).unwrap(), WishlistToggle::Added);
        assert_eq!(kit.shop.wishlist(customer).unwrap().len(), 1);
        assert_eq!(kit.shop.toggle_wishlist(customer, p).unwrap(), WishlistToggle::Removed);
        assert!(kit.shop.remove_from_wishlist(customer, p).is_err());
    }

    #[test]
    fn test_blocked_customer_cart_refused() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        let p = kit.product("Ring", 700_00, 700_00, 1);
        kit.shop.set_customer_blocked(customer, true).unwrap();
        assert!(matches!(
            kit.shop.add_to_cart(customer, p).unwrap_err(),
            ShopError::CustomerBlocked { .. }
        ));
    }
}
