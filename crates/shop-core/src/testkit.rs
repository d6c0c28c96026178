//! Shared fixtures for unit tests

use crate::catalog::NewProduct;
use crate::checkout::{BuyNow, PlaceOrder};
use crate::coupon::CouponInput;
use crate::customer::AddressInput;
use crate::money::Price;
use crate::order::{Order, OrderStatus, PaymentMethod};
use crate::store::Shop;
use chrono::{Days, Utc};
use uuid::Uuid;

/// A shop with one listed category and one brand
pub struct Kit {
    pub shop: Shop,
    pub category: Uuid,
    pub brand: Uuid,
}

impl Kit {
    pub fn new() -> Self {
        let shop = Shop::default();
        let category = shop.add_category("Home", "Home and living").unwrap().id;
        let brand = shop.add_brand("Loom", None).unwrap().id;
        Self {
            shop,
            category,
            brand,
        }
    }

    pub fn new_product(&self, name: &str, regular: i64) -> NewProduct {
        NewProduct {
            name: name.into(),
            description: String::new(),
            brand_id: self.brand,
            category_id: self.category,
            regular_price: regular,
            sale_price: None,
            stock: 10,
            images: vec![format!("{}.jpg", name.to_lowercase())],
            returnable: true,
        }
    }

    pub fn product(&self, name: &str, regular: i64, sale: i64, stock: u32) -> Uuid {
        let mut input = self.new_product(name, regular);
        input.sale_price = Some(sale);
        input.stock = stock;
        self.shop.add_product(input).unwrap().id
    }

    /// A registered customer with one address
    pub fn customer(&self, name: &str) -> (Uuid, Uuid) {
        let email = format!("{}@example.com", name.to_lowercase());
        let id = self.shop.register_customer(name, &email, None).unwrap().id;
        let address = self.shop.add_address(id, address_input()).unwrap().id;
        (id, address)
    }

    pub fn fund(&self, customer: Uuid, amount: i64) {
        let gateway_order = format!("order_fund_{}", Uuid::new_v4().simple());
        let amount = Price::from_minor(amount, self.shop.currency());
        self.shop.begin_top_up(customer, amount, &gateway_order).unwrap();
        self.shop.complete_top_up(&gateway_order, "pay_fund").unwrap();
    }

    pub fn balance(&self, customer: Uuid) -> i64 {
        self.shop.wallet(customer).unwrap().balance.amount
    }

    pub fn stock(&self, product: Uuid) -> u32 {
        self.shop.product(product).unwrap().product.stock
    }

    pub fn buy(&self, customer: Uuid, address: Uuid, product: Uuid, quantity: u32, method: PaymentMethod) -> Order {
        let request = PlaceOrder {
            address_id: address,
            payment_method: method,
            coupon_code: None,
            buy_now: Some(BuyNow {
                product_id: product,
                quantity,
            }),
        };
        self.shop.place_order(customer, request, Utc::now()).unwrap()
    }

    pub fn place_from_cart(
        &self,
        customer: Uuid,
        address: Uuid,
        method: PaymentMethod,
        coupon: Option<&str>,
    ) -> Order {
        let request = PlaceOrder {
            address_id: address,
            payment_method: method,
            coupon_code: coupon.map(str::to_string),
            buy_now: None,
        };
        self.shop.place_order(customer, request, Utc::now()).unwrap()
    }

    pub fn deliver(&self, order: Uuid) {
        for next in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
            self.shop.update_order_status(order, next).unwrap();
        }
    }
}

pub fn address_input() -> AddressInput {
    AddressInput {
        name: "Meera Nair".into(),
        city: "Kochi".into(),
        state: "Kerala".into(),
        pincode: "682001".into(),
        landmark: "Near Park".into(),
        phone: "9876543210".into(),
    }
}

pub fn coupon_input(code: &str, pct: u8, minimum: i64) -> CouponInput {
    let today = Utc::now().date_naive();
    CouponInput {
        code: code.into(),
        discount_percent: pct,
        minimum_purchase: minimum,
        starts_on: today - Days::new(1),
        expires_on: today + Days::new(30),
        active: true,
    }
}
