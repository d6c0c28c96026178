//! # Coupons
//!
//! Percentage coupons with a minimum purchase and a validity window.
//! Codes are case-insensitive and a customer may redeem each code once.
//! Previewing a coupon never redeems it; redemption happens when the
//! order is placed.

use crate::error::{ShopError, ShopResult};
use crate::money::Price;
use crate::store::{Page, Shop, ShopState};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

pub const COUPON_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    /// Upper-cased code
    pub code: String,
    pub discount_percent: u8,
    pub minimum_purchase: Price,
    pub starts_on: NaiveDate,
    /// First day the coupon no longer applies
    pub expires_on: NaiveDate,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_live(&self, today: NaiveDate) -> bool {
        self.active && self.starts_on <= today && today < self.expires_on
    }

    pub fn discount_on(&self, subtotal: Price) -> Price {
        subtotal.percent_of(self.discount_percent)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CouponInput {
    pub code: String,
    pub discount_percent: u8,
    /// Minor units
    #[serde(default)]
    pub minimum_purchase: i64,
    pub starts_on: NaiveDate,
    pub expires_on: NaiveDate,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CouponInput {
    fn validate(&self) -> ShopResult<String> {
        let code = self.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(ShopError::InvalidRequest("Coupon code is required".into()));
        }
        if !(1..=100).contains(&self.discount_percent) {
            return Err(ShopError::InvalidRequest(
                "Discount must be between 1 and 100 percent".into(),
            ));
        }
        if self.minimum_purchase < 0 {
            return Err(ShopError::InvalidRequest(
                "Minimum purchase cannot be negative".into(),
            ));
        }
        if self.expires_on <= self.starts_on {
            return Err(ShopError::InvalidRequest(
                "Expiry date must be after the start date".into(),
            ));
        }
        Ok(code)
    }
}

/// Result of checking a coupon against a subtotal
#[derive(Debug, Clone, Serialize)]
pub struct CouponPreview {
    pub code: String,
    pub discount_percent: u8,
    pub discount: Price,
    pub total: Price,
}

impl ShopState {
    /// Check that `code` can be applied by `customer_id` to `subtotal`
    /// on `today`
    pub fn validate_coupon(
        &self,
        customer_id: Uuid,
        code: &str,
        subtotal: Price,
        today: NaiveDate,
    ) -> ShopResult<&Coupon> {
        let code = code.trim().to_uppercase();
        let coupon = self
            .coupons
            .values()
            .find(|c| c.code == code)
            .ok_or_else(|| ShopError::CouponRejected("Invalid coupon code".into()))?;
        if !coupon.active {
            return Err(ShopError::CouponRejected("Coupon is not active".into()));
        }
        if today < coupon.starts_on {
            return Err(ShopError::CouponRejected("Coupon is not valid yet".into()));
        }
        if today >= coupon.expires_on {
            return Err(ShopError::CouponRejected("Coupon has expired".into()));
        }
        if subtotal.amount < coupon.minimum_purchase.amount {
            return Err(ShopError::CouponRejected(format!(
                "Minimum purchase of {} required",
                coupon.minimum_purchase.display()
            )));
        }
        if self
            .redemptions
            .get(&customer_id)
            .is_some_and(|used| used.contains(&code))
        {
            return Err(ShopError::CouponRejected(
                "Coupon already used".into(),
            ));
        }
        Ok(coupon)
    }

    pub fn redeem_coupon(&mut self, customer_id: Uuid, code: &str) {
        self.redemptions
            .entry(customer_id)
            .or_default()
            .insert(code.trim().to_uppercase());
    }

    fn coupon_code_taken(&self, code: &str, except: Option<Uuid>) -> bool {
        self.coupons
            .values()
            .any(|c| Some(c.id) != except && c.code == code)
    }
}

impl Shop {
    pub fn create_coupon(&self, input: CouponInput) -> ShopResult<Coupon> {
        let code = input.validate()?;
        let mut state = self.write()?;
        if state.coupon_code_taken(&code, None) {
            return Err(ShopError::Conflict(format!("Coupon {code} already exists")));
        }
        let coupon = Coupon {
            id: Uuid::new_v4(),
            code,
            discount_percent: input.discount_percent,
            minimum_purchase: self.price(input.minimum_purchase),
            starts_on: input.starts_on,
            expires_on: input.expires_on,
            active: input.active,
            created_at: Utc::now(),
        };
        state.coupons.insert(coupon.id, coupon.clone());
        info!(coupon = %coupon.code, pct = coupon.discount_percent, "Coupon created");
        Ok(coupon)
    }

    pub fn update_coupon(&self, id: Uuid, input: CouponInput) -> ShopResult<Coupon> {
        let code = input.validate()?;
        let minimum_purchase = self.price(input.minimum_purchase);
        let mut state = self.write()?;
        if state.coupon_code_taken(&code, Some(id)) {
            return Err(ShopError::Conflict(format!("Coupon {code} already exists")));
        }
        let coupon = state
            .coupons
            .get_mut(&id)
            .ok_or_else(|| ShopError::not_found("Coupon", id))?;
        coupon.code = code;
        coupon.discount_percent = input.discount_percent;
        coupon.minimum_purchase = minimum_purchase;
        coupon.starts_on = input.starts_on;
        coupon.expires_on = input.expires_on;
        coupon.active = input.active;
        Ok(coupon.clone())
    }

    pub fn delete_coupon(&self, id: Uuid) -> ShopResult<()> {
        let mut state = self.write()?;
        state
            .coupons
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ShopError::not_found("Coupon", id))
    }

    pub fn coupon(&self, id: Uuid) -> ShopResult<Coupon> {
        let state = self.read()?;
        state
            .coupons
            .get(&id)
            .cloned()
            .ok_or_else(|| ShopError::not_found("Coupon", id))
    }

    /// Back-office coupon listing, newest first
    pub fn coupons(&self, page: usize) -> ShopResult<Page<Coupon>> {
        let state = self.read()?;
        let mut items: Vec<Coupon> = state.coupons.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.code.cmp(&b.code)));
        Ok(Page::paginate(items, page, COUPON_PAGE_SIZE))
    }

    /// Coupons a shopper can currently use, by code
    pub fn available_coupons(&self, now: DateTime<Utc>) -> ShopResult<Vec<Coupon>> {
        let today = now.date_naive();
        let state = self.read()?;
        let mut items: Vec<Coupon> = state
            .coupons
            .values()
            .filter(|c| c.is_live(today))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(items)
    }

    /// Validate a coupon against a subtotal without redeeming it
    pub fn preview_coupon(
        &self,
        customer_id: Uuid,
        code: &str,
        subtotal: Price,
        now: DateTime<Utc>,
    ) -> ShopResult<CouponPreview> {
        let state = self.read()?;
        state.active_customer(customer_id)?;
        let coupon = state.validate_coupon(customer_id, code, subtotal, now.date_naive())?;
        let discount = coupon.discount_on(subtotal);
        Ok(CouponPreview {
            code: coupon.code.clone(),
            discount_percent: coupon.discount_percent,
            discount,
            total: subtotal.saturating_sub(discount),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::*;

    #[test]
    fn test_create_coupon_validation() {
        let shop = Shop::default();
        shop.create_coupon(coupon_input("save10", 10, 500_00)).unwrap();
        assert!(matches!(
            shop.create_coupon(coupon_input("SAVE10", 20, 0)).unwrap_err(),
            ShopError::Conflict(_)
        ));
        assert!(shop.create_coupon(coupon_input("ZERO", 0, 0)).is_err());

        let mut backwards = coupon_input("BACK", 5, 0);
        backwards.expires_on = backwards.starts_on;
        assert!(shop.create_coupon(backwards).is_err());
    }

    #[test]
    fn test_preview_does_not_redeem() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        kit.shop.create_coupon(coupon_input("FEST15", 15, 1000_00)).unwrap();
        let subtotal = Price::from_minor(2000_00, kit.shop.currency());

        let preview = kit
            .shop
            .preview_coupon(customer, "fest15", subtotal, Utc::now())
            .unwrap();
        assert_eq!(preview.discount.amount, 300_00);
        assert_eq!(preview.total.amount, 1700_00);

        // previewing twice is fine
        assert!(kit.shop.preview_coupon(customer, "FEST15", subtotal, Utc::now()).is_ok());
    }

    #[test]
    fn test_coupon_rules() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        let coupon = kit.shop.create_coupon(coupon_input("BIG", 10, 1000_00)).unwrap();
        let now = Utc::now();
        let small = Price::from_minor(999_99, kit.shop.currency());
        let big = Price::from_minor(1000_00, kit.shop.currency());

        assert!(matches!(
            kit.shop.preview_coupon(customer, "BIG", small, now).unwrap_err(),
            ShopError::CouponRejected(_)
        ));
        assert!(kit.shop.preview_coupon(customer, "NOPE", big, now).is_err());

        kit.shop.write().unwrap().redeem_coupon(customer, "big");
        assert!(kit.shop.preview_coupon(customer, "BIG", big, now).is_err());

        let mut input = coupon_input("BIG", 10, 1000_00);
        input.active = false;
        kit.shop.update_coupon(coupon.id, input).unwrap();
        let (other, _) = kit.customer("Ravi");
        assert!(kit.shop.preview_coupon(other, "BIG", big, now).is_err());
    }

    #[test]
    fn test_available_coupons_window() {
        let shop = Shop::default();
        shop.create_coupon(coupon_input("NOW", 5, 0)).unwrap();
        let mut future = coupon_input("LATER", 5, 0);
        future.starts_on = Utc::now().date_naive() + chrono::Days::new(3);
        future.expires_on = future.starts_on + chrono::Days::new(10);
        shop.create_coupon(future).unwrap();

        let codes: Vec<String> = shop
            .available_coupons(Utc::now())
            .unwrap()
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(codes, vec!["NOW"]);
        assert_eq!(shop.coupons(1).unwrap().total, 2);
    }
}
