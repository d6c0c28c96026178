//! # Content
//!
//! Storefront banners and product reviews.

use crate::error::{ShopError, ShopResult};
use crate::order::OrderStatus;
use crate::store::{Shop, ShopState};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    pub id: Uuid,
    pub image: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub starts_on: NaiveDate,
    /// Last day the banner is shown
    pub ends_on: NaiveDate,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Banner {
    pub fn is_showing(&self, today: NaiveDate) -> bool {
        self.active && self.starts_on <= today && today <= self.ends_on
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BannerInput {
    pub image: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: Option<String>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub rating: u8,
    pub comment: String,
    pub order_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    pub product_id: Uuid,
    pub order_id: Uuid,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

impl ShopState {
    /// Reviews of a product, newest first
    pub fn product_reviews(&self, product_id: Uuid) -> Vec<Review> {
        let mut reviews: Vec<Review> = self
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reviews
    }
}

impl Shop {
    pub fn add_banner(&self, input: BannerInput) -> ShopResult<Banner> {
        if input.image.trim().is_empty() || input.title.trim().is_empty() {
            return Err(ShopError::InvalidRequest(
                "Banner image and title are required".into(),
            ));
        }
        if input.ends_on < input.starts_on {
            return Err(ShopError::InvalidRequest(
                "Banner end date must not be before its start date".into(),
            ));
        }
        let banner = Banner {
            id: Uuid::new_v4(),
            image: input.image.trim().to_string(),
            title: input.title.trim().to_string(),
            description: input.description,
            link: input.link,
            starts_on: input.starts_on,
            ends_on: input.ends_on,
            active: true,
            created_at: Utc::now(),
        };
        self.write()?.banners.insert(banner.id, banner.clone());
        Ok(banner)
    }

    pub fn toggle_banner(&self, id: Uuid) -> ShopResult<Banner> {
        let mut state = self.write()?;
        let banner = state
            .banners
            .get_mut(&id)
            .ok_or_else(|| ShopError::not_found("Banner", id))?;
        banner.active = !banner.active;
        Ok(banner.clone())
    }

    pub fn delete_banner(&self, id: Uuid) -> ShopResult<()> {
        self.write()?
            .banners
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ShopError::not_found("Banner", id))
    }

    /// Every banner, newest first
    pub fn banners(&self) -> ShopResult<Vec<Banner>> {
        let state = self.read()?;
        let mut items: Vec<Banner> = state.banners.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.title.cmp(&b.title)));
        Ok(items)
    }

    /// Banners to show on the home page at `now`
    pub fn active_banners(&self, now: DateTime<Utc>) -> ShopResult<Vec<Banner>> {
        let today = now.date_naive();
        Ok(self
            .banners()?
            .into_iter()
            .filter(|b| b.is_showing(today))
            .collect())
    }

    /// Review a product from a delivered order
    pub fn add_review(&self, customer_id: Uuid, input: ReviewInput) -> ShopResult<Review> {
        if !(1..=5).contains(&input.rating) {
            return Err(ShopError::InvalidRequest(
                "Rating must be between 1 and 5".into(),
            ));
        }
        let mut state = self.write()?;
        let customer_name = state.active_customer(customer_id)?.name.clone();
        let order = state.owned_order(customer_id, input.order_id)?;
        let delivered = order
            .item(input.product_id)
            .map(|i| i.status == OrderStatus::Delivered)
            .unwrap_or(false);
        if !delivered {
            return Err(ShopError::NotPermitted(
                "Only delivered products can be reviewed".into(),
            ));
        }
        if state.reviews.iter().any(|r| {
            r.customer_id == customer_id && r.product_id == input.product_id && r.order_id == input.order_id
        }) {
            return Err(ShopError::Conflict("Product already reviewed for this order".into()));
        }

        let review = Review {
            id: Uuid::new_v4(),
            product_id: input.product_id,
            customer_id,
            customer_name,
            rating: input.rating,
            comment: input.comment.trim().to_string(),
            order_id: input.order_id,
            created_at: Utc::now(),
        };
        state.reviews.push(review.clone());

        let ratings: Vec<u8> = state
            .reviews
            .iter()
            .filter(|r| r.product_id == input.product_id)
            .map(|r| r.rating)
            .collect();
        let average = ratings.iter().map(|r| *r as f32).sum::<f32>() / ratings.len() as f32;
        state.product_mut(input.product_id)?.average_rating = average;
        info!(product_id = %input.product_id, rating = input.rating, "Review added");
        Ok(review)
    }

    pub fn product_reviews(&self, product_id: Uuid) -> ShopResult<Vec<Review>> {
        Ok(self.read()?.product_reviews(product_id))
    }
}
