//! # Catalog
//!
//! Categories, brands and products, their offers, and the storefront
//! listing. A product's selling price is always derived: the sale price
//! reduced by the better of its own offer and its category's offer.
//! Seed catalogs are loaded from TOML (`config/catalog.toml`).

use crate::content::Review;
use crate::error::{ShopError, ShopResult};
use crate::money::Price;
use crate::store::{matches_search, Page, Shop, ShopState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Storefront listing page size
pub const SHOP_PAGE_SIZE: usize = 6;
/// Back-office product, category and brand page size
pub const ADMIN_CATALOG_PAGE_SIZE: usize = 4;
/// Related products shown on a product page
pub const RELATED_PRODUCTS: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Unlisted categories hide their products from the storefront
    pub listed: bool,
    pub offer_percent: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub brand_id: Uuid,
    pub category_id: Uuid,
    pub regular_price: Price,
    pub sale_price: Price,
    pub stock: u32,
    pub images: Vec<String>,
    pub offer_percent: u8,
    pub blocked: bool,
    pub returnable: bool,
    /// Units sold over the product's lifetime, net of cancellations and returns
    pub sales_count: u32,
    pub average_rating: f32,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new product. Prices are minor units.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub brand_id: Uuid,
    pub category_id: Uuid,
    pub regular_price: i64,
    /// Defaults to the regular price
    #[serde(default)]
    pub sale_price: Option<i64>,
    #[serde(default)]
    pub stock: u32,
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub returnable: bool,
}

/// Fields for editing a product. `images: None` keeps the current images.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductUpdate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub brand_id: Uuid,
    pub category_id: Uuid,
    pub regular_price: i64,
    #[serde(default)]
    pub sale_price: Option<i64>,
    pub stock: u32,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub returnable: bool,
}

fn default_true() -> bool {
    true
}

/// Storefront sort order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    /// Best stocked first
    Popularity,
    PriceAsc,
    PriceDesc,
    Rating,
    AToZ,
    ZToA,
}

/// Storefront listing query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub category: Option<Uuid>,
    #[serde(default)]
    pub brand: Option<Uuid>,
    /// Minimum regular price, minor units
    #[serde(default)]
    pub min_price: Option<i64>,
    #[serde(default)]
    pub max_price: Option<i64>,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    #[serde(default)]
    pub page: usize,
}

/// A product as shown to shoppers and admins
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: String,
    pub brand_name: String,
    /// The offer percent actually applied (best of product and category)
    pub applied_offer: u8,
    pub effective_price: Price,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub product: ProductSummary,
    pub related: Vec<ProductSummary>,
    pub reviews: Vec<Review>,
}

/// Seed catalog loaded from TOML. Products refer to their category and
/// brand by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub brands: Vec<SeedBrand>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub offer_percent: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedBrand {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub brand: String,
    pub regular_price: i64,
    #[serde(default)]
    pub sale_price: Option<i64>,
    #[serde(default)]
    pub stock: u32,
    pub images: Vec<String>,
    #[serde(default)]
    pub offer_percent: u8,
    #[serde(default = "default_true")]
    pub returnable: bool,
}

impl CatalogSeed {
    /// Load a seed catalog from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

fn check_percent(pct: u8) -> ShopResult<()> {
    if pct > 100 {
        return Err(ShopError::InvalidRequest(
            "Offer percent must be between 0 and 100".into(),
        ));
    }
    Ok(())
}

fn clean_name(name: &str, what: &str) -> ShopResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ShopError::InvalidRequest(format!("{what} name is required")));
    }
    Ok(name.to_string())
}

impl ShopState {
    /// Effective selling price and the offer percent that produced it
    pub fn effective_price(&self, product: &Product) -> (Price, u8) {
        let category_offer = self
            .categories
            .get(&product.category_id)
            .map(|c| c.offer_percent)
            .unwrap_or(0);
        let best = product.offer_percent.max(category_offer);
        (product.sale_price.percent_off(best), best)
    }

    /// Shoppers can see the product and put it in a cart
    pub fn is_purchasable(&self, product: &Product) -> bool {
        !product.blocked
            && self
                .categories
                .get(&product.category_id)
                .map(|c| c.listed)
                .unwrap_or(false)
    }

    pub fn summarize(&self, product: &Product) -> ProductSummary {
        let (effective_price, applied_offer) = self.effective_price(product);
        ProductSummary {
            product: product.clone(),
            category_name: self
                .categories
                .get(&product.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            brand_name: self
                .brands
                .get(&product.brand_id)
                .map(|b| b.name.clone())
                .unwrap_or_default(),
            applied_offer,
            effective_price,
        }
    }

    fn category_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.categories
            .values()
            .any(|c| Some(c.id) != except && c.name.eq_ignore_ascii_case(name))
    }

    fn product_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.products
            .values()
            .any(|p| Some(p.id) != except && p.name.eq_ignore_ascii_case(name))
    }

    fn check_product_refs(&self, category_id: Uuid, brand_id: Uuid) -> ShopResult<()> {
        self.category(category_id)?;
        if self.brand(brand_id)?.blocked {
            return Err(ShopError::InvalidRequest("Brand is blocked".into()));
        }
        Ok(())
    }
}

fn check_prices(regular: i64, sale: Option<i64>) -> ShopResult<i64> {
    let regular = Price::check_amount(regular, "Regular price")?;
    let sale = sale.unwrap_or(regular);
    if sale <= 0 || sale > regular {
        return Err(ShopError::InvalidRequest(
            "Sale price must be positive and not above the regular price".into(),
        ));
    }
    Ok(sale)
}

fn sort_products(items: &mut [ProductSummary], sort: ProductSort) {
    use std::cmp::Ordering;
    let by_name = |a: &ProductSummary, b: &ProductSummary| {
        a.product
            .name
            .to_lowercase()
            .cmp(&b.product.name.to_lowercase())
            .then(a.product.id.cmp(&b.product.id))
    };
    items.sort_by(|a, b| {
        let primary = match sort {
            ProductSort::Newest => b.product.created_at.cmp(&a.product.created_at),
            ProductSort::Popularity => b.product.stock.cmp(&a.product.stock),
            ProductSort::PriceAsc => a.product.regular_price.amount.cmp(&b.product.regular_price.amount),
            ProductSort::PriceDesc => b.product.regular_price.amount.cmp(&a.product.regular_price.amount),
            ProductSort::Rating => b
                .product
                .average_rating
                .partial_cmp(&a.product.average_rating)
                .unwrap_or(Ordering::Equal),
            ProductSort::AToZ => Ordering::Equal,
            ProductSort::ZToA => return by_name(b, a),
        };
        primary.then_with(|| by_name(a, b))
    });
}

impl Shop {
    // ---- categories ----

    pub fn add_category(&self, name: &str, description: &str) -> ShopResult<Category> {
        let name = clean_name(name, "Category")?;
        let mut state = self.write()?;
        if state.category_name_taken(&name, None) {
            return Err(ShopError::Conflict(format!("Category '{name}' already exists")));
        }
        let category = Category {
            id: Uuid::new_v4(),
            name,
            description: description.trim().to_string(),
            listed: true,
            offer_percent: 0,
            created_at: Utc::now(),
        };
        state.categories.insert(category.id, category.clone());
        info!(category_id = %category.id, name = %category.name, "Category added");
        Ok(category)
    }

    pub fn edit_category(&self, id: Uuid, name: &str, description: &str) -> ShopResult<Category> {
        let name = clean_name(name, "Category")?;
        let mut state = self.write()?;
        if state.category_name_taken(&name, Some(id)) {
            return Err(ShopError::Conflict(format!("Category '{name}' already exists")));
        }
        let category = state
            .categories
            .get_mut(&id)
            .ok_or_else(|| ShopError::not_found("Category", id))?;
        category.name = name;
        category.description = description.trim().to_string();
        Ok(category.clone())
    }

    pub fn set_category_listed(&self, id: Uuid, listed: bool) -> ShopResult<Category> {
        let mut state = self.write()?;
        let category = state
            .categories
            .get_mut(&id)
            .ok_or_else(|| ShopError::not_found("Category", id))?;
        category.listed = listed;
        Ok(category.clone())
    }

    pub fn remove_category(&self, id: Uuid) -> ShopResult<()> {
        let mut state = self.write()?;
        state.category(id)?;
        if state.products.values().any(|p| p.category_id == id) {
            return Err(ShopError::Conflict(
                "Category still has products".into(),
            ));
        }
        state.categories.remove(&id);
        Ok(())
    }

    /// Apply a category-wide offer. Refused while any product in the
    /// category carries a larger offer of its own; on success the
    /// category's product offers are cleared.
    pub fn add_category_offer(&self, id: Uuid, pct: u8) -> ShopResult<Category> {
        check_percent(pct)?;
        let mut state = self.write()?;
        state.category(id)?;
        if state
            .products
            .values()
            .any(|p| p.category_id == id && p.offer_percent > pct)
        {
            return Err(ShopError::Conflict(
                "Products within this category already have higher offers".into(),
            ));
        }
        for product in state.products.values_mut().filter(|p| p.category_id == id) {
            product.offer_percent = 0;
        }
        let category = state
            .categories
            .get_mut(&id)
            .ok_or_else(|| ShopError::not_found("Category", id))?;
        category.offer_percent = pct;
        info!(category_id = %id, pct, "Category offer applied");
        Ok(category.clone())
    }

    pub fn remove_category_offer(&self, id: Uuid) -> ShopResult<Category> {
        let mut state = self.write()?;
        let category = state
            .categories
            .get_mut(&id)
            .ok_or_else(|| ShopError::not_found("Category", id))?;
        category.offer_percent = 0;
        Ok(category.clone())
    }

    /// Back-office category listing, newest first
    pub fn list_categories(&self, search: Option<&str>, page: usize) -> ShopResult<Page<Category>> {
        let state = self.read()?;
        let mut items: Vec<Category> = state
            .categories
            .values()
            .filter(|c| matches_search(&c.name, search))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.name.cmp(&b.name)));
        Ok(Page::paginate(items, page, ADMIN_CATALOG_PAGE_SIZE))
    }

    /// Categories shown on the storefront filter, by name
    pub fn listed_categories(&self) -> ShopResult<Vec<Category>> {
        let state = self.read()?;
        let mut items: Vec<Category> = state
            .categories
            .values()
            .filter(|c| c.listed)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    // ---- brands ----

    pub fn add_brand(&self, name: &str, image: Option<String>) -> ShopResult<Brand> {
        let name = clean_name(name, "Brand")?;
        let mut state = self.write()?;
        if state.brands.values().any(|b| b.name.eq_ignore_ascii_case(&name)) {
            return Err(ShopError::Conflict(format!("Brand '{name}' already exists")));
        }
        let brand = Brand {
            id: Uuid::new_v4(),
            name,
            image,
            blocked: false,
            created_at: Utc::now(),
        };
        state.brands.insert(brand.id, brand.clone());
        Ok(brand)
    }

    pub fn set_brand_blocked(&self, id: Uuid, blocked: bool) -> ShopResult<Brand> {
        let mut state = self.write()?;
        let brand = state
            .brands
            .get_mut(&id)
            .ok_or_else(|| ShopError::not_found("Brand", id))?;
        brand.blocked = blocked;
        Ok(brand.clone())
    }

    pub fn remove_brand(&self, id: Uuid) -> ShopResult<()> {
        let mut state = self.write()?;
        state.brand(id)?;
        if state.products.values().any(|p| p.brand_id == id) {
            return Err(ShopError::Conflict("Brand still has products".into()));
        }
        state.brands.remove(&id);
        Ok(())
    }

    pub fn list_brands(&self, search: Option<&str>, page: usize) -> ShopResult<Page<Brand>> {
        let state = self.read()?;
        let mut items: Vec<Brand> = state
            .brands
            .values()
            .filter(|b| matches_search(&b.name, search))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.name.cmp(&b.name)));
        Ok(Page::paginate(items, page, ADMIN_CATALOG_PAGE_SIZE))
    }

    // ---- products ----

    pub fn add_product(&self, input: NewProduct) -> ShopResult<Product> {
        let name = clean_name(&input.name, "Product")?;
        let sale = check_prices(input.regular_price, input.sale_price)?;
        if input.images.is_empty() {
            return Err(ShopError::InvalidRequest(
                "At least one product image is required".into(),
            ));
        }
        let mut state = self.write()?;
        if state.product_name_taken(&name, None) {
            return Err(ShopError::Conflict(format!("Product '{name}' already exists")));
        }
        state.check_product_refs(input.category_id, input.brand_id)?;

        let product = Product {
            id: Uuid::new_v4(),
            name,
            description: input.description,
            brand_id: input.brand_id,
            category_id: input.category_id,
            regular_price: self.price(input.regular_price),
            sale_price: self.price(sale),
            stock: input.stock,
            images: input.images,
            offer_percent: 0,
            blocked: false,
            returnable: input.returnable,
            sales_count: 0,
            average_rating: 0.0,
            created_at: Utc::now(),
        };
        state.products.insert(product.id, product.clone());
        info!(product_id = %product.id, name = %product.name, "Product added");
        Ok(product)
    }

    pub fn update_product(&self, id: Uuid, input: ProductUpdate) -> ShopResult<Product> {
        let name = clean_name(&input.name, "Product")?;
        let sale = check_prices(input.regular_price, input.sale_price)?;
        if matches!(&input.images, Some(images) if images.is_empty()) {
            return Err(ShopError::InvalidRequest(
                "At least one product image is required".into(),
            ));
        }
        let currency = self.currency();
        let mut state = self.write()?;
        state.product(id)?;
        if state.product_name_taken(&name, Some(id)) {
            return Err(ShopError::Conflict(format!("Product '{name}' already exists")));
        }
        state.check_product_refs(input.category_id, input.brand_id)?;

        let product = state.product_mut(id)?;
        product.name = name;
        product.description = input.description;
        product.brand_id = input.brand_id;
        product.category_id = input.category_id;
        product.regular_price = Price::from_minor(input.regular_price, currency);
        product.sale_price = Price::from_minor(sale, currency);
        product.stock = input.stock;
        if let Some(images) = input.images {
            product.images = images;
        }
        product.returnable = input.returnable;
        Ok(product.clone())
    }

    pub fn set_product_blocked(&self, id: Uuid, blocked: bool) -> ShopResult<Product> {
        let mut state = self.write()?;
        let product = state.product_mut(id)?;
        product.blocked = blocked;
        info!(product_id = %id, blocked, "Product visibility changed");
        Ok(product.clone())
    }

    pub fn add_product_offer(&self, id: Uuid, pct: u8) -> ShopResult<ProductSummary> {
        check_percent(pct)?;
        let mut state = self.write()?;
        state.product_mut(id)?.offer_percent = pct;
        Ok(state.summarize(state.product(id)?))
    }

    pub fn remove_product_offer(&self, id: Uuid) -> ShopResult<ProductSummary> {
        let mut state = self.write()?;
        state.product_mut(id)?.offer_percent = 0;
        Ok(state.summarize(state.product(id)?))
    }

    /// Current selling price of a product
    pub fn effective_price(&self, id: Uuid) -> ShopResult<Price> {
        let state = self.read()?;
        let product = state.product(id)?;
        Ok(state.effective_price(product).0)
    }

    /// Storefront listing
    pub fn browse(&self, query: &ProductQuery) -> ShopResult<Page<ProductSummary>> {
        let state = self.read()?;
        let mut items: Vec<ProductSummary> = state
            .products
            .values()
            .filter(|p| state.is_purchasable(p))
            .filter(|p| query.category.map_or(true, |c| p.category_id == c))
            .filter(|p| query.brand.map_or(true, |b| p.brand_id == b))
            .filter(|p| query.min_price.map_or(true, |min| p.regular_price.amount >= min))
            .filter(|p| query.max_price.map_or(true, |max| p.regular_price.amount <= max))
            .filter(|p| !query.in_stock || p.stock > 0)
            .filter(|p| matches_search(&p.name, query.search.as_deref()))
            .map(|p| state.summarize(p))
            .collect();
        sort_products(&mut items, query.sort);
        Ok(Page::paginate(items, query.page, SHOP_PAGE_SIZE))
    }

    /// Product page: the product, related products and reviews
    pub fn product_detail(&self, id: Uuid) -> ShopResult<ProductDetail> {
        let state = self.read()?;
        let product = state.product(id)?;
        if !state.is_purchasable(product) {
            return Err(ShopError::not_found("Product", id));
        }
        let mut related: Vec<ProductSummary> = state
            .products
            .values()
            .filter(|p| {
                p.id != id
                    && p.category_id == product.category_id
                    && p.stock > 0
                    && !p.blocked
            })
            .map(|p| state.summarize(p))
            .collect();
        sort_products(&mut related, ProductSort::Newest);
        related.truncate(RELATED_PRODUCTS);

        Ok(ProductDetail {
            product: state.summarize(product),
            related,
            reviews: state.product_reviews(id),
        })
    }

    /// Back-office product listing, blocked products included
    pub fn admin_products(&self, search: Option<&str>, page: usize) -> ShopResult<Page<ProductSummary>> {
        let state = self.read()?;
        let mut items: Vec<ProductSummary> = state
            .products
            .values()
            .filter(|p| matches_search(&p.name, search))
            .map(|p| state.summarize(p))
            .collect();
        sort_products(&mut items, ProductSort::Newest);
        Ok(Page::paginate(items, page, ADMIN_CATALOG_PAGE_SIZE))
    }

    pub fn product(&self, id: Uuid) -> ShopResult<ProductSummary> {
        let state = self.read()?;
        Ok(state.summarize(state.product(id)?))
    }

    /// Load a seed catalog. Categories and brands that already exist by
    /// name are reused.
    pub fn seed(&self, seed: CatalogSeed) -> ShopResult<()> {
        for c in &seed.categories {
            let existing = self.category_by_name(&c.name)?;
            let category = match existing {
                Some(category) => category,
                None => self.add_category(&c.name, &c.description)?,
            };
            if c.offer_percent > 0 {
                self.add_category_offer(category.id, c.offer_percent)?;
            }
        }
        for b in &seed.brands {
            if self.brand_by_name(&b.name)?.is_none() {
                self.add_brand(&b.name, b.image.clone())?;
            }
        }
        for p in seed.products {
            let category = self
                .category_by_name(&p.category)?
                .ok_or_else(|| ShopError::not_found("Category", &p.category))?;
            let brand = self
                .brand_by_name(&p.brand)?
                .ok_or_else(|| ShopError::not_found("Brand", &p.brand))?;
            let product = self.add_product(NewProduct {
                name: p.name,
                description: p.description,
                brand_id: brand.id,
                category_id: category.id,
                regular_price: p.regular_price,
                sale_price: p.sale_price,
                stock: p.stock,
                images: p.images,
                returnable: p.returnable,
            })?;
            if p.offer_percent > 0 {
                self.add_product_offer(product.id, p.offer_percent)?;
            }
        }
        info!(
            categories = seed.categories.len(),
            brands = seed.brands.len(),
            "Seed catalog loaded"
        );
        Ok(())
    }

    fn category_by_name(&self, name: &str) -> ShopResult<Option<Category>> {
        let state = self.read()?;
        Ok(state
            .categories
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    fn brand_by_name(&self, name: &str) -> ShopResult<Option<Brand>> {
        let state = self.read()?;
        Ok(state
            .brands
            .values()
            .find(|b| b.name.eq_ignore_ascii_case(name.trim()))
            .cloned())
    }
}
