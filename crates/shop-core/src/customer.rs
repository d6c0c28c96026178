//! # Customers
//!
//! Customer accounts, blocking, and the address book.

use crate::error::{ShopError, ShopResult};
use crate::store::{matches_search, Page, Shop};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

pub const CUSTOMER_PAGE_SIZE: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub landmark: String,
    pub phone: String,
}

impl Address {
    /// Single-line shipping address stored on orders
    pub fn shipping_label(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        if !self.landmark.is_empty() {
            parts.push(self.landmark.as_str());
        }
        parts.push(self.city.as_str());
        format!(
            "{}, {} - {} (Ph: {})",
            parts.join(", "),
            self.state,
            self.pincode,
            self.phone
        )
    }
}

/// Address fields as submitted by the customer
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    pub name: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub landmark: String,
    pub phone: String,
}

impl AddressInput {
    fn validate(&self) -> ShopResult<()> {
        let required = [
            ("name", &self.name),
            ("city", &self.city),
            ("state", &self.state),
            ("pincode", &self.pincode),
            ("phone", &self.phone),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ShopError::InvalidRequest(format!("Address {field} is required")));
        }
        if self.pincode.trim().len() != 6 || !self.pincode.trim().chars().all(|c| c.is_ascii_digit()) {
            return Err(ShopError::InvalidRequest("Pincode must be 6 digits".into()));
        }
        Ok(())
    }

    fn into_address(self, id: Uuid) -> Address {
        Address {
            id,
            name: self.name.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            pincode: self.pincode.trim().to_string(),
            landmark: self.landmark.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }
}

impl Shop {
    pub fn register_customer(
        &self,
        name: &str,
        email: &str,
        phone: Option<String>,
    ) -> ShopResult<Customer> {
        let name = name.trim();
        let email = email.trim().to_lowercase();
        if name.is_empty() {
            return Err(ShopError::InvalidRequest("Name is required".into()));
        }
        if !email.contains('@') {
            return Err(ShopError::InvalidRequest("A valid email is required".into()));
        }
        let mut state = self.write()?;
        if state.customers.values().any(|c| c.email == email) {
            return Err(ShopError::Conflict("Email is already registered".into()));
        }
        let customer = Customer {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            phone,
            blocked: false,
            created_at: Utc::now(),
        };
        state.customers.insert(customer.id, customer.clone());
        info!(customer_id = %customer.id, "Customer registered");
        Ok(customer)
    }

    /// Change the name and, when given, the phone number
    pub fn update_profile(
        &self,
        customer_id: Uuid,
        name: &str,
        phone: Option<&str>,
    ) -> ShopResult<Customer> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ShopError::InvalidRequest("Name is required".into()));
        }
        let phone = phone.map(str::trim).filter(|p| !p.is_empty());
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        let customer = state
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| ShopError::not_found("Customer", customer_id))?;
        customer.name = name.to_string();
        if let Some(phone) = phone {
            customer.phone = Some(phone.to_string());
        }
        info!(customer_id = %customer_id, "Profile updated");
        Ok(customer.clone())
    }

    pub fn customer(&self, id: Uuid) -> ShopResult<Customer> {
        self.read()?.customer(id).cloned()
    }

    /// Back-office customer listing, newest first
    pub fn customers(&self, search: Option<&str>, page: usize) -> ShopResult<Page<Customer>> {
        let state = self.read()?;
        let mut items: Vec<Customer> = state
            .customers
            .values()
            .filter(|c| matches_search(&c.name, search) || matches_search(&c.email, search))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.email.cmp(&b.email)));
        Ok(Page::paginate(items, page, CUSTOMER_PAGE_SIZE))
    }

    pub fn set_customer_blocked(&self, id: Uuid, blocked: bool) -> ShopResult<Customer> {
        let mut state = self.write()?;
        let customer = state
            .customers
            .get_mut(&id)
            .ok_or_else(|| ShopError::not_found("Customer", id))?;
        customer.blocked = blocked;
        info!(customer_id = %id, blocked, "Customer access changed");
        Ok(customer.clone())
    }

    pub fn addresses(&self, customer_id: Uuid) -> ShopResult<Vec<Address>> {
        let state = self.read()?;
        state.active_customer(customer_id)?;
        Ok(state.addresses.get(&customer_id).cloned().unwrap_or_default())
    }

    pub fn add_address(&self, customer_id: Uuid, input: AddressInput) -> ShopResult<Address> {
        input.validate()?;
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        let address = input.into_address(Uuid::new_v4());
        state
            .addresses
            .entry(customer_id)
            .or_default()
            .push(address.clone());
        Ok(address)
    }

    pub fn edit_address(
        &self,
        customer_id: Uuid,
        address_id: Uuid,
        input: AddressInput,
    ) -> ShopResult<Address> {
        input.validate()?;
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        let slot = state
            .addresses
            .get_mut(&customer_id)
            .and_then(|book| book.iter_mut().find(|a| a.id == address_id))
            .ok_or_else(|| ShopError::not_found("Address", address_id))?;
        *slot = input.into_address(address_id);
        Ok(slot.clone())
    }

    pub fn remove_address(&self, customer_id: Uuid, address_id: Uuid) -> ShopResult<()> {
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        let book = state.addresses.entry(customer_id).or_default();
        let before = book.len();
        book.retain(|a| a.id != address_id);
        if book.len() == before {
            return Err(ShopError::not_found("Address", address_id));
        }
        Ok(())
    }
}
