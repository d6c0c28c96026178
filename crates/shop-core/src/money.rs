//! # Money
//!
//! Currency and integer minor-unit prices. The store trades in INR by
//! default, so amounts are paise unless another currency is configured.

use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};

/// Largest amount the store accepts for a price or a top-up (₹1000 crore)
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000_000;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    INR,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// Returns the ISO 4217 currency code, upper case as the gateway expects
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
        }
    }

    pub fn decimal_places(&self) -> u8 {
        2
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::INR => "₹",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
        }
    }

    /// Convert a decimal amount to the smallest currency unit (paise, cents)
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "INR" => Some(Currency::INR),
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            _ => None,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::INR
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price with amount in smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (paise for INR)
    pub amount: i64,
    pub currency: Currency,
}

impl Price {
    /// Create a new price from decimal amount
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_smallest_unit(amount),
            currency,
        }
    }

    /// Create a price from smallest unit
    pub fn from_minor(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Refuse amounts outside `1..=MAX_AMOUNT_MINOR`
    pub fn check_amount(amount: i64, what: &str) -> ShopResult<i64> {
        if amount <= 0 {
            return Err(ShopError::InvalidRequest(format!("{what} must be positive")));
        }
        if amount > MAX_AMOUNT_MINOR {
            return Err(ShopError::InvalidRequest(format!("{what} is too large")));
        }
        Ok(amount)
    }

    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        self.currency.from_smallest_unit(self.amount)
    }

    /// Format for display (e.g., "₹1299.50")
    pub fn display(&self) -> String {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        format!(
            "{}{}{}.{:02}",
            sign,
            self.currency.symbol(),
            abs / 100,
            abs % 100
        )
    }

    pub fn plus(self, other: Price) -> Price {
        Price::from_minor(self.amount.saturating_add(other.amount), self.currency)
    }

    /// Subtraction clamped at zero
    pub fn saturating_sub(self, other: Price) -> Price {
        Price::from_minor(self.amount.saturating_sub(other.amount).max(0), self.currency)
    }

    pub fn times(self, qty: u32) -> Price {
        Price::from_minor(self.amount.saturating_mul(qty as i64), self.currency)
    }

    pub fn negate(self) -> Price {
        Price::from_minor(self.amount.saturating_neg(), self.currency)
    }

    /// `self * numerator / denominator` without intermediate overflow,
    /// rounded towards zero. A zero denominator gives zero.
    pub fn scale(self, numerator: i64, denominator: i64) -> Price {
        if denominator == 0 {
            return Price::zero(self.currency);
        }
        let scaled = self.amount as i128 * numerator as i128 / denominator as i128;
        let clamped = scaled.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Price::from_minor(clamped, self.currency)
    }

    /// Discount worth `pct` percent of this price, rounded down
    pub fn percent_of(self, pct: u8) -> Price {
        self.scale(pct as i64, 100)
    }

    /// This price with a `pct` percent discount (the discount rounds down)
    pub fn percent_off(self, pct: u8) -> Price {
        self.saturating_sub(self.percent_of(pct))
    }

    pub fn min(self, other: Price) -> Price {
        if other.amount < self.amount {
            Price::from_minor(other.amount, self.currency)
        } else {
            self
        }
    }
}
