//! # Wallet
//!
//! Every customer has a wallet ledger: refunds credit it, wallet
//! purchases debit it, and gateway top-ups credit it once their payment
//! is captured. Transaction amounts are signed.

use crate::error::{ShopError, ShopResult};
use crate::money::{Currency, Price};
use crate::store::{Page, Shop};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

pub const WALLET_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Refund,
    Purchase,
    TopUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    /// Positive for credits, negative for debits
    pub amount: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    pub status: TransactionStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub customer_id: Uuid,
    pub balance: Price,
    pub transactions: Vec<WalletTransaction>,
}

impl Wallet {
    pub fn new(customer_id: Uuid, currency: Currency) -> Self {
        Self {
            customer_id,
            balance: Price::zero(currency),
            transactions: Vec::new(),
        }
    }

    fn record(
        &mut self,
        kind: TransactionKind,
        amount: Price,
        order_id: Option<Uuid>,
        status: TransactionStatus,
        description: String,
    ) -> WalletTransaction {
        let tx = WalletTransaction {
            id: Uuid::new_v4(),
            kind,
            amount,
            order_id,
            status,
            description,
            created_at: Utc::now(),
        };
        self.transactions.push(tx.clone());
        tx
    }

    /// Credit a refund for an order
    pub fn credit_refund(&mut self, amount: Price, order_id: Uuid, description: impl Into<String>) -> WalletTransaction {
        self.balance = self.balance.plus(amount);
        self.record(
            TransactionKind::Refund,
            amount,
            Some(order_id),
            TransactionStatus::Completed,
            description.into(),
        )
    }

    /// Ensure the balance covers `amount`
    pub fn check_funds(&self, amount: Price) -> ShopResult<()> {
        if self.balance.amount < amount.amount {
            return Err(ShopError::InsufficientBalance {
                required: amount,
                available: self.balance,
            });
        }
        Ok(())
    }

    /// Debit a purchase. Refused when the balance is short.
    pub fn debit_purchase(&mut self, amount: Price, order_id: Uuid) -> ShopResult<WalletTransaction> {
        self.check_funds(amount)?;
        self.balance = self.balance.saturating_sub(amount);
        Ok(self.record(
            TransactionKind::Purchase,
            amount.negate(),
            Some(order_id),
            TransactionStatus::Completed,
            format!("Payment for order {order_id}"),
        ))
    }
}

/// A wallet top-up waiting on its gateway payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUp {
    pub gateway_order_id: String,
    pub customer_id: Uuid,
    pub amount: Price,
    pub transaction_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub status: TransactionStatus,
}

/// Balance plus one page of history, newest first
#[derive(Debug, Clone, Serialize)]
pub struct WalletStatement {
    pub balance: Price,
    pub transactions: Page<WalletTransaction>,
}

impl Shop {
    /// The customer's wallet, created empty on first use
    pub fn wallet(&self, customer_id: Uuid) -> ShopResult<Wallet> {
        let currency = self.currency();
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        Ok(state.wallet_mut(customer_id, currency).clone())
    }

    pub fn wallet_history(&self, customer_id: Uuid, page: usize) -> ShopResult<WalletStatement> {
        let wallet = self.wallet(customer_id)?;
        let mut transactions = wallet.transactions;
        transactions.reverse();
        Ok(WalletStatement {
            balance: wallet.balance,
            transactions: Page::paginate(transactions, page, WALLET_PAGE_SIZE),
        })
    }

    /// Record a pending top-up tied to a gateway order
    pub fn begin_top_up(
        &self,
        customer_id: Uuid,
        amount: Price,
        gateway_order_id: &str,
    ) -> ShopResult<TopUp> {
        Price::check_amount(amount.amount, "Top-up amount")?;
        let currency = self.currency();
        let mut state = self.write()?;
        state.active_customer(customer_id)?;
        if state.top_ups.contains_key(gateway_order_id) {
            return Err(ShopError::Conflict(format!(
                "Top-up already recorded for {gateway_order_id}"
            )));
        }
        let tx = state.wallet_mut(customer_id, currency).record(
            TransactionKind::TopUp,
            amount,
            None,
            TransactionStatus::Pending,
            "Wallet top-up".into(),
        );
        let top_up = TopUp {
            gateway_order_id: gateway_order_id.to_string(),
            customer_id,
            amount,
            transaction_id: tx.id,
            payment_id: None,
            status: TransactionStatus::Pending,
        };
        state
            .top_ups
            .insert(top_up.gateway_order_id.clone(), top_up.clone());
        Ok(top_up)
    }

    /// A customer's top-up by its gateway order id
    pub fn top_up(&self, customer_id: Uuid, gateway_order_id: &str) -> ShopResult<TopUp> {
        let state = self.read()?;
        state
            .top_ups
            .get(gateway_order_id)
            .filter(|t| t.customer_id == customer_id)
            .cloned()
            .ok_or_else(|| ShopError::not_found("Top-up", gateway_order_id))
    }

    /// Whether a gateway order belongs to a wallet top-up
    pub fn is_top_up(&self, gateway_order_id: &str) -> ShopResult<bool> {
        Ok(self.read()?.top_ups.contains_key(gateway_order_id))
    }

    /// Credit a captured top-up. A top-up completes at most once.
    pub fn complete_top_up(&self, gateway_order_id: &str, payment_id: &str) -> ShopResult<Wallet> {
        self.settle_top_up(gateway_order_id, Some(payment_id), TransactionStatus::Completed)
    }

    /// Mark a top-up whose payment failed
    pub fn fail_top_up(&self, gateway_order_id: &str) -> ShopResult<Wallet> {
        self.settle_top_up(gateway_order_id, None, TransactionStatus::Failed)
    }

    fn settle_top_up(
        &self,
        gateway_order_id: &str,
        payment_id: Option<&str>,
        outcome: TransactionStatus,
    ) -> ShopResult<Wallet> {
        let currency = self.currency();
        let mut state = self.write()?;
        let top_up = state
            .top_ups
            .get_mut(gateway_order_id)
            .ok_or_else(|| ShopError::not_found("Top-up", gateway_order_id))?;
        if top_up.status != TransactionStatus::Pending {
            return Err(ShopError::Conflict(format!(
                "Top-up {gateway_order_id} is already settled"
            )));
        }
        top_up.status = outcome;
        top_up.payment_id = payment_id.map(str::to_string);
        let (customer_id, amount, tx_id) = (top_up.customer_id, top_up.amount, top_up.transaction_id);

        let wallet = state.wallet_mut(customer_id, currency);
        if let Some(tx) = wallet.transactions.iter_mut().find(|t| t.id == tx_id) {
            tx.status = outcome;
        }
        if outcome == TransactionStatus::Completed {
            wallet.balance = wallet.balance.plus(amount);
            info!(customer_id = %customer_id, amount = amount.amount, "Wallet topped up");
        }
        Ok(wallet.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::*;

    #[test]
    fn test_wallet_created_on_first_use() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        let wallet = kit.shop.wallet(customer).unwrap();
        assert!(wallet.balance.is_zero());
        assert!(wallet.transactions.is_empty());
    }

    #[test]
    fn test_debit_refused_on_short_balance() {
        let mut wallet = Wallet::new(Uuid::new_v4(), Currency::INR);
        let order = Uuid::new_v4();
        wallet.credit_refund(Price::from_minor(300_00, Currency::INR), order, "refund");

        let err = wallet
            .debit_purchase(Price::from_minor(500_00, Currency::INR), order)
            .unwrap_err();
        assert!(matches!(err, ShopError::InsufficientBalance { .. }));
        assert_eq!(wallet.balance.amount, 300_00);

        let tx = wallet
            .debit_purchase(Price::from_minor(200_00, Currency::INR), order)
            .unwrap();
        assert_eq!(tx.amount.amount, -200_00);
        assert_eq!(wallet.balance.amount, 100_00);
    }

    #[test]
    fn test_top_up_credits_once() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        let amount = Price::from_minor(500_00, kit.shop.currency());
        kit.shop.begin_top_up(customer, amount, "order_TOP1").unwrap();
        assert!(kit.shop.wallet(customer).unwrap().balance.is_zero());

        let wallet = kit.shop.complete_top_up("order_TOP1", "pay_1").unwrap();
        assert_eq!(wallet.balance.amount, 500_00);
        assert_eq!(wallet.transactions[0].status, TransactionStatus::Completed);

        assert!(matches!(
            kit.shop.complete_top_up("order_TOP1", "pay_1").unwrap_err(),
            ShopError::Conflict(_)
        ));
        assert_eq!(kit.shop.wallet(customer).unwrap().balance.amount, 500_00);
    }

    #[test]
    fn test_top_up_amount_bounds() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        let currency = kit.shop.currency();
        for amount in [0, -5, crate::money::MAX_AMOUNT_MINOR + 1] {
            assert!(matches!(
                kit.shop
                    .begin_top_up(customer, Price::from_minor(amount, currency), "order_BIG")
                    .unwrap_err(),
                ShopError::InvalidRequest(_)
            ));
        }
        assert!(!kit.shop.is_top_up("order_BIG").unwrap());
    }

    #[test]
    fn test_failed_top_up_leaves_balance() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        let amount = Price::from_minor(200_00, kit.shop.currency());
        kit.shop.begin_top_up(customer, amount, "order_TOP2").unwrap();
        let wallet = kit.shop.fail_top_up("order_TOP2").unwrap();
        assert!(wallet.balance.is_zero());
        assert_eq!(wallet.transactions[0].status, TransactionStatus::Failed);
        assert!(kit.shop.complete_top_up("order_TOP2", "pay_2").is_err());
    }

    #[test]
    fn test_top_up_lookup_is_owned() {
        let kit = Kit::new();
        let (asha, _) = kit.customer("Asha");
        let (ravi, _) = kit.customer("Ravi");
        let amount = Price::from_minor(50_00, kit.shop.currency());
        kit.shop.begin_top_up(asha, amount, "order_TOP3").unwrap();

        assert!(kit.shop.is_top_up("order_TOP3").unwrap());
        assert!(!kit.shop.is_top_up("order_other").unwrap());
        assert_eq!(kit.shop.top_up(asha, "order_TOP3").unwrap().amount, amount);
        assert!(matches!(
            kit.shop.top_up(ravi, "order_TOP3").unwrap_err(),
            ShopError::NotFound { .. }
        ));
    }

    #[test]
    fn test_history_newest_first() {
        let kit = Kit::new();
        let (customer, _) = kit.customer("Asha");
        for i in 0..7 {
            let amount = Price::from_minor(100 + i, kit.shop.currency());
            let id = format!("order_{i}");
            kit.shop.begin_top_up(customer, amount, &id).unwrap();
            kit.shop.complete_top_up(&id, "pay").unwrap();
        }
        let statement = kit.shop.wallet_history(customer, 1).unwrap();
        assert_eq!(statement.transactions.items.len(), WALLET_PAGE_SIZE);
        assert_eq!(statement.transactions.items[0].amount.amount, 106);
        assert_eq!(statement.transactions.total_pages, 2);
    }
}
