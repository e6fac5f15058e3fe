//! Account ledger kept beside the matching engine.
//!
//! Balances are plain per-signer amounts. Nothing in the order book calls
//! into this module; matches are not settled against balances.

pub mod error;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub use error::{AccountError, AccountResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxAction {
    Deposit,
    Withdraw,
}

/// Record of one balance change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tx {
    pub action: TxAction,
    pub signer: String,
    pub amount: Decimal,
}

#[derive(Debug, Default)]
pub struct Accounts {
    balances: DashMap<String, Decimal>,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_account(&self, signer: &str) -> AccountResult<()> {
        match self.balances.entry(signer.to_string()) {
            Entry::Occupied(_) => Err(AccountError::AlreadyExists(signer.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(Decimal::ZERO);
                debug!("Created account {}", signer);
                Ok(())
            }
        }
    }

    pub fn balance_of(&self, signer: &str) -> AccountResult<Decimal> {
        self.balances
            .get(signer)
            .map(|balance| *balance)
            .ok_or_else(|| AccountError::NotFound(signer.to_string()))
    }

    /// Every balance keyed by signer, ordered by signer.
    pub fn balances(&self) -> BTreeMap<String, Decimal> {
        self.balances
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Credit `amount`, opening the account first if it does not exist.
    pub fn deposit(&self, signer: &str, amount: Decimal) -> AccountResult<Tx> {
        check_amount(amount)?;
        *self
            .balances
            .entry(signer.to_string())
            .or_insert(Decimal::ZERO) += amount;

        debug!("Deposited {} to {}", amount, signer);
        Ok(Tx {
            action: TxAction::Deposit,
            signer: signer.to_string(),
            amount,
        })
    }

    pub fn withdraw(&self, signer: &str, amount: Decimal) -> AccountResult<Tx> {
        check_amount(amount)?;
        let mut balance = self
            .balances
            .get_mut(signer)
            .ok_or_else(|| AccountError::NotFound(signer.to_string()))?;

        if *balance < amount {
            return Err(AccountError::UnderFunded(signer.to_string()));
        }
        *balance -= amount;

        debug!("Withdrew {} from {}", amount, signer);
        Ok(Tx {
            action: TxAction::Withdraw,
            signer: signer.to_string(),
            amount,
        })
    }

    /// Move `amount` from `sender` to `recipient`; returns the withdraw and
    /// deposit transactions in that order.
    pub fn send(&self, sender: &str, recipient: &str, amount: Decimal) -> AccountResult<[Tx; 2]> {
        let withdrawal = self.withdraw(sender, amount)?;
        let deposit = self.deposit(recipient, amount)?;
        Ok([withdrawal, deposit])
    }

    /// Close every account.
    pub fn clear(&self) {
        let closed = self.balances.len();
        self.balances.clear();
        info!("Cleared {} accounts", closed);
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

fn check_amount(amount: Decimal) -> AccountResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AccountError::InvalidAmount(amount));
    }
    Ok(())
}
