//! Account collaborator
//!
//! Balance storage and transfer primitives. Every mutation goes through a
//! [`TxContext`], so a failed message leaves no trace.

use crate::{
    coin::Coin,
    store::TxContext,
    types::{Account, AccountKey, FundingPool},
    Error, Result,
};
use std::collections::BTreeMap;

/// Account operations consumed by the settlement handlers
pub trait AccountLedger: Send + Sync {
    /// Check whether an account exists
    fn exists(&self, ctx: &TxContext<'_>, key: &AccountKey) -> bool;

    /// Register a new account
    fn create_account(
        &self,
        ctx: &mut TxContext<'_>,
        key: &AccountKey,
        saving: Coin,
        checking: Coin,
    ) -> Result<()>;

    /// Balance of one pool
    fn balance(&self, ctx: &TxContext<'_>, key: &AccountKey, pool: FundingPool) -> Result<Coin>;

    /// Remove coin from a pool, failing if the balance is too low
    fn debit(
        &self,
        ctx: &mut TxContext<'_>,
        key: &AccountKey,
        coin: Coin,
        pool: FundingPool,
    ) -> Result<()>;

    /// Add coin to a pool
    fn credit(
        &self,
        ctx: &mut TxContext<'_>,
        key: &AccountKey,
        coin: Coin,
        pool: FundingPool,
    ) -> Result<()>;

    /// Number of donations `consumer` has made to `author`
    fn donation_count(
        &self,
        ctx: &TxContext<'_>,
        consumer: &AccountKey,
        author: &AccountKey,
    ) -> Result<u64>;

    /// Count one more donation from `consumer` to `author`
    fn record_donation_relationship(
        &self,
        ctx: &mut TxContext<'_>,
        consumer: &AccountKey,
        author: &AccountKey,
    ) -> Result<()>;

    /// Current stake of an account
    fn stake_of(&self, ctx: &TxContext<'_>, key: &AccountKey) -> Result<Coin>;
}

/// Reference account manager over the ledger state
///
/// Stake is the saving balance at the time of the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountManager;

impl AccountManager {
    /// Create account manager
    pub fn new() -> Self {
        Self
    }

    fn account<'c>(&self, ctx: &'c TxContext<'_>, key: &AccountKey) -> Result<&'c Account> {
        ctx.account(key)
            .ok_or_else(|| Error::AccountNotFound(key.clone()))
    }

    fn account_mut<'c>(
        &self,
        ctx: &'c mut TxContext<'_>,
        key: &AccountKey,
    ) -> Result<&'c mut Account> {
        ctx.account_mut(key)
            .ok_or_else(|| Error::AccountNotFound(key.clone()))
    }
}

impl AccountLedger for AccountManager {
    fn exists(&self, ctx: &TxContext<'_>, key: &AccountKey) -> bool {
        ctx.has_account(key)
    }

    fn create_account(
        &self,
        ctx: &mut TxContext<'_>,
        key: &AccountKey,
        saving: Coin,
        checking: Coin,
    ) -> Result<()> {
        if ctx.has_account(key) {
            return Err(Error::AccountAlreadyExists(key.clone()));
        }

        let created_at = ctx.block_time();
        ctx.put_account(Account {
            username: key.clone(),
            saving,
            checking,
            created_at,
            donation_relationships: BTreeMap::new(),
        });

        Ok(())
    }

    fn balance(&self, ctx: &TxContext<'_>, key: &AccountKey, pool: FundingPool) -> Result<Coin> {
        Ok(self.account(ctx, key)?.balance(pool))
    }

    fn debit(
        &self,
        ctx: &mut TxContext<'_>,
        key: &AccountKey,
        coin: Coin,
        pool: FundingPool,
    ) -> Result<()> {
        let account = self.account_mut(ctx, key)?;
        let balance = account.balance_mut(pool);
        let available = *balance;

        *balance = available.minus(coin).map_err(|_| Error::InsufficientFunds {
            account: key.clone(),
            pool,
            available,
            required: coin,
        })?;

        tracing::trace!(account = %key, %pool, %coin, "Debited");
        Ok(())
    }

    fn credit(
        &self,
        ctx: &mut TxContext<'_>,
        key: &AccountKey,
        coin: Coin,
        pool: FundingPool,
    ) -> Result<()> {
        let account = self.account_mut(ctx, key)?;
        *account.balance_mut(pool) += coin;

        tracing::trace!(account = %key, %pool, %coin, "Credited");
        Ok(())
    }

    fn donation_count(
        &self,
        ctx: &TxContext<'_>,
        consumer: &AccountKey,
        author: &AccountKey,
    ) -> Result<u64> {
        Ok(self
            .account(ctx, consumer)?
            .donation_relationships
            .get(author)
            .copied()
            .unwrap_or(0))
    }

    fn record_donation_relationship(
        &self,
        ctx: &mut TxContext<'_>,
        consumer: &AccountKey,
        author: &AccountKey,
    ) -> Result<()> {
        let account = self.account_mut(ctx, consumer)?;
        *account
            .donation_relationships
            .entry(author.clone())
            .or_insert(0) += 1;
        Ok(())
    }

    fn stake_of(&self, ctx: &TxContext<'_>, key: &AccountKey) -> Result<Coin> {
        self.balance(ctx, key, FundingPool::Saving)
    }
}
