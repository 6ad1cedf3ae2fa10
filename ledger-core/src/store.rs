//! Ledger state and the per-message transactional context
//!
//! # Keyspaces
//!
//! - `accounts` - Account records (key: account name)
//! - `posts` - Post records (key: `(author, post_id)`)
//! - `global` - Global economic state (singleton)
//! - `reward_events` - Queued reward events (key: `(due_at, seq)`)
//!
//! Every keyspace is an ordered map, so iteration order and the canonical
//! encoding are identical on every node.
//!
//! # Transactions
//!
//! A [`TxContext`] borrows the committed state immutably and records every
//! write in its own overlay. Committing turns the overlay into a [`WriteSet`]
//! that is applied in one step; dropping the context discards all writes.

use crate::{
    coin::Coin,
    config::Config,
    error::Result,
    types::{
        Account, AccountKey, BlockInfo, GlobalState, Post, PostKey, RewardEvent, RewardEventKey,
        ScheduledRewardEvent,
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Committed ledger state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    accounts: BTreeMap<AccountKey, Account>,
    posts: BTreeMap<PostKey, Post>,
    global: GlobalState,
    reward_events: BTreeMap<RewardEventKey, RewardEvent>,
}

impl LedgerState {
    /// Empty state with the given global state
    pub fn new(global: GlobalState) -> Self {
        Self {
            accounts: BTreeMap::new(),
            posts: BTreeMap::new(),
            global,
            reward_events: BTreeMap::new(),
        }
    }

    /// Build the genesis state described by the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut state = Self::new(GlobalState::new(config.global));

        for genesis in &config.genesis_accounts {
            let account = genesis.to_account(config.genesis_time)?;
            if state.accounts.contains_key(&account.username) {
                return Err(crate::Error::AccountAlreadyExists(account.username));
            }
            state.accounts.insert(account.username.clone(), account);
        }

        tracing::info!(
            accounts = state.accounts.len(),
            friction_rate = %state.global.params.consumption_friction_rate,
            "Built genesis state"
        );

        Ok(state)
    }

    /// Look up an account
    pub fn account(&self, key: &AccountKey) -> Option<&Account> {
        self.accounts.get(key)
    }

    /// Look up a post
    pub fn post(&self, key: &PostKey) -> Option<&Post> {
        self.posts.get(key)
    }

    /// Global state
    pub fn global(&self) -> &GlobalState {
        &self.global
    }

    /// Queued reward events in due order
    pub fn reward_events(&self) -> impl Iterator<Item = ScheduledRewardEvent> + '_ {
        self.reward_events.iter().map(scheduled)
    }

    /// Number of queued reward events
    pub fn reward_event_count(&self) -> usize {
        self.reward_events.len()
    }

    /// Number of accounts
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Number of posts
    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// Total issued coin: all account balances plus retained friction
    pub fn total_supply(&self) -> Coin {
        self.accounts
            .values()
            .map(Account::total_balance)
            .sum::<Coin>()
            + self.global.friction_pool
    }

    /// Open a transactional context for one message
    pub fn begin(&self, block: BlockInfo) -> TxContext<'_> {
        TxContext {
            block,
            accounts: Overlay::new(&self.accounts),
            posts: Overlay::new(&self.posts),
            base_global: &self.global,
            global: None,
            reward_events: Overlay::new(&self.reward_events),
        }
    }

    /// Apply a committed write set
    pub fn apply(&mut self, write_set: WriteSet) {
        self.accounts.extend(write_set.accounts);
        self.posts.extend(write_set.posts);
        if let Some(global) = write_set.global {
            self.global = global;
        }
        self.reward_events.extend(write_set.reward_events);
    }

    /// Canonical encoding of the whole state
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// SHA-256 of the canonical encoding
    pub fn state_root(&self) -> Result<[u8; 32]> {
        let bytes = self.canonical_bytes()?;
        Ok(Sha256::digest(&bytes).into())
    }
}

/// Copy-on-write view over one keyspace
#[derive(Debug)]
struct Overlay<'a, K, V> {
    base: &'a BTreeMap<K, V>,
    dirty: BTreeMap<K, V>,
}

impl<'a, K: Ord + Clone, V: Clone> Overlay<'a, K, V> {
    fn new(base: &'a BTreeMap<K, V>) -> Self {
        Self {
            base,
            dirty: BTreeMap::new(),
        }
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.dirty.get(key).or_else(|| self.base.get(key))
    }

    fn contains(&self, key: &K) -> bool {
        self.dirty.contains_key(key) || self.base.contains_key(key)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if !self.dirty.contains_key(key) {
            let value = self.base.get(key)?.clone();
            self.dirty.insert(key.clone(), value);
        }
        self.dirty.get_mut(key)
    }

    fn insert(&mut self, key: K, value: V) {
        self.dirty.insert(key, value);
    }

    /// Merged view in key order
    fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        let mut merged: BTreeMap<&K, &V> = self.base.iter().collect();
        merged.extend(self.dirty.iter());
        merged.into_iter()
    }
}

fn scheduled((key, event): (&RewardEventKey, &RewardEvent)) -> ScheduledRewardEvent {
    ScheduledRewardEvent {
        due_at: key.due_at,
        event: event.clone(),
    }
}

/// Transactional view of the ledger for one message
///
/// Reads see the committed state plus this context's own writes. Nothing is
/// visible outside the context until [`TxContext::into_write_set`] is applied.
#[derive(Debug)]
pub struct TxContext<'a> {
    block: BlockInfo,
    accounts: Overlay<'a, AccountKey, Account>,
    posts: Overlay<'a, PostKey, Post>,
    base_global: &'a GlobalState,
    global: Option<GlobalState>,
    reward_events: Overlay<'a, RewardEventKey, RewardEvent>,
}

impl<'a> TxContext<'a> {
    /// Block the message executes in
    pub fn block(&self) -> BlockInfo {
        self.block
    }

    /// Block time
    pub fn block_time(&self) -> DateTime<Utc> {
        self.block.time
    }

    /// Look up an account
    pub fn account(&self, key: &AccountKey) -> Option<&Account> {
        self.accounts.get(key)
    }

    /// Check whether an account exists
    pub fn has_account(&self, key: &AccountKey) -> bool {
        self.accounts.contains(key)
    }

    /// Mutable account, copied into the overlay on first write
    pub fn account_mut(&mut self, key: &AccountKey) -> Option<&mut Account> {
        self.accounts.get_mut(key)
    }

    /// Insert or replace an account
    pub fn put_account(&mut self, account: Account) {
        self.accounts.insert(account.username.clone(), account);
    }

    /// Look up a post
    pub fn post(&self, key: &PostKey) -> Option<&Post> {
        self.posts.get(key)
    }

    /// Check whether a post exists
    pub fn has_post(&self, key: &PostKey) -> bool {
        self.posts.contains(key)
    }

    /// Mutable post, copied into the overlay on first write
    pub fn post_mut(&mut self, key: &PostKey) -> Option<&mut Post> {
        self.posts.get_mut(key)
    }

    /// Insert or replace a post
    pub fn put_post(&mut self, post: Post) {
        self.posts.insert(post.key.clone(), post);
    }

    /// Global state
    pub fn global(&self) -> &GlobalState {
        self.global.as_ref().unwrap_or(self.base_global)
    }

    /// Mutable global state, copied into the overlay on first write
    pub fn global_mut(&mut self) -> &mut GlobalState {
        let base = self.base_global;
        self.global.get_or_insert_with(|| base.clone())
    }

    /// Append a reward event to the queue
    ///
    /// Only the new entry and the sequence counter are written; events
    /// already queued stay in the committed state.
    pub fn queue_reward_event(
        &mut self,
        due_at: DateTime<Utc>,
        event: RewardEvent,
    ) -> RewardEventKey {
        let global = self.global_mut();
        let key = RewardEventKey {
            due_at,
            seq: global.next_reward_event_seq,
        };
        global.next_reward_event_seq += 1;
        self.reward_events.insert(key, event);
        key
    }

    /// Queued reward events in due order, including this context's own
    pub fn reward_events(&self) -> impl Iterator<Item = ScheduledRewardEvent> + '_ {
        self.reward_events.iter().map(scheduled)
    }

    /// Finish the transaction, keeping its writes
    pub fn into_write_set(self) -> WriteSet {
        WriteSet {
            accounts: self.accounts.dirty,
            posts: self.posts.dirty,
            global: self.global,
            reward_events: self.reward_events.dirty,
        }
    }
}

/// Writes produced by one committed transaction
#[derive(Debug, Default)]
pub struct WriteSet {
    accounts: BTreeMap<AccountKey, Account>,
    posts: BTreeMap<PostKey, Post>,
    global: Option<GlobalState>,
    reward_events: BTreeMap<RewardEventKey, RewardEvent>,
}

impl WriteSet {
    /// Check whether the transaction wrote anything
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.posts.is_empty()
            && self.global.is_none()
            && self.reward_events.is_empty()
    }

    /// Number of records written
    pub fn len(&self) -> usize {
        self.accounts.len()
            + self.posts.len()
            + usize::from(self.global.is_some())
            + self.reward_events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GlobalParams;

    fn account(name: &str, saving: u64) -> Account {
        Account {
            username: AccountKey::new(name),
            saving: Coin::new(saving),
            checking: Coin::ZERO,
            created_at: DateTime::<Utc>::default(),
            donation_relationships: BTreeMap::new(),
        }
    }

    fn block() -> BlockInfo {
        BlockInfo::new(1, DateTime::<Utc>::default())
    }

    fn state_with(accounts: &[Account]) -> LedgerState {
        let mut state = LedgerState::new(GlobalState::new(GlobalParams::default()));
        let mut ctx = state.begin(block());
        for a in accounts {
            ctx.put_account(a.clone());
        }
        let ws = ctx.into_write_set();
        state.apply(ws);
        state
    }

    #[test]
    fn test_reads_see_own_writes() {
        let state = state_with(&[account("alice", 100)]);
        let key = AccountKey::new("alice");

        let mut ctx = state.begin(block());
        ctx.account_mut(&key).unwrap().saving = Coin::new(40);

        assert_eq!(ctx.account(&key).unwrap().saving, Coin::new(40));
        assert_eq!(state.account(&key).unwrap().saving, Coin::new(100));
    }

    #[test]
    fn test_dropped_context_leaves_state_untouched() {
        let mut state = state_with(&[account("alice", 100)]);
        let root_before = state.state_root().unwrap();

        {
            let mut ctx = state.begin(block());
            ctx.account_mut(&AccountKey::new("alice")).unwrap().saving = Coin::ZERO;
            ctx.put_account(account("bob", 5));
            ctx.global_mut().friction_pool = Coin::new(9);
        }

        assert_eq!(state.state_root().unwrap(), root_before);

        let ctx = state.begin(block());
        let ws = ctx.into_write_set();
        assert!(ws.is_empty());
        state.apply(ws);
        assert_eq!(state.state_root().unwrap(), root_before);
    }

    #[test]
    fn test_commit_applies_every_keyspace() {
        let mut state = state_with(&[account("alice", 100)]);

        let mut ctx = state.begin(block());
        ctx.account_mut(&AccountKey::new("alice")).unwrap().saving = Coin::new(60);
        ctx.global_mut().friction_pool = Coin::new(40);
        let ws = ctx.into_write_set();
        assert_eq!(ws.len(), 2);
        state.apply(ws);

        assert_eq!(
            state.account(&AccountKey::new("alice")).unwrap().saving,
            Coin::new(60)
        );
        assert_eq!(state.global().friction_pool, Coin::new(40));
        assert_eq!(state.total_supply(), Coin::new(100));
    }

    fn reward_event(consumer: &str) -> RewardEvent {
        RewardEvent {
            post_author: AccountKey::new("bob"),
            post_id: "p1".to_string(),
            consumer: AccountKey::new(consumer),
            evaluate: Coin::new(1),
            original: Coin::new(1),
            friction: Coin::ZERO,
            from_app: None,
        }
    }

    #[test]
    fn test_queued_event_writes_only_the_new_entry() {
        let mut state = state_with(&[]);
        let early = DateTime::<Utc>::default();
        let late = early + chrono::Duration::seconds(10);

        for name in ["a", "b", "c"] {
            let mut ctx = state.begin(block());
            ctx.queue_reward_event(late, reward_event(name));
            let ws = ctx.into_write_set();
            state.apply(ws);
        }
        assert_eq!(state.reward_event_count(), 3);

        let mut ctx = state.begin(block());
        let key = ctx.queue_reward_event(early, reward_event("d"));
        assert_eq!(key.seq, 3);
        let order: Vec<_> = ctx.reward_events().map(|e| e.event.consumer.to_string()).collect();
        assert_eq!(order, ["d", "a", "b", "c"]);

        let ws = ctx.into_write_set();
        assert_eq!(ws.reward_events.len(), 1);
        assert_eq!(ws.len(), 2);
        state.apply(ws);
        assert_eq!(state.reward_event_count(), 4);
        assert_eq!(state.global().next_reward_event_seq, 4);
    }

    #[test]
    fn test_dropped_context_discards_queued_events() {
        let state = state_with(&[]);
        let root = state.state_root().unwrap();
        {
            let mut ctx = state.begin(block());
            ctx.queue_reward_event(DateTime::<Utc>::default(), reward_event("a"));
        }
        assert_eq!(state.reward_event_count(), 0);
        assert_eq!(state.state_root().unwrap(), root);
    }

    #[test]
    fn test_missing_key_is_not_materialized() {
        let state = state_with(&[]);
        let mut ctx = state.begin(block());
        assert!(ctx.account_mut(&AccountKey::new("ghost")).is_none());
        assert!(ctx.into_write_set().is_empty());
    }

    #[test]
    fn test_state_root_is_deterministic() {
        let a = state_with(&[account("bob", 1), account("alice", 2)]);
        let b = state_with(&[account("alice", 2), account("bob", 1)]);
        assert_eq!(a.state_root().unwrap(), b.state_root().unwrap());
    }
}
