//! Global economic collaborator
//!
//! Owns the friction rate, the consumption accumulator and the reward-weight
//! formula, and appends reward events to the queue drained by inflation.
//!
//! # Reward weight
//!
//! The weight of a donation leg decays with the age of the post, with the
//! reward the post has already earned, and with the number of earlier
//! donations from the same consumer to the same author:
//!
//! ```text
//! w1 = floor(coin × H / (H + age))
//! w2 = floor(w1 × R / (R + cumulative_reward))
//! w  = floor(w2 × T / (T + donation_count))
//! ```
//!
//! Each factor lies in `(0, 1]`, so the weight never exceeds the coin. The
//! computation is integer-only.

use crate::{
    coin::{Coin, Rate},
    store::TxContext,
    types::{EvaluateParams, RewardEvent, ScheduledRewardEvent},
    Result,
};
use chrono::{DateTime, Duration, Utc};

/// Global pool operations consumed by the settlement handlers
pub trait GlobalPool: Send + Sync {
    /// Fraction of every settled leg retained as friction
    fn consumption_friction_rate(&self, ctx: &TxContext<'_>) -> Result<Rate>;

    /// Add gross consumption to the current window
    fn add_consumption(&self, ctx: &mut TxContext<'_>, coin: Coin) -> Result<()>;

    /// Reward weight of a donation leg
    fn evaluate_consumption(
        &self,
        ctx: &TxContext<'_>,
        coin: Coin,
        donation_count: u64,
        post_age_secs: u64,
        cumulative_reward: Coin,
    ) -> Result<Coin>;

    /// Retain friction and queue the reward event for the inflation drain
    fn register_reward_event(
        &self,
        ctx: &mut TxContext<'_>,
        event: RewardEvent,
        friction: Coin,
        evaluate: Coin,
    ) -> Result<()>;

    /// Reward events not yet drained, in due order
    fn pending_reward_events(&self, ctx: &TxContext<'_>) -> Vec<ScheduledRewardEvent>;
}

/// Reference global manager over the ledger state
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalManager;

impl GlobalManager {
    /// Create global manager
    pub fn new() -> Self {
        Self
    }
}

/// Apply the decay formula
pub fn evaluate_weight(
    params: &EvaluateParams,
    coin: Coin,
    donation_count: u64,
    post_age_secs: u64,
    cumulative_reward: Coin,
) -> Coin {
    let half_life = params.time_half_life_secs.max(1);
    let saturation = params.reward_saturation.value().max(1);
    let threshold = params.repeat_donation_threshold.max(1);

    let by_age = coin.mul_div_floor(half_life, half_life.saturating_add(post_age_secs));
    let by_reward = by_age.mul_div_floor(
        saturation,
        saturation.saturating_add(cumulative_reward.value()),
    );
    by_reward.mul_div_floor(threshold, threshold.saturating_add(donation_count))
}

impl GlobalPool for GlobalManager {
    fn consumption_friction_rate(&self, ctx: &TxContext<'_>) -> Result<Rate> {
        Ok(ctx.global().params.consumption_friction_rate)
    }

    fn add_consumption(&self, ctx: &mut TxContext<'_>, coin: Coin) -> Result<()> {
        ctx.global_mut().consumption_window += coin;
        Ok(())
    }

    fn evaluate_consumption(
        &self,
        ctx: &TxContext<'_>,
        coin: Coin,
        donation_count: u64,
        post_age_secs: u64,
        cumulative_reward: Coin,
    ) -> Result<Coin> {
        Ok(evaluate_weight(
            &ctx.global().params.evaluate,
            coin,
            donation_count,
            post_age_secs,
            cumulative_reward,
        ))
    }

    fn register_reward_event(
        &self,
        ctx: &mut TxContext<'_>,
        event: RewardEvent,
        friction: Coin,
        evaluate: Coin,
    ) -> Result<()> {
        let block_time = ctx.block_time();
        // An unrepresentable delay means the event is never due.
        let due_at = i64::try_from(ctx.global().params.reward_event_delay_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|delay| block_time.checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let global = ctx.global_mut();
        global.friction_pool += friction;
        global.window_evaluated_weight += evaluate;
        ctx.queue_reward_event(due_at, event);
        Ok(())
    }

    fn pending_reward_events(&self, ctx: &TxContext<'_>) -> Vec<ScheduledRewardEvent> {
        ctx.reward_events().collect()
    }
}
