//! Metrics collection for observability
//!
//! Counters live on a private registry owned by the executor; they are not
//! part of replicated state.
//!
//! # Metrics
//!
//! - `settlement_tx_total{result}` - Messages delivered, by result
//! - `settlement_donation_legs_total` - Non-zero donation legs settled
//! - `settlement_zero_legs_total` - Donation legs skipped as zero
//! - `settlement_friction_coin_total` - Friction retained, in coin

use crate::donation::DonationReceipt;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Delivered messages by result
    pub tx_total: IntCounterVec,

    /// Settled donation legs
    pub donation_legs_total: IntCounter,

    /// Skipped zero legs
    pub zero_legs_total: IntCounter,

    /// Retained friction
    pub friction_coin_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let tx_total = IntCounterVec::new(
            Opts::new("settlement_tx_total", "Messages delivered, by result"),
            &["result"],
        )?;
        registry.register(Box::new(tx_total.clone()))?;

        let donation_legs_total = IntCounter::new(
            "settlement_donation_legs_total",
            "Non-zero donation legs settled",
        )?;
        registry.register(Box::new(donation_legs_total.clone()))?;

        let zero_legs_total = IntCounter::new(
            "settlement_zero_legs_total",
            "Donation legs skipped as zero",
        )?;
        registry.register(Box::new(zero_legs_total.clone()))?;

        let friction_coin_total = IntCounter::new(
            "settlement_friction_coin_total",
            "Friction retained, in coin",
        )?;
        registry.register(Box::new(friction_coin_total.clone()))?;

        Ok(Self {
            tx_total,
            donation_legs_total,
            zero_legs_total,
            friction_coin_total,
            registry,
        })
    }

    /// Record a delivered message
    pub fn record_tx(&self, result: &str) {
        self.tx_total.with_label_values(&[result]).inc();
    }

    /// Record a committed donation
    pub fn record_donation(&self, receipt: &DonationReceipt) {
        self.donation_legs_total.inc_by(receipt.legs.len() as u64);
        self.zero_legs_total.inc_by(receipt.zero_legs as u64);
        self.friction_coin_total.inc_by(receipt.friction().value());
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
