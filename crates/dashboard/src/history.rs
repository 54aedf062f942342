//! Rolling portfolio-value history
//!
//! Keeps a bounded series of `(timestamp, portfolio value)` samples so that
//! period PnL can be computed as a real delta instead of a fixed fraction.
//! The hub owns the history and reduces it to [`PeriodBaselines`] before each
//! pass, which keeps the aggregator a pure function of its snapshot.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use vantage_core::Timestamp;

use crate::config::HistoryConfig;

/// One recorded portfolio value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueSample {
    pub timestamp: Timestamp,
    pub value: Decimal,
}

/// Oldest portfolio value inside each reporting window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodBaselines {
    pub day: Option<Decimal>,
    pub week: Option<Decimal>,
    pub month: Option<Decimal>,
}

/// Bounded, time-ordered sample buffer
#[derive(Debug, Clone)]
pub struct ValueHistory {
    config: HistoryConfig,
    samples: VecDeque<ValueSample>,
}

impl ValueHistory {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            samples: VecDeque::new(),
        }
    }

    /// Record a sample, respecting the minimum spacing, then prune.
    ///
    /// Samples older than the newest one are ignored.
    pub fn record(&mut self, timestamp: Timestamp, value: Decimal) {
        if let Some(last) = self.samples.back() {
            if timestamp < last.timestamp + self.config.min_spacing {
                return;
            }
        }
        self.samples.push_back(ValueSample { timestamp, value });
        self.prune(timestamp);
    }

    /// Drop samples that fell out of the retention window
    pub fn prune(&mut self, now: Timestamp) {
        let cutoff = now - self.config.retention;
        while self
            .samples
            .front()
            .is_some_and(|sample| sample.timestamp < cutoff)
        {
            self.samples.pop_front();
        }
    }

    /// Oldest sample not older than `now - window`
    pub fn oldest_since(&self, now: Timestamp, window: Duration) -> Option<&ValueSample> {
        let start = now - window;
        self.samples
            .iter()
            .find(|sample| sample.timestamp >= start && sample.timestamp <= now)
    }

    /// Baselines for the 1-day, 7-day and 30-day windows
    pub fn baselines(&self, now: Timestamp) -> PeriodBaselines {
        PeriodBaselines {
            day: self.oldest_since(now, Duration::days(1)).map(|s| s.value),
            week: self.oldest_since(now, Duration::days(7)).map(|s| s.value),
            month: self.oldest_since(now, Duration::days(30)).map(|s| s.value),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for ValueHistory {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}
