//! Rolling tick timing
//!
//! Keeps the most recent tick durations so the driver can report average,
//! p95 and budget usage against a target tick rate.

use std::collections::VecDeque;
use std::time::Duration;

/// Samples kept in the rolling window (~2 seconds at 120 Hz)
const MAX_SAMPLES: usize = 240;

/// Point-in-time summary of recent ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickStatsSnapshot {
    pub ticks: u64,
    pub average: Duration,
    pub p95: Duration,
    pub max: Duration,
    /// Average tick duration as a percentage of the per-tick budget
    pub budget_usage_percent: f32,
}

/// Rolling window of tick durations
#[derive(Debug, Clone)]
pub struct TickStats {
    durations: VecDeque<Duration>,
    target_tick_duration: Duration,
    total_ticks: u64,
}

impl TickStats {
    pub fn new(target_tick_rate: u32) -> Self {
        Self {
            durations: VecDeque::with_capacity(MAX_SAMPLES),
            target_tick_duration: Duration::from_secs_f32(1.0 / target_tick_rate.max(1) as f32),
            total_ticks: 0,
        }
    }

    /// Record how long one tick took
    pub fn record(&mut self, duration: Duration) {
        self.durations.push_back(duration);
        while self.durations.len() > MAX_SAMPLES {
            self.durations.pop_front();
        }
        self.total_ticks += 1;
    }

    pub fn average(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.durations.iter().sum();
        sum / self.durations.len() as u32
    }

    /// 95th percentile of the window
    pub fn p95(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted: Vec<_> = self.durations.iter().copied().collect();
        sorted.sort_unstable();
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn max(&self) -> Duration {
        self.durations.iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn budget_usage_percent(&self) -> f32 {
        self.average().as_secs_f32() / self.target_tick_duration.as_secs_f32() * 100.0
    }

    pub fn snapshot(&self) -> TickStatsSnapshot {
        TickStatsSnapshot {
            ticks: self.total_ticks,
            average: self.average(),
            p95: self.p95(),
            max: self.max(),
            budget_usage_percent: self.budget_usage_percent(),
        }
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new(120)
    }
}
