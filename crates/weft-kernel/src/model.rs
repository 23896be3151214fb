//! A constant-rate resource model.
//!
//! Real bandwidth sharing is outside the kernel; this model gives every
//! computation a fixed duration so standalone runs have a clock to
//! advance. Transfers cost `latency + size / bandwidth`, executions
//! `flops / speed`, sleeps their own duration.

use weft_core::{Action, ResourceModel};

/// Default one-way latency, in seconds.
pub const DEFAULT_LATENCY: f64 = 0.0;
/// Default bandwidth, in bytes per second.
pub const DEFAULT_BANDWIDTH: f64 = 1.0e9;
/// Default host speed, in flops per second.
pub const DEFAULT_SPEED: f64 = 1.0e9;

/// Resource model with constant latency, bandwidth and speed.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantModel {
    /// Added to every transfer. Default: 0.
    pub latency: f64,
    /// Bytes per second. Default: 1e9.
    pub bandwidth: f64,
    /// Flops per second. Default: 1e9.
    pub speed: f64,
}

impl Default for ConstantModel {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            bandwidth: DEFAULT_BANDWIDTH,
            speed: DEFAULT_SPEED,
        }
    }
}

impl ResourceModel for ConstantModel {
    fn communicate(&mut self, now: f64, size: u64) -> Box<dyn Action> {
        let duration = self.latency + size as f64 / self.bandwidth;
        Box::new(DelayAction::start(now, duration))
    }

    fn execute(&mut self, now: f64, flops: f64) -> Box<dyn Action> {
        Box::new(DelayAction::start(now, flops / self.speed))
    }

    fn sleep(&mut self, now: f64, duration: f64) -> Box<dyn Action> {
        Box::new(DelayAction::start(now, duration))
    }
}

/// A computation that completes a fixed delay after it starts, minus
/// any time spent suspended.
#[derive(Clone, Debug, PartialEq)]
pub struct DelayAction {
    finish_at: Option<f64>,
    remaining: f64,
    cancelled: bool,
}

impl DelayAction {
    /// Start at `now`; negative or NaN durations complete immediately.
    pub fn start(now: f64, duration: f64) -> Self {
        let duration = if duration.is_nan() { 0.0 } else { duration.max(0.0) };
        Self {
            finish_at: Some(now + duration),
            remaining: duration,
            cancelled: false,
        }
    }
}

impl Action for DelayAction {
    fn completion_time(&self) -> Option<f64> {
        self.finish_at
    }

    fn remaining(&self, now: f64) -> f64 {
        match self.finish_at {
            Some(t) => (t - now).max(0.0),
            None => self.remaining,
        }
    }

    fn cancel(&mut self) {
        self.cancelled = true;
        self.finish_at = None;
    }

    fn suspend(&mut self, now: f64) {
        if let Some(t) = self.finish_at.take() {
            self.remaining = (t - now).max(0.0);
        }
    }

    fn resume(&mut self, now: f64) {
        if !self.cancelled && self.finish_at.is_none() {
            self.finish_at = Some(now + self.remaining);
        }
    }
}
