// SPDX-License-Identifier: GPL-3.0-only

//! Capture plan parameters and progress

use crate::constants::{DEFAULT_PERIOD_SECS, DEFAULT_REPEATS};
use std::time::Duration;

/// How often to shoot, how many shots, and how many have been taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePlan {
    period_secs: u32,
    max_repeats: u32,
    current_count: u32,
}

impl CapturePlan {
    /// Returns `None` unless both period and repeats are positive
    pub fn new(period_secs: u32, max_repeats: u32) -> Option<Self> {
        if period_secs == 0 || max_repeats == 0 {
            return None;
        }
        Some(Self {
            period_secs,
            max_repeats,
            current_count: 0,
        })
    }

    pub fn period_secs(&self) -> u32 {
        self.period_secs
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(u64::from(self.period_secs))
    }

    pub fn max_repeats(&self) -> u32 {
        self.max_repeats
    }

    pub fn current_count(&self) -> u32 {
        self.current_count
    }

    pub fn is_complete(&self) -> bool {
        self.current_count >= self.max_repeats
    }

    /// Start over from zero shots
    pub fn reset(&mut self) {
        self.current_count = 0;
    }

    /// Consume one repeat slot; returns the new count
    pub fn advance(&mut self) -> u32 {
        if self.current_count < self.max_repeats {
            self.current_count += 1;
        }
        self.current_count
    }

    /// Replace the parameters in place, keeping progress within the new bound
    pub fn modify(&mut self, period_secs: u32, max_repeats: u32) -> bool {
        if period_secs == 0 || max_repeats == 0 {
            return false;
        }
        self.period_secs = period_secs;
        self.max_repeats = max_repeats;
        self.current_count = self.current_count.min(max_repeats);
        true
    }
}

impl Default for CapturePlan {
    fn default() -> Self {
        Self {
            period_secs: DEFAULT_PERIOD_SECS,
            max_repeats: DEFAULT_REPEATS,
            current_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_parameters() {
        assert!(CapturePlan::new(0, 5).is_none());
        assert!(CapturePlan::new(5, 0).is_none());
        assert!(CapturePlan::new(1, 1).is_some());
    }

    #[test]
    fn test_advance_stops_at_max() {
        let mut plan = CapturePlan::new(5, 2).unwrap();
        assert_eq!(plan.advance(), 1);
        assert_eq!(plan.advance(), 2);
        assert!(plan.is_complete());
        assert_eq!(plan.advance(), 2);
    }

    #[test]
    fn test_modify_clamps_progress() {
        let mut plan = CapturePlan::new(5, 10).unwrap();
        for _ in 0..7 {
            plan.advance();
        }
        assert!(plan.modify(2, 4));
        assert_eq!(plan.current_count(), 4);
        assert_eq!(plan.period(), Duration::from_secs(2));
        assert!(plan.is_complete());

        assert!(!plan.modify(0, 4));
        assert_eq!(plan.period_secs(), 2);
    }
}
