//! Compute budgets.
//!
//! Long-running loops (anomaly strategies, rolling correlation) check a
//! `Deadline` cooperatively between iterations and bail out with
//! `AnalyticsError::Timeout`. Nothing is mutated outside the caller's own
//! buffers before the check, so abandoning the work is always safe.

use std::time::{Duration, Instant};

use crate::error::AnalyticsError;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn unbounded() -> Self {
        Self {
            started: Instant::now(),
            budget: None,
        }
    }

    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget: Some(budget),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::after(Duration::from_millis(ms))
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    pub fn budget_ms(&self) -> u64 {
        self.budget.map(|b| b.as_millis() as u64).unwrap_or(u64::MAX)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before expiry; `None` for an unbounded deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.budget.map(|b| b.saturating_sub(self.started.elapsed()))
    }

    pub fn is_expired(&self) -> bool {
        match self.budget {
            Some(b) => self.started.elapsed() >= b,
            None => false,
        }
    }

    /// Fail with `Timeout` if the budget is spent.
    pub fn check(&self, context: &str) -> Result<(), AnalyticsError> {
        if self.is_expired() {
            return Err(AnalyticsError::Timeout {
                context: context.to_string(),
                budget_ms: self.budget_ms(),
            });
        }
        Ok(())
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_expires() {
        let d = Deadline::unbounded();
        assert!(!d.is_expired());
        assert!(d.check("x").is_ok());
        assert!(d.remaining().is_none());
    }

    #[test]
    fn zero_budget_expires_immediately() {
        let d = Deadline::after(Duration::ZERO);
        assert!(d.is_expired());
        let err = d.check("lof").unwrap_err();
        assert!(matches!(err, AnalyticsError::Timeout { budget_ms: 0, .. }));
    }

    #[test]
    fn generous_budget_is_not_expired() {
        let d = Deadline::from_millis(60_000);
        assert!(d.check("x").is_ok());
        assert!(d.remaining().unwrap() > Duration::from_secs(50));
    }
}
