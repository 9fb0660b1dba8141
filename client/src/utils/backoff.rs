use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reconnect policy shared by the push channel and the log-tail stream:
/// exponential backoff with a cap, and a bounded attempt budget after which
/// the owner gives up and tells the user instead of spinning forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    pub initial_delay_secs: u64,
    pub max_delay_secs: u64,
    pub multiplier: f64,
    /// `None` restores the legacy retry-forever behavior.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_secs: 5,
            max_delay_secs: 60,
            multiplier: 2.0,
            max_attempts: Some(10),
        }
    }
}

/// Iterator-style state over a [`ReconnectPolicy`]. `reset` after a
/// successful connection so the next outage starts from the initial delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        let current = Duration::from_secs(policy.initial_delay_secs);
        Self {
            policy,
            attempt: 0,
            current,
        }
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.policy.max_attempts {
            if self.attempt >= max {
                return None;
            }
        }
        self.attempt += 1;
        let delay = self.current;
        let next = self.current.as_secs_f64() * self.policy.multiplier;
        self.current = Duration::from_secs_f64(
            next.min(self.policy.max_delay_secs as f64),
        );
        Some(delay)
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
        self.current = Duration::from_secs(self.policy.initial_delay_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_to_the_cap() {
        let mut backoff = Backoff::new(ReconnectPolicy {
            initial_delay_secs: 5,
            max_delay_secs: 60,
            multiplier: 2.0,
            max_attempts: Some(10),
        });
        let delays: Vec<u64> = std::iter::from_fn(|| backoff.next_delay())
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 60, 60, 60, 60, 60, 60]);
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn reset_restarts_the_schedule() {
        let mut backoff = Backoff::new(ReconnectPolicy::default());
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn unbounded_policy_never_gives_up() {
        let mut backoff = Backoff::new(ReconnectPolicy {
            max_attempts: None,
            ..ReconnectPolicy::default()
        });
        for _ in 0..100 {
            assert!(backoff.next_delay().is_some());
        }
    }
}
