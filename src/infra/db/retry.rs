use std::time::Duration;

const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_MULTIPLIER: f64 = 1.5;

/// Exponential backoff schedule for the startup connection loop.
#[derive(Debug, Clone)]
pub struct ConnectRetry {
    next_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
    max_elapsed: Duration,
}

impl ConnectRetry {
    pub fn new(max_elapsed: Duration) -> Self {
        Self {
            next_interval: DEFAULT_INITIAL_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
            max_elapsed,
        }
    }

    /// Delay before the next attempt, or `None` once sleeping would overrun
    /// the overall budget.
    pub fn next_delay(&mut self, elapsed: Duration) -> Option<Duration> {
        let delay = self.next_interval.min(self.max_interval);
        if elapsed + delay > self.max_elapsed {
            return None;
        }

        self.next_interval = delay.mul_f64(self.multiplier).min(self.max_interval);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_until_capped() {
        let mut retry = ConnectRetry::new(Duration::from_secs(600));
        let delays: Vec<u128> = (0..8)
            .map(|_| {
                retry
                    .next_delay(Duration::ZERO)
                    .expect("within budget")
                    .as_millis()
            })
            .collect();

        assert_eq!(delays, vec![500, 750, 1125, 1687, 2531, 3796, 5000, 5000]);
    }

    #[test]
    fn gives_up_when_budget_is_spent() {
        let mut retry = ConnectRetry::new(Duration::from_secs(30));
        assert!(retry.next_delay(Duration::from_secs(29)).is_some());
        assert!(retry.next_delay(Duration::from_secs(30)).is_none());
    }
}
