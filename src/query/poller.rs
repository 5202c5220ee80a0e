use std::thread;
use std::time::{Duration, Instant};

/// Polling policy for explicit waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementPoller {
    /// Check once and give up.
    NoWait,
    /// Poll every `interval` until `timeout` has elapsed.
    TimeoutWithInterval(Duration, Duration),
    /// Poll `n` times, `interval` apart.
    NumTriesWithInterval(u32, Duration),
    /// Poll every `interval` until `timeout` has elapsed and at least `n` polls were made.
    TimeoutWithIntervalAndMinTries(Duration, Duration, u32),
}

impl ElementPoller {
    /// The overall timeout, if this policy has one.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            ElementPoller::TimeoutWithInterval(t, _)
            | ElementPoller::TimeoutWithIntervalAndMinTries(t, _, _) => Some(*t),
            _ => None,
        }
    }

    /// Replace the timeout, keeping the interval.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match self {
            ElementPoller::TimeoutWithIntervalAndMinTries(_, i, n) => {
                ElementPoller::TimeoutWithIntervalAndMinTries(timeout, i, n)
            }
            ElementPoller::TimeoutWithInterval(_, i) | ElementPoller::NumTriesWithInterval(_, i) => {
                ElementPoller::TimeoutWithInterval(timeout, i)
            }
            ElementPoller::NoWait => {
                ElementPoller::TimeoutWithInterval(timeout, crate::config::defaults().poll_interval())
            }
        }
    }

    /// Replace the interval, keeping the timeout.
    pub fn with_interval(self, interval: Duration) -> Self {
        match self {
            ElementPoller::TimeoutWithIntervalAndMinTries(t, _, n) => {
                ElementPoller::TimeoutWithIntervalAndMinTries(t, interval, n)
            }
            ElementPoller::TimeoutWithInterval(t, _) => ElementPoller::TimeoutWithInterval(t, interval),
            ElementPoller::NumTriesWithInterval(n, _) => ElementPoller::NumTriesWithInterval(n, interval),
            ElementPoller::NoWait => {
                ElementPoller::TimeoutWithInterval(crate::config::defaults().timeout(), interval)
            }
        }
    }
}

/// Tracks one run of an [`ElementPoller`], sleeping between polls.
#[derive(Debug)]
pub struct ElementPollerTicker {
    timeout: Option<Duration>,
    interval: Option<Duration>,
    min_tries: u32,
    start: Instant,
    cur_tries: u32,
}

impl ElementPollerTicker {
    pub fn new(poller: ElementPoller) -> Self {
        let mut ticker = Self {
            timeout: None,
            interval: None,
            min_tries: 0,
            start: Instant::now(),
            cur_tries: 0,
        };

        match poller {
            ElementPoller::NoWait => {}
            ElementPoller::TimeoutWithInterval(timeout, interval) => {
                ticker.timeout = Some(timeout);
                ticker.interval = Some(interval);
            }
            ElementPoller::NumTriesWithInterval(num_tries, interval) => {
                ticker.interval = Some(interval);
                ticker.min_tries = num_tries;
            }
            ElementPoller::TimeoutWithIntervalAndMinTries(timeout, interval, num_tries) => {
                ticker.timeout = Some(timeout);
                ticker.interval = Some(interval);
                ticker.min_tries = num_tries;
            }
        }

        ticker
    }

    /// Number of polls completed so far.
    pub fn tries(&self) -> u32 {
        self.cur_tries
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record a failed poll. Returns `false` once the policy is exhausted, otherwise sleeps
    /// until the next poll is due and returns `true`.
    pub fn tick(&mut self) -> bool {
        self.cur_tries += 1;

        if self.timeout.filter(|t| &self.start.elapsed() < t).is_none()
            && self.cur_tries >= self.min_tries
        {
            return false;
        }

        if let Some(i) = self.interval {
            // Polls are scheduled on a fixed grid from the start of the wait.
            let due = i * self.cur_tries;
            let elapsed = self.start.elapsed();
            if elapsed < due {
                let mut pause = due - elapsed;
                // Never sleep past the deadline.
                if let Some(t) = self.timeout {
                    if self.cur_tries >= self.min_tries {
                        pause = pause.min(t.saturating_sub(elapsed));
                    }
                }
                thread::sleep(pause);
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_wait_stops_after_first_poll() {
        let mut ticker = ElementPollerTicker::new(ElementPoller::NoWait);
        assert!(!ticker.tick());
        assert_eq!(ticker.tries(), 1);
    }

    #[test]
    fn num_tries_counts_polls() {
        let mut ticker =
            ElementPollerTicker::new(ElementPoller::NumTriesWithInterval(3, Duration::from_millis(1)));
        assert!(ticker.tick());
        assert!(ticker.tick());
        assert!(!ticker.tick());
    }

    #[test]
    fn timeout_is_wall_clock_bounded() {
        let mut ticker = ElementPollerTicker::new(ElementPoller::TimeoutWithInterval(
            Duration::from_millis(100),
            Duration::from_millis(30),
        ));
        while ticker.tick() {}
        assert!(ticker.elapsed() >= Duration::from_millis(100));
        assert!(ticker.elapsed() < Duration::from_millis(200));
        assert!(ticker.tries() >= 3);
    }

    #[test]
    fn overrides_keep_the_other_half() {
        let p = ElementPoller::TimeoutWithInterval(Duration::from_secs(5), Duration::from_millis(10));
        assert_eq!(
            p.clone().with_timeout(Duration::from_secs(1)),
            ElementPoller::TimeoutWithInterval(Duration::from_secs(1), Duration::from_millis(10))
        );
        assert_eq!(
            p.with_interval(Duration::from_millis(50)),
            ElementPoller::TimeoutWithInterval(Duration::from_secs(5), Duration::from_millis(50))
        );
    }
}
