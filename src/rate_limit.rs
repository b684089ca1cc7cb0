use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Fixed-window request limiter keyed by client address.
///
/// Clients whose address is unknown share one bucket.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    state: Mutex<Inner>,
}

struct Inner {
    windows: HashMap<Option<IpAddr>, Window>,
    last_pruned: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(Inner {
                windows: HashMap::new(),
                last_pruned: Instant::now(),
            }),
        }
    }

    /// Record a request and report whether it is within the limit.
    pub fn check(&self, client: Option<IpAddr>) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: Option<IpAddr>, now: Instant) -> bool {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let window = self.window;

        // Sweep expired windows at most once per window length.
        if now.duration_since(state.last_pruned) >= window {
            state
                .windows
                .retain(|_, w| now.duration_since(w.started) < window);
            state.last_pruned = now;
        }

        let entry = state.windows.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }
        if entry.count >= self.max_requests {
            tracing::warn!(?client, "Rate limit exceeded");
            return false;
        }
        entry.count += 1;
        true
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        match self.state.lock() {
            Ok(guard) => guard.windows.len(),
            Err(poisoned) => poisoned.into_inner().windows.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> Option<IpAddr> {
        Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)))
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(1), now));
        assert!(!limiter.check_at(ip(1), now));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(2), now));
        assert!(limiter.check_at(None, now));
        assert!(!limiter.check_at(ip(1), now));
        assert!(!limiter.check_at(None, now));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at(ip(1), start));
        assert!(!limiter.check_at(ip(1), start + Duration::from_secs(30)));
        assert!(limiter.check_at(ip(1), start + Duration::from_secs(61)));
    }

    #[test]
    fn test_expired_windows_are_swept_once_per_window() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at(ip(1), start));
        assert!(limiter.check_at(ip(2), start));
        assert!(limiter.check_at(ip(3), start));
        assert_eq!(limiter.tracked_clients(), 3);

        assert!(limiter.check_at(ip(1), start + Duration::from_secs(30)));
        assert_eq!(limiter.tracked_clients(), 3);

        assert!(limiter.check_at(ip(1), start + Duration::from_secs(61)));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_window_resets_between_sweeps() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at(ip(1), start + Duration::from_secs(50)));
        // Sweep runs here and keeps ip(1), whose window is only 10s old.
        assert!(limiter.check_at(ip(2), start + Duration::from_secs(60)));
        assert!(!limiter.check_at(ip(1), start + Duration::from_secs(100)));
        assert!(limiter.check_at(ip(1), start + Duration::from_secs(111)));
    }
}
