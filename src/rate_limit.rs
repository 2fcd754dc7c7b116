//! Fixed-window request limiter keyed by client IP

use std::{
    collections::HashMap,
    net::IpAddr,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Advisory message returned alongside HTTP 429 rejections.
pub const RATE_LIMIT_MESSAGE: &str =
    "Too many requests from this IP, please try again after 1 minute.";

/// Entries beyond this trigger a sweep of expired windows on the next call.
const SWEEP_THRESHOLD: usize = 1024;

/// Fixed-window counter per client IP.
///
/// A client's first request opens its window; requests beyond the quota
/// inside the same window are rejected until the window expires and a fresh
/// one starts.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request from `ip`; false means over quota for this window.
    pub fn allow(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if clients.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.opened) < window);
        }

        let entry = clients.entry(ip).or_insert(Window {
            opened: now,
            count: 0,
        });
        if now.duration_since(entry.opened) >= self.window {
            *entry = Window {
                opened: now,
                count: 0,
            };
        }
        entry.count += 1;
        entry.count <= self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::net::{IpAddr, Ipv4Addr},
    };

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, last))
    }

    #[test]
    fn test_quota_enforced_within_window() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        for _ in 0..5 {
            assert!(limiter.allow(ip(1)));
        }
        assert!(!limiter.allow(ip(1)));
        assert!(!limiter.allow(ip(1)));
    }

    #[test]
    fn test_clients_counted_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.allow(ip(1)));
        assert!(limiter.allow(ip(2)));
        assert!(!limiter.allow(ip(1)));
    }

    #[test]
    fn test_window_restarts_after_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.allow(ip(1)));
        assert!(!limiter.allow(ip(1)));

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.allow(ip(1)));
    }
}
