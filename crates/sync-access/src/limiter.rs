//! Fixed-window call limiter

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::shard::ShardedMap;

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

impl Window {
    fn open(now: Instant) -> Self {
        Self { start: now, count: 1 }
    }

    /// Count one call; returns whether it is within `limit`.
    fn hit(&mut self, now: Instant, size: Duration, limit: u32) -> bool {
        if now.duration_since(self.start) >= size {
            *self = Self::open(now);
        } else {
            self.count = self.count.saturating_add(1);
        }
        self.count <= limit
    }
}

/// Per-key fixed-window call counter.
///
/// Each key gets a window that opens on its first call. Calls inside the
/// window are counted and admitted while the count stays at or below the
/// limit; the first call at or after `window` elapsed opens a fresh window.
///
/// This is a fixed window, not a sliding log: a burst straddling a window
/// boundary can be admitted up to twice the limit.
///
/// Elapsed windows are swept at most once per window length as calls come
/// in, so the key map stays bounded by the keys seen in the last window.
#[derive(Debug)]
pub struct CallLimiter {
    limit: u32,
    window: Duration,
    windows: ShardedMap<Window>,
    last_purge: Mutex<Instant>,
}

impl CallLimiter {
    /// Create a limiter admitting `limit` calls per `window_ms` milliseconds.
    pub fn new(limit: u32, window_ms: u64) -> Self {
        Self::with_window(limit, Duration::from_millis(window_ms))
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: ShardedMap::new(),
            last_purge: Mutex::new(Instant::now()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a call for `key`; `true` when the call is allowed.
    pub fn track(&self, key: &str) -> bool {
        self.track_at(key, Instant::now())
    }

    pub fn track_at(&self, key: &str, now: Instant) -> bool {
        self.purge_if_due(now);
        let (limit, size) = (self.limit, self.window);
        let allowed = self.windows.with_shard(key, |shard| match shard.get_mut(key) {
            Some(window) => window.hit(now, size, limit),
            None => {
                shard.insert(key.to_string(), Window::open(now));
                limit >= 1
            }
        });
        if !allowed {
            debug!("Call limit exceeded for {key}");
        }
        allowed
    }

    /// Record a call identified by two keys, e.g. client address and
    /// hardware address.
    ///
    /// A known `primary` key decides on its own. A first sighting of
    /// `primary` opens its window and then defers to `secondary`, so a
    /// client rotating addresses is still counted by its second identity.
    pub fn track_pair(&self, primary: &str, secondary: &str) -> bool {
        self.track_pair_at(primary, secondary, Instant::now())
    }

    pub fn track_pair_at(&self, primary: &str, secondary: &str, now: Instant) -> bool {
        self.purge_if_due(now);
        let (limit, size) = (self.limit, self.window);
        let known = self.windows.with_shard(primary, |shard| match shard.get_mut(primary) {
            Some(window) => Some(window.hit(now, size, limit)),
            None => {
                shard.insert(primary.to_string(), Window::open(now));
                None
            }
        });
        match known {
            Some(allowed) => allowed,
            None => self.track_at(secondary, now),
        }
    }

    /// Drop windows that have fully elapsed.
    pub fn purge_expired(&self) {
        self.purge_expired_at(Instant::now());
    }

    pub fn purge_expired_at(&self, now: Instant) {
        let size = self.window;
        self.windows
            .retain(|_, window| now.duration_since(window.start) < size);
    }

    fn purge_if_due(&self, now: Instant) {
        {
            let mut last = self.last_purge.lock().unwrap_or_else(PoisonError::into_inner);
            if now.saturating_duration_since(*last) < self.window {
                return;
            }
            *last = now;
        }
        self.purge_expired_at(now);
        debug!("Purged elapsed call windows, {} keys tracked", self.tracked_keys());
    }

    /// Number of keys currently holding a window.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
