//! The access controller owning the limiter and the verification caches

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::keys::{KeyCache, KeyRequest};
use crate::limiter::CallLimiter;
use crate::status::{AccountStatus, AccountVerifier, StatusCache};

/// Gatekeeper in front of the sync cache.
///
/// The player, admin and access-key caches are flushed together on a fixed
/// wall-clock interval. Flushing is lazy: every cache access first checks
/// whether the next clear time has passed.
#[derive(Debug)]
pub struct AccessController {
    limiter: CallLimiter,
    players: StatusCache,
    admins: StatusCache,
    keys: KeyCache,
    clear_interval: TimeDelta,
    next_clear: Mutex<DateTime<Utc>>,
}

impl AccessController {
    /// * `limit` / `window` - call limiter parameters
    /// * `clear_interval` - how often the verification caches are flushed
    pub fn new(limit: u32, window: Duration, clear_interval: Duration) -> Self {
        let clear_interval = TimeDelta::from_std(clear_interval).unwrap_or(TimeDelta::MAX);
        let next_clear = Utc::now()
            .checked_add_signed(clear_interval)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        debug!("Time of next cache clearing: {next_clear}");
        Self {
            limiter: CallLimiter::with_window(limit, window),
            players: StatusCache::new("Player"),
            admins: StatusCache::new("Admin"),
            keys: KeyCache::new(),
            clear_interval,
            next_clear: Mutex::new(next_clear),
        }
    }

    pub fn limiter(&self) -> &CallLimiter {
        &self.limiter
    }

    pub fn players(&self) -> &StatusCache {
        &self.players
    }

    pub fn admins(&self) -> &StatusCache {
        &self.admins
    }

    pub fn keys(&self) -> &KeyCache {
        &self.keys
    }

    /// Count a call from `address`, falling back to `mac_address` for
    /// addresses seen for the first time.
    pub fn track_call(&self, address: &str, mac_address: Option<&str>) -> bool {
        match mac_address {
            Some(mac) => self.limiter.track_pair(address, mac),
            None => self.limiter.track(address),
        }
    }

    pub fn verify_player<V>(&self, username: &str, uuid: &str, verifier: &V) -> Result<AccountStatus, V::Error>
    where
        V: AccountVerifier + ?Sized,
    {
        self.clear_if_due(Utc::now());
        self.players.verify_with(username, uuid, verifier)
    }

    pub fn verify_admin<V>(&self, username: &str, uuid: &str, verifier: &V) -> Result<AccountStatus, V::Error>
    where
        V: AccountVerifier + ?Sized,
    {
        self.clear_if_due(Utc::now());
        self.admins.verify_with(username, uuid, verifier)
    }

    pub fn access_key<F, E>(&self, request: &KeyRequest, issue: F) -> Result<String, E>
    where
        F: FnOnce(&KeyRequest) -> Result<String, E>,
    {
        self.clear_if_due(Utc::now());
        self.keys.get_or_issue(request, issue)
    }

    /// When the caches will next be flushed.
    pub fn next_clear_time(&self) -> DateTime<Utc> {
        *self.next_clear.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flush every cache now and push the next clear time one interval out.
    pub fn clear_caches(&self) {
        self.clear_caches_at(Utc::now());
    }

    /// Flush the caches if `now` has reached the next clear time.
    ///
    /// Returns whether a flush happened.
    pub fn clear_if_due(&self, now: DateTime<Utc>) -> bool {
        if now < self.next_clear_time() {
            return false;
        }
        self.clear_caches_at(now);
        true
    }

    fn clear_caches_at(&self, now: DateTime<Utc>) {
        let mut next_clear = self.next_clear.lock().unwrap_or_else(PoisonError::into_inner);
        self.players.clear();
        self.admins.clear();
        self.keys.clear();
        self.limiter.purge_expired();
        *next_clear = now
            .checked_add_signed(self.clear_interval)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        debug!("Cleared access caches, next clearing at {}", *next_clear);
    }
}
