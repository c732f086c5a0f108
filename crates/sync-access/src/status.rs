//! Cached account verification outcomes

use tracing::debug;

use crate::shard::ShardedMap;

/// Outcome of verifying a launcher account against the account service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountStatus {
    Passed,
    NotFound,
    Banned,
    UuidMismatch,
}

impl AccountStatus {
    pub fn is_passed(self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Result of one call to the external account service.
///
/// `status` is what the service reports about the account itself; a
/// `Passed` account whose `uuid` differs from the one presented is turned
/// into [`AccountStatus::UuidMismatch`] by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub status: AccountStatus,
    /// The uuid the service holds for the account, when it knows one.
    pub uuid: Option<String>,
}

impl Verification {
    pub fn new(status: AccountStatus, uuid: impl Into<String>) -> Self {
        Self {
            status,
            uuid: Some(uuid.into()),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: AccountStatus::NotFound,
            uuid: None,
        }
    }
}

/// The external account check a [`StatusCache`] sits in front of.
pub trait AccountVerifier {
    type Error;

    fn verify(&self, username: &str, uuid: &str) -> Result<Verification, Self::Error>;
}

impl<F, E> AccountVerifier for F
where
    F: Fn(&str, &str) -> Result<Verification, E>,
{
    type Error = E;

    fn verify(&self, username: &str, uuid: &str) -> Result<Verification, E> {
        self(username, uuid)
    }
}

#[derive(Debug, Clone)]
struct CachedStatus {
    status: AccountStatus,
    uuid: String,
}

/// Per-username cache of verification outcomes.
///
/// An entry only answers requests that present the same uuid it was
/// recorded with. A different uuid discards the entry, so a forged
/// identity is never trusted on the strength of an earlier check and a
/// legitimate uuid change is picked up on the next request.
#[derive(Debug)]
pub struct StatusCache {
    label: &'static str,
    entries: ShardedMap<CachedStatus>,
}

impl StatusCache {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: ShardedMap::new(),
        }
    }

    /// Cached status for `username` if it was recorded for `uuid`.
    pub fn lookup(&self, username: &str, uuid: &str) -> Option<AccountStatus> {
        let label = self.label;
        self.entries.with_shard(username, |shard| {
            let cached = shard.get(username)?;
            if cached.uuid == uuid {
                debug!("{label} cache hit: {username}({uuid}) -> {:?}", cached.status);
                return Some(cached.status);
            }
            debug!(
                "{label} cache uuid mismatch for {username}: cached {}, got {uuid}; dropping entry",
                cached.uuid
            );
            shard.remove(username);
            None
        })
    }

    pub fn record(&self, username: &str, status: AccountStatus, uuid: &str) {
        self.entries.with_shard(username, |shard| {
            shard.insert(
                username.to_string(),
                CachedStatus {
                    status,
                    uuid: uuid.to_string(),
                },
            );
        });
    }

    /// Answer from the cache, or ask `verifier` and remember the outcome.
    ///
    /// The outcome is stored against the uuid the service reports; when it
    /// reports none (unknown account) the requested uuid is used. A
    /// mismatch is stored against the presented uuid, so a forged request
    /// never answers for the account's real uuid.
    pub fn verify_with<V>(&self, username: &str, uuid: &str, verifier: &V) -> Result<AccountStatus, V::Error>
    where
        V: AccountVerifier + ?Sized,
    {
        if let Some(status) = self.lookup(username, uuid) {
            return Ok(status);
        }
        let verification = verifier.verify(username, uuid)?;
        let status = match verification.status {
            AccountStatus::Passed if verification.uuid.as_deref().is_some_and(|known| known != uuid) => {
                AccountStatus::UuidMismatch
            }
            other => other,
        };
        let cached_uuid = match status {
            AccountStatus::UuidMismatch => uuid,
            _ => verification.uuid.as_deref().unwrap_or(uuid),
        };
        self.record(username, status, cached_uuid);
        debug!("{} verification for {username}({uuid}): {status:?}", self.label);
        Ok(status)
    }

    pub fn remove(&self, username: &str) {
        self.entries.with_shard(username, |shard| {
            shard.remove(username);
        });
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
