//! Cache of access keys issued to launcher identities

use tracing::debug;
use uuid::Uuid;

use crate::shard::ShardedMap;

/// Identity a launcher presents when asking for an access key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyRequest {
    pub username: String,
    pub uuid: String,
    pub mac_address: String,
    pub pack_name: String,
}

impl KeyRequest {
    pub fn new(
        username: impl Into<String>,
        uuid: impl Into<String>,
        mac_address: impl Into<String>,
        pack_name: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            uuid: uuid.into(),
            mac_address: mac_address.into(),
            pack_name: pack_name.into(),
        }
    }

    fn cache_key(&self) -> String {
        // NUL cannot appear in any of the fields a launcher sends.
        format!(
            "{}\0{}\0{}\0{}",
            self.username, self.uuid, self.mac_address, self.pack_name
        )
    }
}

/// Generate a fresh 32-character alphanumeric access key.
pub fn generate_access_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Access keys already issued, keyed by the full requesting identity.
#[derive(Debug)]
pub struct KeyCache {
    keys: ShardedMap<String>,
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyCache {
    pub fn new() -> Self {
        Self {
            keys: ShardedMap::new(),
        }
    }

    pub fn get(&self, request: &KeyRequest) -> Option<String> {
        let key = request.cache_key();
        self.keys.with_shard(&key, |shard| shard.get(&key).cloned())
    }

    pub fn insert(&self, request: &KeyRequest, access_key: impl Into<String>) {
        let key = request.cache_key();
        let access_key = access_key.into();
        self.keys.with_shard(&key, |shard| {
            shard.insert(key.clone(), access_key);
        });
    }

    /// Return the cached key for `request`, or obtain one from `issue`
    /// (typically a key-store lookup that creates a key when none exists)
    /// and cache it.
    pub fn get_or_issue<F, E>(&self, request: &KeyRequest, issue: F) -> Result<String, E>
    where
        F: FnOnce(&KeyRequest) -> Result<String, E>,
    {
        if let Some(existing) = self.get(request) {
            debug!("Access key cache hit for {}", request.username);
            return Ok(existing);
        }
        let access_key = issue(request)?;
        self.insert(request, access_key.clone());
        Ok(access_key)
    }

    /// Whether `candidate` is the key cached for `request`.
    pub fn matches(&self, request: &KeyRequest, candidate: &str) -> bool {
        self.get(request).is_some_and(|key| key == candidate)
    }

    pub fn clear(&self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_alphanumeric_and_unique() {
        let a = generate_access_key();
        let b = generate_access_key();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn identities_differing_in_one_field_do_not_share_keys() {
        let cache = KeyCache::new();
        let a = KeyRequest::new("steve", "u1", "00:11", "modpack1");
        let b = KeyRequest::new("steve", "u1", "00:11", "modpack2");
        cache.insert(&a, "key-a");
        assert_eq!(cache.get(&a).as_deref(), Some("key-a"));
        assert_eq!(cache.get(&b), None);
    }
}
