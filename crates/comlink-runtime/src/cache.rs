// SPDX-License-Identifier: MIT OR Apache-2.0
//! The bound profile-provider cache (spec §3, §5): a single entry per
//! `(profile, version?, provider, map-variant?, map-revision?)` combination,
//! with concurrent misses on the same key coalesced to one registry bind.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use comlink_registry::{BindRequest, BindResponse, RegistryClient, RegistryError};
use tokio::sync::{Mutex, RwLock};

use crate::timers::Timers;

/// Identifies one bindable profile-provider combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Profile id.
    pub profile_id: String,
    /// Profile version, if pinned.
    pub profile_version: Option<String>,
    /// Provider name.
    pub provider_name: String,
    /// Explicit map variant, if requested.
    pub map_variant: Option<String>,
    /// Explicit map revision, if requested.
    pub map_revision: Option<String>,
}

impl CacheKey {
    /// Build a key from a [`BindRequest`]'s own identifying fields.
    #[must_use]
    pub fn from_request(request: &BindRequest) -> Self {
        CacheKey {
            profile_id: request.profile_id.clone(),
            profile_version: request.profile_version.clone(),
            provider_name: request.provider_name.clone(),
            map_variant: request.map_variant.clone(),
            map_revision: request.map_revision.clone(),
        }
    }
}

struct Slot {
    entry: Option<(BindResponse, u64)>,
}

/// Read-mostly cache of bound profile-providers.
///
/// Each key owns its own `Mutex<Slot>`: a miss holds that key's lock for the
/// duration of the bind, so concurrent misses on the *same* key coalesce
/// into a single registry call (spec §5), while misses on different keys
/// proceed independently.
pub struct ProfileProviderCache {
    slots: RwLock<HashMap<CacheKey, Arc<Mutex<Slot>>>>,
    ttl: Duration,
}

impl ProfileProviderCache {
    /// Construct an empty cache whose entries live for `ttl` (spec §6's
    /// `superfaceCacheTimeout`).
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        ProfileProviderCache {
            slots: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    async fn slot_for(&self, key: &CacheKey) -> Arc<Mutex<Slot>> {
        if let Some(slot) = self.slots.read().await.get(key) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Slot { entry: None }))),
        )
    }

    /// Return the cached bind for `key`, re-binding through `registry` on a
    /// miss or expiry. `now` is the caller's current time in milliseconds
    /// (via [`Timers`]), so expiry is driven by the same injected clock
    /// success/failure timestamps use.
    pub async fn get_or_bind(
        &self,
        key: CacheKey,
        registry: &dyn RegistryClient,
        request: &BindRequest,
        timers: &dyn Timers,
    ) -> Result<BindResponse, RegistryError> {
        let slot = self.slot_for(&key).await;
        let mut guard = slot.lock().await;

        let now = timers.now_millis();
        if let Some((bound, expires_at)) = &guard.entry {
            if now < *expires_at {
                return Ok(bound.clone());
            }
        }

        let bound = registry.bind(request).await?;
        guard.entry = Some((bound.clone(), now + self.ttl.as_millis() as u64));
        Ok(bound)
    }

    /// Drop a key's cached entry, forcing the next lookup to re-bind (e.g.
    /// after the router switches to a different provider whose binding is
    /// suspected stale).
    pub async fn invalidate(&self, key: &CacheKey) {
        if let Some(slot) = self.slots.read().await.get(key) {
            slot.lock().await.entry = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use comlink_interpreter::ast::MapDocument;
    use comlink_registry::ProviderJson;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use crate::timers::ManualTimers;

    struct CountingRegistry {
        calls: AtomicU32,
    }

    #[async_trait]
    impl RegistryClient for CountingRegistry {
        async fn bind(&self, _request: &BindRequest) -> Result<BindResponse, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(BindResponse {
                provider: ProviderJson {
                    services: BTreeMap::new(),
                },
                map: MapDocument {
                    maps: BTreeMap::new(),
                    operations: BTreeMap::new(),
                },
            })
        }
    }

    fn request() -> BindRequest {
        BindRequest {
            profile_id: "weather".to_string(),
            profile_version: None,
            provider_name: "noaa".to_string(),
            map_variant: None,
            map_revision: None,
        }
    }

    #[tokio::test]
    async fn second_lookup_within_ttl_does_not_rebind() {
        let cache = ProfileProviderCache::new(Duration::from_secs(60));
        let registry = CountingRegistry { calls: AtomicU32::new(0) };
        let timers = ManualTimers::new(0);
        let key = CacheKey::from_request(&request());

        cache.get_or_bind(key.clone(), &registry, &request(), &timers).await.unwrap();
        cache.get_or_bind(key, &registry, &request(), &timers).await.unwrap();

        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookup_after_ttl_rebinds() {
        let cache = ProfileProviderCache::new(Duration::from_secs(60));
        let registry = CountingRegistry { calls: AtomicU32::new(0) };
        let timers = ManualTimers::new(0);
        let key = CacheKey::from_request(&request());

        cache.get_or_bind(key.clone(), &registry, &request(), &timers).await.unwrap();
        timers.advance(61_000);
        cache.get_or_bind(key, &registry, &request(), &timers).await.unwrap();

        assert_eq!(registry.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_on_same_key_coalesce() {
        let cache = Arc::new(ProfileProviderCache::new(Duration::from_secs(60)));
        let registry = Arc::new(CountingRegistry { calls: AtomicU32::new(0) });
        let timers = Arc::new(ManualTimers::new(0));
        let key = CacheKey::from_request(&request());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let registry = Arc::clone(&registry);
            let timers = Arc::clone(&timers);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_bind(key, registry.as_ref(), &request(), timers.as_ref())
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
    }
}
