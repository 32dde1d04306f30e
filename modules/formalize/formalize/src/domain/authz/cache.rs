use std::collections::HashMap;
use std::sync::Arc;

use formalize_sdk::ResourceClass;
use formalize_security::SecurityContext;
use parking_lot::Mutex;

/// Key of a memoized grant lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub resource_class: ResourceClass,
    pub resource_identifier: Option<String>,
    pub user_identifier: Option<String>,
}

impl CacheKey {
    #[must_use]
    pub fn new(
        resource_class: ResourceClass,
        resource_identifier: Option<&str>,
        user_identifier: Option<&str>,
    ) -> Self {
        Self {
            resource_class,
            resource_identifier: resource_identifier.map(ToOwned::to_owned),
            user_identifier: user_identifier.map(ToOwned::to_owned),
        }
    }
}

/// Granted action names memoized for the lifetime of one request.
///
/// Never shared between requests: grants may change in between.
#[derive(Debug, Default)]
pub struct GrantCache {
    entries: Mutex<HashMap<CacheKey, Arc<[String]>>>,
}

impl GrantCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<[String]>> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, actions: Arc<[String]>) {
        self.entries.lock().insert(key, actions);
    }

    /// Drop every entry of one resource, for all users.
    pub fn invalidate_resource(&self, resource_class: ResourceClass, resource_identifier: &str) {
        self.entries.lock().retain(|key, _| {
            key.resource_class != resource_class
                || key.resource_identifier.as_deref() != Some(resource_identifier)
        });
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Scope of a single request: who is calling plus that request's grant cache.
#[derive(Debug)]
pub struct RequestContext {
    security: SecurityContext,
    cache: GrantCache,
}

impl RequestContext {
    /// Start a request with an empty cache.
    #[must_use]
    pub fn new(security: SecurityContext) -> Self {
        Self {
            security,
            cache: GrantCache::new(),
        }
    }

    #[must_use]
    pub fn security(&self) -> &SecurityContext {
        &self.security
    }

    #[must_use]
    pub fn user_identifier(&self) -> Option<&str> {
        self.security.user_identifier()
    }

    #[must_use]
    pub fn cache(&self) -> &GrantCache {
        &self.cache
    }
}
