//! Service implementation for the static grant store plugin.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use formalize_sdk::{GrantStoreError, GrantSubject, ResourceActionGrant, ResourceHandle};
use formalize_security::SecurityContext;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::StaticGrantPluginConfig;

type ResourceKey = (String, Option<String>);

#[derive(Default)]
struct Store {
    resources: HashMap<ResourceKey, ResourceHandle>,
    // keyed by resource handle identifier
    grants: HashMap<String, Vec<ResourceActionGrant>>,
}

impl Store {
    fn grants_of(
        &self,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> &[ResourceActionGrant] {
        self.resources
            .get(&key(resource_class, resource_identifier))
            .and_then(|handle| self.grants.get(&handle.identifier))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn remove(&mut self, resource_class: &str, resource_identifier: &str) -> usize {
        let k = key(resource_class, Some(resource_identifier));
        let Some(handle) = self.resources.remove(&k) else {
            return 0;
        };
        self.grants
            .remove(&handle.identifier)
            .map_or(0, |grants| grants.len())
    }
}

fn key(resource_class: &str, resource_identifier: Option<&str>) -> ResourceKey {
    (resource_class.to_owned(), resource_identifier.map(ToOwned::to_owned))
}

/// Static grant store service.
///
/// Lookups on resources that were never registered yield no grants.
/// Only mutations require the resource to exist.
pub struct Service {
    config: StaticGrantPluginConfig,
    store: RwLock<Store>,
    available: AtomicBool,
}

impl Service {
    #[must_use]
    pub fn new(config: StaticGrantPluginConfig) -> Self {
        Self {
            config,
            store: RwLock::new(Store::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: every call fails with `Unavailable` until reset.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), GrantStoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GrantStoreError::Unavailable(
                "static grant store is offline".to_owned(),
            ))
        }
    }

    fn matches(&self, ctx: &SecurityContext, subject: &GrantSubject) -> bool {
        match subject {
            GrantSubject::User(user) => {
                ctx.is_authenticated() && ctx.user_identifier() == Some(user.as_str())
            }
            GrantSubject::Group(group) => ctx.is_member_of(group),
            GrantSubject::DynamicGroup(group) => match self.config.dynamic_groups.get(group) {
                Some(attribute) => ctx.is_authenticated() && ctx.has_attribute(attribute),
                None => {
                    tracing::warn!(
                        group = %group,
                        "grant references an unconfigured dynamic group"
                    );
                    false
                }
            },
        }
    }

    /// Actions granted to the current user, without duplicates, in grant order.
    ///
    /// # Errors
    ///
    /// `Unavailable` while the store is offline.
    pub fn granted_actions(
        &self,
        ctx: &SecurityContext,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Result<Vec<String>, GrantStoreError> {
        self.ensure_available()?;
        let store = self.store.read();
        let mut actions: Vec<String> = Vec::new();
        for grant in store.grants_of(resource_class, resource_identifier) {
            if self.matches(ctx, &grant.subject) && !actions.contains(&grant.action) {
                actions.push(grant.action.clone());
            }
        }
        Ok(actions)
    }

    /// # Errors
    ///
    /// `Unavailable` while the store is offline.
    pub fn is_granted_any_of(
        &self,
        ctx: &SecurityContext,
        resource_class: &str,
        resource_identifier: Option<&str>,
        actions: &[&str],
    ) -> Result<bool, GrantStoreError> {
        self.ensure_available()?;
        let store = self.store.read();
        Ok(store
            .grants_of(resource_class, resource_identifier)
            .iter()
            .any(|g| actions.contains(&g.action.as_str()) && self.matches(ctx, &g.subject)))
    }

    /// # Errors
    ///
    /// `Unavailable` while the store is offline.
    pub fn find(
        &self,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Result<Option<ResourceHandle>, GrantStoreError> {
        self.ensure_available()?;
        Ok(self
            .store
            .read()
            .resources
            .get(&key(resource_class, resource_identifier))
            .cloned())
    }

    /// # Errors
    ///
    /// - `Unavailable` while the store is offline
    /// - `ResourceAlreadyRegistered` if the resource exists
    pub fn register(
        &self,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Result<ResourceHandle, GrantStoreError> {
        self.ensure_available()?;
        let mut store = self.store.write();
        let k = key(resource_class, resource_identifier);
        if store.resources.contains_key(&k) {
            return Err(GrantStoreError::ResourceAlreadyRegistered {
                resource_class: resource_class.to_owned(),
                resource_identifier: resource_identifier.map(ToOwned::to_owned),
            });
        }
        let handle = ResourceHandle {
            identifier: Uuid::now_v7().to_string(),
            resource_class: resource_class.to_owned(),
            resource_identifier: resource_identifier.map(ToOwned::to_owned),
        };
        store.resources.insert(k, handle.clone());
        tracing::debug!(resource_class, resource_identifier, "registered resource");
        Ok(handle)
    }

    /// Add a grant. An identical existing grant is returned instead of a duplicate.
    ///
    /// # Errors
    ///
    /// - `Unavailable` while the store is offline
    /// - `ResourceNotRegistered` if the resource is unknown
    pub fn add_grant(
        &self,
        resource: &ResourceHandle,
        action: &str,
        subject: &GrantSubject,
    ) -> Result<ResourceActionGrant, GrantStoreError> {
        self.ensure_available()?;
        let mut store = self.store.write();
        let registered = store
            .resources
            .get(&key(
                &resource.resource_class,
                resource.resource_identifier.as_deref(),
            ))
            .is_some_and(|h| h.identifier == resource.identifier);
        if !registered {
            return Err(GrantStoreError::ResourceNotRegistered {
                resource_class: resource.resource_class.clone(),
                resource_identifier: resource.resource_identifier.clone(),
            });
        }

        let grants = store.grants.entry(resource.identifier.clone()).or_default();
        if let Some(existing) = grants
            .iter()
            .find(|g| g.action == action && &g.subject == subject)
        {
            return Ok(existing.clone());
        }
        let grant = ResourceActionGrant {
            identifier: Uuid::now_v7().to_string(),
            resource: resource.clone(),
            action: action.to_owned(),
            subject: subject.clone(),
        };
        grants.push(grant.clone());
        Ok(grant)
    }

    /// Remove the resources with all their grants and return how many grants
    /// went with them. Unknown resources are ignored.
    ///
    /// # Errors
    ///
    /// `Unavailable` while the store is offline.
    pub fn remove_resources(
        &self,
        resource_class: &str,
        resource_identifiers: &[String],
    ) -> Result<usize, GrantStoreError> {
        self.ensure_available()?;
        let mut store = self.store.write();
        let removed: usize = resource_identifiers
            .iter()
            .map(|id| store.remove(resource_class, id))
            .sum();
        tracing::debug!(
            resource_class,
            resources = resource_identifiers.len(),
            grants = removed,
            "removed resources"
        );
        Ok(removed)
    }

    #[must_use]
    pub fn is_registered(&self, resource_class: &str, resource_identifier: Option<&str>) -> bool {
        self.store
            .read()
            .resources
            .contains_key(&key(resource_class, resource_identifier))
    }

    /// All grants on a resource, for every subject.
    #[must_use]
    pub fn grants_on(
        &self,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Vec<ResourceActionGrant> {
        self.store
            .read()
            .grants_of(resource_class, resource_identifier)
            .to_vec()
    }

    #[must_use]
    pub fn grant_count(&self) -> usize {
        self.store.read().grants.values().map(Vec::len).sum()
    }

    /// Registered resources, collections included.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.store.read().resources.len()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const FORM: &str = "DbpRelayFormalizeForm";

    fn service() -> Service {
        Service::new(
            StaticGrantPluginConfig::default().with_dynamic_group("employees", "ROLE_EMPLOYEE"),
        )
    }

    fn user(id: &str) -> GrantSubject {
        GrantSubject::User(id.to_owned())
    }

    #[test]
    fn register_then_grant_then_lookup() {
        let svc = service();
        let handle = svc.register(FORM, Some("f1")).unwrap();
        svc.add_grant(&handle, "manage", &user("alice")).unwrap();

        let alice = SecurityContext::for_user("alice");
        assert_eq!(
            svc.granted_actions(&alice, FORM, Some("f1")).unwrap(),
            vec!["manage".to_owned()]
        );
        assert!(
            svc.is_granted_any_of(&alice, FORM, Some("f1"), &["read", "manage"])
                .unwrap()
        );

        let bob = SecurityContext::for_user("bob");
        assert!(
            svc.granted_actions(&bob, FORM, Some("f1"))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn double_registration_is_a_conflict() {
        let svc = service();
        svc.register(FORM, None).unwrap();
        assert!(matches!(
            svc.register(FORM, None),
            Err(GrantStoreError::ResourceAlreadyRegistered { .. })
        ));
    }

    #[test]
    fn grant_on_unregistered_resource_fails() {
        let svc = service();
        let handle = ResourceHandle {
            identifier: "ghost".to_owned(),
            resource_class: FORM.to_owned(),
            resource_identifier: Some("f1".to_owned()),
        };
        assert!(matches!(
            svc.add_grant(&handle, "read", &user("alice")),
            Err(GrantStoreError::ResourceNotRegistered { .. })
        ));
    }

    #[test]
    fn identical_grants_are_stored_once() {
        let svc = service();
        let handle = svc.register(FORM, None).unwrap();
        let first = svc
            .add_grant(&handle, "create_forms", &GrantSubject::Group("editors".to_owned()))
            .unwrap();
        let second = svc
            .add_grant(&handle, "create_forms", &GrantSubject::Group("editors".to_owned()))
            .unwrap();
        assert_eq!(first.identifier, second.identifier);
        assert_eq!(svc.grant_count(), 1);
    }

    #[test]
    fn groups_and_dynamic_groups_match() {
        let svc = service();
        let handle = svc.register(FORM, Some("f1")).unwrap();
        svc.add_grant(&handle, "read", &GrantSubject::Group("staff".to_owned()))
            .unwrap();
        svc.add_grant(&handle, "update", &GrantSubject::DynamicGroup("employees".to_owned()))
            .unwrap();
        svc.add_grant(&handle, "delete", &GrantSubject::DynamicGroup("unknown".to_owned()))
            .unwrap();

        let ctx = SecurityContext::builder()
            .user_identifier("carol")
            .group("staff")
            .attribute("ROLE_EMPLOYEE", true)
            .build();
        assert_eq!(
            svc.granted_actions(&ctx, FORM, Some("f1")).unwrap(),
            vec!["read".to_owned(), "update".to_owned()]
        );

        let anonymous = SecurityContext::builder()
            .attribute("ROLE_EMPLOYEE", true)
            .build();
        assert!(
            svc.granted_actions(&anonymous, FORM, Some("f1"))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn removal_drops_resource_and_grants() {
        let svc = service();
        let handle = svc.register(FORM, Some("f1")).unwrap();
        svc.add_grant(&handle, "manage", &user("alice")).unwrap();
        svc.add_grant(&handle, "read", &user("bob")).unwrap();
        let other = svc.register(FORM, Some("f2")).unwrap();
        svc.add_grant(&other, "read", &user("bob")).unwrap();

        let removed = svc
            .remove_resources(FORM, &["f1".to_owned(), "never-registered".to_owned()])
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(svc.resource_count(), 1);
        assert!(!svc.is_registered(FORM, Some("f1")));
        assert_eq!(svc.grant_count(), 1);
        let alice = SecurityContext::for_user("alice");
        assert!(
            svc.granted_actions(&alice, FORM, Some("f1"))
                .unwrap()
                .is_empty()
        );
        // registering again starts from scratch
        svc.register(FORM, Some("f1")).unwrap();
    }

    #[test]
    fn offline_store_reports_unavailable() {
        let svc = service();
        svc.set_available(false);
        let alice = SecurityContext::for_user("alice");
        assert!(matches!(
            svc.granted_actions(&alice, FORM, None),
            Err(GrantStoreError::Unavailable(_))
        ));
        assert!(svc.register(FORM, None).is_err());

        svc.set_available(true);
        assert!(svc.granted_actions(&alice, FORM, None).unwrap().is_empty());
    }
}
