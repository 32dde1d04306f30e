//! Client implementation for the static grant store plugin.

use async_trait::async_trait;
use formalize_sdk::{
    GrantStoreError, GrantSubject, ResourceActionGrant, ResourceGrantClient, ResourceHandle,
};
use formalize_security::SecurityContext;

use super::service::Service;

#[async_trait]
impl ResourceGrantClient for Service {
    async fn is_current_user_granted_any_of(
        &self,
        ctx: &SecurityContext,
        resource_class: &str,
        resource_identifier: Option<&str>,
        actions: &[&str],
    ) -> Result<bool, GrantStoreError> {
        self.is_granted_any_of(ctx, resource_class, resource_identifier, actions)
    }

    async fn get_granted_actions(
        &self,
        ctx: &SecurityContext,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Result<Vec<String>, GrantStoreError> {
        self.granted_actions(ctx, resource_class, resource_identifier)
    }

    async fn find_resource(
        &self,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Result<Option<ResourceHandle>, GrantStoreError> {
        self.find(resource_class, resource_identifier)
    }

    async fn register_resource(
        &self,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Result<ResourceHandle, GrantStoreError> {
        self.register(resource_class, resource_identifier)
    }

    async fn add_grant(
        &self,
        resource: &ResourceHandle,
        action: &str,
        subject: &GrantSubject,
    ) -> Result<ResourceActionGrant, GrantStoreError> {
        Service::add_grant(self, resource, action, subject)
    }

    async fn remove_all_grants_for_resource(
        &self,
        resource_class: &str,
        resource_identifier: &str,
    ) -> Result<(), GrantStoreError> {
        self.remove_resources(resource_class, &[resource_identifier.to_owned()])?;
        Ok(())
    }

    async fn remove_all_grants_for_resources(
        &self,
        resource_class: &str,
        resource_identifiers: &[String],
    ) -> Result<(), GrantStoreError> {
        self.remove_resources(resource_class, resource_identifiers)?;
        Ok(())
    }
}
