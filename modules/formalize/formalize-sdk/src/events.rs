//! Notifications emitted by the grant lifecycle hooks.

use crate::plugin_api::ResourceActionGrant;

/// A grant was created on a submission resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionGrantAdded {
    pub form_identifier: String,
    pub submission_identifier: String,
    pub grant: ResourceActionGrant,
}

/// Observer for grant notifications.
///
/// Listeners are invoked synchronously, once per created grant, after the
/// grant has been stored.
pub trait GrantEventListener: Send + Sync {
    fn on_submission_grant_added(&self, event: &SubmissionGrantAdded);
}
