//! Pure decision rules of the authorization engine.
//!
//! Nothing here talks to the grant store: callers pass in the action names
//! the store returned and get typed action sets back.

use std::collections::BTreeSet;
use std::str::FromStr;

use formalize_sdk::{Form, FormAction, Submission, SubmissionAction, SubmissionState};
use formalize_security::SecurityContext;

use super::AuthorizationError;
use crate::config::LegacyScopeConfig;

/// How a form decides who may act on its submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionAuthorization {
    /// Explicit grants on each submission resource.
    GrantBased,
    /// Implicit rights of the submission creator.
    CreatorBased,
}

impl SubmissionAuthorization {
    /// Mode configured on `form`.
    ///
    /// # Errors
    ///
    /// [`AuthorizationError::InvalidConfiguration`] if the form combines the
    /// legacy client-scope mode with grant-based submission authorization.
    pub fn of(form: &Form) -> Result<Self, AuthorizationError> {
        match (
            form.grant_based_submission_authorization,
            form.legacy_client_scope_authorization,
        ) {
            (true, true) => Err(AuthorizationError::InvalidConfiguration(format!(
                "form '{}' enables both legacy client-scope and grant-based submission authorization",
                form.identifier
            ))),
            (true, false) => Ok(Self::GrantBased),
            (false, _) => Ok(Self::CreatorBased),
        }
    }
}

/// Where an action in a raw effective set came from. Gating differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Grant,
    Creator,
}

/// Parse action names returned by the grant store.
///
/// Names outside the vocabulary are skipped with a warning.
pub fn parse_actions<A>(names: &[String]) -> BTreeSet<A>
where
    A: FromStr<Err = formalize_sdk::UnknownActionError> + Ord,
{
    names
        .iter()
        .filter_map(|name| match name.parse::<A>() {
            Ok(action) => Some(action),
            Err(e) => {
                tracing::warn!(
                    action = %e.name,
                    scope = e.scope,
                    "ignoring unknown granted action"
                );
                None
            }
        })
        .collect()
}

/// `manage` implies every form item action.
#[must_use]
pub fn expand_form_actions(mut actions: BTreeSet<FormAction>) -> BTreeSet<FormAction> {
    if actions.contains(&FormAction::Manage) {
        actions.extend(FormAction::ALL.iter().copied());
    }
    actions
}

/// Form actions conferred by the legacy client-scope mode.
///
/// Empty unless the form carries the legacy flag and the user is authenticated.
#[must_use]
pub fn legacy_form_actions(
    form: &Form,
    security: &SecurityContext,
    legacy: &LegacyScopeConfig,
) -> BTreeSet<FormAction> {
    let mut actions = BTreeSet::new();
    if !form.legacy_client_scope_authorization || !security.is_authenticated() {
        return actions;
    }
    let holds_any = |names: &[String]| names.iter().any(|name| security.has_attribute(name));
    if holds_any(&legacy.read_submissions_attributes) {
        actions.insert(FormAction::ReadSubmissions);
    }
    if holds_any(&legacy.create_submissions_attributes) {
        actions.insert(FormAction::CreateSubmissions);
    }
    actions
}

/// Submission actions conferred by the legacy client-scope mode.
///
/// `None` when the mode does not apply to this user. Otherwise the result
/// replaces grant and creator evaluation, even when it is empty.
#[must_use]
pub fn legacy_submission_actions(
    form: &Form,
    security: &SecurityContext,
    legacy: &LegacyScopeConfig,
) -> Option<BTreeSet<SubmissionAction>> {
    let form_actions = legacy_form_actions(form, security, legacy);
    if form_actions.is_empty() {
        return None;
    }
    let mut actions = BTreeSet::new();
    if form_actions.contains(&FormAction::ReadSubmissions) {
        actions.insert(SubmissionAction::Read);
    }
    Some(actions)
}

/// Submission item actions implied by actions held on the owning form.
#[must_use]
pub fn submission_actions_from_form(
    form_actions: &BTreeSet<FormAction>,
) -> BTreeSet<SubmissionAction> {
    form_actions
        .iter()
        .filter_map(|action| match action {
            FormAction::ReadSubmissions => Some(SubmissionAction::Read),
            FormAction::UpdateSubmissions => Some(SubmissionAction::Update),
            FormAction::DeleteSubmissions => Some(SubmissionAction::Delete),
            FormAction::Manage => Some(SubmissionAction::Manage),
            FormAction::Read
            | FormAction::Update
            | FormAction::Delete
            | FormAction::CreateSubmissions => None,
        })
        .collect()
}

/// Implicit rights of a submission creator under creator-based authorization.
#[must_use]
pub fn creator_actions() -> BTreeSet<SubmissionAction> {
    BTreeSet::from([
        SubmissionAction::Read,
        SubmissionAction::Update,
        SubmissionAction::Delete,
    ])
}

fn passes_submitted_gate(
    action: SubmissionAction,
    origin: Origin,
    allowed: &BTreeSet<SubmissionAction>,
) -> bool {
    match action {
        SubmissionAction::Manage => true,
        SubmissionAction::Read | SubmissionAction::ReadTags => {
            origin == Origin::Grant || allowed.contains(&action)
        }
        SubmissionAction::Update | SubmissionAction::Delete | SubmissionAction::WriteTags => {
            allowed.contains(&action)
        }
    }
}

/// Effective actions of the current user on `submission`.
///
/// `granted` holds the grant-derived actions: those mapped from the form
/// plus, in grant-based mode, those granted on the submission itself.
/// `user_identifier` decides creator status.
#[must_use]
pub fn effective_submission_actions(
    form: &Form,
    submission: &Submission,
    mode: SubmissionAuthorization,
    user_identifier: Option<&str>,
    granted: &BTreeSet<SubmissionAction>,
) -> BTreeSet<SubmissionAction> {
    if granted.contains(&SubmissionAction::Manage) {
        return SubmissionAction::ALL.iter().copied().collect();
    }

    let is_creator = submission.is_created_by(user_identifier);
    let from_creator = match mode {
        SubmissionAuthorization::CreatorBased if is_creator => creator_actions(),
        SubmissionAuthorization::CreatorBased | SubmissionAuthorization::GrantBased => {
            BTreeSet::new()
        }
    };

    let raw = granted
        .iter()
        .map(|a| (*a, Origin::Grant))
        .chain(from_creator.iter().map(|a| (*a, Origin::Creator)));

    let mut effective: BTreeSet<SubmissionAction> = match submission.submission_state {
        SubmissionState::Draft => raw.map(|(a, _)| a).collect(),
        SubmissionState::Submitted => raw
            .filter(|(a, origin)| {
                passes_submitted_gate(*a, *origin, &form.actions_allowed_when_submitted)
            })
            .map(|(a, _)| a)
            .collect(),
    };

    // explicit tag grants take precedence over the submitter default
    if is_creator && !granted.iter().any(|a| a.is_tag_action()) {
        effective.extend(form.tag_permissions_for_submitters.actions());
    }

    effective
}
