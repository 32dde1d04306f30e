//! Domain models for the formalize module.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::actions::SubmissionAction;

/// Lifecycle state of a submission.
///
/// The discriminants are bit flags so that a form can declare the set of
/// states it accepts as a [`SubmissionStates`] mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Draft = 0b0001,
    Submitted = 0b0100,
}

impl SubmissionState {
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bit mask over [`SubmissionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionStates(u8);

impl SubmissionStates {
    pub const NONE: Self = Self(0);
    pub const DRAFT: Self = Self(SubmissionState::Draft.bits());
    pub const SUBMITTED: Self = Self(SubmissionState::Submitted.bits());
    pub const ALL: Self = Self(SubmissionState::Draft.bits() | SubmissionState::Submitted.bits());

    /// Build a mask from raw bits, dropping bits that name no state.
    #[must_use]
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, state: SubmissionState) -> bool {
        self.0 & state.bits() != 0
    }

    #[must_use]
    pub const fn with(self, state: SubmissionState) -> Self {
        Self(self.0 | state.bits())
    }
}

impl From<SubmissionState> for SubmissionStates {
    fn from(state: SubmissionState) -> Self {
        Self(state.bits())
    }
}

/// What tag operations the creator of a submission may perform without an
/// explicit tag grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagPermissions {
    #[default]
    None,
    Read,
    Write,
}

impl TagPermissions {
    /// Tag actions implied by this permission level.
    #[must_use]
    pub fn actions(self) -> BTreeSet<SubmissionAction> {
        match self {
            Self::None => BTreeSet::new(),
            Self::Read => BTreeSet::from([SubmissionAction::ReadTags]),
            Self::Write => {
                BTreeSet::from([SubmissionAction::ReadTags, SubmissionAction::WriteTags])
            }
        }
    }
}

/// A name with optional per-language translations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalizedName {
    /// Name used when no translation matches.
    pub default: String,
    /// Language tag (e.g. `de`, `en`) to name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub translations: BTreeMap<String, String>,
}

impl LocalizedName {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            translations: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_translation(
        mut self,
        language: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.translations.insert(language.into(), name.into());
        self
    }

    /// Name for `language`, falling back to the default name.
    #[must_use]
    pub fn get(&self, language: &str) -> &str {
        self.translations
            .get(language)
            .map_or(self.default.as_str(), String::as_str)
    }
}

impl From<&str> for LocalizedName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Tag that can be attached to submissions of a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub identifier: String,
    /// Free-form descriptor (display names, colors, ...).
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Tag {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// A dynamically defined form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    /// Opaque, immutable identifier.
    pub identifier: String,
    pub name: LocalizedName,
    /// JSON schema the `data_feed_element` of submissions should follow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_feed_schema: Option<String>,
    /// Creator of the form. Absent for legacy forms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub date_created: OffsetDateTime,
    /// `true`: submissions carry their own grants. `false`: creator-based access.
    pub grant_based_submission_authorization: bool,
    /// Deprecated client-scope authorization (pre-grant deployments).
    #[serde(default)]
    pub legacy_client_scope_authorization: bool,
    pub allowed_submission_states: SubmissionStates,
    /// Actions still permitted once a submission is submitted.
    #[serde(default)]
    pub actions_allowed_when_submitted: BTreeSet<SubmissionAction>,
    /// 0 means unlimited.
    pub max_num_submissions_per_creator: u32,
    #[serde(default)]
    pub available_tags: Vec<Tag>,
    #[serde(default)]
    pub tag_permissions_for_submitters: TagPermissions,
}

impl Form {
    #[must_use]
    pub fn has_tag(&self, identifier: &str) -> bool {
        self.available_tags
            .iter()
            .any(|t| t.identifier == identifier)
    }

    #[must_use]
    pub fn allows_state(&self, state: SubmissionState) -> bool {
        self.allowed_submission_states.contains(state)
    }
}

/// Input for creating a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewForm {
    pub name: LocalizedName,
    #[serde(default)]
    pub data_feed_schema: Option<String>,
    #[serde(default)]
    pub grant_based_submission_authorization: bool,
    #[serde(default)]
    pub legacy_client_scope_authorization: bool,
    #[serde(default = "default_allowed_submission_states")]
    pub allowed_submission_states: SubmissionStates,
    #[serde(default)]
    pub actions_allowed_when_submitted: BTreeSet<SubmissionAction>,
    /// Falls back to the module default when absent.
    #[serde(default)]
    pub max_num_submissions_per_creator: Option<u32>,
    #[serde(default)]
    pub available_tags: Vec<Tag>,
    #[serde(default)]
    pub tag_permissions_for_submitters: TagPermissions,
}

fn default_allowed_submission_states() -> SubmissionStates {
    SubmissionStates::SUBMITTED
}

impl NewForm {
    pub fn new(name: impl Into<LocalizedName>) -> Self {
        Self {
            name: name.into(),
            data_feed_schema: None,
            grant_based_submission_authorization: false,
            legacy_client_scope_authorization: false,
            allowed_submission_states: default_allowed_submission_states(),
            actions_allowed_when_submitted: BTreeSet::new(),
            max_num_submissions_per_creator: None,
            available_tags: Vec::new(),
            tag_permissions_for_submitters: TagPermissions::None,
        }
    }
}

/// Partial update of a form. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormPatch {
    pub name: Option<LocalizedName>,
    pub data_feed_schema: Option<Option<String>>,
    pub grant_based_submission_authorization: Option<bool>,
    pub allowed_submission_states: Option<SubmissionStates>,
    pub actions_allowed_when_submitted: Option<BTreeSet<SubmissionAction>>,
    pub max_num_submissions_per_creator: Option<u32>,
    pub available_tags: Option<Vec<Tag>>,
    pub tag_permissions_for_submitters: Option<TagPermissions>,
}

/// A submission of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub identifier: String,
    pub form_identifier: String,
    /// JSON-encoded payload. Only absent while in draft.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_feed_element: Option<String>,
    pub submission_state: SubmissionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub date_created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub date_last_modified: OffsetDateTime,
    /// Identifiers of tags from the form's `available_tags`.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Actions the current user may perform. Computed per request, never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granted_actions: Option<BTreeSet<SubmissionAction>>,
}

impl Submission {
    #[must_use]
    pub fn is_created_by(&self, user_identifier: Option<&str>) -> bool {
        matches!(
            (self.creator_id.as_deref(), user_identifier),
            (Some(creator), Some(user)) if creator == user
        )
    }
}

/// File already uploaded to the blob store, to attach to a new submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmittedFile {
    pub file_attribute_name: String,
    pub file_data_identifier: String,
}

/// Input for creating a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub form_identifier: String,
    #[serde(default)]
    pub data_feed_element: Option<String>,
    /// Defaults to `Submitted` if the form allows it, otherwise `Draft`.
    #[serde(default)]
    pub submission_state: Option<SubmissionState>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub files: Vec<NewSubmittedFile>,
}

impl NewSubmission {
    pub fn new(form_identifier: impl Into<String>) -> Self {
        Self {
            form_identifier: form_identifier.into(),
            data_feed_element: None,
            submission_state: None,
            tags: BTreeSet::new(),
            files: Vec::new(),
        }
    }

    #[must_use]
    pub fn data_feed_element(mut self, data: impl Into<String>) -> Self {
        self.data_feed_element = Some(data.into());
        self
    }

    #[must_use]
    pub fn state(mut self, state: SubmissionState) -> Self {
        self.submission_state = Some(state);
        self
    }

    #[must_use]
    pub fn tag(mut self, identifier: impl Into<String>) -> Self {
        self.tags.insert(identifier.into());
        self
    }

    #[must_use]
    pub fn file(
        mut self,
        attribute: impl Into<String>,
        file_data_identifier: impl Into<String>,
    ) -> Self {
        self.files.push(NewSubmittedFile {
            file_attribute_name: attribute.into(),
            file_data_identifier: file_data_identifier.into(),
        });
        self
    }
}

/// Partial update of a submission. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPatch {
    pub data_feed_element: Option<String>,
    pub submission_state: Option<SubmissionState>,
}

/// A file attached to a submission. The bytes live in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedFile {
    pub identifier: String,
    pub submission_identifier: String,
    /// The form field the file was attached to.
    pub file_attribute_name: String,
    /// Reference into the blob store.
    pub file_data_identifier: String,
}

/// Display metadata of a blob, fetched on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedFileDetails {
    pub file: SubmittedFile,
    pub metadata: FileMetadata,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn submission_state_mask() {
        let mask = SubmissionStates::NONE.with(SubmissionState::Draft);
        assert!(mask.contains(SubmissionState::Draft));
        assert!(!mask.contains(SubmissionState::Submitted));
        assert!(SubmissionStates::ALL.contains(SubmissionState::Submitted));
        assert!(SubmissionStates::NONE.is_empty());
        assert_eq!(SubmissionStates::from_bits_truncate(0b1111), SubmissionStates::ALL);
        assert!(SubmissionStates::from_bits_truncate(0b0010).is_empty());
    }

    #[test]
    fn tag_permission_levels() {
        assert!(TagPermissions::None.actions().is_empty());
        assert_eq!(
            TagPermissions::Read.actions(),
            BTreeSet::from([SubmissionAction::ReadTags])
        );
        assert!(
            TagPermissions::Write
                .actions()
                .contains(&SubmissionAction::WriteTags)
        );
    }

    #[test]
    fn localized_name_falls_back_to_default() {
        let name = LocalizedName::new("Application").with_translation("de", "Antrag");
        assert_eq!(name.get("de"), "Antrag");
        assert_eq!(name.get("fr"), "Application");
    }

    #[test]
    fn creator_match_requires_both_sides() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let mut submission = Submission {
            identifier: "s".to_owned(),
            form_identifier: "f".to_owned(),
            data_feed_element: None,
            submission_state: SubmissionState::Draft,
            creator_id: Some("alice".to_owned()),
            last_modified_by_id: None,
            date_created: now,
            date_last_modified: now,
            tags: BTreeSet::new(),
            granted_actions: None,
        };
        assert!(submission.is_created_by(Some("alice")));
        assert!(!submission.is_created_by(Some("bob")));
        assert!(!submission.is_created_by(None));

        submission.creator_id = None;
        assert!(!submission.is_created_by(None));
    }

    #[test]
    fn new_form_defaults_from_json() {
        let form: NewForm = serde_json::from_str(r#"{"name": {"default": "Survey"}}"#).unwrap();
        assert_eq!(form.allowed_submission_states, SubmissionStates::SUBMITTED);
        assert!(!form.grant_based_submission_authorization);
        assert_eq!(form.tag_permissions_for_submitters, TagPermissions::None);
        assert_eq!(form.max_num_submissions_per_creator, None);
    }
}
