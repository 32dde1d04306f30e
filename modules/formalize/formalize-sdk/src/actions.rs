//! Action vocabulary understood by the formalize authorization engine.
//!
//! Actions are exchanged with the resource grant store by name. Inside the
//! module they are always handled as the typed enums below, so that every
//! per-action rule is checked for exhaustiveness at compile time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An action name that is not part of the vocabulary of the given resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {scope} action '{name}'")]
pub struct UnknownActionError {
    /// Which vocabulary was consulted (e.g. `"form"`).
    pub scope: &'static str,
    /// The offending name.
    pub name: String,
}

macro_rules! action_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $scope:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every action of this vocabulary, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire name of the action, as stored by the grant store.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownActionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(UnknownActionError {
                        scope: $scope,
                        name: other.to_owned(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

action_enum! {
    /// Item-level actions on a single form.
    FormAction, "form" {
        Read => "read",
        Update => "update",
        Delete => "delete",
        CreateSubmissions => "create_submissions",
        ReadSubmissions => "read_submissions",
        UpdateSubmissions => "update_submissions",
        DeleteSubmissions => "delete_submissions",
        /// Implies every other form item action.
        Manage => "manage",
    }
}

action_enum! {
    /// Collection-level actions on the form resource class.
    FormCollectionAction, "form collection" {
        CreateForms => "create_forms",
    }
}

action_enum! {
    /// Item-level actions on a single submission.
    SubmissionAction, "submission" {
        Read => "read",
        Update => "update",
        Delete => "delete",
        /// Implies every other submission item action.
        Manage => "manage",
        ReadTags => "read_tags",
        WriteTags => "write_tags",
    }
}

action_enum! {
    /// Collection-level actions on the submission resource class.
    SubmissionCollectionAction, "submission collection" {
        CreateSubmissions => "create_submissions",
    }
}

impl SubmissionAction {
    /// Actions that are never restricted by submission state gating.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::Read | Self::ReadTags)
    }

    #[must_use]
    pub const fn is_tag_action(self) -> bool {
        matches!(self, Self::ReadTags | Self::WriteTags)
    }
}

/// Resource classes registered with the resource grant store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceClass {
    Form,
    Submission,
}

impl ResourceClass {
    /// Stable class name under which grants are stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Form => "DbpRelayFormalizeForm",
            Self::Submission => "DbpRelayFormalizeSubmission",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
