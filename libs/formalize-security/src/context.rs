use std::collections::HashMap;

use serde_json::Value;

/// `SecurityContext` encapsulates the identity of the caller for a single request.
///
/// Built by the authentication layer and passed through the request lifecycle.
/// The authorization engine reads it to resolve grants (user identifier and
/// static groups) and legacy scope checks (user attributes).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SecurityContext {
    /// Identifier of the current user. `None` for anonymous callers and for
    /// service clients authenticated without a user.
    user_identifier: Option<String>,
    /// Whether the caller presented valid credentials.
    authenticated: bool,
    /// Static group memberships asserted by the identity provider.
    #[serde(default)]
    groups: Vec<String>,
    /// Named user attributes (scopes, roles) resolved at authentication time.
    /// A missing key means "undefined", which is distinct from `false`.
    #[serde(default)]
    attributes: HashMap<String, Value>,
}

impl SecurityContext {
    /// Create a new `SecurityContext` builder
    #[must_use]
    pub fn builder() -> SecurityContextBuilder {
        SecurityContextBuilder::default()
    }

    /// Create an anonymous `SecurityContext`: no user, not authenticated, no attributes.
    #[must_use]
    pub fn anonymous() -> Self {
        SecurityContextBuilder::default().build()
    }

    /// Shortcut for an authenticated user with no groups or attributes.
    #[must_use]
    pub fn for_user(user_identifier: impl Into<String>) -> Self {
        Self::builder().user_identifier(user_identifier).build()
    }

    #[must_use]
    pub fn user_identifier(&self) -> Option<&str> {
        self.user_identifier.as_deref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    #[must_use]
    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Raw attribute lookup. `None` means the attribute is undefined.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Boolean view of an attribute.
    ///
    /// Returns `None` when the attribute is undefined and `Some(truthiness)`
    /// otherwise: `null`, `false`, `0`, `""`, `[]` and `{}` are falsy.
    #[must_use]
    pub fn attribute_flag(&self, name: &str) -> Option<bool> {
        self.attributes.get(name).map(is_truthy)
    }

    /// `true` only if the attribute is defined and truthy.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_flag(name).unwrap_or(false)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[derive(Default)]
pub struct SecurityContextBuilder {
    user_identifier: Option<String>,
    authenticated: Option<bool>,
    groups: Vec<String>,
    attributes: HashMap<String, Value>,
}

impl SecurityContextBuilder {
    /// Set the user identifier. Implies `authenticated(true)` unless overridden.
    #[must_use]
    pub fn user_identifier(mut self, user_identifier: impl Into<String>) -> Self {
        self.user_identifier = Some(user_identifier.into());
        self
    }

    #[must_use]
    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = Some(authenticated);
        self
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    #[must_use]
    pub fn groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn build(self) -> SecurityContext {
        let authenticated = self
            .authenticated
            .unwrap_or(self.user_identifier.is_some());
        SecurityContext {
            user_identifier: self.user_identifier,
            authenticated,
            groups: self.groups,
            attributes: self.attributes,
        }
    }
}
