//! Core type definitions for the relation model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Entity type for subjects.
pub const USER_ENTITY_TYPE: &str = "user";

/// Entity type for protected resources.
pub const DOCUMENT_ENTITY_TYPE: &str = "document";

/// An action a principal may perform on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    Delete,
    Share,
}

impl Action {
    /// The closed action set.
    pub const ALL: [Action; 4] = [Action::Read, Action::Write, Action::Delete, Action::Share];

    /// Returns the wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
            Action::Share => "share",
        }
    }

    /// Returns true for actions that require ownership in degraded mode.
    pub fn requires_ownership(&self) -> bool {
        !matches!(self, Action::Read)
    }

    /// Maps a route guard name to the action it checks.
    ///
    /// Owner guards check `delete` since only owners may delete.
    pub fn for_guard(guard: Guard) -> Self {
        match guard {
            Guard::Owner => Action::Delete,
            Guard::Reader => Action::Read,
            Guard::Editor => Action::Write,
            Guard::Sharer => Action::Share,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            "delete" => Ok(Action::Delete),
            "share" => Ok(Action::Share),
            _ => Err(DomainError::UnknownAction {
                value: value.to_string(),
            }),
        }
    }
}

/// Named route guards used by the document routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Owner,
    Reader,
    Editor,
    Sharer,
}

/// A relation between a user and a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Owner,
    Editor,
    Viewer,
}

impl Relation {
    /// The closed relation set.
    pub const ALL: [Relation; 3] = [Relation::Owner, Relation::Editor, Relation::Viewer];

    /// Relations removed by a full revoke. Ownership is never revoked.
    pub const SHARED: [Relation; 2] = [Relation::Viewer, Relation::Editor];

    /// Returns the wire name of the relation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Owner => "owner",
            Relation::Editor => "editor",
            Relation::Viewer => "viewer",
        }
    }

    /// Actions implied by holding this relation.
    pub fn allowed_actions(&self) -> &'static [Action] {
        match self {
            Relation::Owner => &[Action::Read, Action::Write, Action::Delete, Action::Share],
            Relation::Editor => &[Action::Read, Action::Write],
            Relation::Viewer => &[Action::Read],
        }
    }

    /// Returns true if this relation implies `action`.
    pub fn allows(&self, action: Action) -> bool {
        self.allowed_actions().contains(&action)
    }

    /// Parses a share permission. Only `viewer` and `editor` are grantable
    /// by sharing; ownership is assigned at creation.
    pub fn parse_share(value: &str) -> Result<Self, DomainError> {
        match value {
            "viewer" => Ok(Relation::Viewer),
            "editor" => Ok(Relation::Editor),
            _ => Err(DomainError::InvalidSharePermission {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relation {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "owner" => Ok(Relation::Owner),
            "editor" => Ok(Relation::Editor),
            "viewer" => Ok(Relation::Viewer),
            _ => Err(DomainError::UnknownRelation {
                value: value.to_string(),
            }),
        }
    }
}

/// Returns true if any of `relations` implies `action`.
///
/// A subject holding several relations gets the union of their actions.
pub fn relations_allow(relations: &[Relation], action: Action) -> bool {
    relations.iter().any(|r| r.allows(action))
}

/// An entity identified by type and key (e.g., `user:alice`, `document:doc-1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub key: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    pub fn user(key: impl Into<String>) -> Self {
        Self::new(USER_ENTITY_TYPE, key)
    }

    pub fn document(key: impl Into<String>) -> Self {
        Self::new(DOCUMENT_ENTITY_TYPE, key)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.key)
    }
}

/// A stored (subject, relation, target) fact granting access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub subject: EntityRef,
    pub relation: Relation,
    pub target: EntityRef,
}

impl Assignment {
    /// Creates an assignment of `relation` for a user on a document.
    pub fn user_on_document(
        user_id: impl Into<String>,
        relation: Relation,
        document_id: impl Into<String>,
    ) -> Self {
        Self {
            subject: EntityRef::user(user_id),
            relation,
            target: EntityRef::document(document_id),
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.target, self.relation, self.subject)
    }
}

/// The caller's bearer credential, forwarded on relationship mutations.
///
/// The token is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Parses an `Authorization` header value, stripping the `Bearer ` prefix.
    pub fn from_authorization_header(value: &str) -> Option<Self> {
        let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// A short prefix of the token, safe for logs.
    pub fn preview(&self) -> String {
        let prefix: String = self.0.chars().take(8).collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_allows_every_action() {
        for action in Action::ALL {
            assert!(Relation::Owner.allows(action), "owner should allow {action}");
        }
    }

    #[test]
    fn test_editor_allows_read_and_write_only() {
        assert!(Relation::Editor.allows(Action::Read));
        assert!(Relation::Editor.allows(Action::Write));
        assert!(!Relation::Editor.allows(Action::Delete));
        assert!(!Relation::Editor.allows(Action::Share));
    }

    #[test]
    fn test_viewer_allows_read_only() {
        assert_eq!(Relation::Viewer.allowed_actions(), &[Action::Read]);
    }

    #[test]
    fn test_relations_allow_is_union() {
        assert!(relations_allow(
            &[Relation::Viewer, Relation::Owner],
            Action::Delete
        ));
        assert!(!relations_allow(&[Relation::Viewer], Action::Write));
        assert!(!relations_allow(&[], Action::Read));
    }

    #[test]
    fn test_action_parse_rejects_unknown() {
        assert_eq!("share".parse::<Action>().unwrap(), Action::Share);
        let err = "publish".parse::<Action>().unwrap_err();
        assert!(matches!(err, DomainError::UnknownAction { .. }));
        // Parsing is case sensitive, matching the wire names
        assert!("Read".parse::<Action>().is_err());
    }

    #[test]
    fn test_parse_share_rejects_owner() {
        assert_eq!(Relation::parse_share("viewer").unwrap(), Relation::Viewer);
        assert_eq!(Relation::parse_share("editor").unwrap(), Relation::Editor);
        assert!(matches!(
            Relation::parse_share("owner"),
            Err(DomainError::InvalidSharePermission { .. })
        ));
    }

    #[test]
    fn test_guards_map_to_actions() {
        assert_eq!(Action::for_guard(Guard::Owner), Action::Delete);
        assert_eq!(Action::for_guard(Guard::Reader), Action::Read);
        assert_eq!(Action::for_guard(Guard::Editor), Action::Write);
        assert_eq!(Action::for_guard(Guard::Sharer), Action::Share);
    }

    #[test]
    fn test_assignment_display() {
        let a = Assignment::user_on_document("alice", Relation::Owner, "doc-1");
        assert_eq!(a.to_string(), "document:doc-1#owner@user:alice");
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let cred = Credential::new("eyJhbGciOiJSUzI1NiJ9.secret");
        let debug = format!("{cred:?}");
        assert!(!debug.contains("secret"));
        assert_eq!(cred.preview(), "eyJhbGci...");
    }

    #[test]
    fn test_credential_from_authorization_header() {
        let cred = Credential::from_authorization_header("Bearer abc").unwrap();
        assert_eq!(cred.expose(), "abc");
        assert!(Credential::from_authorization_header("Bearer ").is_none());
        assert!(Credential::from_authorization_header("").is_none());
    }
}
