use std::fmt::{Display, Formatter};
use std::str::FromStr;

use fieldgate_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Actions a permission token can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    /// Allows reading records or fields.
    Read,
    /// Allows creating and updating records or fields.
    Write,
    /// Allows deleting records.
    Delete,
}

impl PermissionAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for PermissionAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown permission action '{value}'"
            ))),
        }
    }
}

/// Permission token of the form `<entity>.<action>[.<field>]`.
///
/// A token without a field grants the action over every field of the entity.
/// The field part may be a dotted field path, e.g. `book.read.author.name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionToken {
    entity: NonEmptyString,
    action: PermissionAction,
    field: Option<NonEmptyString>,
}

impl PermissionToken {
    /// Creates an entity-wide token.
    pub fn entity_wide(entity: impl Into<String>, action: PermissionAction) -> AppResult<Self> {
        Ok(Self {
            entity: NonEmptyString::new(entity)?,
            action,
            field: None,
        })
    }

    /// Creates a token scoped to one field path of the entity.
    pub fn field_scoped(
        entity: impl Into<String>,
        action: PermissionAction,
        field: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            entity: NonEmptyString::new(entity)?,
            action,
            field: Some(NonEmptyString::new(field)?),
        })
    }

    /// Parses a transport value into a token.
    pub fn parse(value: &str) -> AppResult<Self> {
        Self::from_str(value)
    }

    /// Returns the entity the token applies to.
    #[must_use]
    pub fn entity(&self) -> &str {
        self.entity.as_str()
    }

    /// Returns the granted action.
    #[must_use]
    pub fn action(&self) -> PermissionAction {
        self.action
    }

    /// Returns the field refinement, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_ref().map(NonEmptyString::as_str)
    }

    /// Returns whether the token covers every field of the entity.
    #[must_use]
    pub fn is_entity_wide(&self) -> bool {
        self.field.is_none()
    }
}

impl FromStr for PermissionToken {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.trim().splitn(3, '.');
        let (Some(entity), Some(action)) = (parts.next(), parts.next()) else {
            return Err(AppError::Validation(format!(
                "permission token '{value}' must have the form '<entity>.<action>[.<field>]'"
            )));
        };

        if entity == "*" || action == "*" {
            return Err(AppError::Validation(format!(
                "permission token '{value}' uses an unsupported wildcard"
            )));
        }

        let action = PermissionAction::from_str(action)?;
        match parts.next() {
            Some(field) if field.split('.').any(|segment| segment.trim().is_empty()) => {
                Err(AppError::Validation(format!(
                    "permission token '{value}' has an empty field segment"
                )))
            }
            Some(field) => Self::field_scoped(entity, action, field),
            None => Self::entity_wide(entity, action),
        }
    }
}

impl TryFrom<String> for PermissionToken {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(value.as_str())
    }
}

impl From<PermissionToken> for String {
    fn from(value: PermissionToken) -> Self {
        value.to_string()
    }
}

impl Display for PermissionToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}.{}", self.entity, self.action.as_str())?;
        if let Some(field) = &self.field {
            write!(formatter, ".{field}")?;
        }

        Ok(())
    }
}

/// Named role and the tokens it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    name: NonEmptyString,
    permissions: Vec<PermissionToken>,
}

impl RoleDefinition {
    /// Creates a validated role definition.
    pub fn new(name: impl Into<String>, permissions: Vec<PermissionToken>) -> AppResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name)?,
            permissions,
        })
    }

    /// Returns the unique role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the tokens granted by the role.
    #[must_use]
    pub fn permissions(&self) -> &[PermissionToken] {
        &self.permissions
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{PermissionAction, PermissionToken};

    #[test]
    fn entity_wide_token_roundtrips_storage_value() {
        let token = PermissionToken::from_str("book.read").unwrap_or_else(|_| unreachable!());
        assert!(token.is_entity_wide());
        assert_eq!(token.action(), PermissionAction::Read);
        assert_eq!(token.to_string(), "book.read");
    }

    #[test]
    fn field_scoped_token_keeps_dotted_field_path() {
        let token =
            PermissionToken::from_str("book.read.author.name").unwrap_or_else(|_| unreachable!());
        assert_eq!(token.entity(), "book");
        assert_eq!(token.field(), Some("author.name"));
        assert_eq!(token.to_string(), "book.read.author.name");
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(PermissionToken::from_str("book.publish").is_err());
    }

    #[test]
    fn wildcards_are_rejected() {
        assert!(PermissionToken::from_str("*.read").is_err());
        assert!(PermissionToken::from_str("book.*").is_err());
    }

    #[test]
    fn missing_action_is_rejected() {
        assert!(PermissionToken::from_str("book").is_err());
        assert!(PermissionToken::from_str("book.read.").is_err());
    }

    #[test]
    fn tokens_deserialize_from_strings() {
        let parsed: Result<Vec<PermissionToken>, _> =
            serde_json::from_str(r#"["book.read", "book.write.title"]"#);
        let parsed = parsed.unwrap_or_else(|_| unreachable!());
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].field(), Some("title"));
    }
}
