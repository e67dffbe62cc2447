use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use fieldgate_core::{AppError, AppResult, RoleProvider};
use fieldgate_domain::{FieldPath, PermissionAction, PermissionToken, RoleDefinition};

use crate::EntityMetadataProvider;

/// Process-wide role to permission table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleTable {
    roles: BTreeMap<String, Vec<PermissionToken>>,
}

impl RoleTable {
    /// Builds the table, rejecting duplicate role names.
    pub fn new(roles: Vec<RoleDefinition>) -> AppResult<Self> {
        let mut table = BTreeMap::new();

        for role in roles {
            let name = role.name().to_owned();
            if table
                .insert(name.clone(), role.permissions().to_vec())
                .is_some()
            {
                return Err(AppError::Configuration(format!(
                    "role '{name}' is defined more than once"
                )));
            }
        }

        Ok(Self { roles: table })
    }

    /// Returns tokens granted by one role.
    #[must_use]
    pub fn permissions_for(&self, role_name: &str) -> Option<&[PermissionToken]> {
        self.roles.get(role_name).map(Vec::as_slice)
    }

    /// Returns defined role names in sorted order.
    #[must_use]
    pub fn role_names(&self) -> Vec<&str> {
        self.roles.keys().map(String::as_str).collect()
    }

    /// Verifies that every token names a registered entity.
    pub fn ensure_entities_exist(&self, metadata: &dyn EntityMetadataProvider) -> AppResult<()> {
        for (role_name, tokens) in &self.roles {
            for token in tokens {
                if metadata.entity(token.entity()).is_none() {
                    return Err(AppError::Configuration(format!(
                        "role '{role_name}' grants '{token}' on unknown entity '{}'",
                        token.entity()
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Flattened permission tokens of one caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    tokens: BTreeSet<PermissionToken>,
}

impl PermissionSet {
    /// Creates a set from explicit tokens.
    #[must_use]
    pub fn from_tokens(tokens: impl IntoIterator<Item = PermissionToken>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Returns whether the caller holds no token at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns the flattened tokens.
    pub fn tokens(&self) -> impl Iterator<Item = &PermissionToken> {
        self.tokens.iter()
    }

    /// Returns whether `action` on `path` of `entity` is granted.
    ///
    /// Entity-wide tokens cover every path. Field-scoped tokens match the
    /// full dotted path or its leaf segment.
    #[must_use]
    pub fn grants(&self, entity: &str, action: PermissionAction, path: &FieldPath) -> bool {
        let dotted = path.to_string();

        self.tokens_for(entity, action)
            .any(|token| match token.field() {
                None => true,
                Some(field) => field == dotted || field == path.leaf(),
            })
    }

    /// Returns whether any token, entity-wide or field-scoped, grants `action`.
    #[must_use]
    pub fn allows_action(&self, entity: &str, action: PermissionAction) -> bool {
        self.tokens_for(entity, action).next().is_some()
    }

    fn tokens_for(
        &self,
        entity: &str,
        action: PermissionAction,
    ) -> impl Iterator<Item = &PermissionToken> {
        self.tokens
            .iter()
            .filter(move |token| token.entity() == entity && token.action() == action)
    }
}

/// Resolves caller roles into a flattened permission set.
#[derive(Clone)]
pub struct PermissionResolver {
    roles: Arc<RoleTable>,
}

impl PermissionResolver {
    /// Creates a resolver over the shared role table.
    #[must_use]
    pub fn new(roles: Arc<RoleTable>) -> Self {
        Self { roles }
    }

    /// Returns the union of tokens granted by every known role of the caller.
    ///
    /// Unknown role names are skipped; no known role yields an empty set.
    #[must_use]
    pub fn resolve(&self, caller: &dyn RoleProvider) -> PermissionSet {
        let mut tokens = BTreeSet::new();

        for role_name in caller.role_names() {
            match self.roles.permissions_for(role_name.as_str()) {
                Some(granted) => tokens.extend(granted.iter().cloned()),
                None => tracing::debug!(role = %role_name, "ignoring unknown role"),
            }
        }

        PermissionSet { tokens }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fieldgate_core::{AppError, CallerIdentity};
    use fieldgate_domain::{FieldPath, PermissionAction, PermissionToken, RoleDefinition};

    use super::{PermissionResolver, RoleTable};

    fn token(value: &str) -> PermissionToken {
        PermissionToken::parse(value).unwrap_or_else(|_| unreachable!())
    }

    fn path(value: &str) -> FieldPath {
        FieldPath::parse(value).unwrap_or_else(|_| unreachable!())
    }

    fn resolver() -> PermissionResolver {
        let table = RoleTable::new(vec![
            RoleDefinition::new("viewer", vec![token("book.read")])
                .unwrap_or_else(|_| unreachable!()),
            RoleDefinition::new(
                "editor",
                vec![token("book.read"), token("book.write.title")],
            )
            .unwrap_or_else(|_| unreachable!()),
            RoleDefinition::new("auditor", vec![token("book.read.title")])
                .unwrap_or_else(|_| unreachable!()),
        ])
        .unwrap_or_else(|_| unreachable!());

        PermissionResolver::new(Arc::new(table))
    }

    #[test]
    fn union_of_roles_is_deduplicated() {
        let caller = CallerIdentity::new(
            "alice",
            vec!["viewer".to_owned(), "editor".to_owned(), "viewer".to_owned()],
        );
        let permissions = resolver().resolve(&caller);

        assert_eq!(permissions.tokens().count(), 2);
        assert!(permissions.grants("book", PermissionAction::Write, &path("title")));
        assert!(!permissions.grants("book", PermissionAction::Write, &path("price")));
    }

    #[test]
    fn unknown_roles_fail_closed() {
        let caller = CallerIdentity::new("mallory", vec!["superuser".to_owned()]);
        let permissions = resolver().resolve(&caller);

        assert!(permissions.is_empty());
        assert!(!permissions.grants("book", PermissionAction::Read, &path("id")));
    }

    #[test]
    fn field_scoped_grant_matches_leaf_or_full_path() {
        let caller = CallerIdentity::new("carol", vec!["auditor".to_owned()]);
        let permissions = resolver().resolve(&caller);

        assert!(permissions.grants("book", PermissionAction::Read, &path("title")));
        assert!(!permissions.grants("book", PermissionAction::Read, &path("price")));
        assert!(permissions.allows_action("book", PermissionAction::Read));
        assert!(!permissions.allows_action("book", PermissionAction::Delete));
    }

    #[test]
    fn duplicate_role_names_are_rejected() {
        let result = RoleTable::new(vec![
            RoleDefinition::new("viewer", Vec::new()).unwrap_or_else(|_| unreachable!()),
            RoleDefinition::new("viewer", Vec::new()).unwrap_or_else(|_| unreachable!()),
        ]);

        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
