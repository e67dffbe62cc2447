use std::str::FromStr;

use fieldgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::FieldPath;

/// Lookup operator applied by a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOperator {
    /// Equality, or membership when several values are supplied.
    Exact,
    /// Explicit membership in the value set.
    In,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Calendar year of a temporal value.
    Year,
    /// Calendar month of a temporal value.
    Month,
    /// Day of month of a temporal value.
    Day,
    /// Case-insensitive substring match.
    IContains,
    /// Case-insensitive prefix match.
    IStartsWith,
    /// Case-insensitive suffix match.
    IEndsWith,
    /// Null check; values are `true` or `false`.
    IsNull,
}

impl LookupOperator {
    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::In => "in",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::IContains => "icontains",
            Self::IStartsWith => "istartswith",
            Self::IEndsWith => "iendswith",
            Self::IsNull => "isnull",
        }
    }

    /// Parses a transport value into a lookup operator.
    pub fn parse_transport(value: &str) -> AppResult<Self> {
        Self::from_str(value)
    }
}

impl FromStr for LookupOperator {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "exact" => Ok(Self::Exact),
            "in" => Ok(Self::In),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "year" => Ok(Self::Year),
            "month" => Ok(Self::Month),
            "day" => Ok(Self::Day),
            "icontains" => Ok(Self::IContains),
            "istartswith" => Ok(Self::IStartsWith),
            "iendswith" => Ok(Self::IEndsWith),
            "isnull" => Ok(Self::IsNull),
            _ => Err(AppError::Validation(format!(
                "unknown lookup operator '{value}'"
            ))),
        }
    }
}

/// How several values of one clause combine against a to-many relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    /// At least one value must be satisfied.
    #[default]
    Any,
    /// Every value must be satisfied by some related row.
    All,
}

impl Combinator {
    /// Parses the `_cond` wire value (`AND`/`OR`, case-insensitive).
    ///
    /// Unrecognized values yield `None`; callers default to [`Combinator::Any`].
    #[must_use]
    pub fn parse_transport(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AND" => Some(Self::All),
            "OR" => Some(Self::Any),
            _ => None,
        }
    }

    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "OR",
            Self::All => "AND",
        }
    }
}

/// Compiled filter predicate handed to the storage engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterClause {
    path: FieldPath,
    lookup: LookupOperator,
    values: Vec<String>,
    combinator: Combinator,
}

impl FilterClause {
    /// Creates a clause, deduplicating values and rejecting an empty set.
    pub fn new(
        path: FieldPath,
        lookup: LookupOperator,
        values: Vec<String>,
        combinator: Combinator,
    ) -> AppResult<Self> {
        let mut distinct: Vec<String> = Vec::with_capacity(values.len());
        for value in values {
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }

        if distinct.is_empty() {
            return Err(AppError::Validation(format!(
                "filter clause for '{path}' requires at least one value"
            )));
        }

        Ok(Self {
            path,
            lookup,
            values: distinct,
            combinator,
        })
    }

    /// Returns the filtered field path.
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Returns the lookup operator.
    #[must_use]
    pub fn lookup(&self) -> LookupOperator {
        self.lookup
    }

    /// Returns the distinct values in first-seen order.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Returns the value combinator.
    #[must_use]
    pub fn combinator(&self) -> Combinator {
        self.combinator
    }
}

/// Sort direction of an ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Ordering directive for the primary rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingKey {
    /// Attribute to order by.
    pub field: FieldPath,
    /// Sort direction.
    pub direction: SortDirection,
}

/// Case-insensitive free-text search across text attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchClause {
    /// Search terms; every term must match at least one field.
    pub terms: Vec<String>,
    /// Attributes searched.
    pub fields: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{Combinator, FilterClause, LookupOperator};
    use crate::FieldPath;

    #[test]
    fn combinator_parses_case_insensitively() {
        assert_eq!(Combinator::parse_transport("and"), Some(Combinator::All));
        assert_eq!(Combinator::parse_transport(" Or "), Some(Combinator::Any));
        assert_eq!(Combinator::parse_transport("xor"), None);
    }

    #[test]
    fn clause_rejects_empty_value_set() {
        let path = FieldPath::parse("title").unwrap_or_else(|_| unreachable!());
        let result = FilterClause::new(path, LookupOperator::Exact, Vec::new(), Combinator::Any);
        assert!(result.is_err());
    }

    #[test]
    fn clause_deduplicates_values() {
        let path = FieldPath::parse("tags.name").unwrap_or_else(|_| unreachable!());
        let clause = FilterClause::new(
            path,
            LookupOperator::Exact,
            vec!["a".to_owned(), "b".to_owned(), "a".to_owned()],
            Combinator::All,
        )
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(clause.values(), ["a", "b"]);
    }
}
