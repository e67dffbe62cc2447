use std::fmt::{Display, Formatter};
use std::str::FromStr;

use fieldgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Delimiter between relation-traversal segments of a field path.
pub const PATH_DELIMITER: char = '.';

/// Which declared field set a request is shaped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// List view.
    Summary,
    /// Single-record view, also used for writes.
    Detail,
}

impl ViewMode {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Detail => "detail",
        }
    }
}

/// Dot-delimited path to a (possibly nested) value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parses a dotted path, rejecting empty segments.
    pub fn parse(value: &str) -> AppResult<Self> {
        let segments: Vec<String> = value
            .split(PATH_DELIMITER)
            .map(|segment| segment.trim().to_owned())
            .collect();

        if segments.iter().any(String::is_empty) {
            return Err(AppError::Validation(format!(
                "field path '{value}' contains an empty segment"
            )));
        }

        Ok(Self { segments })
    }

    /// Builds a path from already validated segments.
    pub fn from_segments(segments: Vec<String>) -> AppResult<Self> {
        if segments.is_empty() || segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(AppError::Validation(
                "field path requires at least one non-empty segment".to_owned(),
            ));
        }

        Ok(Self { segments })
    }

    /// Returns the path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the first segment.
    #[must_use]
    pub fn head(&self) -> &str {
        self.segments[0].as_str()
    }

    /// Returns the last segment.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.segments[self.segments.len() - 1].as_str()
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns whether the path traverses at least one relation.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    /// Returns the path without its first segment, if any remains.
    #[must_use]
    pub fn tail(&self) -> Option<Self> {
        self.is_nested().then(|| Self {
            segments: self.segments[1..].to_vec(),
        })
    }

    /// Returns every strict prefix, shortest first.
    #[must_use]
    pub fn strict_prefixes(&self) -> Vec<Self> {
        (1..self.segments.len())
            .map(|length| Self {
                segments: self.segments[..length].to_vec(),
            })
            .collect()
    }

    /// Returns whether `self` is a strict prefix of `other`.
    #[must_use]
    pub fn is_strict_prefix_of(&self, other: &Self) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments.starts_with(self.segments.as_slice())
    }
}

impl FromStr for FieldPath {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value.as_str())
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.to_string()
    }
}

impl Display for FieldPath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                write!(formatter, "{PATH_DELIMITER}")?;
            }
            formatter.write_str(segment)?;
        }

        Ok(())
    }
}

/// Declared field paths for the summary and detail views of one entity.
///
/// A missing list means "every declared attribute and relation".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFieldSpec {
    summary: Option<Vec<FieldPath>>,
    detail: Option<Vec<FieldPath>>,
}

impl EntityFieldSpec {
    /// Creates a spec with separate summary and detail lists.
    #[must_use]
    pub fn new(summary: Option<Vec<FieldPath>>, detail: Option<Vec<FieldPath>>) -> Self {
        Self { summary, detail }
    }

    /// Creates a spec that uses one list for both views.
    #[must_use]
    pub fn uniform(paths: Vec<FieldPath>) -> Self {
        Self {
            summary: Some(paths.clone()),
            detail: Some(paths),
        }
    }

    /// Returns the declared list for a view mode, if configured.
    #[must_use]
    pub fn paths_for(&self, mode: ViewMode) -> Option<&[FieldPath]> {
        match mode {
            ViewMode::Summary => self.summary.as_deref(),
            ViewMode::Detail => self.detail.as_deref(),
        }
    }

    /// Returns every declared path across both views.
    pub fn all_paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.summary
            .iter()
            .flatten()
            .chain(self.detail.iter().flatten())
    }
}

/// Ordered, deduplicated, ancestor-closed set of visible field paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibleFieldSet {
    paths: Vec<FieldPath>,
}

impl VisibleFieldSet {
    /// Builds the closed set from authorized paths.
    ///
    /// Missing ancestors are inserted immediately before their first
    /// dependent descendant and duplicates keep their first position.
    #[must_use]
    pub fn close_over_ancestors(authorized: &[FieldPath]) -> Self {
        let mut paths: Vec<FieldPath> = Vec::with_capacity(authorized.len());

        for path in authorized {
            for prefix in path.strict_prefixes() {
                if !paths.contains(&prefix) {
                    paths.push(prefix);
                }
            }

            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }

        Self { paths }
    }

    /// Returns the visible paths in output order.
    #[must_use]
    pub fn paths(&self) -> &[FieldPath] {
        &self.paths
    }

    /// Returns whether no field is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Returns whether a path is visible.
    #[must_use]
    pub fn contains(&self, path: &FieldPath) -> bool {
        self.paths.contains(path)
    }
}
