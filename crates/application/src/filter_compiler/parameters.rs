use super::*;

/// Suffix that forces list semantics on a parameter key.
pub const ARRAY_MARKER: &str = "[]";

/// Separator splitting one string value into several.
pub const VALUE_SEPARATOR: char = ',';

/// Raw request parameters from the two transport sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParameters {
    /// Decoded query-string pairs in transport order.
    pub query: Vec<(String, String)>,
    /// Structured body parameters, when present.
    pub body: Option<Map<String, Value>>,
}

/// Normalized parameters keyed in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedParameters {
    entries: Vec<(String, Vec<String>)>,
}

impl MergedParameters {
    /// Returns the distinct values of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, values)| values.as_slice())
    }

    /// Returns the first value of a key.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns whether a key was supplied at all.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates keys and values in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no key was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn append(&mut self, raw_key: &str, raw_values: impl IntoIterator<Item = String>) {
        let key = normalize_key(raw_key);
        let position = match self.entries.iter().position(|(candidate, _)| *candidate == key) {
            Some(position) => position,
            None => {
                self.entries.push((key.to_owned(), Vec::new()));
                self.entries.len() - 1
            }
        };

        let values = &mut self.entries[position].1;
        for raw_value in raw_values {
            for value in split_value(raw_value.as_str()) {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
    }
}

impl RequestParameters {
    /// Creates parameters from query-string pairs only.
    #[must_use]
    pub fn from_query(query: Vec<(String, String)>) -> Self {
        Self { query, body: None }
    }

    /// Merges both sources without touching the originals.
    #[must_use]
    pub fn merged(&self) -> MergedParameters {
        merge_parameters(&self.query, self.body.as_ref())
    }
}

/// Merges query-string pairs and body parameters into one normalized map.
///
/// Query values come first. Body values for a key already present are
/// appended when not yet seen. `key` and `key[]` land in the same entry.
#[must_use]
pub fn merge_parameters(
    query: &[(String, String)],
    body: Option<&Map<String, Value>>,
) -> MergedParameters {
    let mut merged = MergedParameters::default();

    for (key, value) in query {
        merged.append(key, std::iter::once(value.clone()));
    }

    if let Some(body) = body {
        for (key, value) in body {
            merged.append(key, body_values(value));
        }
    }

    merged
}

fn normalize_key(raw_key: &str) -> &str {
    let key = raw_key.trim();
    key.strip_suffix(ARRAY_MARKER).unwrap_or(key).trim_end()
}

fn split_value(raw_value: &str) -> Vec<String> {
    raw_value
        .split(VALUE_SEPARATOR)
        .map(|part| {
            let part = part.trim();
            part.strip_prefix('"')
                .and_then(|inner| inner.strip_suffix('"'))
                .unwrap_or(part)
                .trim()
                .to_owned()
        })
        .filter(|part| !part.is_empty())
        .collect()
}

fn body_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
