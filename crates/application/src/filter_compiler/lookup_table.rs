use super::*;

const NUMERIC_LOOKUPS: &[LookupOperator] = &[
    LookupOperator::Exact,
    LookupOperator::In,
    LookupOperator::Gt,
    LookupOperator::Gte,
    LookupOperator::Lt,
    LookupOperator::Lte,
];

const TEMPORAL_PART_LOOKUPS: &[LookupOperator] = &[
    LookupOperator::Year,
    LookupOperator::Month,
    LookupOperator::Day,
];

const TEXT_LOOKUPS: &[LookupOperator] = &[
    LookupOperator::Exact,
    LookupOperator::In,
    LookupOperator::IContains,
    LookupOperator::IStartsWith,
    LookupOperator::IEndsWith,
];

const IDENTIFIER_LOOKUPS: &[LookupOperator] = &[
    LookupOperator::Exact,
    LookupOperator::In,
    LookupOperator::IsNull,
];

/// Lookup operators allowed per field type and for relation keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    by_type: BTreeMap<FieldType, BTreeSet<LookupOperator>>,
    relation_key: BTreeSet<LookupOperator>,
}

impl LookupTable {
    /// Creates a table that allows nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_type: BTreeMap::new(),
            relation_key: BTreeSet::new(),
        }
    }

    /// Replaces the lookups allowed for one field type.
    #[must_use]
    pub fn with_lookups(
        mut self,
        field_type: FieldType,
        lookups: impl IntoIterator<Item = LookupOperator>,
    ) -> Self {
        self.by_type
            .insert(field_type, lookups.into_iter().collect());
        self
    }

    /// Replaces the lookups allowed on a relation's primary key.
    #[must_use]
    pub fn with_relation_key_lookups(
        mut self,
        lookups: impl IntoIterator<Item = LookupOperator>,
    ) -> Self {
        self.relation_key = lookups.into_iter().collect();
        self
    }

    /// Returns whether `lookup` may be applied to an attribute of `field_type`.
    #[must_use]
    pub fn allows(&self, field_type: FieldType, lookup: LookupOperator) -> bool {
        self.by_type
            .get(&field_type)
            .is_some_and(|lookups| lookups.contains(&lookup))
    }

    /// Returns whether `lookup` may be applied to a relation's primary key.
    #[must_use]
    pub fn allows_relation_key(&self, lookup: LookupOperator) -> bool {
        self.relation_key.contains(&lookup)
    }
}

impl Default for LookupTable {
    fn default() -> Self {
        let temporal = NUMERIC_LOOKUPS
            .iter()
            .chain(TEMPORAL_PART_LOOKUPS)
            .copied()
            .collect::<Vec<_>>();

        Self::empty()
            .with_lookups(FieldType::Integer, NUMERIC_LOOKUPS.iter().copied())
            .with_lookups(FieldType::Decimal, NUMERIC_LOOKUPS.iter().copied())
            .with_lookups(FieldType::Float, NUMERIC_LOOKUPS.iter().copied())
            .with_lookups(FieldType::Date, temporal.clone())
            .with_lookups(FieldType::DateTime, temporal)
            .with_lookups(FieldType::Boolean, [LookupOperator::Exact])
            .with_lookups(FieldType::Text, TEXT_LOOKUPS.iter().copied())
            .with_lookups(FieldType::Uuid, IDENTIFIER_LOOKUPS.iter().copied())
            .with_lookups(
                FieldType::File,
                [LookupOperator::Exact, LookupOperator::IsNull],
            )
            .with_lookups(
                FieldType::IpAddress,
                [LookupOperator::Exact, LookupOperator::IStartsWith],
            )
            .with_relation_key_lookups(IDENTIFIER_LOOKUPS.iter().copied())
    }
}
