use fieldgate_domain::{
    AttributeDescriptor, Cardinality, Combinator, EntityDescriptor, EntityFieldSpec, FieldType,
    LookupOperator, RelationDescriptor, SortDirection,
};
use proptest::prelude::*;
use serde_json::json;

use super::{FilterCompiler, MergedParameters, merge_parameters};
use crate::{EntityMetadataProvider, EntityRegistry, RegisteredEntity};

fn attribute(name: &str, field_type: FieldType) -> AttributeDescriptor {
    AttributeDescriptor::new(name, field_type).unwrap_or_else(|_| unreachable!())
}

fn relation(name: &str, cardinality: Cardinality, target: &str) -> RelationDescriptor {
    RelationDescriptor::new(name, cardinality, target).unwrap_or_else(|_| unreachable!())
}

fn registry() -> EntityRegistry {
    let author = EntityDescriptor::new(
        "author",
        vec![attribute("name", FieldType::Text)],
        Vec::new(),
        Vec::new(),
    )
    .unwrap_or_else(|_| unreachable!());
    let tag = EntityDescriptor::new(
        "tag",
        vec![attribute("name", FieldType::Text)],
        Vec::new(),
        Vec::new(),
    )
    .unwrap_or_else(|_| unreachable!());
    let book = EntityDescriptor::new(
        "book",
        vec![
            attribute("title", FieldType::Text),
            attribute("price", FieldType::Decimal),
            attribute("published", FieldType::Date),
            attribute("in_print", FieldType::Boolean),
            attribute("metadata", FieldType::Json),
            attribute("cover", FieldType::Binary),
        ],
        vec![
            relation("author", Cardinality::ToOne, "author"),
            relation("tags", Cardinality::ToMany, "tag"),
        ],
        vec!["title".to_owned()],
    )
    .unwrap_or_else(|_| unreachable!());

    EntityRegistry::builder()
        .register(author, EntityFieldSpec::default())
        .register(tag, EntityFieldSpec::default())
        .register(book, EntityFieldSpec::default())
        .build()
        .unwrap_or_else(|_| unreachable!())
}

fn book(registry: &EntityRegistry) -> &RegisteredEntity {
    registry.entity("book").unwrap_or_else(|| unreachable!())
}

fn query(pairs: &[(&str, &str)]) -> MergedParameters {
    let pairs: Vec<(String, String)> = pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect();
    merge_parameters(&pairs, None)
}

#[test]
fn merge_strips_array_marker_and_splits_values() {
    let merged = query(&[("tags.name[]", "fiction, \"thriller\""), ("tags.name", "fiction")]);

    assert_eq!(merged.len(), 1);
    assert_eq!(
        merged.get("tags.name"),
        Some(&["fiction".to_owned(), "thriller".to_owned()][..])
    );
}

#[test]
fn merge_deduplicates_whitespace_variants() {
    let body = json!({ "title": ["x", "x", " x "] });
    let merged = merge_parameters(&[], body.as_object());

    assert_eq!(merged.get("title"), Some(&["x".to_owned()][..]));
}

#[test]
fn merge_appends_body_values_after_query_values() {
    let pairs = vec![("price.gte".to_owned(), "10".to_owned())];
    let body = json!({
        "price.gte": [10, 12],
        "in_print": true,
        "author": null,
        "nested": { "ignored": true }
    });
    let merged = merge_parameters(&pairs, body.as_object());

    assert_eq!(
        merged.get("price.gte"),
        Some(&["10".to_owned(), "12".to_owned()][..])
    );
    assert_eq!(merged.first("in_print"), Some("true"));
    assert_eq!(merged.get("author"), Some(&[][..]));
    assert_eq!(merged.get("nested"), Some(&[][..]));
}

#[test]
fn to_many_filter_with_and_companion_compiles_to_all() {
    let registry = registry();
    let parameters = query(&[("tags.name", "fiction,thriller"), ("tags.name_cond", "AND")]);

    let clauses = FilterCompiler::default().compile(&registry, book(&registry), &parameters);

    assert_eq!(clauses.len(), 1);
    assert_eq!(clauses[0].path().to_string(), "tags.name");
    assert_eq!(clauses[0].values(), ["fiction", "thriller"]);
    assert_eq!(clauses[0].combinator(), Combinator::All);
    assert_eq!(clauses[0].lookup(), LookupOperator::Exact);
}

#[test]
fn missing_or_unknown_companion_defaults_to_any() {
    let registry = registry();
    let compiler = FilterCompiler::default();

    for parameters in [
        query(&[("tags.name", "a,b")]),
        query(&[("tags.name", "a,b"), ("tags.name_cond", "maybe")]),
        query(&[("tags.name", "a"), ("tags.name_cond", "or")]),
    ] {
        let clauses = compiler.compile(&registry, book(&registry), &parameters);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].combinator(), Combinator::Any);
    }
}

#[test]
fn all_on_to_one_path_is_overridden_to_any() {
    let registry = registry();
    let parameters = query(&[("author.name", "ann,bob"), ("author.name_cond", "AND")]);

    let clauses = FilterCompiler::default().compile(&registry, book(&registry), &parameters);

    assert_eq!(clauses.len(), 1);
    assert_eq!(clauses[0].combinator(), Combinator::Any);
}

#[test]
fn unknown_keys_and_reserved_parameters_are_discarded() {
    let registry = registry();
    let parameters = query(&[
        ("publisher.name", "acme"),
        ("page", "2"),
        ("ordering", "-price"),
        ("search", "dune"),
        ("title.length", "3"),
        ("title.frobnicate", "x"),
        ("author.name.extra", "x"),
    ]);

    let clauses = FilterCompiler::default().compile(&registry, book(&registry), &parameters);

    assert!(clauses.is_empty());
}

#[test]
fn excluded_field_types_never_compile() {
    let registry = registry();
    let parameters = query(&[("metadata", "{}"), ("cover", "abc")]);

    let compiler = FilterCompiler::default();
    assert!(compiler.compile(&registry, book(&registry), &parameters).is_empty());

    let parameters = query(&[("title", "dune")]);
    let compiler = FilterCompiler::default().with_ignored_field_types([FieldType::Text]);
    assert!(compiler.compile(&registry, book(&registry), &parameters).is_empty());
}

#[test]
fn lookups_are_checked_against_field_type() {
    let registry = registry();
    let parameters = query(&[
        ("price.gte", "10.5"),
        ("title.gte", "a"),
        ("published.year", "1965"),
        ("in_print.icontains", "t"),
    ]);

    let clauses = FilterCompiler::default().compile(&registry, book(&registry), &parameters);
    let rendered: Vec<(String, LookupOperator)> = clauses
        .iter()
        .map(|clause| (clause.path().to_string(), clause.lookup()))
        .collect();

    assert_eq!(
        rendered,
        vec![
            ("price".to_owned(), LookupOperator::Gte),
            ("published".to_owned(), LookupOperator::Year),
        ]
    );
}

#[test]
fn relation_keys_filter_on_related_primary_key() {
    let registry = registry();
    let parameters = query(&[("author", "a1,a2"), ("tags.isnull", "false")]);

    let clauses = FilterCompiler::default().compile(&registry, book(&registry), &parameters);

    assert_eq!(clauses.len(), 2);
    assert_eq!(clauses[0].path().to_string(), "author.id");
    assert_eq!(clauses[0].values(), ["a1", "a2"]);
    assert_eq!(clauses[1].path().to_string(), "tags.id");
    assert_eq!(clauses[1].lookup(), LookupOperator::IsNull);
    assert_eq!(clauses[1].values(), ["false"]);
}

#[test]
fn invalid_values_are_dropped_and_empty_clauses_discarded() {
    let registry = registry();
    let parameters = query(&[
        ("price", "cheap,12"),
        ("in_print", "perhaps"),
        ("published", "1965-13-40"),
    ]);

    let clauses = FilterCompiler::default().compile(&registry, book(&registry), &parameters);

    assert_eq!(clauses.len(), 1);
    assert_eq!(clauses[0].values(), ["12"]);
}

#[test]
fn ordering_parses_direction_and_defaults_to_primary_key() {
    let registry = registry();
    let compiler = FilterCompiler::default();

    let ordering =
        compiler.compile_ordering(book(&registry), &query(&[("ordering", "-price,title,bogus")]));
    let rendered: Vec<(String, SortDirection)> = ordering
        .iter()
        .map(|key| (key.field.to_string(), key.direction))
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("price".to_owned(), SortDirection::Desc),
            ("title".to_owned(), SortDirection::Asc),
        ]
    );

    let fallback = compiler.compile_ordering(book(&registry), &query(&[("ordering", "bogus")]));
    assert_eq!(fallback.len(), 1);
    assert_eq!(fallback[0].field.to_string(), "id");
    assert_eq!(fallback[0].direction, SortDirection::Asc);
}

#[test]
fn search_splits_terms_over_searchable_fields() {
    let registry = registry();
    let search = FilterCompiler::default()
        .compile_search(book(&registry), &query(&[("search", "Dune  Messiah")]))
        .unwrap_or_else(|| unreachable!());

    assert_eq!(search.terms, vec!["dune", "messiah"]);
    assert_eq!(search.fields, vec!["title"]);

    let author = registry.entity("author").unwrap_or_else(|| unreachable!());
    assert!(
        FilterCompiler::default()
            .compile_search(author, &query(&[("search", "ann")]))
            .is_none()
    );
}

fn parameter_pair() -> impl Strategy<Value = (String, String)> {
    let keys = prop::sample::select(vec![
        "title",
        "title.icontains",
        "price.gte",
        "tags.name",
        "tags.name_cond",
        "author.name[]",
        "author",
        "unknown",
        "page",
    ]);
    (keys, "[a-c0-9 ,\"]{0,12}").prop_map(|(key, value)| (key.to_owned(), value))
}

proptest! {
    #[test]
    fn compiling_twice_yields_identical_clauses(
        pairs in prop::collection::vec(parameter_pair(), 0..10)
    ) {
        let registry = registry();
        let compiler = FilterCompiler::default();

        let first = compiler.compile(&registry, book(&registry), &merge_parameters(&pairs, None));
        let second = compiler.compile(&registry, book(&registry), &merge_parameters(&pairs, None));

        prop_assert_eq!(first, second);
    }

    #[test]
    fn compiled_values_are_distinct_and_non_empty(
        pairs in prop::collection::vec(parameter_pair(), 0..10)
    ) {
        let registry = registry();
        let clauses = FilterCompiler::default()
            .compile(&registry, book(&registry), &merge_parameters(&pairs, None));

        for clause in clauses {
            prop_assert!(!clause.values().is_empty());
            for (index, value) in clause.values().iter().enumerate() {
                prop_assert!(!clause.values()[index + 1..].contains(value));
            }
        }
    }
}
