use liveset_model::{Pagination, QuerySpec, Selection, DEFAULT_PAGE_LIMIT};
use pretty_assertions::assert_eq;
use serde_json::json;

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parses_fields_and_relations() {
    let spec = QuerySpec::from_json(json!({
        "id": true,
        "author": { "name": true }
    }))
    .unwrap();

    assert_eq!(spec.len(), 2);
    assert_eq!(spec.get("id"), Some(&Selection::Field));
    let (name, nested) = spec.relations().next().unwrap();
    assert_eq!(name, "author");
    assert_eq!(nested.get("name"), Some(&Selection::Field));
    assert!(spec.pagination().is_none());
}

#[test]
fn builder_matches_parsed_spec() {
    let built = QuerySpec::new()
        .field("id")
        .relation("author", QuerySpec::new().field("name"));
    let parsed = QuerySpec::from_json(json!({"author": {"name": true}, "id": true})).unwrap();
    assert_eq!(built, parsed);
}

#[test]
fn false_deselects() {
    let spec = QuerySpec::from_json(json!({"id": true, "secret": false})).unwrap();
    assert_eq!(spec.scalar_fields().collect::<Vec<_>>(), vec!["id"]);
}

#[test]
fn null_is_empty_spec() {
    let spec = QuerySpec::from_json(json!(null)).unwrap();
    assert!(spec.is_empty());
}

#[test]
fn rejects_non_object_spec() {
    assert!(QuerySpec::from_json(json!([1, 2])).is_err());
    assert!(QuerySpec::from_json(json!("id")).is_err());
}

#[test]
fn rejects_non_boolean_leaf() {
    let err = QuerySpec::from_json(json!({"author": {"name": 1}})).unwrap_err();
    assert!(err.to_string().contains("author.name"));
}

// ── Pagination ───────────────────────────────────────────────────

#[test]
fn top_level_page_and_limit_are_reserved() {
    let spec = QuerySpec::from_json(json!({"id": true, "page": 2, "limit": 5})).unwrap();
    assert_eq!(spec.pagination(), Some(Pagination { page: 2, limit: 5 }));
    assert_eq!(spec.len(), 1);
}

#[test]
fn page_without_limit_uses_default() {
    let spec = QuerySpec::from_json(json!({"page": 3})).unwrap();
    assert_eq!(
        spec.pagination(),
        Some(Pagination {
            page: 3,
            limit: DEFAULT_PAGE_LIMIT
        })
    );
}

#[test]
fn page_zero_is_clamped() {
    let spec = QuerySpec::from_json(json!({"page": 0, "limit": 10})).unwrap();
    assert_eq!(spec.pagination().unwrap().page, 1);
}

#[test]
fn nested_page_is_a_field() {
    let spec = QuerySpec::from_json(json!({"book": {"page": true}})).unwrap();
    assert!(spec.pagination().is_none());
    let (_, book) = spec.relations().next().unwrap();
    assert_eq!(book.get("page"), Some(&Selection::Field));
}

#[test]
fn invalid_page_value_rejected() {
    assert!(QuerySpec::from_json(json!({"page": "two"})).is_err());
    assert!(QuerySpec::from_json(json!({"limit": -1})).is_err());
}

#[test]
fn relation_builder_drops_nested_pagination() {
    let spec = QuerySpec::new().relation("posts", QuerySpec::new().field("id").paginate(1, 5));
    let (_, posts) = spec.relations().next().unwrap();
    assert!(posts.pagination().is_none());
}

#[test]
fn pagination_offset() {
    assert_eq!(Pagination::new(1, 10).offset(), 0);
    assert_eq!(Pagination::new(3, 10).offset(), 20);
}

#[test]
fn without_pagination_keeps_selection() {
    let spec = QuerySpec::new().field("id").paginate(2, 2);
    let plain = spec.without_pagination();
    assert!(plain.pagination().is_none());
    assert_eq!(plain.len(), 1);
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn serializes_to_wire_shape() {
    let spec = QuerySpec::new()
        .field("id")
        .relation("author", QuerySpec::new().field("name"))
        .paginate(1, 10);
    assert_eq!(
        serde_json::to_value(&spec).unwrap(),
        json!({"id": true, "author": {"name": true}, "page": 1, "limit": 10})
    );
}

#[test]
fn deserializes_inside_other_types() {
    #[derive(serde::Deserialize)]
    struct Request {
        spec: QuerySpec,
    }
    let req: Request =
        serde_json::from_value(json!({"spec": {"title": true, "page": 1}})).unwrap();
    assert_eq!(req.spec.pagination().unwrap().page, 1);

    let bad: Result<Request, _> = serde_json::from_value(json!({"spec": {"title": 3}}));
    assert!(bad.is_err());
}
