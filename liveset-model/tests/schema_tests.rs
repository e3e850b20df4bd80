use liveset_model::{EntitySchema, FieldType, RelationKind, SchemaRegistry};

fn blog_registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(
            EntitySchema::new("user")
                .text("name")
                .text("email")
                .has_many("posts", "post", "author_id")
                .has_one("profile", "profile", "user_id"),
        )
        .with(
            EntitySchema::new("post")
                .text("title")
                .number("views")
                .bool("published")
                .datetime("created_at")
                .json("meta")
                .number("author_id")
                .belongs_to("author", "user", "author_id"),
        )
}

// ── EntitySchema ─────────────────────────────────────────────────

#[test]
fn new_schema_has_id_field() {
    let s = EntitySchema::new("user");
    assert_eq!(s.fields.len(), 1);
    assert_eq!(s.field_def("id").unwrap().field_type, FieldType::Id);
}

#[test]
fn shorthand_builders_set_types() {
    let registry = blog_registry();
    let post = registry.get("post").unwrap();
    assert_eq!(post.field_def("title").unwrap().field_type, FieldType::Text);
    assert_eq!(post.field_def("views").unwrap().field_type, FieldType::Number);
    assert_eq!(post.field_def("published").unwrap().field_type, FieldType::Bool);
    assert_eq!(post.field_def("created_at").unwrap().field_type, FieldType::DateTime);
    assert_eq!(post.field_def("meta").unwrap().field_type, FieldType::Json);
}

#[test]
fn relations_are_registered() {
    let registry = blog_registry();
    let user = registry.get("user").unwrap();

    let posts = user.relation("posts").unwrap();
    assert_eq!(posts.target, "post");
    assert!(posts.kind.is_collection());
    assert_eq!(posts.kind.foreign_key(), "author_id");

    let profile = user.relation("profile").unwrap();
    assert!(!profile.kind.is_collection());

    let author = registry.get("post").unwrap().relation("author").unwrap();
    assert_eq!(
        author.kind,
        RelationKind::BelongsTo {
            foreign_key: "author_id".into()
        }
    );
}

#[test]
fn has_key_covers_fields_and_relations() {
    let registry = blog_registry();
    let user = registry.get("user").unwrap();
    assert!(user.has_key("name"));
    assert!(user.has_key("posts"));
    assert!(!user.has_key("password"));
}

#[test]
fn relation_kind_serializes_tagged() {
    let kind = RelationKind::HasMany {
        foreign_key: "author_id".into(),
    };
    let json = serde_json::to_value(&kind).unwrap();
    assert_eq!(json["kind"], "has_many");
    assert_eq!(json["foreign_key"], "author_id");
}

// ── SchemaRegistry ───────────────────────────────────────────────

#[test]
fn registry_require_unknown_type_fails() {
    let registry = blog_registry();
    assert!(registry.require("user").is_ok());
    assert!(registry.require("comment").is_err());
}

#[test]
fn registry_register_replaces() {
    let mut registry = blog_registry();
    registry.register(EntitySchema::new("user"));
    assert!(!registry.get("user").unwrap().has_key("name"));
    assert!(registry.contains("post"));
    assert_eq!(registry.entity_types().count(), 2);
}
