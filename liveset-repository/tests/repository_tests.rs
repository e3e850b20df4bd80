//! Tests for the repository read and write paths.

mod common;

use common::{Post, User, harness, user};
use liveset_model::{EntityHooks, ModelError, QuerySpec, ValidationMode};
use liveset_repository::{QueryResult, RepoError, Repository, RepositoryConfig};
use liveset_storage::{FindOptions, FilterOp, SortDirection, StorageError};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;

fn spec(value: Value) -> QuerySpec {
    QuerySpec::from_json(value).unwrap()
}

// ── typed reads ─────────────────────────────────────────────────

#[tokio::test]
async fn find_one_or_fail_returns_entity() {
    let h = harness().await;
    let ann = h.users.find_one_or_fail(1).await.unwrap();
    assert_eq!(
        ann,
        User {
            id: 1,
            name: "ann".into(),
            email: Some("ann@example.com".into()),
        }
    );
}

#[tokio::test]
async fn find_one_or_fail_missing_is_not_found() {
    let h = harness().await;
    let err = h.users.find_one_or_fail(42).await.unwrap_err();
    match err {
        RepoError::NotFound { entity_type, id } => {
            assert_eq!(entity_type, "user");
            assert_eq!(id, "42");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn find_one_missing_is_none() {
    let h = harness().await;
    assert_eq!(h.users.find_one(42).await.unwrap(), None);
    assert_eq!(h.users.find_one(2).await.unwrap().unwrap().name, "bob");
}

#[tokio::test]
async fn find_many_keeps_request_order() {
    let h = harness().await;
    let names: Vec<String> = h
        .users
        .find_many(&[2, 42, 1])
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, vec!["bob", "ann"]);
}

#[tokio::test]
async fn find_with_filter_and_order() {
    let h = harness().await;
    let options = FindOptions::new()
        .filter("views", FilterOp::Gt, json!(2))
        .order_by("views", SortDirection::Desc);
    let titles: Vec<String> = h
        .posts
        .find(&options)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["bob's", "hello"]);
}

#[tokio::test]
async fn find_all_returns_every_row() {
    let h = harness().await;
    assert_eq!(h.posts.find_all().await.unwrap().len(), 3);
}

// ── projected reads ─────────────────────────────────────────────

#[tokio::test]
async fn projection_is_exact() {
    let h = harness().await;
    let value = h
        .users
        .find_one_or_fail_with(1, &spec(json!({"id": true, "name": true})))
        .await
        .unwrap();
    assert_eq!(value, json!({"id": 1, "name": "ann"}));
}

#[tokio::test]
async fn projection_follows_relations() {
    let h = harness().await;
    let value = h
        .posts
        .find_one_or_fail_with(10, &spec(json!({"title": true, "author": {"name": true}})))
        .await
        .unwrap();
    assert_eq!(value, json!({"title": "hello", "author": {"name": "ann"}}));
}

#[tokio::test]
async fn projection_nested_collections_and_whole_relation() {
    let h = harness().await;
    let value = h
        .users
        .find_one_or_fail_with(
            1,
            &spec(json!({
                "name": true,
                "posts": {"title": true, "author": {"name": true}},
                "profile": true
            })),
        )
        .await
        .unwrap();
    assert_eq!(
        value,
        json!({
            "name": "ann",
            "posts": [
                {"title": "hello", "author": {"name": "ann"}},
                {"title": "again", "author": {"name": "ann"}}
            ],
            "profile": {"id": 100, "user_id": 1, "bio": "hi"}
        })
    );
}

#[tokio::test]
async fn empty_spec_returns_row_without_relations() {
    let h = harness().await;
    let value = h
        .users
        .find_one_or_fail_with(2, &QuerySpec::new())
        .await
        .unwrap();
    assert_eq!(value, json!({"id": 2, "name": "bob", "email": null}));
}

#[tokio::test]
async fn find_one_with_missing_is_none() {
    let h = harness().await;
    let value = h
        .users
        .find_one_with(42, &spec(json!({"name": true})))
        .await
        .unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn find_many_with_projects_each() {
    let h = harness().await;
    let values = h
        .posts
        .find_many_with(&[12, 99, 10], &spec(json!({"title": true})))
        .await
        .unwrap();
    assert_eq!(values, vec![json!({"title": "bob's"}), json!({"title": "hello"})]);
}

#[tokio::test]
async fn find_all_with_ignores_pagination() {
    let h = harness().await;
    let values = h
        .posts
        .find_all_with(&spec(json!({"id": true, "page": 1, "limit": 1})))
        .await
        .unwrap();
    assert_eq!(values.len(), 3);
}

#[tokio::test]
async fn query_without_pagination_returns_list() {
    let h = harness().await;
    let options = FindOptions::new().eq("author_id", json!(1));
    let result = h
        .posts
        .query(&spec(json!({"title": true})), &options)
        .await
        .unwrap();
    assert!(!result.is_paginated());
    assert_eq!(
        result,
        QueryResult::List(vec![json!({"title": "hello"}), json!({"title": "again"})])
    );
}

#[tokio::test]
async fn query_with_pagination_returns_page() {
    let h = harness().await;
    let options = FindOptions::new().order_by("id", SortDirection::Asc);
    let result = h
        .posts
        .query(&spec(json!({"id": true, "page": 2, "limit": 2})), &options)
        .await
        .unwrap();

    assert!(result.is_paginated());
    assert_eq!(result.total(), 3);
    assert_eq!(result.items(), &[json!({"id": 12})]);
    assert_eq!(
        result.into_value(),
        json!({"items": [{"id": 12}], "total": 3, "page": 2, "limit": 2})
    );
}

#[tokio::test]
async fn query_page_items_are_projected_individually() {
    let h = harness().await;
    let result = h
        .posts
        .query(
            &spec(json!({"title": true, "author": {"name": true}, "limit": 1})),
            &FindOptions::new(),
        )
        .await
        .unwrap();
    match result {
        QueryResult::Page(page) => {
            assert_eq!(page.page, 1);
            assert_eq!(page.items, vec![json!({"title": "hello", "author": {"name": "ann"}})]);
        }
        other => panic!("expected a page, got {other:?}"),
    }
}

// ── validation ──────────────────────────────────────────────────

#[tokio::test]
async fn unknown_key_fails_before_store_access() {
    let h = harness().await;
    let err = h
        .users
        .find_one_or_fail_with(1, &spec(json!({"name": true, "posts": {"nope": true}})))
        .await
        .unwrap_err();

    match err {
        RepoError::Model(ModelError::SchemaMismatch { path, .. }) => {
            assert_eq!(path, "posts.nope");
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }
    assert_eq!(h.store.stats().total(), 0);
}

#[tokio::test]
async fn trusted_mode_ignores_unknown_keys() {
    let h = harness().await;
    let users = h.users.clone().with_config(RepositoryConfig {
        validation: ValidationMode::Trusted,
    });
    let value = users
        .find_one_or_fail_with(1, &spec(json!({"name": true, "secret": true})))
        .await
        .unwrap();
    assert_eq!(value, json!({"name": "ann"}));
}

// ── store failures ──────────────────────────────────────────────

#[tokio::test]
async fn read_failure_propagates() {
    let h = harness().await;
    h.store.fail_reads(true);
    let err = h.users.find_one(1).await.unwrap_err();
    assert!(matches!(err, RepoError::Storage(StorageError::Backend(_))));
}

#[tokio::test]
async fn write_failure_propagates() {
    let h = harness().await;
    h.store.fail_writes(true);
    let err = h.users.upsert(&user(5, "eve")).await.unwrap_err();
    assert!(matches!(err, RepoError::Storage(_)));
    h.store.fail_writes(false);
    assert_eq!(h.users.find_one(5).await.unwrap(), None);
}

// ── empty inputs ────────────────────────────────────────────────

#[tokio::test]
async fn empty_inputs_never_touch_the_store() {
    let h = harness().await;

    assert!(h.users.find_many(&[]).await.unwrap().is_empty());
    assert!(
        h.users
            .find_many_with(&[], &spec(json!({"name": true})))
            .await
            .unwrap()
            .is_empty()
    );
    assert!(h.users.upsert_many(&[]).await.unwrap().is_empty());
    assert!(
        h.users
            .upsert_many_with(&[], &QuerySpec::new())
            .await
            .unwrap()
            .is_empty()
    );
    assert!(h.users.delete_many(&[]).await.unwrap().is_empty());

    assert_eq!(h.store.stats().total(), 0);
}

// ── writes ──────────────────────────────────────────────────────

#[tokio::test]
async fn update_merges_patch() {
    let h = harness().await;
    let updated = h
        .users
        .update(1, json!({"name": "annie"}))
        .await
        .unwrap();
    assert_eq!(updated.name, "annie");
    assert_eq!(updated.email.as_deref(), Some("ann@example.com"));
}

#[tokio::test]
async fn update_with_projects_fresh_row() {
    let h = harness().await;
    let value = h
        .posts
        .update_with(11, json!({"views": 50}), &spec(json!({"views": true})))
        .await
        .unwrap();
    assert_eq!(value, json!({"views": 50}));
}

#[tokio::test]
async fn update_id_in_patch_is_overridden() {
    let h = harness().await;
    let updated = h
        .users
        .update(2, json!({"id": 77, "name": "robert"}))
        .await
        .unwrap();
    assert_eq!(updated.id, 2);
    assert_eq!(h.users.find_one(77).await.unwrap(), None);
}

#[tokio::test]
async fn update_rejects_non_object_patch() {
    let h = harness().await;
    let err = h.users.update(1, json!("nope")).await.unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(h.store.stats().writes, 0);
}

#[tokio::test]
async fn upsert_then_read_reflects_write() {
    let h = harness().await;
    let eve = User {
        id: 5,
        name: "eve".into(),
        email: Some("eve@example.com".into()),
    };

    let returned = h.users.upsert(&eve).await.unwrap();
    assert_eq!(returned, eve);
    assert_eq!(h.users.find_one_or_fail(5).await.unwrap(), eve);

    let renamed = User {
        name: "eva".into(),
        ..eve
    };
    h.users.upsert(&renamed).await.unwrap();
    assert_eq!(h.users.find_one_or_fail(5).await.unwrap().name, "eva");
}

#[tokio::test]
async fn upsert_with_returns_projection() {
    let h = harness().await;
    let post = Post {
        id: 13,
        title: "new".into(),
        author_id: 2,
        views: 0,
    };
    let value = h
        .posts
        .upsert_with(&post, &spec(json!({"title": true, "author": {"name": true}})))
        .await
        .unwrap();
    assert_eq!(value, json!({"title": "new", "author": {"name": "bob"}}));
}

#[tokio::test]
async fn upsert_many_writes_in_one_batch() {
    let h = harness().await;
    let saved = h
        .users
        .upsert_many(&[user(6, "fay"), user(7, "gus")])
        .await
        .unwrap();

    assert_eq!(saved.len(), 2);
    assert_eq!(h.store.stats().writes, 1);
    assert_eq!(h.store.len("user").await, 4);
}

#[tokio::test]
async fn delete_returns_id_and_removes_row() {
    let h = harness().await;
    assert_eq!(h.users.delete(2).await.unwrap(), 2);
    assert_eq!(h.users.find_one(2).await.unwrap(), None);

    // Already absent is not an error
    assert_eq!(h.users.delete(2).await.unwrap(), 2);
}

#[tokio::test]
async fn delete_many_returns_ids() {
    let h = harness().await;
    let ids = h.posts.delete_many(&[10, 12, 99]).await.unwrap();
    assert_eq!(ids, vec![10, 12, 99]);
    assert_eq!(h.store.len("post").await, 1);
}

// ── hooks ───────────────────────────────────────────────────────

struct NameRequired;

impl EntityHooks for NameRequired {
    fn validate(&self, row: &Value) -> Result<(), String> {
        match row.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => Ok(()),
            _ => Err("name is required".into()),
        }
    }
}

struct Shout;

impl EntityHooks for Shout {
    fn on_after_load(&self, row: &mut Value) {
        let loud = row
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_uppercase);
        if let (Some(loud), Some(fields)) = (loud, row.as_object_mut()) {
            fields.insert("shout".into(), Value::String(loud));
        }
    }
}

#[tokio::test]
async fn validate_hook_rejects_write() {
    let h = harness().await;
    let users: Repository<User> = h.users.clone().with_hooks(Arc::new(NameRequired));

    let err = users.upsert(&user(8, "")).await.unwrap_err();

    assert!(matches!(err, RepoError::Validation(msg) if msg == "name is required"));
    assert_eq!(h.store.stats().writes, 0);
    assert!(users.upsert(&user(8, "hal")).await.is_ok());
}

#[tokio::test]
async fn after_load_hook_runs_before_projection() {
    let h = harness().await;
    let users: Repository<User> = h.users.clone().with_hooks(Arc::new(Shout));

    let value = users
        .find_one_or_fail_with(2, &QuerySpec::new())
        .await
        .unwrap();
    assert_eq!(value["shout"], "BOB");

    let value = users
        .find_one_or_fail_with(2, &spec(json!({"name": true})))
        .await
        .unwrap();
    assert_eq!(value, json!({"name": "bob"}));
}
