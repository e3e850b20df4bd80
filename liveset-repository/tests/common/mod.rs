//! Shared fixtures for repository tests.

#![allow(dead_code)]

use liveset_live::{LiveConfig, SubscriptionRegistry};
use liveset_model::{Entity, EntitySchema, SchemaRegistry, ValidationMode};
use liveset_repository::{Repository, RepositoryConfig};
use liveset_storage::MemoryStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Entity for User {
    type Id = i64;
    const ENTITY_TYPE: &'static str = "user";

    fn id(&self) -> i64 {
        self.id
    }

    fn schema() -> EntitySchema {
        EntitySchema::new("user")
            .text("name")
            .text("email")
            .has_many("posts", "post", "author_id")
            .has_one("profile", "profile", "user_id")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    #[serde(default)]
    pub views: i64,
}

impl Entity for Post {
    type Id = i64;
    const ENTITY_TYPE: &'static str = "post";

    fn id(&self) -> i64 {
        self.id
    }

    fn schema() -> EntitySchema {
        EntitySchema::new("post")
            .text("title")
            .number("author_id")
            .number("views")
            .belongs_to("author", "user", "author_id")
    }
}

pub fn user(id: i64, name: &str) -> User {
    User {
        id,
        name: name.to_string(),
        email: None,
    }
}

pub fn schemas() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::new()
            .with_entity::<User>()
            .with_entity::<Post>()
            .with(EntitySchema::new("profile").text("bio").number("user_id")),
    )
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub registry: Arc<SubscriptionRegistry>,
    pub users: Repository<User>,
    pub posts: Repository<Post>,
}

/// Two users, three posts, and a profile for ann, with strict validation.
pub async fn harness() -> Harness {
    let schemas = schemas();
    let store = Arc::new(MemoryStore::new(Arc::clone(&schemas)));
    store
        .seed(
            "user",
            vec![
                json!({"id": 1, "name": "ann", "email": "ann@example.com"}),
                json!({"id": 2, "name": "bob", "email": null}),
            ],
        )
        .await
        .unwrap();
    store
        .seed(
            "post",
            vec![
                json!({"id": 10, "title": "hello", "author_id": 1, "views": 5}),
                json!({"id": 11, "title": "again", "author_id": 1, "views": 1}),
                json!({"id": 12, "title": "bob's", "author_id": 2, "views": 9}),
            ],
        )
        .await
        .unwrap();
    store
        .seed("profile", vec![json!({"id": 100, "user_id": 1, "bio": "hi"})])
        .await
        .unwrap();

    let registry = Arc::new(SubscriptionRegistry::new(LiveConfig::default()));
    let config = RepositoryConfig {
        validation: ValidationMode::Strict,
    };
    let users = Repository::new(store.clone(), Arc::clone(&registry), Arc::clone(&schemas))
        .with_config(config);
    let posts = Repository::new(store.clone(), Arc::clone(&registry), schemas).with_config(config);

    Harness {
        store,
        registry,
        users,
        posts,
    }
}
