//! Demo schema served by the gateway binary: users and their posts, kept in
//! memory.

use crate::AppState;
use crate::collection::Collections;
use liveset_live::{LiveConfig, SubscriptionRegistry};
use liveset_model::{Entity, EntitySchema, SchemaRegistry};
use liveset_repository::Repository;
use liveset_storage::{MemoryStore, StorageResult};
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
        EntitySchema::new(Self::ENTITY_TYPE)
            .text("name")
            .text("email")
            .has_many("posts", Post::ENTITY_TYPE, "author_id")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    #[serde(default)]
    pub body: String,
}

impl Entity for Post {
    type Id = i64;
    const ENTITY_TYPE: &'static str = "post";

    fn id(&self) -> i64 {
        self.id
    }

    fn schema() -> EntitySchema {
        EntitySchema::new(Self::ENTITY_TYPE)
            .text("title")
            .text("body")
            .number("author_id")
            .belongs_to("author", User::ENTITY_TYPE, "author_id")
    }
}

/// A gateway over an empty in-memory store with the demo schema.
pub fn demo_state(config: LiveConfig) -> (AppState, Arc<MemoryStore>) {
    let schemas = Arc::new(
        SchemaRegistry::new()
            .with_entity::<User>()
            .with_entity::<Post>(),
    );
    let store = Arc::new(MemoryStore::new(Arc::clone(&schemas)));
    let registry = Arc::new(SubscriptionRegistry::new(config));

    let users: Repository<User> =
        Repository::new(store.clone(), Arc::clone(&registry), Arc::clone(&schemas));
    let posts: Repository<Post> = Repository::new(store.clone(), Arc::clone(&registry), schemas);
    let collections = Collections::new()
        .with(Arc::new(users))
        .with(Arc::new(posts));

    (AppState::new(registry, collections), store)
}

/// Adds a couple of users and posts so a fresh gateway has something to show.
pub async fn seed(store: &MemoryStore) -> StorageResult<()> {
    store
        .seed(
            User::ENTITY_TYPE,
            vec![
                json!({"id": 1, "name": "Ada", "email": "ada@example.com"}),
                json!({"id": 2, "name": "Linus", "email": null}),
            ],
        )
        .await?;
    store
        .seed(
            Post::ENTITY_TYPE,
            vec![
                json!({"id": 1, "title": "Notes on the engine", "author_id": 1, "body": ""}),
                json!({"id": 2, "title": "Release plan", "author_id": 2, "body": ""}),
            ],
        )
        .await
}
