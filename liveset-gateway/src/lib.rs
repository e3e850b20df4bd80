//! HTTP and WebSocket API for liveset.
//!
//! Routes:
//! - `GET /api/v1/health`: connection and subscription counts
//! - `GET /api/v1/live`: WebSocket carrying live query subscriptions
//! - `PUT /api/v1/{entity}`: upsert a row
//! - `PATCH /api/v1/{entity}/{id}`: merge fields into a row
//! - `DELETE /api/v1/{entity}/{id}`: delete a row
//!
//! Writes go through the repositories, so every live subscriber sees them.

pub mod collection;
pub mod demo;
pub mod protocol;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, patch, put};
use axum::Router;
use collection::{Collection, Collections};
use futures::{SinkExt, StreamExt};
use liveset_live::{ConnectionHandle, SubscriptionRegistry};
use liveset_repository::RepoError;
use liveset_types::{ChannelId, ConnectionId, SubscriptionId};
use protocol::{ClientMessage, SOCKET_QUEUE_CAPACITY, ServerMessage, SocketSink};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Shared state of every route.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SubscriptionRegistry>,
    pub collections: Arc<Collections>,
}

impl AppState {
    pub fn new(registry: Arc<SubscriptionRegistry>, collections: Collections) -> Self {
        Self {
            registry,
            collections: Arc::new(collections),
        }
    }

    fn collection(&self, entity_type: &str) -> Result<&Arc<dyn Collection>, ApiError> {
        self.collections.get(entity_type).ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                format!("unknown entity type: {entity_type}"),
            )
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub connections: usize,
    pub subscriptions: usize,
}

/// An error answered as `{"code": .., "message": ..}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<RepoError> for ApiError {
    fn from(error: RepoError) -> Self {
        let status = match &error {
            RepoError::NotFound { .. } => StatusCode::NOT_FOUND,
            RepoError::Model(_) | RepoError::Serialization(_) => StatusCode::BAD_REQUEST,
            RepoError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RepoError::Live(e) => {
                StatusCode::from_u16(e.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            RepoError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({"code": self.status.as_u16(), "message": self.message});
        (self.status, Json(body)).into_response()
    }
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/live", get(live_handler))
        .route("/api/v1/{entity}", put(upsert_handler))
        .route(
            "/api/v1/{entity}/{id}",
            patch(update_handler).delete(delete_handler),
        )
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        connections: state.registry.connection_count().await,
        subscriptions: state.registry.subscription_count().await,
    })
}

async fn upsert_handler(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Json(row): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let saved = state.collection(&entity)?.upsert(row).await?;
    Ok(Json(saved))
}

async fn update_handler(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let saved = state
        .collection(&entity)?
        .update(&id, patch)
        .await?;
    Ok(Json(saved))
}

async fn delete_handler(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state.collection(&entity)?.delete(&id).await?;
    Ok(Json(json!({"deleted": deleted})))
}

async fn live_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

/// Runs one WebSocket connection until the client goes away, then drops its
/// subscriptions.
async fn serve_socket(socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(SOCKET_QUEUE_CAPACITY);
    let connection = ConnectionHandle::new(ConnectionId::new(), Arc::new(SocketSink(tx.clone())));
    state.registry.on_connect(&connection).await;
    info!("Live connection {} opened", connection.id());

    let (mut sender, mut receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode server message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        let reply = match message {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(request) => dispatch(&state, &connection, request).await,
                Err(e) => ServerMessage::error(None, 400, format!("invalid message: {e}")),
            },
            Message::Close(_) => break,
            _ => continue,
        };
        if tx.send(reply).await.is_err() {
            break;
        }
    }

    let dropped = state.registry.on_disconnect(connection.id()).await;
    writer.abort();
    info!(
        "Live connection {} closed ({} subscriptions dropped)",
        connection.id(),
        dropped
    );
}

/// Serves one client message for `connection` and returns the reply.
pub async fn dispatch(
    state: &AppState,
    connection: &ConnectionHandle,
    message: ClientMessage,
) -> ServerMessage {
    debug!("Connection {} sent {:?}", connection.id(), message);
    match message {
        ClientMessage::SubscribeOne {
            entity,
            channel,
            id,
            spec,
        } => {
            let result = match state.collection(&entity) {
                Ok(c) => c
                    .subscribe_one(connection, channel.clone(), id, &spec)
                    .await
                    .map_err(ApiError::from),
                Err(e) => Err(e),
            };
            subscribed(channel, result)
        }
        ClientMessage::SubscribeMany {
            entity,
            channel,
            ids,
            spec,
        } => {
            let result = match state.collection(&entity) {
                Ok(c) => c
                    .subscribe_many(connection, channel.clone(), ids, &spec)
                    .await
                    .map_err(ApiError::from),
                Err(e) => Err(e),
            };
            subscribed(channel, result)
        }
        ClientMessage::SubscribeQuery {
            entity,
            channel,
            spec,
            options,
        } => {
            let result = match state.collection(&entity) {
                Ok(c) => c
                    .subscribe_query(connection, channel.clone(), &spec, options)
                    .await
                    .map_err(ApiError::from),
                Err(e) => Err(e),
            };
            subscribed(channel, result)
        }
        ClientMessage::Unsubscribe { channel } => {
            let removed = state.registry.unsubscribe(connection.id(), &channel).await;
            ServerMessage::Unsubscribed { channel, removed }
        }
    }
}

fn subscribed(channel: ChannelId, result: Result<SubscriptionId, ApiError>) -> ServerMessage {
    match result {
        Ok(subscription) => ServerMessage::Subscribed {
            channel,
            subscription,
        },
        Err(e) => ServerMessage::error(Some(channel), e.status.as_u16(), e.message),
    }
}
