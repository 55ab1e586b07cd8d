#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use arc_exchange::api::AppState;
use arc_exchange::config::Config;
use arc_exchange::database::{DbPool, create_memory_pool};
use arc_exchange::middleware::auth::AuthUser;
use arc_exchange::models::item::{CreateItemRequest, Item, Rarity};
use arc_exchange::models::listing::{CreateListingRequest, ListingKind, ListingView};
use arc_exchange::server::route_builder::build_router;
use arc_exchange::services::auth::{RegisterRequest, register_user};
use arc_exchange::services::catalog::create_item;
use arc_exchange::services::listing::create_listing;
use arc_exchange::services::trade_chat::TradeChatService;
use arc_exchange::utils::helpers::new_id;
use arc_exchange::utils::jwt::JwtService;
use arc_exchange::websocket::events::ServerMessage;
use arc_exchange::websocket::publisher::{Broadcaster, EventPublisher};

pub const TEST_SECRET: &str = "test-secret-key";

/// Captures every emitted event instead of delivering it.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(String, ServerMessage)>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<(String, ServerMessage)> {
        self.events.lock().unwrap().clone()
    }

    pub fn in_room(&self, room: &str) -> Vec<ServerMessage> {
        self.events()
            .into_iter()
            .filter(|(r, _)| r == room)
            .map(|(_, message)| message)
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventPublisher for RecordingPublisher {
    fn emit_to_room(&self, room: &str, message: ServerMessage) {
        self.events.lock().unwrap().push((room.to_string(), message));
    }
}

/// Service-level fixture: in-memory database plus a chat service whose
/// realtime events are recorded.
pub struct TestContext {
    pub db: DbPool,
    pub jwt: Arc<JwtService>,
    pub recorder: Arc<RecordingPublisher>,
    pub events: Broadcaster,
    pub chats: TradeChatService,
}

impl TestContext {
    pub async fn new() -> Self {
        let db = create_memory_pool().await.unwrap();
        let jwt = Arc::new(JwtService::new(TEST_SECRET, 1));
        let recorder = Arc::new(RecordingPublisher::default());
        let events = Broadcaster::new(recorder.clone());
        let chats = TradeChatService::new(db.clone(), events.clone());

        Self {
            db,
            jwt,
            recorder,
            events,
            chats,
        }
    }

    pub async fn user(&self, username: &str, embark_id: Option<&str>) -> AuthUser {
        register(&self.db, &self.jwt, username, embark_id).await.0
    }

    /// A SELL listing owned by `owner` for a freshly added item.
    pub async fn listing(&self, owner: &AuthUser) -> ListingView {
        let item = seed_item(&self.db, &format!("Item {}", &new_id()[..8])).await;
        seed_listing(&self.db, owner, &item.id).await
    }
}

pub async fn register(
    db: &DbPool,
    jwt: &JwtService,
    username: &str,
    embark_id: Option<&str>,
) -> (AuthUser, String) {
    let response = register_user(
        db,
        RegisterRequest {
            username: username.to_string(),
            password: "correct-horse".to_string(),
            embark_id: embark_id.map(str::to_string),
        },
        jwt,
    )
    .await
    .unwrap();

    let user = AuthUser {
        id: response.user.id,
        username: response.user.username,
        role: response.user.role,
    };
    (user, response.token)
}

pub async fn seed_item(db: &DbPool, name: &str) -> Item {
    create_item(
        db,
        CreateItemRequest {
            name: name.to_string(),
            category: "weapon".to_string(),
            rarity: Rarity::Rare,
            description: None,
        },
    )
    .await
    .unwrap()
}

pub async fn seed_listing(db: &DbPool, owner: &AuthUser, item_id: &str) -> ListingView {
    create_listing(
        db,
        owner,
        CreateListingRequest {
            item_id: item_id.to_string(),
            kind: ListingKind::Sell,
            quantity: 1,
            price: "3x Rusted Gear".to_string(),
            description: Some("Fresh from the Blue Gate".to_string()),
        },
    )
    .await
    .unwrap()
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        secret_key: TEST_SECRET.to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        frontend_url: "http://127.0.0.1:9".to_string(),
        max_body_bytes: 64 * 1024,
        token_ttl_days: 1,
    }
}

/// HTTP fixture: the production router over an in-memory database.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = test_config();
        let db = create_memory_pool().await.unwrap();
        let jwt = Arc::new(JwtService::new(&config.secret_key, config.token_ttl_days));
        let state = Arc::new(AppState::new(db, jwt));
        let router = build_router(state.clone(), &config).unwrap();
        Self { router, state }
    }

    /// Registers a user and returns it with a bearer token.
    pub async fn user(&self, username: &str, embark_id: Option<&str>) -> (AuthUser, String) {
        register(&self.state.db, &self.state.jwt_service, username, embark_id).await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let response = self.request(Method::GET, uri, token, None).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let response = self.request(Method::POST, uri, token, Some(body)).await;
        let status = response.status();
        (status, body_json(response).await)
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
