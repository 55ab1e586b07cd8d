pub mod admin;
pub mod auth;
pub mod chats;
pub mod items;
pub mod listings;
pub mod notifications;
pub mod trades;
pub mod users;

use axum::Router;
use std::sync::Arc;

use crate::database::DbPool;
use crate::services::trade_chat::TradeChatService;
use crate::utils::jwt::JwtService;
use crate::websocket::connection::ConnectionManager;
use crate::websocket::publisher::Broadcaster;

pub struct AppState {
    pub db: DbPool,
    pub jwt_service: Arc<JwtService>,
    pub ws_manager: Arc<ConnectionManager>,
    pub events: Broadcaster,
    pub chats: TradeChatService,
}

impl AppState {
    /// Wires the websocket hub in as the realtime publisher for every service.
    pub fn new(db: DbPool, jwt_service: Arc<JwtService>) -> Self {
        let ws_manager = Arc::new(ConnectionManager::new());
        let events = Broadcaster::new(ws_manager.clone());
        let chats = TradeChatService::new(db.clone(), events.clone());

        Self {
            db,
            jwt_service,
            ws_manager,
            events,
            chats,
        }
    }
}

pub fn routes(state: Arc<AppState>) -> Router {
    let ws_route = Router::new()
        .route(
            "/ws",
            axum::routing::get(crate::websocket::handlers::ws_handler),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .nest("/chats", chats::routes(state.clone()))
        .nest("/trades", trades::routes(state.clone()))
        .nest("/notifications", notifications::routes(state.clone()))
        .nest("/users", users::routes(state.clone()))
        .nest("/admin", admin::routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    Router::new()
        .merge(ws_route)
        .nest("/auth", auth::routes(state.clone()))
        .nest("/items", items::routes(state.clone()))
        .nest("/listings", listings::routes(state.clone()))
        .merge(protected_routes)
}
