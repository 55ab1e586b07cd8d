use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::collections::{HashMap, HashSet};
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use super::events::{ClientMessage, RoomEvent, ServerMessage, chat_room, notification_room};
use super::publisher::EventPublisher;
use crate::middleware::auth::AuthUser;
use crate::services::trade_chat::TradeChatService;

const EVENT_BUFFER: usize = 1000;

/// Fans room events out to every connected session.
///
/// All events travel over one broadcast channel; each session keeps its own
/// set of joined rooms and drops everything else.
pub struct ConnectionManager {
    /// connection id -> user id
    connections: RwLock<HashMap<String, String>>,
    broadcast_tx: broadcast::Sender<RoomEvent>,
}

/// One session's view of the event stream.
pub struct RoomSubscription {
    rx: broadcast::Receiver<RoomEvent>,
    rooms: HashSet<String>,
}

impl RoomSubscription {
    pub fn join(&mut self, room: impl Into<String>) {
        self.rooms.insert(room.into());
    }

    pub fn leave(&mut self, room: &str) -> bool {
        self.rooms.remove(room)
    }

    pub fn is_joined(&self, room: &str) -> bool {
        self.rooms.contains(room)
    }

    /// Next event for a joined room. Returns `None` once the hub is gone.
    /// Events missed while lagging are skipped; clients re-fetch state.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.rooms.contains(&event.room) => return Some(event.message),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Websocket session lagged behind, events skipped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            connections: RwLock::new(HashMap::new()),
            broadcast_tx,
        }
    }

    pub fn subscribe(&self) -> RoomSubscription {
        RoomSubscription {
            rx: self.broadcast_tx.subscribe(),
            rooms: HashSet::new(),
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_user_connected(&self, user_id: &str) -> bool {
        self.connections
            .read()
            .await
            .values()
            .any(|connected| connected == user_id)
    }

    pub async fn handle_connection(
        &self,
        socket: WebSocket,
        user: AuthUser,
        chats: TradeChatService,
    ) {
        let (mut sender, mut receiver) = socket.split();
        let mut subscription = self.subscribe();
        subscription.join(notification_room(&user.id));

        let connection_id = Uuid::new_v4().to_string();
        self.connections
            .write()
            .await
            .insert(connection_id.clone(), user.id.clone());
        let open = self.connection_count().await;
        tracing::info!(
            user_id = %user.id,
            %connection_id,
            open,
            "Websocket connected"
        );

        let connected = ServerMessage::Connected {
            user_id: user.id.clone(),
        };

        if send_frame(&mut sender, &connected).await {
            loop {
                tokio::select! {
                    incoming = receiver.next() => {
                        let reply = match incoming {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ClientMessage>(&text) {
                                    Ok(msg) => handle_client_message(msg, &user, &chats, &mut subscription).await,
                                    Err(_) => Some(ServerMessage::Error {
                                        message: "Unrecognised message".to_string(),
                                    }),
                                }
                            }
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                            Some(Ok(_)) => None,
                        };

                        if let Some(reply) = reply
                            && !send_frame(&mut sender, &reply).await
                        {
                            break;
                        }
                    }
                    event = subscription.recv() => {
                        match event {
                            Some(message) => {
                                if !send_frame(&mut sender, &message).await {
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        }

        self.connections.write().await.remove(&connection_id);
        let other_sessions = self.is_user_connected(&user.id).await;
        tracing::info!(
            user_id = %user.id,
            %connection_id,
            other_sessions,
            "Websocket disconnected"
        );
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for ConnectionManager {
    fn emit_to_room(&self, room: &str, message: ServerMessage) {
        // Err only means nobody is listening right now.
        if self
            .broadcast_tx
            .send(RoomEvent {
                room: room.to_string(),
                message,
            })
            .is_err()
        {
            tracing::trace!(room, "No websocket sessions connected");
        }
    }
}

async fn send_frame(sender: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => sender.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize websocket frame: {}", e);
            true
        }
    }
}

async fn handle_client_message(
    message: ClientMessage,
    user: &AuthUser,
    chats: &TradeChatService,
    subscription: &mut RoomSubscription,
) -> Option<ServerMessage> {
    match message {
        ClientMessage::JoinChat { chat_id } => {
            let room = chat_room(&chat_id);
            if subscription.is_joined(&room) {
                return Some(ServerMessage::Joined { room });
            }

            match chats.authorize_room(&chat_id, Some(user)).await {
                Ok(room) => {
                    subscription.join(room.clone());
                    Some(ServerMessage::Joined { room })
                }
                Err(e) => {
                    e.log();
                    Some(ServerMessage::Error {
                        message: e.public_message(),
                    })
                }
            }
        }
        ClientMessage::LeaveChat { chat_id } => {
            let room = chat_room(&chat_id);
            subscription.leave(&room);
            Some(ServerMessage::Left { room })
        }
        ClientMessage::SendMessage { chat_id, content } => {
            // The resulting new-message event reaches this session through the room.
            match chats.send_message(&chat_id, Some(user), &content).await {
                Ok(_) => None,
                Err(e) => {
                    e.log();
                    Some(ServerMessage::Error {
                        message: e.public_message(),
                    })
                }
            }
        }
        ClientMessage::Heartbeat => Some(ServerMessage::Pong),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_update(room: &str) -> ServerMessage {
        ServerMessage::Joined {
            room: room.to_string(),
        }
    }

    #[tokio::test]
    async fn subscription_only_sees_joined_rooms() {
        let manager = ConnectionManager::new();
        let mut sub = manager.subscribe();
        sub.join("chat-a");

        manager.emit_to_room("chat-b", chat_update("chat-b"));
        manager.emit_to_room("chat-a", chat_update("chat-a"));

        match sub.recv().await {
            Some(ServerMessage::Joined { room }) => assert_eq!(room, "chat-a"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn leaving_a_room_stops_delivery() {
        let manager = ConnectionManager::new();
        let mut sub = manager.subscribe();
        sub.join("chat-a");
        sub.join("notifications:u1");
        assert!(sub.leave("chat-a"));
        assert!(!sub.is_joined("chat-a"));

        manager.emit_to_room("chat-a", chat_update("chat-a"));
        manager.emit_to_room("notifications:u1", chat_update("notifications:u1"));

        match sub.recv().await {
            Some(ServerMessage::Joined { room }) => assert_eq!(room, "notifications:u1"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    async fn principal(
        db: &crate::database::DbPool,
        jwt: &crate::utils::jwt::JwtService,
        username: &str,
    ) -> AuthUser {
        let response = crate::services::auth::register_user(
            db,
            crate::services::auth::RegisterRequest {
                username: username.to_string(),
                password: "correct-horse".to_string(),
                embark_id: None,
            },
            jwt,
        )
        .await
        .unwrap();

        AuthUser {
            id: response.user.id,
            username: response.user.username,
            role: response.user.role,
        }
    }

    #[tokio::test]
    async fn join_chat_frames_admit_participants_only() {
        use crate::models::item::{CreateItemRequest, Rarity};
        use crate::models::listing::{CreateListingRequest, ListingKind};
        use crate::websocket::publisher::Broadcaster;

        let db = crate::database::create_memory_pool().await.unwrap();
        let jwt = crate::utils::jwt::JwtService::new("secret", 1);
        let owner = principal(&db, &jwt, "owner").await;
        let buyer = principal(&db, &jwt, "buyer").await;
        let stranger = principal(&db, &jwt, "stranger").await;

        let item = crate::services::catalog::create_item(
            &db,
            CreateItemRequest {
                name: "Ferro".to_string(),
                category: "weapon".to_string(),
                rarity: Rarity::Common,
                description: None,
            },
        )
        .await
        .unwrap();
        let listing = crate::services::listing::create_listing(
            &db,
            &owner,
            CreateListingRequest {
                item_id: item.id,
                kind: ListingKind::Sell,
                quantity: 1,
                price: "5x Metal Parts".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

        let chats = TradeChatService::new(db.clone(), Broadcaster::disabled());
        let (chat, _) = chats.find_or_create_chat(Some(&buyer), &listing.id).await.unwrap();
        let manager = ConnectionManager::new();

        let join = || ClientMessage::JoinChat {
            chat_id: chat.id.clone(),
        };

        let mut sub = manager.subscribe();
        let reply = handle_client_message(join(), &buyer, &chats, &mut sub).await;
        assert!(matches!(reply, Some(ServerMessage::Joined { ref room }) if *room == chat.id));
        assert!(sub.is_joined(&chat.id));

        // Joining again keeps the membership.
        let reply = handle_client_message(join(), &buyer, &chats, &mut sub).await;
        assert!(matches!(reply, Some(ServerMessage::Joined { .. })));

        let mut outsider = manager.subscribe();
        let reply = handle_client_message(join(), &stranger, &chats, &mut outsider).await;
        assert!(matches!(reply, Some(ServerMessage::Error { .. })));
        assert!(!outsider.is_joined(&chat.id));
    }

    #[test]
    fn emitting_without_sessions_is_harmless() {
        let manager = ConnectionManager::new();
        manager.emit_to_room("chat-a", ServerMessage::Pong);
    }
}
