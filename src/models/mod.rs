pub mod chat;
pub mod item;
pub mod listing;
pub mod message;
pub mod notification;
pub mod trade;
pub mod user;
