pub mod auth;
pub mod catalog;
pub mod listing;
pub mod notification;
pub mod profanity;
pub mod trade;
pub mod trade_chat;
pub mod user;
pub mod user_moderation;
