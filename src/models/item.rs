use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::helpers::{new_id, now_timestamp};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub category: String,
    pub rarity: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub category: String,
    pub rarity: Rarity,
    pub description: Option<String>,
}

impl Item {
    pub fn new(request: CreateItemRequest) -> Self {
        Self {
            id: new_id(),
            name: request.name.trim().to_string(),
            category: request.category.trim().to_lowercase(),
            rarity: request.rarity.as_str().to_string(),
            description: request.description,
            created_at: now_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ItemSummary {
    pub id: String,
    pub name: String,
    pub category: String,
    pub rarity: String,
}
