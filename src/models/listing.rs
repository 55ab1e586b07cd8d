use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::item::ItemSummary;
use crate::utils::helpers::{new_id, now_timestamp};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Listing {
    pub id: String,
    pub owner_id: String,
    pub item_id: String,
    pub kind: String,
    pub quantity: i64,
    pub price: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListingKind {
    Sell,
    Buy,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::Sell => "SELL",
            ListingKind::Buy => "BUY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListingStatus {
    Active,
    Closed,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "ACTIVE",
            ListingStatus::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(ListingStatus::Active),
            "CLOSED" => Some(ListingStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateListingRequest {
    pub item_id: String,
    pub kind: ListingKind,
    pub quantity: i64,
    pub price: String,
    pub description: Option<String>,
}

impl Listing {
    pub fn new(
        owner_id: String,
        item_id: String,
        kind: ListingKind,
        quantity: i64,
        price: String,
        description: Option<String>,
    ) -> Self {
        let now = now_timestamp();
        Self {
            id: new_id(),
            owner_id,
            item_id,
            kind: kind.as_str().to_string(),
            quantity,
            price,
            description,
            status: ListingStatus::Active.as_str().to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        ListingStatus::parse(&self.status) == Some(ListingStatus::Active)
    }
}

/// Listing joined with its item and owner name, one flat row per listing.
#[derive(Debug, Clone, FromRow)]
pub struct ListingRow {
    pub id: String,
    pub owner_id: String,
    pub owner_username: String,
    pub kind: String,
    pub quantity: i64,
    pub price: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub item_id: String,
    pub item_name: String,
    pub item_category: String,
    pub item_rarity: String,
}

/// Column list matching [`ListingRow`]; expects `listings l`, `items i`, `users u`.
pub const LISTING_ROW_COLUMNS: &str = "l.id, l.owner_id, u.username AS owner_username, l.kind, l.quantity, \
     l.price, l.description, l.status, l.created_at, l.updated_at, \
     i.id AS item_id, i.name AS item_name, i.category AS item_category, i.rarity AS item_rarity";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingView {
    pub id: String,
    pub owner_id: String,
    pub owner_username: String,
    pub kind: String,
    pub quantity: i64,
    pub price: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub item: ItemSummary,
}

impl From<ListingRow> for ListingView {
    fn from(row: ListingRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            owner_username: row.owner_username,
            kind: row.kind,
            quantity: row.quantity,
            price: row.price,
            description: row.description,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            item: ItemSummary {
                id: row.item_id,
                name: row.item_name,
                category: row.item_category,
                rarity: row.item_rarity,
            },
        }
    }
}
