use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::database::DbPool;
use crate::models::item::{CreateItemRequest, Item, Rarity};
use crate::utils::error::{AppError, AppResult, is_unique_violation};
use crate::utils::validation::{MAX_DESCRIPTION_LENGTH, validate_text_field};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Validated limit/offset pair shared by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> AppResult<Self> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let offset = offset.unwrap_or(0);

        if limit < 1 {
            return Err(AppError::Validation("limit must be positive".to_string()));
        }
        if offset < 0 {
            return Err(AppError::Validation(
                "offset cannot be negative".to_string(),
            ));
        }

        Ok(Self {
            limit: limit.min(MAX_PAGE_SIZE),
            offset,
        })
    }

    pub fn push_to(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" LIMIT ");
        builder.push_bind(self.limit);
        builder.push(" OFFSET ");
        builder.push_bind(self.offset);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemQuery {
    pub category: Option<String>,
    pub rarity: Option<Rarity>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub rarity: Option<Rarity>,
    pub name_contains: Option<String>,
    pub page: Page,
}

impl TryFrom<ItemQuery> for ItemFilter {
    type Error = AppError;

    fn try_from(query: ItemQuery) -> AppResult<Self> {
        let non_empty = |s: Option<String>| {
            s.map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            category: non_empty(query.category).map(|c| c.to_lowercase()),
            rarity: query.rarity,
            name_contains: non_empty(query.q),
            page: Page::new(query.limit, query.offset)?,
        })
    }
}

pub async fn list_items(pool: &DbPool, filter: &ItemFilter) -> AppResult<Vec<Item>> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM items WHERE 1 = 1");

    if let Some(category) = &filter.category {
        builder.push(" AND category = ");
        builder.push_bind(category.clone());
    }
    if let Some(rarity) = filter.rarity {
        builder.push(" AND rarity = ");
        builder.push_bind(rarity.as_str());
    }
    if let Some(name) = &filter.name_contains {
        builder.push(" AND name LIKE ");
        builder.push_bind(format!("%{}%", name));
    }

    builder.push(" ORDER BY name ASC");
    filter.page.push_to(&mut builder);

    let items = builder
        .build_query_as::<Item>()
        .fetch_all(pool.as_ref())
        .await?;

    Ok(items)
}

pub async fn get_item(pool: &DbPool, item_id: &str) -> AppResult<Item> {
    sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = ?")
        .bind(item_id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
}

pub async fn create_item(pool: &DbPool, request: CreateItemRequest) -> AppResult<Item> {
    validate_text_field("Item name", &request.name, 100)?;
    validate_text_field("Category", &request.category, 50)?;
    if let Some(description) = &request.description {
        validate_text_field("Description", description, MAX_DESCRIPTION_LENGTH)?;
    }

    let item = Item::new(request);

    sqlx::query(
        "INSERT INTO items (id, name, category, rarity, description, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&item.id)
    .bind(&item.name)
    .bind(&item.category)
    .bind(&item.rarity)
    .bind(&item.description)
    .bind(&item.created_at)
    .execute(pool.as_ref())
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("An item named '{}' already exists", item.name))
        } else {
            AppError::Database(e)
        }
    })?;

    tracing::info!(item_id = %item.id, "Added catalog item {}", item.name);

    Ok(item)
}
