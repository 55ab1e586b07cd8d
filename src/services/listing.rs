use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::database::DbPool;
use crate::middleware::auth::AuthUser;
use crate::models::listing::{
    CreateListingRequest, LISTING_ROW_COLUMNS, Listing, ListingKind, ListingRow, ListingStatus,
    ListingView,
};
use crate::services::catalog::{Page, get_item};
use crate::services::profanity::filter_profanity;
use crate::utils::error::{AppError, AppResult};
use crate::utils::helpers::now_timestamp;
use crate::utils::validation::{MAX_DESCRIPTION_LENGTH, MAX_PRICE_LENGTH, validate_text_field};

const MAX_QUANTITY: i64 = 9999;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    pub item_id: Option<String>,
    pub kind: Option<ListingKind>,
    pub status: Option<ListingStatus>,
    pub owner_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Validated marketplace feed filter. Status defaults to ACTIVE.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingFilter {
    pub item_id: Option<String>,
    pub kind: Option<ListingKind>,
    pub status: ListingStatus,
    pub owner_id: Option<String>,
    pub page: Page,
}

impl TryFrom<ListingQuery> for ListingFilter {
    type Error = AppError;

    fn try_from(query: ListingQuery) -> AppResult<Self> {
        Ok(Self {
            item_id: query.item_id.filter(|id| !id.trim().is_empty()),
            kind: query.kind,
            status: query.status.unwrap_or(ListingStatus::Active),
            owner_id: query.owner_id.filter(|id| !id.trim().is_empty()),
            page: Page::new(query.limit, query.offset)?,
        })
    }
}

fn listing_select() -> String {
    format!(
        "SELECT {} FROM listings l
         JOIN items i ON l.item_id = i.id
         JOIN users u ON l.owner_id = u.id",
        LISTING_ROW_COLUMNS
    )
}

pub async fn create_listing(
    pool: &DbPool,
    owner: &AuthUser,
    request: CreateListingRequest,
) -> AppResult<ListingView> {
    if !(1..=MAX_QUANTITY).contains(&request.quantity) {
        return Err(AppError::Validation(format!(
            "Quantity must be between 1 and {}",
            MAX_QUANTITY
        )));
    }
    validate_text_field("Price", &request.price, MAX_PRICE_LENGTH)?;

    let description = match request.description.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            validate_text_field("Description", text, MAX_DESCRIPTION_LENGTH)?;
            let (filtered, censored) = filter_profanity(text);
            if censored {
                tracing::debug!(owner_id = %owner.id, "Censored listing description");
            }
            Some(filtered)
        }
        _ => None,
    };

    let item = get_item(pool, &request.item_id).await?;
    let (price, _) = filter_profanity(request.price.trim());

    let listing = Listing::new(
        owner.id.clone(),
        item.id,
        request.kind,
        request.quantity,
        price,
        description,
    );

    sqlx::query(
        "INSERT INTO listings (id, owner_id, item_id, kind, quantity, price, description, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&listing.id)
    .bind(&listing.owner_id)
    .bind(&listing.item_id)
    .bind(&listing.kind)
    .bind(listing.quantity)
    .bind(&listing.price)
    .bind(&listing.description)
    .bind(&listing.status)
    .bind(&listing.created_at)
    .bind(&listing.updated_at)
    .execute(pool.as_ref())
    .await?;

    tracing::info!(listing_id = %listing.id, owner_id = %owner.id, "Created listing");

    get_listing(pool, &listing.id).await
}

pub async fn find_listing(pool: &DbPool, listing_id: &str) -> AppResult<Listing> {
    sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = ?")
        .bind(listing_id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))
}

pub async fn get_listing(pool: &DbPool, listing_id: &str) -> AppResult<ListingView> {
    let row = sqlx::query_as::<_, ListingRow>(&format!("{} WHERE l.id = ?", listing_select()))
        .bind(listing_id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

    Ok(ListingView::from(row))
}

pub async fn list_listings(pool: &DbPool, filter: &ListingFilter) -> AppResult<Vec<ListingView>> {
    let mut builder = QueryBuilder::<Sqlite>::new(listing_select());

    builder.push(" WHERE l.status = ");
    builder.push_bind(filter.status.as_str());

    if let Some(item_id) = &filter.item_id {
        builder.push(" AND l.item_id = ");
        builder.push_bind(item_id.clone());
    }
    if let Some(kind) = filter.kind {
        builder.push(" AND l.kind = ");
        builder.push_bind(kind.as_str());
    }
    if let Some(owner_id) = &filter.owner_id {
        builder.push(" AND l.owner_id = ");
        builder.push_bind(owner_id.clone());
    }

    builder.push(" ORDER BY l.created_at DESC");
    filter.page.push_to(&mut builder);

    let rows = builder
        .build_query_as::<ListingRow>()
        .fetch_all(pool.as_ref())
        .await?;

    Ok(rows.into_iter().map(ListingView::from).collect())
}

/// Closes a listing to new chats. Existing negotiations are left untouched.
pub async fn close_listing(
    pool: &DbPool,
    requester: &AuthUser,
    listing_id: &str,
) -> AppResult<ListingView> {
    let listing = find_listing(pool, listing_id).await?;

    if listing.owner_id != requester.id && !requester.is_admin() {
        return Err(AppError::Forbidden(
            "Only the owner can close this listing".to_string(),
        ));
    }

    sqlx::query("UPDATE listings SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(ListingStatus::Closed.as_str())
        .bind(now_timestamp())
        .bind(listing_id)
        .bind(ListingStatus::Active.as_str())
        .execute(pool.as_ref())
        .await?;

    get_listing(pool, listing_id).await
}
