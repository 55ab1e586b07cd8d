use once_cell::sync::Lazy;
use regex::Regex;

use crate::services::profanity::contains_profanity;
use crate::utils::error::{AppError, AppResult};

pub const MAX_MESSAGE_LENGTH: usize = 4000;
pub const MAX_PRICE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_COMMENT_LENGTH: usize = 500;

static EMBARK_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\- ]{2,32}#[0-9]{4}$").expect("valid embark id regex"));

fn is_printable_ascii(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii() && !c.is_ascii_control())
}

pub fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() {
        return Err(AppError::Validation("Username cannot be empty".to_string()));
    }

    if username.len() < 3 || username.len() > 32 {
        return Err(AppError::Validation(
            "Username must be between 3 and 32 characters long".to_string(),
        ));
    }

    if !is_printable_ascii(username) || username.contains(' ') {
        return Err(AppError::Validation(
            "Username must contain only printable ASCII characters without spaces".to_string(),
        ));
    }

    if contains_profanity(username) {
        return Err(AppError::Validation(
            "Username contains inappropriate language".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be at most 128 characters long".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_embark_id(embark_id: &str) -> AppResult<()> {
    if !EMBARK_ID.is_match(embark_id) {
        return Err(AppError::Validation(
            "Embark ID must look like Name#1234".to_string(),
        ));
    }

    Ok(())
}

/// Returns the trimmed content that gets stored.
pub fn validate_message_content(content: &str) -> AppResult<&str> {
    let trimmed = content.trim();

    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "Message content cannot be empty".to_string(),
        ));
    }

    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::Validation(format!(
            "Message content must be at most {} characters long",
            MAX_MESSAGE_LENGTH
        )));
    }

    Ok(trimmed)
}

pub fn validate_text_field(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", field)));
    }

    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters long",
            field, max
        )));
    }

    Ok(())
}

pub fn validate_score(score: i64) -> AppResult<()> {
    if !(1..=5).contains(&score) {
        return Err(AppError::Validation(
            "Score must be between 1 and 5".to_string(),
        ));
    }

    Ok(())
}
