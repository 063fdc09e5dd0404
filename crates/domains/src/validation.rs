//! # Input Rules
//!
//! Field-level checks shared by every caller of the engine. Derive-based
//! rules live on the models; the helpers here cover charsets and the
//! standalone strings (aliases, renames) that have no struct of their own.

use std::borrow::Cow;
use std::collections::HashSet;

use validator::{Validate, ValidationError};

use crate::error::Result;
use crate::models::{Column, NewBoard};

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn column_id(value: &str) -> std::result::Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Ok(())
    } else {
        Err(invalid("column_id", "column id may only contain letters, digits, '_' and '-'"))
    }
}

pub fn hex_color(value: &str) -> std::result::Result<(), ValidationError> {
    let digits = value.strip_prefix('#').unwrap_or(value);
    if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(invalid("hex_color", "color must be six hex digits"))
    }
}

pub fn unique_column_ids(columns: &[Column]) -> std::result::Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(columns.len());
    if columns.iter().all(|c| seen.insert(c.id.as_str())) {
        Ok(())
    } else {
        Err(invalid("unique_column_ids", "column ids must be unique within a board"))
    }
}

pub fn alias_charset(value: &str) -> std::result::Result<(), ValidationError> {
    if value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.'))
    {
        Ok(())
    } else {
        Err(invalid("alias", "alias contains unsupported characters"))
    }
}

#[derive(Validate)]
struct AliasInput<'a> {
    #[validate(length(min = 1, max = 50), custom(function = "alias_charset"))]
    alias: &'a str,
}

#[derive(Validate)]
struct BoardNameInput<'a> {
    #[validate(length(min = 1, max = 200))]
    name: &'a str,
}

#[derive(Validate)]
struct ColumnNameInput<'a> {
    #[validate(length(min = 1, max = 100))]
    name: &'a str,
}

pub fn validate_new_board(board: &NewBoard) -> Result<()> {
    board.validate()?;
    Ok(())
}

pub fn validate_alias(alias: &str) -> Result<()> {
    AliasInput { alias }.validate()?;
    Ok(())
}

pub fn validate_board_name(name: &str) -> Result<()> {
    BoardNameInput { name }.validate()?;
    Ok(())
}

pub fn validate_column_name(name: &str) -> Result<()> {
    ColumnNameInput { name }.validate()?;
    Ok(())
}
