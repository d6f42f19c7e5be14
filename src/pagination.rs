use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub pages: u64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u64, per_page: u64, total: u64) -> Self {
        let pages = total.div_ceil(per_page.max(1));
        Self {
            items,
            page,
            per_page,
            total,
            pages,
            has_prev: page > 1,
            has_next: page < pages,
        }
    }
}

/// Validates a 1-based page number and returns the row offset. Offsets
/// that do not fit a Postgres BIGINT are treated as past the end.
pub fn offset_for(page: i64, per_page: u64) -> Result<u64, AppError> {
    if page < 1 {
        return Err(AppError::NotFound("page"));
    }
    i64::try_from(per_page)
        .ok()
        .and_then(|per_page| (page - 1).checked_mul(per_page))
        .map(|offset| offset as u64)
        .ok_or(AppError::NotFound("page"))
}

/// Pages past the end are missing, except page 1 of an empty listing.
pub fn ensure_in_range<T>(page: &Page<T>) -> Result<(), AppError> {
    if page.page > 1 && page.page > page.pages {
        return Err(AppError::NotFound("page"));
    }
    Ok(())
}
