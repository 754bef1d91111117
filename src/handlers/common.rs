use crate::errors::ApiError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Pagination parameters for list and search operations
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number (default 1)
    pub page: Option<i64>,
    /// Page size (default from configuration)
    #[serde(rename = "perPage")]
    pub per_page: Option<i64>,
}

/// Resolved, validated pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub per_page: u64,
}

impl PaginationParams {
    /// Applies defaults and rejects non-positive values.
    pub fn resolve(&self, default_per_page: u64) -> Result<PageWindow, ApiError> {
        let page = positive(self.page, 1, "page")?;
        let per_page = positive(self.per_page, default_per_page, "perPage")?;
        Ok(PageWindow { page, per_page })
    }
}

fn positive(value: Option<i64>, default: u64, name: &str) -> Result<u64, ApiError> {
    match value {
        None => Ok(default),
        Some(v) if v >= 1 => Ok(v as u64),
        Some(_) => Err(ApiError::BadRequest(format!(
            "{name} must be a positive integer"
        ))),
    }
}

impl PageWindow {
    /// Zero-based offset of the first record, `None` when it cannot be
    /// represented. SQL `OFFSET` is bound as a signed 64-bit integer.
    pub fn offset(&self) -> Option<u64> {
        (self.page - 1)
            .checked_mul(self.per_page)
            .filter(|offset| i64::try_from(*offset).is_ok())
    }
}

/// Number of pages needed for `count` records, 0 when there are none.
pub fn total_pages(count: u64, per_page: u64) -> u64 {
    if count % per_page != 0 {
        count / per_page + 1
    } else {
        count / per_page
    }
}

/// Paginated response envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductPage<T> {
    pub total_pages: u64,
    pub page: u64,
    #[serde(rename = "perPage")]
    pub per_page: u64,
    pub products: Vec<T>,
}

impl<T> ProductPage<T> {
    pub fn new(products: Vec<T>, window: PageWindow, total: u64) -> Self {
        Self {
            total_pages: total_pages(total, window.per_page),
            page: window.page,
            per_page: window.per_page,
            products,
        }
    }
}

pub fn normalize_string(value: String) -> String {
    value.trim().to_string()
}

pub fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .and_then(|v| if v.is_empty() { None } else { Some(v) })
}

/// Malformed JSON bodies become 400 `{msg}`
pub fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

/// Malformed query strings become 400 `{msg}`
pub fn query_rejection(rejection: QueryRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}
