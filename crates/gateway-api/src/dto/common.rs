//! Common DTO types: the success envelope and list pagination.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// `{ "success": true, "data": ... }` - the success half of spec.md §6's
/// response envelope. [`crate::error::ErrorEnvelope`] is the failure half.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DataEnvelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    pub page: i64,
    pub limit: i64,
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: i64, limit: i64, total: Option<i64>) -> Self {
        let has_more = total.map(|t| (page * limit) < t).unwrap_or(data.len() as i64 >= limit);
        Self { data, total, page, limit, has_more }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 200))]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    50
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, limit: 50 }
    }
}

impl PaginationParams {
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit
    }

    pub fn clamped_limit(&self, max: i64) -> i64 {
        self.limit.min(max).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_offset() {
        let params = PaginationParams { page: 1, limit: 10 };
        assert_eq!(params.offset(), 0);

        let params = PaginationParams { page: 2, limit: 10 };
        assert_eq!(params.offset(), 10);

        let params = PaginationParams { page: 5, limit: 20 };
        assert_eq!(params.offset(), 80);
    }

    #[test]
    fn paginated_response_has_more() {
        let data = vec![1, 2, 3, 4, 5];
        let response = PaginatedResponse::new(data, 1, 10, Some(100));
        assert!(response.has_more);
        assert_eq!(response.total, Some(100));
    }
}
