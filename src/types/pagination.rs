//! Pagination parameters for list queries.

use std::collections::HashMap;

use serde::Deserialize;

/// First page when none is requested.
pub const DEFAULT_PAGE_NUMBER: u64 = 1;
/// Page size when none is requested.
pub const DEFAULT_PAGE_SIZE: u64 = 20;
/// Hard cap on the page size a caller may request.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Pagination query parameters (reusable across all list queries)
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    DEFAULT_PAGE_NUMBER
}

fn default_per_page() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl PaginationParams {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }

    /// Parse from string-keyed request parameters, e.g. a decoded query
    /// string. Missing, malformed, or out-of-range values fall back to the
    /// defaults.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let page = params
            .get("page")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(DEFAULT_PAGE_NUMBER);
        let per_page = params
            .get("per_page")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self { page, per_page }
    }

    /// Calculate offset for database query
    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1)) * self.limit()
    }

    /// Get limit capped at maximum
    pub fn limit(&self) -> u64 {
        self.per_page.min(MAX_PAGE_SIZE)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE_NUMBER,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn from_params_parses_page_and_per_page() {
        let p = PaginationParams::from_params(&params(&[("page", "3"), ("per_page", "2")]));
        assert_eq!(p.page, 3);
        assert_eq!(p.per_page, 2);
        assert_eq!(p.offset(), 4);
    }

    #[test]
    fn from_params_falls_back_on_garbage() {
        let p = PaginationParams::from_params(&params(&[("page", "zero"), ("per_page", "0")]));
        assert_eq!(p.page, DEFAULT_PAGE_NUMBER);
        assert_eq!(p.per_page, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn limit_is_capped() {
        let p = PaginationParams::new(1, 10_000);
        assert_eq!(p.limit(), MAX_PAGE_SIZE);
    }
}
