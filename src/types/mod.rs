//! Shared types.

mod pagination;

pub use pagination::{PaginationParams, DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
