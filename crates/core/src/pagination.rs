// crates/core/src/pagination.rs
//! Page request clamping and page metadata for job listings.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// A clamped page request. Construct with [`PageRequest::clamped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    page_size: i64,
}

impl PageRequest {
    /// Clamp raw inputs: `page < 1` becomes 1; a page size outside
    /// `1..=100` (or absent) falls back to the default of 10.
    pub fn clamped(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = page_size
            .filter(|s| (1..=MAX_PAGE_SIZE).contains(s))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self { page, page_size }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Row offset of the first item on this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::clamped(None, None)
    }
}

/// Page metadata returned alongside a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_page: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let size = request.page_size();
        Self {
            page: request.page(),
            page_size: size,
            total,
            total_page: (total + size - 1) / size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_out_of_range_inputs() {
        let req = PageRequest::clamped(Some(0), Some(500));
        assert_eq!(req.page(), 1);
        assert_eq!(req.page_size(), 10);

        let req = PageRequest::clamped(Some(-3), Some(0));
        assert_eq!(req.page(), 1);
        assert_eq!(req.page_size(), 10);
    }

    #[test]
    fn test_keeps_valid_inputs() {
        let req = PageRequest::clamped(Some(3), Some(100));
        assert_eq!(req.page(), 3);
        assert_eq!(req.page_size(), 100);
        assert_eq!(req.offset(), 200);

        let req = PageRequest::clamped(Some(1), Some(1));
        assert_eq!(req.offset(), 0);
        assert_eq!(req.limit(), 1);
    }

    #[test]
    fn test_defaults_when_absent() {
        assert_eq!(PageRequest::default(), PageRequest::clamped(Some(1), Some(10)));
    }

    #[test]
    fn test_total_page_is_ceiling() {
        let req = PageRequest::clamped(Some(1), Some(10));
        assert_eq!(Pagination::new(req, 0).total_page, 0);
        assert_eq!(Pagination::new(req, 1).total_page, 1);
        assert_eq!(Pagination::new(req, 10).total_page, 1);
        assert_eq!(Pagination::new(req, 11).total_page, 2);
        assert_eq!(Pagination::new(req, 95).total_page, 10);
    }
}
