//! Page-number pagination shared by every list endpoint.

use serde::Serialize;

/// A validated page request.
///
/// Out-of-range input is clamped rather than rejected: `page` falls within
/// `[1, i64::MAX / max_limit]` and `limit` within `[1, max_limit]`, so the
/// row offset always fits a signed 64-bit column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    /// Page size.
    pub limit: u64,
}

impl PageRequest {
    /// Build a page request from raw query values.
    #[must_use]
    pub fn clamped(page: Option<i64>, limit: Option<i64>, default_limit: u64, max_limit: u64) -> Self {
        let max_limit = max_limit.clamp(1, i64::MAX as u64);
        let max_page = i64::MAX as u64 / max_limit;
        let page = page.map_or(1, |p| p.max(1) as u64).min(max_page);
        let limit = limit.map_or(default_limit, |l| l.max(1) as u64).clamp(1, max_limit);
        Self { page, limit }
    }

    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Zero-based page index, as sea-orm paginators expect.
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.page.saturating_sub(1)
    }
}

/// A page of results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Assemble a page from its items and the total match count.
    #[must_use]
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            page: request.page,
            page_size: request.limit,
            total_pages: total_count.div_ceil(request.limit),
        }
    }

    /// An empty page, used when the caller's visibility excludes every row.
    #[must_use]
    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), 0, request)
    }

    /// Convert every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_out_of_range_values() {
        let req = PageRequest::clamped(Some(0), Some(500), 10, 100);
        assert_eq!(req, PageRequest { page: 1, limit: 100 });

        let req = PageRequest::clamped(Some(-3), Some(-1), 10, 100);
        assert_eq!(req, PageRequest { page: 1, limit: 1 });

        let req = PageRequest::clamped(None, None, 10, 100);
        assert_eq!(req, PageRequest { page: 1, limit: 10 });
    }

    #[test]
    fn test_offset() {
        let req = PageRequest::clamped(Some(3), Some(20), 10, 100);
        assert_eq!(req.offset(), 40);
        assert_eq!(req.index(), 2);
    }

    #[test]
    fn test_huge_page_is_capped() {
        let req = PageRequest::clamped(Some(i64::MAX), Some(100), 10, 100);
        assert_eq!(req.page, i64::MAX as u64 / 100);
        assert!(req.offset() <= i64::MAX as u64);

        let req = PageRequest::clamped(Some(i64::MAX), Some(1), 10, 100);
        assert!(req.offset() < i64::MAX as u64);
    }

    #[test]
    fn test_total_pages() {
        let req = PageRequest::clamped(Some(1), Some(10), 10, 100);
        let page = Page::new(vec![1, 2, 3], 21, req);
        assert_eq!(page.total_pages, 3);

        let empty: Page<i32> = Page::empty(req);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.items.is_empty());
    }
}
