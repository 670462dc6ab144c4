use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// `?page=&page_size=` as sent by clients. Both are optional.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// A normalized, 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// Page 1 always exists, even when empty. Any later page must start
    /// inside the result set.
    pub fn is_within(&self, count: u64) -> bool {
        self.page == 1 || self.offset() < count
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        Self::new(params.page, params.page_size)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: u64, request: PageRequest) -> Self {
        let seen = request.offset() + results.len() as u64;
        Self {
            count,
            next: if seen < count { request.page.checked_add(1) } else { None },
            previous: (request.page > 1).then_some(request.page - 1),
            results,
        }
    }

    /// Slices an already filtered and ordered collection.
    pub fn from_all(all: Vec<T>, request: PageRequest) -> Self {
        let count = all.len() as u64;
        let results = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.page_size as usize)
            .collect();
        Self::new(results, count, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        assert_eq!(PageRequest::default(), PageRequest { page: 1, page_size: 10 });
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, page_size: 1 });
        assert_eq!(PageRequest::new(Some(3), Some(500)).page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_last_possible_page_has_no_next_link() {
        let request = PageRequest::new(Some(u32::MAX), None);
        let page = Page::from_all(vec![1, 2, 3], request);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(u32::MAX - 1));
        assert!(page.results.is_empty());
        assert!(!request.is_within(page.count));
    }

    #[test]
    fn test_page_links() {
        let items: Vec<u32> = (0..25).collect();

        let first = Page::from_all(items.clone(), PageRequest::new(Some(1), None));
        assert_eq!(first.results.len(), 10);
        assert_eq!(first.next, Some(2));
        assert_eq!(first.previous, None);

        let last = Page::from_all(items, PageRequest::new(Some(3), None));
        assert_eq!(last.results, vec![20, 21, 22, 23, 24]);
        assert_eq!(last.next, None);
        assert_eq!(last.previous, Some(2));
        assert_eq!(last.count, 25);
    }

    #[test]
    fn test_is_within() {
        assert!(PageRequest::new(Some(1), None).is_within(0));
        assert!(PageRequest::new(Some(3), None).is_within(21));
        assert!(!PageRequest::new(Some(3), None).is_within(20));
    }
}
