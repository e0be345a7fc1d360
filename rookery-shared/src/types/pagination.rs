use serde::{Deserialize, Serialize};

pub const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl PaginationParams {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }

    /// Page numbers start at 1; page 0 is treated as page 1.
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    /// Saturates instead of overflowing on absurd page numbers.
    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: 20 }
    }
}

/// Window into a list query, in the units the store works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub fn all() -> Self {
        Self { limit: i64::MAX, offset: 0 }
    }
}

impl From<&PaginationParams> for PageRequest {
    fn from(params: &PaginationParams) -> Self {
        Self {
            limit: params.limit() as i64,
            offset: i64::try_from(params.offset()).unwrap_or(i64::MAX),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        let per_page = params.limit();
        Self {
            items,
            total,
            page: params.page(),
            per_page,
            total_pages: total.div_ceil(per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_and_cap() {
        let params = PaginationParams::new(3, 500);
        assert_eq!(params.limit(), MAX_PER_PAGE);
        assert_eq!(params.offset(), 200);

        let first = PaginationParams::new(0, 10);
        assert_eq!(first.page(), 1);
        assert_eq!(first.offset(), 0);
    }

    #[test]
    fn huge_page_saturates() {
        let params = PaginationParams::new(u64::MAX, 20);
        assert_eq!(params.offset(), u64::MAX);

        let request = PageRequest::from(&params);
        assert_eq!(request.offset, i64::MAX);
        assert_eq!(request.limit, 20);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PaginationParams::new(1, 20);
        let page = Paginated::new(vec![1, 2, 3], 41, &params);
        assert_eq!(page.total_pages, 3);

        let empty: Paginated<i32> = Paginated::new(vec![], 0, &params);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn query_string_defaults() {
        let params: PaginationParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 20);
        assert_eq!(PageRequest::from(&params), PageRequest { limit: 20, offset: 0 });
    }
}
