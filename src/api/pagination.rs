use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_PAGE_SIZE: i64 = 20;
pub(crate) const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct PageQuery {
    #[serde(default)]
    pub(crate) page: Option<i64>,
    #[serde(default)]
    pub(crate) page_size: Option<i64>,
}

impl PageQuery {
    pub(crate) fn params(self) -> PageParams {
        PageParams::new(self.page, self.page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageParams {
    pub(crate) page: i64,
    pub(crate) page_size: i64,
}

impl PageParams {
    pub(crate) fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub(crate) fn offset(self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total: i64,
    pub(crate) page: i64,
    pub(crate) page_size: i64,
    pub(crate) total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub(crate) fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        let total_pages = if total <= 0 { 0 } else { (total + params.page_size - 1) / params.page_size };
        Self { items, total, page: params.page, page_size: params.page_size, total_pages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(PageParams::new(None, None), PageParams { page: 1, page_size: 20 });
        assert_eq!(PageParams::new(Some(0), Some(500)), PageParams { page: 1, page_size: 100 });
        assert_eq!(PageParams::new(Some(3), Some(0)).page_size, 1);
    }

    #[test]
    fn offset_skips_previous_pages() {
        assert_eq!(PageParams::new(Some(3), Some(20)).offset(), 40);
        assert_eq!(PageParams::new(None, None).offset(), 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PageParams::new(Some(1), Some(20));
        assert_eq!(PaginatedResponse::new(Vec::<u8>::new(), 0, params).total_pages, 0);
        assert_eq!(PaginatedResponse::new(Vec::<u8>::new(), 20, params).total_pages, 1);
        assert_eq!(PaginatedResponse::new(Vec::<u8>::new(), 41, params).total_pages, 3);
    }
}
