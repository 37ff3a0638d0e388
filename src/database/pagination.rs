use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Page-number pagination parameters, 1-based.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub page: i64,
    pub page_count: i64,
    pub next_page: Option<i64>,
    pub prev_page: Option<i64>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, query: PageQuery) -> Self {
        if total_rows <= 0 {
            return Self::no_rows();
        }
        let page_size = query.limit();
        let page = query.page();
        let page_count = (total_rows + page_size - 1) / page_size;

        Self {
            rows,
            total_rows,
            page,
            page_count,
            next_page: (page < page_count).then_some(page + 1),
            prev_page: (page > 1).then(|| (page - 1).min(page_count)),
        }
    }

    pub fn no_rows() -> Self {
        Self {
            rows: vec![],
            total_rows: 0,
            page: 1,
            page_count: 0,
            next_page: None,
            prev_page: None,
        }
    }
}
