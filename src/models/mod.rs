use serde::{Deserialize, Serialize};

pub mod asset;
pub mod job;
pub mod user;

pub use asset::*;
pub use job::*;
pub use user::*;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}

impl ListQuery {
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(query: &ListQuery, total: i64) -> Self {
        Self {
            page: query.page,
            per_page: query.per_page,
            total,
            pages: (total + query.per_page - 1) / query.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_clamps_out_of_range_values() {
        let query = ListQuery {
            page: 0,
            per_page: 1000,
        }
        .normalized();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 100);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn pagination_rounds_page_count_up() {
        let query = ListQuery {
            page: 1,
            per_page: 20,
        };
        assert_eq!(Pagination::new(&query, 41).pages, 3);
        assert_eq!(Pagination::new(&query, 40).pages, 2);
        assert_eq!(Pagination::new(&query, 0).pages, 0);
    }
}
