use serde::Serialize;

pub(crate) const MAX_PAGE_SIZE: i64 = 1000;

pub(crate) const fn default_limit() -> i64 {
    100
}

/// One page of a listing plus the unpaged total.
#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

impl<T> PaginatedResponse<T> {
    /// Echoes the window the repositories actually applied.
    pub(crate) fn new(items: Vec<T>, total_count: i64, skip: i64, limit: i64) -> Self {
        Self { items, total_count, skip: skip.max(0), limit: limit.clamp(1, MAX_PAGE_SIZE) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_window() {
        let page = PaginatedResponse::new(vec![1, 2], 2, -5, 5000);
        assert_eq!(page.skip, 0);
        assert_eq!(page.limit, MAX_PAGE_SIZE);

        let page = PaginatedResponse::<i32>::new(Vec::new(), 0, 10, 0);
        assert_eq!(page.skip, 10);
        assert_eq!(page.limit, 1);
    }
}
