use serde::{Deserialize, Serialize};

/// One page of a list view as returned by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Slices `all` into the requested page. Pages past the end are empty.
    pub fn from_slice(all: &[T], page: u32, limit: u32) -> Self
    where
        T: Clone,
    {
        let page = page.max(1);
        let limit = limit.max(1);
        let start = ((page - 1) as usize).saturating_mul(limit as usize);
        let items = all
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();

        Self {
            items,
            total: all.len() as u64,
            page,
            limit,
            total_pages: total_pages(all.len() as u64, limit),
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Number of pages needed to show `total` items at `limit` per page.
pub fn total_pages(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn test_from_slice_returns_requested_window() {
        let all: Vec<u32> = (1..=12).collect();

        let page = Page::from_slice(&all, 3, 5);

        assert_eq!(page.items, vec![11, 12]);
        assert_eq!(page.total, 12);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_from_slice_past_the_end_is_empty() {
        let all = vec!["a", "b"];
        let page = Page::from_slice(&all, 4, 5);
        assert!(page.is_empty());
        assert_eq!(page.total_pages, 1);
    }
}
