//! Pagination and filter state for list views, and the query strings built from it.
//!
//! The outbound query string is a pure function of `{page, limit, filters}`.

use entity::page::{self, Page};
use serde_json::Error as JsonError;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Selected values per filter category, e.g. `{"Status": ["failed"]}`.
///
/// Categories with no selected values are dropped, so an empty map means "no filtering".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterMap(BTreeMap<String, Vec<String>>);

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selection for `category`; an empty selection clears it.
    pub fn set(&mut self, category: &str, values: Vec<String>) {
        let values: Vec<String> = values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            self.0.remove(category);
        } else {
            self.0.insert(category.to_string(), values);
        }
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.0.get(category).map(Vec::as_slice)
    }

    /// Selected values for the category whose outbound key is `key`.
    pub fn values_for_key(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(category, _)| query_key(category) == key)
            .flat_map(|(_, values)| values.iter().map(String::as_str))
            .collect()
    }

    /// Parsed selection for `key`: `None` when the category is not filtered on. Values that do
    /// not parse are dropped, so a selection of only unknown values is `Some` and empty and
    /// matches nothing.
    pub fn selected<T: FromStr>(&self, key: &str) -> Option<Vec<T>> {
        let values = self.values_for_key(key);
        if values.is_empty() {
            return None;
        }
        Some(values.into_iter().filter_map(|v| v.parse().ok()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON form kept in a view's own location state; `None` when there is nothing to keep.
    pub fn to_json(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        serde_json::to_string(&self.0).ok()
    }

    pub fn from_json(json: &str) -> Result<Self, JsonError> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut filters = Self::new();
        for (category, values) in raw {
            filters.set(&category, values);
        }
        Ok(filters)
    }

    /// One `(key, value)` pair per selected value.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .flat_map(|(category, values)| {
                let key = query_key(category);
                values.iter().map(move |v| (key.clone(), v.clone()))
            })
            .collect()
    }
}

/// Outbound query key for a filter category: known labels map to the backend's names, the
/// rest are camel-cased.
pub fn query_key(category: &str) -> String {
    match category.trim().to_lowercase().as_str() {
        "rai dimensions" => "raiDimensions".to_string(),
        "status" => "status".to_string(),
        other => camel_case(other),
    }
}

fn camel_case(words: &str) -> String {
    let mut out = String::with_capacity(words.len());
    for (i, word) in words
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        if i == 0 {
            out.push_str(word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// Everything a list fetch needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based.
    pub page: u32,
    pub limit: u32,
    pub filters: FilterMap,
}

impl ListQuery {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
            filters: FilterMap::new(),
        }
    }

    pub fn with_filters(mut self, filters: FilterMap) -> Self {
        self.filters = filters;
        self
    }

    /// Backend query: `page`, `size`, then one pair per selected filter value.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("size".to_string(), self.limit.to_string()),
        ];
        pairs.extend(self.filters.query_pairs());
        pairs
    }

    /// The view's own location state: `page`, `limit` and `filters` as JSON only when set.
    pub fn to_location_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(json) = self.filters.to_json() {
            pairs.push(("filters".to_string(), json));
        }
        pairs
    }
}

/// Client-side pagination state of one list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState {
    page: u32,
    limit: u32,
    filters: FilterMap,
    total: u64,
    total_pages: u32,
}

impl ListState {
    /// Resumes a view from its location state. Totals are unknown until the next
    /// [`Self::apply`].
    pub fn restore(query: ListQuery) -> Self {
        Self {
            page: query.page.max(1),
            limit: query.limit.max(1),
            filters: query.filters,
            total: 0,
            total_pages: 0,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn query(&self) -> ListQuery {
        ListQuery {
            page: self.page,
            limit: self.limit,
            filters: self.filters.clone(),
        }
    }

    /// Records the totals of a fetched page.
    pub fn apply<T>(&mut self, fetched: &Page<T>) {
        self.total = fetched.total;
        self.total_pages = fetched.total_pages;
    }

    /// Moves to `page`, clamped to `1..=max(1, total_pages)`.
    pub fn go_to(&mut self, page: u32) {
        self.page = page.clamp(1, self.last_page());
    }

    /// Adjusts totals after `removed` items were deleted, clamping the current page to
    /// `max(1, newTotalPages)`. Returns whether the page changed.
    pub fn after_delete(&mut self, removed: u64) -> bool {
        self.total = self.total.saturating_sub(removed);
        self.total_pages = page::total_pages(self.total, self.limit);
        let last = self.last_page();
        if self.page > last {
            self.page = last;
            true
        } else {
            false
        }
    }

    fn last_page(&self) -> u32 {
        self.total_pages.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched(total: u64, page: u32, limit: u32) -> Page<u32> {
        Page {
            items: vec![],
            total,
            page,
            limit,
            total_pages: page::total_pages(total, limit),
        }
    }

    #[test]
    fn test_status_filter_query() {
        let mut filters = FilterMap::new();
        filters.set("status", vec!["failed".to_string()]);
        let query = ListQuery::new(1, 10).with_filters(filters);

        let pairs = query.to_query_pairs();
        assert!(pairs.contains(&("status".to_string(), "failed".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "filters"));
    }

    #[test]
    fn test_empty_filters_produce_no_filters_parameter() {
        let query = ListQuery::new(1, 10);
        assert_eq!(
            query.to_location_pairs(),
            vec![
                ("page".to_string(), "1".to_string()),
                ("limit".to_string(), "10".to_string())
            ]
        );
        assert_eq!(query.to_query_pairs().len(), 2);
    }

    #[test]
    fn test_location_state_keeps_filters_as_json() {
        let mut filters = FilterMap::new();
        filters.set("Status", vec!["done".to_string()]);
        let pairs = ListQuery::new(2, 10).with_filters(filters).to_location_pairs();
        assert_eq!(
            pairs.last(),
            Some(&("filters".to_string(), r#"{"Status":["done"]}"#.to_string()))
        );
    }

    #[test]
    fn test_category_labels_map_to_backend_keys() {
        assert_eq!(query_key(" RAI Dimensions "), "raiDimensions");
        assert_eq!(query_key("Status"), "status");
        assert_eq!(query_key("Auth Type"), "authType");

        let mut filters = FilterMap::new();
        filters.set(
            "RAI Dimensions",
            vec!["reliability".to_string(), "sustainability".to_string()],
        );
        assert_eq!(
            filters.query_pairs(),
            vec![
                ("raiDimensions".to_string(), "reliability".to_string()),
                ("raiDimensions".to_string(), "sustainability".to_string()),
            ]
        );
        assert_eq!(
            filters.values_for_key("raiDimensions"),
            vec!["reliability", "sustainability"]
        );
    }

    #[test]
    fn test_empty_selection_clears_category() {
        let mut filters = FilterMap::new();
        filters.set("Status", vec!["failed".to_string()]);
        filters.set("Status", vec![" ".to_string()]);
        assert!(filters.is_empty());
        assert_eq!(filters.to_json(), None);
    }

    #[test]
    fn test_unparseable_selection_is_not_an_absent_one() {
        let mut filters = FilterMap::new();
        assert_eq!(filters.selected::<u32>("status"), None);

        filters.set("Status", vec!["bogus".to_string(), "7".to_string()]);
        assert_eq!(filters.selected::<u32>("status"), Some(vec![7]));

        filters.set("Status", vec!["bogus".to_string()]);
        assert_eq!(filters.selected::<u32>("status"), Some(vec![]));
    }

    #[test]
    fn test_filters_round_trip_through_location_json() {
        let filters = FilterMap::from_json(r#"{"Status":["failed","done"],"Empty":[]}"#).unwrap();
        assert_eq!(filters.get("Status").map(<[String]>::len), Some(2));
        assert_eq!(filters.get("Empty"), None);
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut state = ListState::restore(ListQuery::new(1, 10));
        state.apply(&fetched(25, 1, 10));

        state.go_to(0);
        assert_eq!(state.page(), 1);
        state.go_to(99);
        assert_eq!(state.page(), 3);

        state.apply(&fetched(0, 1, 10));
        state.go_to(5);
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_deleting_only_item_on_last_page_clamps_page() {
        let mut state = ListState::restore(ListQuery::new(1, 10));
        state.apply(&fetched(21, 3, 10));
        state.go_to(3);

        assert!(state.after_delete(1));
        assert_eq!(state.page(), 2);
        assert_eq!(state.total_pages(), 2);
    }

    #[test]
    fn test_deleting_last_remaining_item_stays_on_page_one() {
        let mut state = ListState::restore(ListQuery::new(1, 10));
        state.apply(&fetched(1, 1, 10));

        assert!(!state.after_delete(1));
        assert_eq!(state.page(), 1);
        assert_eq!(state.total_pages(), 0);
    }

    #[test]
    fn test_restored_state_keeps_page_until_delete() {
        let mut state = ListState::restore(ListQuery::new(3, 10));
        assert_eq!(state.page(), 3);
        state.apply(&fetched(21, 3, 10));

        assert!(state.after_delete(1));
        assert_eq!(state.query().page, 2);
    }

    #[test]
    fn test_delete_inside_range_keeps_page() {
        let mut state = ListState::restore(ListQuery::new(1, 10));
        state.apply(&fetched(30, 2, 10));
        state.go_to(2);

        assert!(!state.after_delete(1));
        assert_eq!(state.page(), 2);
    }
}
