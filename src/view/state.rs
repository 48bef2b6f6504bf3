use std::collections::BTreeMap;

/// Client-only search, filter and page selection. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    search: String,
    filters: BTreeMap<String, String>,
    page: usize,
    page_size: usize,
}

impl ViewState {
    /// Empty search, no filters, first page. A zero page size is treated as 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            search: String::new(),
            filters: BTreeMap::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Current search text.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Active filters by field.
    pub fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    /// Requested page; only meaningful after a projection has clamped it.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Rows per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replaces the search text.
    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
    }

    /// Sets an exact-match filter. An empty value unsets it.
    pub fn set_filter(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        if value.is_empty() {
            self.filters.remove(&field);
        } else {
            self.filters.insert(field, value);
        }
    }

    /// Removes every filter.
    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    /// Requests a page; clamped on the next projection.
    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub(crate) fn clamp_page(&mut self, total_pages: usize) -> usize {
        self.page = self.page.clamp(1, total_pages.max(1));
        self.page
    }
}
