use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::query::SortOption;
use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MAX_SEARCH_DEBOUNCE_MS, SEARCH_DEBOUNCE_MS};

/// Per-screen settings for a [`PaginatedCollection`](crate::PaginatedCollection).
///
/// Shells may ship this as JSON; missing fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub page_size: u32,
    pub search_debounce_ms: u64,
    pub default_sort: SortOption,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce_ms: SEARCH_DEBOUNCE_MS,
            default_sort: SortOption::default(),
        }
    }
}

impl CollectionConfig {
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce_ms = u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_default_sort(mut self, sort: SortOption) -> Self {
        self.default_sort = sort;
        self
    }

    #[must_use]
    pub const fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::PageSizeOutOfRange {
                value: self.page_size,
                max: MAX_PAGE_SIZE,
            });
        }
        if self.search_debounce_ms > MAX_SEARCH_DEBOUNCE_MS {
            return Err(ConfigError::DebounceTooLong {
                value: self.search_debounce_ms,
                max: MAX_SEARCH_DEBOUNCE_MS,
            });
        }
        if self.default_sort.field.trim().is_empty() {
            return Err(ConfigError::EmptySortField);
        }
        Ok(())
    }
}
