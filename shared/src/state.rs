use serde::Serialize;
use std::collections::HashSet;

use crate::query::{Filters, PageRequest, PageResponse, SortOption};

/// An element of a paginated collection.
///
/// The identity key is what de-duplication runs on, typically the database
/// primary key. Two values with the same key are the same entry.
pub trait CollectionItem: Clone + Send + Sync + 'static {
    fn identity_key(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Page 1 of a fresh load: replaces whatever is loaded.
    Replace,
    /// A further page: only unseen keys are appended.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    pub received: usize,
    pub appended: usize,
    pub duplicates: usize,
}

/// Everything a list screen renders, published as a snapshot after each change.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionState<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
    pub total_count: u64,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub search_query: Option<String>,
    pub filter: Filters,
    pub sort_option: SortOption,
    pub error_message: Option<String>,
    #[serde(skip)]
    loaded_keys: HashSet<String>,
}

impl<T: CollectionItem> CollectionState<T> {
    #[must_use]
    pub fn new(page_size: u32, sort_option: SortOption) -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            page_size: page_size.max(1),
            has_more: true,
            total_count: 0,
            is_loading: false,
            is_fetching: false,
            search_query: None,
            filter: Filters::new(),
            sort_option,
            error_message: None,
            loaded_keys: HashSet::new(),
        }
    }

    #[must_use]
    pub fn last_item(&self) -> Option<&T> {
        self.items.last()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.loaded_keys.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Request for the page the cursor points at, echoing the applied parameters.
    #[must_use]
    pub fn next_request(&self) -> PageRequest {
        PageRequest::new(
            self.page,
            self.page_size,
            self.sort_option.clone(),
            self.search_query.as_deref(),
            self.filter.clone(),
        )
    }

    /// Back to page 1 with nothing loaded. Parameters are kept.
    pub fn reset_pagination(&mut self) {
        self.items.clear();
        self.loaded_keys.clear();
        self.page = 1;
        self.has_more = true;
    }

    pub fn begin_fetch(&mut self) {
        self.is_loading = true;
        self.is_fetching = true;
        self.error_message = None;
    }

    pub fn finish_fetch(&mut self) {
        self.is_loading = false;
        self.is_fetching = false;
    }

    /// Applies a successful page. `request` is the request that produced it.
    pub fn apply_page(
        &mut self,
        mode: MergeMode,
        request: &PageRequest,
        response: PageResponse<T>,
    ) -> MergeOutcome {
        let position = response.position_for(request);
        self.total_count = response.total_count;
        self.has_more = position < response.total_count;

        let received = response.entries.len();
        if mode == MergeMode::Replace {
            self.items.clear();
            self.loaded_keys.clear();
        }

        let mut appended = 0;
        for entry in response.entries {
            if self.loaded_keys.insert(entry.identity_key()) {
                self.items.push(entry);
                appended += 1;
            }
        }

        if received > 0 {
            self.page = request.page.saturating_add(1);
        }

        MergeOutcome {
            received,
            appended,
            duplicates: received - appended,
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    /// Removes the entry with `item`'s key. Returns the removed entry.
    pub fn delete(&mut self, item: &T) -> Option<T> {
        let key = item.identity_key();
        if !self.loaded_keys.remove(&key) {
            return None;
        }
        let index = self.items.iter().position(|i| i.identity_key() == key)?;
        self.total_count = self.total_count.saturating_sub(1);
        Some(self.items.remove(index))
    }

    /// Puts `item` first. An already loaded entry with the same key is moved, not duplicated.
    pub fn insert_at_front(&mut self, item: T) {
        let key = item.identity_key();
        if self.loaded_keys.contains(&key) {
            self.items.retain(|i| i.identity_key() != key);
        } else {
            self.loaded_keys.insert(key);
            self.total_count = self.total_count.saturating_add(1);
        }
        self.items.insert(0, item);
    }

    /// Replaces the entry with the same key in place. Returns false if it is not loaded.
    pub fn update_in_place(&mut self, item: T) -> bool {
        let key = item.identity_key();
        if !self.loaded_keys.contains(&key) {
            return false;
        }
        match self.items.iter_mut().find(|i| i.identity_key() == key) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }
}
