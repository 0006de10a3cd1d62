//! The paginated collection controller.
//!
//! One controller backs one list screen. It owns a [`CollectionState`] and
//! publishes it through a `watch` channel; shells read snapshots and call the
//! operations below. At most one fetch is active at a time: every reset
//! (initial load, refresh, fired search, sort/filter change) cancels the fetch
//! it replaces, and a cancelled fetch never mutates state.

use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, debug_span, info, instrument, trace, warn, Instrument};

use crate::cancel::{CancellationToken, TaskSlot};
use crate::config::CollectionConfig;
use crate::error::ConfigError;
use crate::fetcher::PageFetcher;
use crate::metrics::{FetchMetrics, MetricsSnapshot};
use crate::query::{Filters, PageRequest, SortOption};
use crate::state::{CollectionItem, CollectionState, MergeMode};

pub struct PaginatedCollection<T: CollectionItem> {
    inner: Arc<Inner<T>>,
}

impl<T: CollectionItem> Clone for PaginatedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T: CollectionItem> {
    fetcher: Arc<dyn PageFetcher<T>>,
    config: CollectionConfig,
    state: watch::Sender<CollectionState<T>>,
    fetch_slot: TaskSlot,
    search_slot: TaskSlot,
    metrics: FetchMetrics,
}

impl<T: CollectionItem> Drop for Inner<T> {
    fn drop(&mut self) {
        self.search_slot.cancel();
        self.fetch_slot.cancel();
    }
}

fn normalize_query(query: Option<String>) -> Option<String> {
    query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
}

impl<T: CollectionItem> PaginatedCollection<T> {
    pub fn new(
        fetcher: Arc<dyn PageFetcher<T>>,
        config: CollectionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = CollectionState::new(config.page_size, config.default_sort.clone());
        let (tx, _rx) = watch::channel(state);
        Ok(Self {
            inner: Arc::new(Inner {
                fetcher,
                config,
                state: tx,
                fetch_slot: TaskSlot::new(),
                search_slot: TaskSlot::new(),
                metrics: FetchMetrics::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &CollectionConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn snapshot(&self) -> CollectionState<T> {
        self.inner.state.borrow().clone()
    }

    /// Receiver that is notified after every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CollectionState<T>> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// First load of a screen: page 1 with exactly these parameters.
    #[instrument(skip_all, fields(sort_field = %sort.field, has_search = search_query.is_some()))]
    pub async fn load_initial(
        &self,
        search_query: Option<String>,
        filter: Option<Filters>,
        sort: SortOption,
    ) {
        let search_query = normalize_query(search_query);
        self.run_reset(move |state| {
            state.search_query = search_query;
            state.filter = filter.unwrap_or_default();
            state.sort_option = sort;
        })
        .await;
    }

    /// Fetches the next page when the UI reaches `last_visible`.
    ///
    /// Does nothing unless `last_visible` is the last loaded entry, nothing is
    /// loading, and the server reported more entries.
    #[instrument(skip_all)]
    pub async fn load_more(&self, last_visible: &T) {
        let key = last_visible.identity_key();
        let mut begun = None;
        self.inner.state.send_if_modified(|state| {
            if !state.has_more || state.is_loading || state.is_fetching {
                return false;
            }
            let is_last = state
                .last_item()
                .is_some_and(|last| last.identity_key() == key);
            if !is_last {
                return false;
            }
            let token = self.inner.fetch_slot.replace();
            state.begin_fetch();
            begun = Some((token, state.next_request()));
            true
        });

        let Some((token, request)) = begun else {
            FetchMetrics::incr(&self.inner.metrics.load_more_skipped);
            trace!(key = %key, "load more skipped");
            return;
        };
        self.execute(token, MergeMode::Append, request).await;
    }

    /// Reloads from page 1, optionally with a new filter. Resolves when the
    /// fetch has been applied, has failed, or was superseded.
    #[instrument(skip_all, fields(filter_override = filter.is_some()))]
    pub async fn refresh(&self, filter: Option<Filters>) {
        self.run_reset(move |state| {
            if let Some(filter) = filter {
                state.filter = filter;
            }
        })
        .await;
    }

    #[instrument(skip_all, fields(field = %option.field, direction = %option.direction))]
    pub async fn update_sort(&self, option: SortOption) {
        self.run_reset(move |state| state.sort_option = option).await;
    }

    #[instrument(skip_all)]
    pub async fn update_filter(&self, filter: Filters) {
        self.run_reset(move |state| state.filter = filter).await;
    }

    /// Debounced search. Must be called from within a tokio runtime.
    ///
    /// The fetch fires once the configured quiet interval passes without a newer
    /// call; a newer call cancels this one, which then does nothing. The
    /// returned handle completes when the search was dropped or its fetch ended.
    pub fn search(&self, query: impl Into<String>) -> JoinHandle<()> {
        let query = normalize_query(Some(query.into()));
        if self.inner.search_slot.is_active() {
            FetchMetrics::incr(&self.inner.metrics.searches_debounced);
        }
        let token = self.inner.search_slot.replace();
        let debounce = self.inner.config.search_debounce();
        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        let span = debug_span!(
            "search",
            generation = token.generation(),
            query_len = query.as_ref().map_or(0, String::len)
        );

        tokio::spawn(
            async move {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!("search superseded before firing");
                        return;
                    }
                    () = tokio::time::sleep(debounce) => {}
                }

                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if token.is_cancelled() {
                    return;
                }
                inner.search_slot.finish(&token);
                let collection = Self { inner };
                collection
                    .run_reset(move |state| state.search_query = query)
                    .await;
            }
            .instrument(span),
        )
    }

    /// Removes an entry after the server confirmed the delete.
    pub fn delete(&self, item: &T) -> Option<T> {
        let mut removed = None;
        self.inner.state.send_if_modified(|state| {
            removed = state.delete(item);
            removed.is_some()
        });
        removed
    }

    /// Shows a newly created entry first.
    pub fn insert_at_front(&self, item: T) {
        self.inner.state.send_modify(|state| state.insert_at_front(item));
    }

    /// Swaps in the server's updated copy of an entry. Returns false if it is not loaded.
    pub fn update_in_place(&self, item: T) -> bool {
        self.inner
            .state
            .send_if_modified(|state| state.update_in_place(item))
    }

    /// Drops the pending search and the active fetch and clears the loading flags.
    pub fn cancel_all(&self) {
        let search_cancelled = self.inner.search_slot.cancel();
        self.inner.state.send_if_modified(|state| {
            let fetch_cancelled = self.inner.fetch_slot.cancel();
            let was_busy = state.is_loading || state.is_fetching;
            state.finish_fetch();
            if search_cancelled || fetch_cancelled {
                debug!(search_cancelled, fetch_cancelled, "cancelled pending work");
            }
            was_busy
        });
    }

    async fn run_reset(&self, update: impl FnOnce(&mut CollectionState<T>) + Send) {
        let mut begun = None;
        self.inner.state.send_modify(|state| {
            // Cancel and reset under the same lock the result is applied under.
            let token = self.inner.fetch_slot.replace();
            update(state);
            state.reset_pagination();
            state.begin_fetch();
            begun = Some((token, state.next_request()));
        });

        if let Some((token, request)) = begun {
            self.execute(token, MergeMode::Replace, request).await;
        }
    }

    async fn execute(&self, token: CancellationToken, mode: MergeMode, request: PageRequest) {
        let inner = &self.inner;
        let generation = token.generation();
        if token.is_cancelled() {
            FetchMetrics::incr(&inner.metrics.fetches_discarded);
            debug!(generation, "fetch superseded before it was issued");
            return;
        }

        FetchMetrics::incr(&inner.metrics.fetches_started);
        debug!(generation, page = request.page, ?mode, "fetching page");
        let result = inner.fetcher.fetch_page(request.clone()).await;

        inner.state.send_if_modified(|state| {
            if token.is_cancelled() {
                FetchMetrics::incr(&inner.metrics.fetches_discarded);
                debug!(generation, page = request.page, "discarding superseded page");
                return false;
            }

            match result {
                Ok(response) => {
                    let outcome = state.apply_page(mode, &request, response);
                    FetchMetrics::incr(&inner.metrics.pages_applied);
                    FetchMetrics::add(&inner.metrics.duplicates_dropped, outcome.duplicates as u64);
                    info!(
                        generation,
                        page = request.page,
                        received = outcome.received,
                        appended = outcome.appended,
                        total = state.total_count,
                        has_more = state.has_more,
                        "page applied"
                    );
                }
                Err(error) if error.is_cancelled() => {
                    FetchMetrics::incr(&inner.metrics.fetches_discarded);
                    debug!(generation, "collaborator reported the fetch cancelled");
                }
                Err(error) => {
                    FetchMetrics::incr(&inner.metrics.fetches_failed);
                    warn!(
                        generation,
                        page = request.page,
                        code = error.code(),
                        %error,
                        "page fetch failed"
                    );
                    state.set_error(error.user_facing_message());
                }
            }
            state.finish_fetch();
            true
        });

        inner.fetch_slot.finish(&token);
    }
}
