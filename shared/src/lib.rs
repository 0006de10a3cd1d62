#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Paginated, searchable, sortable collections for the drainage and incident
//! screens: patient lists, patient drainage records, patient incidents, the
//! staff picker and the incident feed.
//!
//! A [`PaginatedCollection`] owns the visible list for one screen and drives a
//! [`PageFetcher`] to fill it. The platform shell observes state through
//! [`PaginatedCollection::subscribe`].

pub mod cancel;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod metrics;
pub mod query;
pub mod state;

pub use cancel::{CancellationToken, TaskSlot};
pub use config::CollectionConfig;
pub use controller::PaginatedCollection;
pub use error::{ConfigError, FetchResult, NetworkError};
pub use fetcher::{DualPageFetcher, PageFetcher};
pub use http::{
    Endpoint, EndpointError, HttpPageFetcher, HttpRequest, HttpResponse, HttpTransport,
    TransportError,
};
pub use metrics::{FetchMetrics, MetricsSnapshot};
pub use query::{FilterValue, Filters, PageRequest, PageResponse, SortDirection, SortOption};
pub use state::{CollectionItem, CollectionState, MergeMode, MergeOutcome};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 200;
pub const SEARCH_DEBOUNCE_MS: u64 = 500;
pub const MAX_SEARCH_DEBOUNCE_MS: u64 = 10_000;
