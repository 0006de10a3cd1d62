use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const PARAM_PAGE: &str = "page";
pub const PARAM_LIMIT: &str = "limit";
pub const PARAM_SORT_BY: &str = "sort_by";
pub const PARAM_SORT_ORDER: &str = "sort_order";
pub const PARAM_SEARCH: &str = "search";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOption {
    pub field: String,
    pub direction: SortDirection,
}

impl SortOption {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

impl Default for SortOption {
    /// Newest first, which is what every list screen opens with.
    fn default() -> Self {
        Self::descending("created_at")
    }
}

/// One filter field: either a single value or a multi-select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(String),
    List(Vec<String>),
}

impl FilterValue {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scalar(value) => value.is_empty(),
            Self::List(values) => values.is_empty(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        Self::List(values.into_iter().map(str::to_string).collect())
    }
}

/// Filter fields keyed by their query parameter name.
///
/// A `BTreeMap` keeps serialization order stable, so identical filters always
/// produce identical request URLs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(BTreeMap<String, FilterValue>);

impl Filters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field. An empty value removes it, matching how an absent field is sent.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FilterValue>) {
        let field = field.into();
        let value = value.into();
        if value.is_empty() {
            self.0.remove(&field);
        } else {
            self.0.insert(field, value);
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<FilterValue> {
        self.0.remove(field)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.0.get(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Scalars become `field=value`; lists become `field[0]=a&field[1]=b`.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.0.len());
        for (field, value) in &self.0 {
            match value {
                FilterValue::Scalar(v) => {
                    if !v.is_empty() {
                        pairs.push((field.clone(), v.clone()));
                    }
                }
                FilterValue::List(values) => {
                    for (index, v) in values.iter().enumerate() {
                        pairs.push((format!("{field}[{index}]"), v.clone()));
                    }
                }
            }
        }
        pairs
    }
}

impl<K, V> FromIterator<(K, V)> for Filters
where
    K: Into<String>,
    V: Into<FilterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Self::new();
        for (field, value) in iter {
            filters.set(field, value);
        }
        filters
    }
}

/// What the controller asks a [`PageFetcher`](crate::fetcher::PageFetcher) for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub sort: SortOption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default)]
    pub filters: Filters,
}

impl PageRequest {
    /// Builds a request, dropping a blank search term.
    #[must_use]
    pub fn new(
        page: u32,
        page_size: u32,
        sort: SortOption,
        search: Option<&str>,
        filters: Filters,
    ) -> Self {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
            sort,
            search,
            filters,
        }
    }

    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Number of entries on all pages before this one.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            (PARAM_PAGE.to_string(), self.page.to_string()),
            (PARAM_LIMIT.to_string(), self.page_size.to_string()),
            (PARAM_SORT_BY.to_string(), self.sort.field.clone()),
            (
                PARAM_SORT_ORDER.to_string(),
                self.sort.direction.as_str().to_string(),
            ),
        ];
        if let Some(search) = &self.search {
            pairs.push((PARAM_SEARCH.to_string(), search.clone()));
        }
        pairs.extend(self.filters.to_query_pairs());
        pairs
    }
}

/// One page as returned by the collaborator.
///
/// `current_page_position` is the number of entries up to and including this
/// page; `0` means the server did not say and the controller derives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub entries: Vec<T>,
    pub total_count: u64,
    #[serde(default)]
    pub current_page_position: u64,
}

impl<T> PageResponse<T> {
    pub fn new(entries: Vec<T>, total_count: u64, current_page_position: u64) -> Self {
        Self {
            entries,
            total_count,
            current_page_position,
        }
    }

    pub fn empty(total_count: u64) -> Self {
        Self::new(Vec::new(), total_count, 0)
    }

    /// Cumulative position, falling back to `offset + entries` when unreported.
    pub fn position_for(&self, request: &PageRequest) -> u64 {
        if self.current_page_position > 0 {
            self.current_page_position
        } else {
            request.offset() + self.entries.len() as u64
        }
    }
}
