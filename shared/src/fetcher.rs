use std::sync::Arc;
use tracing::debug;

use crate::error::{FetchResult, NetworkError};
use crate::query::{PageRequest, PageResponse};

/// The remote side of a paginated collection.
///
/// Implementations own transport, auth headers and decoding. They report a
/// superseded request as [`NetworkError::Cancelled`].
#[async_trait::async_trait]
pub trait PageFetcher<T>: Send + Sync {
    async fn fetch_page(&self, request: PageRequest) -> FetchResult<PageResponse<T>>;
}

/// Two sub-collections of the same item type shown as one list.
///
/// The nurse/doctor picker pages through both staff lists with the same page
/// number. Entries are concatenated primary first; totals and positions are
/// summed, each side's position capped at its own total, so the merged
/// collection has more as long as either side does.
pub struct DualPageFetcher<T> {
    primary: Arc<dyn PageFetcher<T>>,
    secondary: Arc<dyn PageFetcher<T>>,
}

impl<T> DualPageFetcher<T> {
    pub fn new(primary: Arc<dyn PageFetcher<T>>, secondary: Arc<dyn PageFetcher<T>>) -> Self {
        Self { primary, secondary }
    }

    fn side_position(request: &PageRequest, response: &PageResponse<T>) -> u64 {
        response.position_for(request).min(response.total_count)
    }
}

#[async_trait::async_trait]
impl<T: Send + 'static> PageFetcher<T> for DualPageFetcher<T> {
    async fn fetch_page(&self, request: PageRequest) -> FetchResult<PageResponse<T>> {
        let (primary, secondary) = tokio::join!(
            self.primary.fetch_page(request.clone()),
            self.secondary.fetch_page(request.clone())
        );

        let (primary, secondary) = match (primary, secondary) {
            (Ok(p), Ok(s)) => (p, s),
            (Err(NetworkError::Cancelled), _) | (_, Err(NetworkError::Cancelled)) => {
                return Err(NetworkError::Cancelled);
            }
            (Err(e), _) | (_, Err(e)) => return Err(e),
        };

        let position = Self::side_position(&request, &primary)
            + Self::side_position(&request, &secondary);
        let total_count = primary.total_count + secondary.total_count;
        debug!(
            page = request.page,
            primary_total = primary.total_count,
            secondary_total = secondary.total_count,
            "merged dual page"
        );

        let mut entries = primary.entries;
        entries.extend(secondary.entries);
        Ok(PageResponse::new(entries, total_count, position))
    }
}
