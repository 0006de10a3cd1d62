#![allow(dead_code)]

use drainage_shared::{
    CollectionConfig, CollectionItem, FetchResult, NetworkError, PageFetcher, PageRequest,
    PageResponse, PaginatedCollection,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    pub id: String,
    pub title: String,
}

impl CollectionItem for Incident {
    fn identity_key(&self) -> String {
        self.id.clone()
    }
}

pub fn incident(id: &str) -> Incident {
    Incident {
        id: id.to_string(),
        title: format!("Incident {id}"),
    }
}

pub fn incidents(ids: &[&str]) -> Vec<Incident> {
    ids.iter().map(|id| incident(id)).collect()
}

pub fn ids(list: &PaginatedCollection<Incident>) -> Vec<String> {
    list.snapshot().items.iter().map(|i| i.id.clone()).collect()
}

pub fn page(ids: &[&str], total: u64, position: u64) -> FetchResult<PageResponse<Incident>> {
    Ok(PageResponse::new(incidents(ids), total, position))
}

enum Step {
    Ready(FetchResult<PageResponse<Incident>>),
    Gated(oneshot::Receiver<FetchResult<PageResponse<Incident>>>),
}

/// Answers page requests in order from a script. Gated steps wait until the
/// test releases them, which is how tests hold a fetch in flight.
#[derive(Default)]
pub struct ScriptedFetcher {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<PageRequest>>,
}

pub struct Gate(oneshot::Sender<FetchResult<PageResponse<Incident>>>);

impl Gate {
    pub fn release(self, result: FetchResult<PageResponse<Incident>>) {
        // The fetch may already have been dropped with its controller.
        let _ = self.0.send(result);
    }
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, result: FetchResult<PageResponse<Incident>>) {
        self.steps.lock().unwrap().push_back(Step::Ready(result));
    }

    pub fn gate(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.steps.lock().unwrap().push_back(Step::Gated(rx));
        Gate(tx)
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Yields until `n` requests have reached the fetcher.
    pub async fn wait_for_requests(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.request_count() < n {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("fetcher was never called");
    }
}

#[async_trait::async_trait]
impl PageFetcher<Incident> for ScriptedFetcher {
    async fn fetch_page(&self, request: PageRequest) -> FetchResult<PageResponse<Incident>> {
        self.requests.lock().unwrap().push(request);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Ready(result)) => result,
            Some(Step::Gated(rx)) => rx.await.unwrap_or(Err(NetworkError::Cancelled)),
            None => Err(NetworkError::Transport("script exhausted".into())),
        }
    }
}

pub fn collection(
    fetcher: &Arc<ScriptedFetcher>,
    page_size: u32,
) -> PaginatedCollection<Incident> {
    PaginatedCollection::new(
        fetcher.clone(),
        CollectionConfig::default().with_page_size(page_size),
    )
    .unwrap()
}
