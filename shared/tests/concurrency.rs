mod common;

use common::{collection, ids, incident, page, ScriptedFetcher};
use drainage_shared::SortOption;
use std::time::Duration;

#[tokio::test]
async fn test_superseded_load_never_lands() {
    let fetcher = ScriptedFetcher::new();
    let gate_a = fetcher.gate();
    fetcher.respond(page(&["B1", "B2"], 2, 2));
    let list = collection(&fetcher, 10);

    let a = tokio::spawn({
        let list = list.clone();
        async move {
            list.load_initial(Some("old".into()), None, SortOption::default())
                .await;
        }
    });
    fetcher.wait_for_requests(1).await;

    list.load_initial(Some("new".into()), None, SortOption::default())
        .await;
    assert_eq!(ids(&list), ["B1", "B2"]);

    gate_a.release(page(&["A1"], 1, 1));
    a.await.unwrap();

    let state = list.snapshot();
    assert_eq!(ids(&list), ["B1", "B2"]);
    assert_eq!(state.search_query.as_deref(), Some("new"));
    assert!(!state.is_loading && !state.is_fetching);
    assert_eq!(list.metrics().fetches_discarded, 1);
    assert_eq!(list.metrics().in_flight(), 0);
}

#[tokio::test]
async fn test_double_refresh_applies_only_the_second() {
    let fetcher = ScriptedFetcher::new();
    let gate_a = fetcher.gate();
    let gate_b = fetcher.gate();
    let list = collection(&fetcher, 10);

    let a = tokio::spawn({
        let list = list.clone();
        async move { list.refresh(None).await }
    });
    fetcher.wait_for_requests(1).await;
    let b = tokio::spawn({
        let list = list.clone();
        async move { list.refresh(None).await }
    });
    fetcher.wait_for_requests(2).await;

    gate_a.release(page(&["A"], 1, 1));
    a.await.unwrap();
    // the superseded fetch leaves the flags to the one still running
    let state = list.snapshot();
    assert!(state.items.is_empty());
    assert!(state.is_loading && state.is_fetching);

    gate_b.release(page(&["B"], 1, 1));
    b.await.unwrap();
    let state = list.snapshot();
    assert_eq!(ids(&list), ["B"]);
    assert!(!state.is_loading && !state.is_fetching);
}

#[tokio::test]
async fn test_load_more_while_loading_is_ignored() {
    let fetcher = ScriptedFetcher::new();
    let gate = fetcher.gate();
    let list = collection(&fetcher, 2);

    let initial = tokio::spawn({
        let list = list.clone();
        async move { list.load_initial(None, None, SortOption::default()).await }
    });
    fetcher.wait_for_requests(1).await;
    assert!(list.snapshot().is_loading);

    list.load_more(&incident("anything")).await;
    assert_eq!(fetcher.request_count(), 1);

    gate.release(page(&["A", "B"], 4, 2));
    initial.await.unwrap();
    assert_eq!(ids(&list), ["A", "B"]);
    assert_eq!(list.metrics().load_more_skipped, 1);
}

#[tokio::test]
async fn test_refresh_discards_in_flight_load_more() {
    let fetcher = ScriptedFetcher::new();
    fetcher.respond(page(&["A", "B"], 4, 2));
    let list = collection(&fetcher, 2);
    list.load_initial(None, None, SortOption::default()).await;

    let gate = fetcher.gate();
    fetcher.respond(page(&["Z"], 1, 1));
    let more = tokio::spawn({
        let list = list.clone();
        async move { list.load_more(&incident("B")).await }
    });
    fetcher.wait_for_requests(2).await;

    list.refresh(None).await;
    gate.release(page(&["C", "D"], 4, 4));
    more.await.unwrap();

    assert_eq!(ids(&list), ["Z"]);
    assert!(!list.snapshot().has_more);
}

#[tokio::test]
async fn test_cancel_all_discards_in_flight_fetch() {
    let fetcher = ScriptedFetcher::new();
    let gate = fetcher.gate();
    let list = collection(&fetcher, 10);

    let initial = tokio::spawn({
        let list = list.clone();
        async move { list.load_initial(None, None, SortOption::default()).await }
    });
    fetcher.wait_for_requests(1).await;

    list.cancel_all();
    let state = list.snapshot();
    assert!(!state.is_loading && !state.is_fetching);

    gate.release(page(&["A"], 1, 1));
    initial.await.unwrap();
    assert!(list.snapshot().items.is_empty());
    assert_eq!(list.metrics().fetches_discarded, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_searches_fire_once() {
    let fetcher = ScriptedFetcher::new();
    fetcher.respond(page(&["leak-1"], 1, 1));
    let list = collection(&fetcher, 10);

    let first = list.search("l");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = list.search("le");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let third = list.search("leak");

    first.await.unwrap();
    second.await.unwrap();
    third.await.unwrap();

    assert_eq!(fetcher.request_count(), 1);
    assert_eq!(fetcher.requests()[0].search.as_deref(), Some("leak"));
    assert_eq!(list.snapshot().search_query.as_deref(), Some("leak"));
    assert_eq!(ids(&list), ["leak-1"]);
    assert_eq!(list.metrics().searches_debounced, 2);
}

#[tokio::test(start_paused = true)]
async fn test_search_waits_for_quiet_interval() {
    let fetcher = ScriptedFetcher::new();
    fetcher.respond(page(&["A"], 1, 1));
    let list = collection(&fetcher, 10);
    let started = tokio::time::Instant::now();

    let handle = list.search("ann");
    tokio::time::sleep(Duration::from_millis(499)).await;
    assert_eq!(fetcher.request_count(), 0);

    handle.await.unwrap();
    assert_eq!(fetcher.request_count(), 1);
    assert!(started.elapsed() >= list.config().search_debounce());
}

#[tokio::test(start_paused = true)]
async fn test_spaced_searches_both_fire() {
    let fetcher = ScriptedFetcher::new();
    fetcher.respond(page(&["A"], 1, 1));
    fetcher.respond(page(&["B"], 1, 1));
    let list = collection(&fetcher, 10);

    list.search("a").await.unwrap();
    list.search("b").await.unwrap();

    let searches: Vec<_> = fetcher
        .requests()
        .into_iter()
        .map(|r| r.search)
        .collect();
    assert_eq!(searches, [Some("a".to_string()), Some("b".to_string())]);
    assert_eq!(ids(&list), ["B"]);
}

#[tokio::test(start_paused = true)]
async fn test_blank_search_clears_query() {
    let fetcher = ScriptedFetcher::new();
    fetcher.respond(page(&["A"], 1, 1));
    fetcher.respond(page(&["A", "B"], 2, 2));
    let list = collection(&fetcher, 10);

    list.load_initial(Some("leak".into()), None, SortOption::default())
        .await;
    list.search("   ").await.unwrap();

    assert_eq!(fetcher.requests()[1].search, None);
    assert_eq!(list.snapshot().search_query, None);
    assert_eq!(ids(&list), ["A", "B"]);
}

#[tokio::test(start_paused = true)]
async fn test_newer_search_supersedes_fired_search() {
    let fetcher = ScriptedFetcher::new();
    let gate = fetcher.gate();
    fetcher.respond(page(&["drain-1"], 1, 1));
    let list = collection(&fetcher, 10);

    let older = list.search("dr");
    fetcher.wait_for_requests(1).await;
    list.search("drain").await.unwrap();

    gate.release(page(&["dr-1", "dr-2"], 2, 2));
    older.await.unwrap();

    assert_eq!(ids(&list), ["drain-1"]);
    assert_eq!(list.snapshot().search_query.as_deref(), Some("drain"));
}
