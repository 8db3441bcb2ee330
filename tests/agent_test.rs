use axum::http::HeaderMap;
use chrono::{NaiveDate, Utc};
use sitepulse::agent::{HttpTransport, MemoryStorage, Tracker, Transport};
use sitepulse::ingest::handler::AppState;
use sitepulse::ingest::payload::TrackPayload;
use sitepulse::query::range::DateInterval;
use sitepulse::server::build_router;
use sitepulse::storage::duckdb_store::DuckDbStore;
use sitepulse::storage::facts::DailyStat;
use sitepulse::storage::AnalyticsStore;
use std::sync::Arc;
use std::time::Duration;

/// Hands beacons straight to the ingestion pipeline, as the HTTP handler would.
struct InProcessTransport(Arc<AppState>);

impl Transport for InProcessTransport {
    fn send(&self, payload: TrackPayload) {
        let _ = self.0.ingestor.ingest(&payload, &HeaderMap::new(), Utc::now());
    }
}

fn setup() -> (Arc<AppState>, Arc<DuckDbStore>) {
    let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
    let account = store.register_account("agent-key").unwrap();
    store.register_domain(&account, "docs.example").unwrap();
    (
        Arc::new(AppState::new(Arc::clone(&store), "agent-secret")),
        store,
    )
}

/// Every day from `start` through now, so a run crossing UTC midnight still
/// sees rows keyed to either day.
fn since(start: NaiveDate) -> DateInterval {
    DateInterval::new(start, Utc::now().date_naive())
}

fn totals(stats: &[DailyStat]) -> (u64, u64, u64) {
    stats.iter().fold((0, 0, 0), |(v, u, p), s| {
        (v + s.visits, u + s.unique_visitors, p + s.page_views)
    })
}

#[test]
fn test_tracker_session_and_navigation_reach_rollups() {
    let start = Utc::now().date_naive();
    let (state, store) = setup();
    let tracker = Tracker::new(
        Some("docs.example"),
        InProcessTransport(state),
        MemoryStorage::default(),
    )
    .with_user_agent("Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0");

    tracker.start("https://docs.example/getting-started");
    tracker.navigate("https://docs.example/reference");
    tracker.navigate("https://docs.example/reference#types");
    tracker.track("copy_snippet", None);

    let visits = store.visits("docs.example", since(start)).unwrap();
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].session_id, tracker.session_id());
    assert_eq!(visits[0].os, "Linux");

    let views = store.page_views("docs.example", since(start)).unwrap();
    let mut paths: Vec<_> = views.iter().map(|v| v.path.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, ["/getting-started", "/reference"]);

    let stats = store.daily_stats("docs.example", since(start)).unwrap();
    assert_eq!(totals(&stats), (1, 1, 2));
    // Custom beacons are acknowledged, never aggregated
    assert!(store.events("docs.example", since(start)).unwrap().is_empty());
}

#[test]
fn test_tracker_without_site_sends_nothing() {
    let start = Utc::now().date_naive();
    let (state, store) = setup();
    let tracker = Tracker::new(None, InProcessTransport(state), MemoryStorage::default());

    tracker.start("https://docs.example/");
    tracker.track_pageview();

    assert!(store.visits("docs.example", since(start)).unwrap().is_empty());
    assert!(store.page_views("docs.example", since(start)).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_http_transport_delivers_to_server() {
    let start = Utc::now().date_naive();
    let (state, store) = setup();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    let transport = HttpTransport::new(format!("http://{addr}/api/track"));
    let tracker = Tracker::new(Some("docs.example"), transport, MemoryStorage::default());
    tracker.start("https://docs.example/");

    let mut delivered = 0;
    for _ in 0..50 {
        delivered = store.page_views("docs.example", since(start)).unwrap().len();
        if delivered == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(delivered, 1);
}

#[test]
fn test_http_transport_unreachable_server_is_silent() {
    let tracker = Tracker::new(
        Some("docs.example"),
        HttpTransport::new("http://127.0.0.1:9/api/track"),
        MemoryStorage::default(),
    );
    tracker.start("https://docs.example/");
    tracker.track("anything", None);
    assert!(tracker.session_id().is_some());
}
