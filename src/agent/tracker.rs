use crate::agent::session::{SessionManager, SessionStorage};
use crate::agent::transport::Transport;
use crate::ingest::classifier::path_from_url;
use crate::ingest::payload::{TrackPayload, UtmParams, PAGEVIEW, SESSION_START};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Delay between a click and the path check, for routers that navigate asynchronously.
pub const CLICK_SETTLE_DELAY: Duration = Duration::from_millis(300);

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
enum PendingCall {
    PageView,
    Event {
        name: String,
        properties: Option<serde_json::Value>,
    },
}

#[derive(Debug, Default)]
struct PageState {
    ready: bool,
    url: String,
    last_path: Option<String>,
    queue: Vec<PendingCall>,
}

/// Native tracking agent bound to one site.
///
/// Calls made before [`Tracker::start`] are queued and replayed in order.
/// A tracker built without a site never touches the transport.
pub struct Tracker<T, S> {
    site: Option<String>,
    transport: T,
    sessions: SessionManager<S>,
    page: Mutex<PageState>,
    user_agent: Option<String>,
    settle_delay: Duration,
    clock: Clock,
}

impl<T: Transport, S: SessionStorage> Tracker<T, S> {
    pub fn new(site: Option<&str>, transport: T, storage: S) -> Self {
        let site = site.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        if site.is_none() {
            tracing::warn!("No site configured for tracker; tracking disabled");
        }
        Self {
            site,
            transport,
            sessions: SessionManager::new(storage),
            page: Mutex::new(PageState::default()),
            user_agent: None,
            settle_delay: CLICK_SETTLE_DELAY,
            clock: Arc::new(Utc::now),
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub const fn is_enabled(&self) -> bool {
        self.site.is_some()
    }

    pub fn session_id(&self) -> Option<String> {
        self.sessions.current_id()
    }

    /// Load the agent on `url`: record the initial page view, then replay
    /// anything queued before now.
    pub fn start(&self, url: &str) {
        if !self.is_enabled() {
            return;
        }
        let queued = {
            let mut page = self.page.lock();
            page.url = url.to_string();
            page.ready = true;
            std::mem::take(&mut page.queue)
        };

        self.track_pageview();
        for call in queued {
            match call {
                PendingCall::PageView => self.track_pageview(),
                PendingCall::Event { name, properties } => self.track(&name, properties),
            }
        }
    }

    /// Public call surface: record a custom event.
    pub fn track(&self, name: &str, properties: Option<serde_json::Value>) {
        if !self.is_enabled() || name.trim().is_empty() {
            return;
        }
        if self.defer(|| PendingCall::Event {
            name: name.to_string(),
            properties: properties.clone(),
        }) {
            return;
        }
        self.ensure_session();
        self.emit(name, properties);
    }

    pub fn track_event(&self, name: &str, properties: Option<serde_json::Value>) {
        self.track(name, properties);
    }

    pub fn track_pageview(&self) {
        if !self.is_enabled() || self.defer(|| PendingCall::PageView) {
            return;
        }
        self.ensure_session();
        {
            let mut page = self.page.lock();
            page.last_path = Some(path_from_url(&page.url));
        }
        self.emit(PAGEVIEW, None);
    }

    /// A history transition moved the page to `url`.
    pub fn navigate(&self, url: &str) {
        self.set_location(url);
        self.check_path_change();
    }

    /// The page location changed without a history event.
    pub fn set_location(&self, url: &str) {
        self.page.lock().url = url.to_string();
    }

    /// Wait for the settle delay after a click, then look for a route change.
    pub async fn after_click(&self) {
        if !self.is_enabled() {
            return;
        }
        tokio::time::sleep(self.settle_delay).await;
        self.check_path_change();
    }

    fn check_path_change(&self) {
        let changed = {
            let page = self.page.lock();
            page.ready && page.last_path.as_deref() != Some(path_from_url(&page.url).as_str())
        };
        if changed {
            self.track_pageview();
        }
    }

    /// Queue the call if the agent is not ready yet. Returns whether it was queued.
    fn defer(&self, call: impl FnOnce() -> PendingCall) -> bool {
        let mut page = self.page.lock();
        if page.ready {
            return false;
        }
        page.queue.push(call());
        true
    }

    fn ensure_session(&self) {
        let state = self.sessions.ensure_session((self.clock)());
        if state.is_new() {
            self.emit(SESSION_START, None);
        }
    }

    fn emit(&self, event: &str, properties: Option<serde_json::Value>) {
        let Some(site) = &self.site else {
            return;
        };
        let url = self.page.lock().url.clone();
        let payload = TrackPayload {
            domain: site.clone(),
            path: Some(path_from_url(&url)),
            event: event.to_string(),
            utm: UtmParams::from_url(&url),
            user_agent: self.user_agent.clone(),
            session_id: self.sessions.current_id(),
            properties,
            url,
            ..TrackPayload::default()
        };
        self.transport.send(payload);
    }
}
