use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::constants;
use crate::database::{Database, RepositoryError};
use crate::models::dashboard::{
    DashboardStats, EventLogEntry, PopularQuery, RecentProduct, SearchAnalytics, StatusCount,
};
use crate::models::tracking::{
    EventType, NewProduct, NewSupplyEvent, ProductDetails, ProductStatus, TrackingError,
    TrackingRecord,
};

/// Attempts at drawing a free `PRD` id before giving up
const ID_GENERATION_ATTEMPTS: usize = 5;

/// What one client currently has on screen.
///
/// Only the outcome of the most recently issued ticket is applied. A miss or
/// failure leaves the displayed record as it was and only sets the notice.
#[derive(Debug, Clone, Default)]
pub struct TrackingView {
    ticket: u64,
    record: Option<TrackingRecord>,
    notice: Option<String>,
}

impl TrackingView {
    pub fn begin(&mut self, ticket: u64) {
        self.ticket = ticket;
    }

    /// Returns false when `ticket` was superseded and the outcome dropped
    pub fn apply(&mut self, ticket: u64, outcome: &Result<TrackingRecord, TrackingError>) -> bool {
        if ticket != self.ticket {
            return false;
        }
        match outcome {
            Ok(record) => {
                self.record = Some(record.clone());
                self.notice = None;
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
        true
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn record(&self) -> Option<&TrackingRecord> {
        self.record.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}

/// Bounds on the per-client and per-query search state
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub max_sessions: usize,
    pub session_idle: Duration,
    pub max_tracked_queries: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_sessions: constants::MAX_SEARCH_SESSIONS,
            session_idle: Duration::from_secs(constants::SEARCH_SESSION_IDLE_SECS),
            max_tracked_queries: constants::MAX_TRACKED_QUERIES,
        }
    }
}

#[derive(Debug)]
struct ClientSession {
    view: TrackingView,
    in_flight: CancellationToken,
    last_seen: Instant,
}

/// Issues search tickets per client and cancels the search a newer one replaces
#[derive(Debug)]
pub struct SearchCoordinator {
    next_ticket: AtomicU64,
    sessions: Mutex<HashMap<String, ClientSession>>,
    max_sessions: usize,
    session_idle: Duration,
}

impl SearchCoordinator {
    pub fn new(limits: &SearchLimits) -> Self {
        Self {
            next_ticket: AtomicU64::new(0),
            sessions: Mutex::new(HashMap::new()),
            max_sessions: limits.max_sessions.max(1),
            session_idle: limits.session_idle,
        }
    }

    /// Start a search for `client`, cancelling whatever it had in flight
    pub async fn begin(&self, client: &str) -> (u64, CancellationToken) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        let now = Instant::now();

        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(client.to_string())
            .or_insert_with(|| ClientSession {
                view: TrackingView::default(),
                in_flight: CancellationToken::new(),
                last_seen: now,
            });
        session.in_flight.cancel();
        session.in_flight = token.clone();
        session.last_seen = now;
        session.view.begin(ticket);

        if sessions.len() > self.max_sessions {
            self.evict(&mut sessions, client);
        }
        (ticket, token)
    }

    /// Drop idle sessions first, then the least recently seen ones, until
    /// the map is back within bounds. `keep` is never dropped.
    fn evict(&self, sessions: &mut HashMap<String, ClientSession>, keep: &str) {
        let before = sessions.len();
        let idle = self.session_idle;
        sessions.retain(|key, session| key == keep || session.last_seen.elapsed() < idle);

        while sessions.len() > self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(key, _)| key.as_str() != keep)
                .min_by_key(|(_, session)| session.last_seen)
                .map(|(key, _)| key.clone());
            match oldest.and_then(|key| sessions.remove(&key)) {
                Some(session) => session.in_flight.cancel(),
                None => break,
            }
        }
        debug!(evicted = before - sessions.len(), "🧹 Search sessions pruned");
    }

    /// Apply an outcome to the client's view; false when it came too late
    pub async fn complete(
        &self,
        client: &str,
        ticket: u64,
        outcome: &Result<TrackingRecord, TrackingError>,
    ) -> bool {
        let mut sessions = self.sessions.lock().await;
        sessions
            .get_mut(client)
            .map(|session| {
                session.last_seen = Instant::now();
                session.view.apply(ticket, outcome)
            })
            .unwrap_or(false)
    }

    pub async fn view(&self, client: &str) -> Option<TrackingView> {
        let sessions = self.sessions.lock().await;
        sessions.get(client).map(|session| session.view.clone())
    }

    #[cfg(test)]
    async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Query counters behind the search analytics screen
#[derive(Debug)]
struct SearchStats {
    total: u64,
    by_query: HashMap<String, u64>,
    max_queries: usize,
}

impl SearchStats {
    fn new(max_queries: usize) -> Self {
        Self {
            total: 0,
            by_query: HashMap::new(),
            max_queries: max_queries.max(1),
        }
    }

    /// Count a normalized query. Past the bound, the least counted query
    /// makes room for a new one.
    fn record(&mut self, query: String) {
        self.total += 1;
        if let Some(count) = self.by_query.get_mut(&query) {
            *count += 1;
            return;
        }
        if self.by_query.len() >= self.max_queries {
            let rarest = self
                .by_query
                .iter()
                .min_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(q, _)| q.clone());
            if let Some(rarest) = rarest {
                self.by_query.remove(&rarest);
            }
        }
        self.by_query.insert(query, 1);
    }
}

/// Listing filters for `GET /api/products`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub query: Option<String>,
    pub status: Option<ProductStatus>,
    /// Substring of the current location
    pub location: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductSort {
    #[default]
    Newest,
    Oldest,
    Name,
}

/// Product registration, event logging and sequenced tracking lookups
#[derive(Clone)]
pub struct TrackingService {
    database: Database,
    coordinator: Arc<SearchCoordinator>,
    stats: Arc<Mutex<SearchStats>>,
}

impl std::fmt::Debug for TrackingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingService")
            .field("database", &self.database)
            .finish()
    }
}

impl TrackingService {
    pub fn new(database: Database) -> Self {
        Self::with_limits(database, SearchLimits::default())
    }

    pub fn with_limits(database: Database, limits: SearchLimits) -> Self {
        Self {
            database,
            coordinator: Arc::new(SearchCoordinator::new(&limits)),
            stats: Arc::new(Mutex::new(SearchStats::new(limits.max_tracked_queries))),
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn coordinator(&self) -> &SearchCoordinator {
        &self.coordinator
    }

    /// Look a product up on behalf of `client`.
    ///
    /// An exact id match wins, otherwise the first record whose id or name
    /// contains the query. A newer search from the same client cancels this
    /// one, which then fails with `Superseded`.
    #[instrument(skip(self))]
    pub async fn find(&self, client: &str, query: &str) -> Result<TrackingRecord, TrackingError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TrackingError::Validation(
                "Please enter a product ID to track".to_string(),
            ));
        }
        if query.chars().count() > constants::MAX_SEARCH_QUERY_LENGTH {
            return Err(TrackingError::Validation(format!(
                "Search query must be at most {} characters",
                constants::MAX_SEARCH_QUERY_LENGTH
            )));
        }

        self.count_search(query).await;
        let (ticket, cancelled) = self.coordinator.begin(client).await;
        debug!(ticket, query, "🔍 Tracking lookup started");

        let outcome = tokio::select! {
            _ = cancelled.cancelled() => Err(TrackingError::Superseded),
            result = self.lookup(query) => result,
        };

        if matches!(outcome, Err(TrackingError::Superseded)) {
            debug!(ticket, "⏭️ Tracking lookup superseded");
            return outcome;
        }
        if !self.coordinator.complete(client, ticket, &outcome).await {
            debug!(ticket, "⏭️ Tracking result arrived after a newer search");
            return Err(TrackingError::Superseded);
        }

        match &outcome {
            Ok(record) => info!(ticket, product_id = %record.product_id, "✅ Product found"),
            Err(TrackingError::NotFound { .. }) => info!(ticket, query, "📭 No product matches"),
            Err(e) => warn!(ticket, "⚠️ Tracking lookup failed: {}", e),
        }
        outcome
    }

    async fn lookup(&self, query: &str) -> Result<TrackingRecord, TrackingError> {
        let mut matches = self.database.products().search(query).await?;
        let exact = matches
            .iter()
            .position(|r| r.product_id.eq_ignore_ascii_case(query));
        match exact.or(if matches.is_empty() { None } else { Some(0) }) {
            Some(index) => Ok(matches.swap_remove(index)),
            None => Err(TrackingError::NotFound {
                query: query.to_string(),
            }),
        }
    }

    async fn count_search(&self, query: &str) {
        self.stats.lock().await.record(query.to_lowercase());
    }

    /// Exact, case-insensitive id lookup
    pub async fn get(&self, product_id: &str) -> Result<TrackingRecord, TrackingError> {
        self.database
            .products()
            .get(product_id.trim())
            .await?
            .ok_or_else(|| TrackingError::NotFound {
                query: product_id.trim().to_string(),
            })
    }

    pub async fn list(&self, filter: &ProductQuery) -> Result<Vec<TrackingRecord>, TrackingError> {
        let mut records = self.database.products().list().await?;
        if let Some(q) = non_blank(filter.query.as_deref()) {
            records.retain(|r| r.matches_text(&q));
        }
        if let Some(location) = non_blank(filter.location.as_deref()) {
            records.retain(|r| r.current_location().to_lowercase().contains(&location));
        }

        if let Some(status) = filter.status {
            records.retain(|r| r.current_status() == status);
        }
        match filter.sort {
            ProductSort::Newest => records.sort_by_key(|r| Reverse(r.created_at)),
            ProductSort::Oldest => records.sort_by_key(|r| r.created_at),
            ProductSort::Name => records.sort_by_key(|r| r.product_name.to_lowercase()),
        }
        Ok(records)
    }

    /// Register a product; its first event records the registration
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn register(&self, request: NewProduct) -> Result<TrackingRecord, TrackingError> {
        request.validate()?;

        let explicit_id = request.id.as_deref().map(|id| id.trim().to_string());
        let attempts = if explicit_id.is_some() { 1 } else { ID_GENERATION_ATTEMPTS };

        for _ in 0..attempts {
            let product_id = explicit_id.clone().unwrap_or_else(generate_product_id);
            let details = ProductDetails {
                product_id: product_id.clone(),
                product_name: request.name.trim().to_string(),
                description: request.description.trim().to_string(),
                manufacturer: request.manufacturer.trim().to_string(),
                category: request.category.clone(),
                batch_number: request.batch_number.clone(),
                expiry_date: request.expiry_date,
            };
            let record = TrackingRecord::register(details, request.location.trim(), Utc::now());

            match self.database.products().insert(record.clone()).await {
                Ok(()) => {
                    info!(product_id = %product_id, "📦 Product registered");
                    return Ok(record);
                }
                Err(RepositoryError::Duplicate(_)) if explicit_id.is_none() => {
                    debug!(product_id = %product_id, "Generated id taken, drawing another");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(TrackingError::Conflict(
            "Could not allocate a free product ID".to_string(),
        ))
    }

    /// Append an event; the record's status and location follow from it
    #[instrument(skip(self, request), fields(event_type = %request.event_type))]
    pub async fn log_event(
        &self,
        product_id: &str,
        request: NewSupplyEvent,
    ) -> Result<TrackingRecord, TrackingError> {
        request.validate()?;
        let record = self
            .database
            .products()
            .append_event(product_id.trim(), request.into_entry(Utc::now()))
            .await?;
        info!(
            product_id = %record.product_id,
            status = %record.current_status(),
            "📝 Supply event logged"
        );
        Ok(record)
    }

    /// Every event across products, newest first; planned events go last
    pub async fn event_log(
        &self,
        event_type: Option<EventType>,
    ) -> Result<Vec<EventLogEntry>, TrackingError> {
        let records = self.database.products().list().await?;
        let mut entries: Vec<EventLogEntry> = records
            .iter()
            .flat_map(|record| {
                record.events().iter().map(move |event| EventLogEntry {
                    id: event.id.clone(),
                    product_id: record.product_id.clone(),
                    product_name: record.product_name.clone(),
                    event_type: event.event_type,
                    location: event.location.clone(),
                    timestamp: event.timestamp,
                    description: event.description.clone(),
                    actor: event.actor.clone(),
                })
            })
            .filter(|entry| event_type.map_or(true, |t| entry.event_type == t))
            .collect();
        // None sorts below Some, so reversing puts planned events last
        entries.sort_by_key(|entry| Reverse(entry.timestamp));
        Ok(entries)
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, TrackingError> {
        let records = self.database.products().list().await?;
        let total_users = self.database.users().list().await?.len();
        let recent_events: Vec<EventLogEntry> = self
            .event_log(None)
            .await?
            .into_iter()
            .filter(|entry| entry.timestamp.is_some())
            .take(constants::RECENT_ITEMS_LIMIT)
            .collect();

        let by_status = ProductStatus::ALL
            .iter()
            .map(|&status| StatusCount {
                status,
                label: status.label(),
                count: records.iter().filter(|r| r.current_status() == status).count(),
            })
            .collect();

        let mut newest: Vec<&TrackingRecord> = records.iter().collect();
        newest.sort_by_key(|r| Reverse(r.created_at));
        let recent_products = newest
            .into_iter()
            .take(constants::RECENT_ITEMS_LIMIT)
            .map(|r| RecentProduct {
                product_id: r.product_id.clone(),
                product_name: r.product_name.clone(),
                status: r.current_status(),
                current_location: r.current_location().to_string(),
            })
            .collect();

        Ok(DashboardStats {
            total_products: records.len(),
            total_users,
            total_events: records.iter().map(|r| r.events().len()).sum(),
            active_products: records
                .iter()
                .filter(|r| !r.current_status().is_terminal())
                .count(),
            by_status,
            recent_products,
            recent_events,
        })
    }

    pub async fn search_analytics(&self) -> SearchAnalytics {
        let stats = self.stats.lock().await;
        let mut popular: Vec<PopularQuery> = stats
            .by_query
            .iter()
            .map(|(query, count)| PopularQuery {
                query: query.clone(),
                count: *count,
            })
            .collect();
        popular.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
        popular.truncate(constants::POPULAR_QUERIES_LIMIT);

        SearchAnalytics {
            total_searches: stats.total,
            popular_queries: popular,
        }
    }
}

/// `PRD` followed by six random digits
/// Lowercased, trimmed filter value; blank counts as absent
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn generate_product_id() -> String {
    format!("PRD{:06}", rand::thread_rng().gen_range(0..1_000_000))
}
