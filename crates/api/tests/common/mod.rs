//! Shared test harness: an in-memory [`DeliveryStore`], a scripted fake
//! provider, and a router builder that mirrors the production middleware
//! stack so integration tests exercise the same surface `main` serves.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use bullhorn_api::config::ServerConfig;
use bullhorn_api::engine::store::{DeliveryStore, StoreError};
use bullhorn_api::routes;
use bullhorn_api::state::AppState;
use bullhorn_core::types::{DbId, Timestamp};
use bullhorn_db::models::call_log::{CallLogEntry, NewCallLog};
use bullhorn_db::models::campaign::{Campaign, NewCampaign};
use bullhorn_db::models::contact::Contact;
use bullhorn_db::models::recipient::{Recipient, RecipientContact};
use bullhorn_db::models::status::{
    CallStatus, CampaignStatus, ChannelKind, RecipientStatus, StatusId,
};
use bullhorn_provider::{CallSnapshot, ProviderAdapter, ProviderError};

// ---------------------------------------------------------------------------
// In-memory delivery store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    campaigns: Vec<Campaign>,
    contacts: Vec<Contact>,
    recipients: Vec<Recipient>,
    call_logs: Vec<CallLogEntry>,
    next_id: DbId,
    /// Monotonic tick so `created_at` ordering is deterministic even when
    /// rows are created within the same instant.
    seq: i64,
}

impl Inner {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn next_time(&mut self) -> Timestamp {
        self.seq += 1;
        Utc::now() + chrono::Duration::milliseconds(self.seq)
    }
}

/// In-memory [`DeliveryStore`] mirroring the Postgres implementation's
/// keyed-update and terminal-protection semantics.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

fn recipient_terminal(status_id: StatusId) -> bool {
    RecipientStatus::from_id(status_id).is_some_and(RecipientStatus::is_terminal)
}

fn call_terminal(status_id: StatusId) -> bool {
    CallStatus::from_id(status_id).is_some_and(CallStatus::is_terminal)
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // --- Seeding ---

    pub fn seed_contact(&self, phone: &str) -> DbId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let now = inner.next_time();
        inner.contacts.push(Contact {
            id,
            name: None,
            phone_number: phone.to_string(),
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn seed_campaign(
        &self,
        kind: ChannelKind,
        message: Option<&str>,
        audio_url: Option<&str>,
    ) -> DbId {
        self.seed_campaign_with_status(kind, message, audio_url, CampaignStatus::Draft, None)
    }

    pub fn seed_campaign_with_status(
        &self,
        kind: ChannelKind,
        message: Option<&str>,
        audio_url: Option<&str>,
        status: CampaignStatus,
        scheduled_for: Option<Timestamp>,
    ) -> DbId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let now = inner.next_time();
        inner.campaigns.push(Campaign {
            id,
            name: format!("campaign-{id}"),
            kind_id: kind.id(),
            message: message.map(String::from),
            audio_url: audio_url.map(String::from),
            status_id: status.id(),
            scheduled_for,
            sent_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn seed_recipient(&self, campaign_id: DbId, contact_id: DbId) -> DbId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let now = inner.next_time();
        inner.recipients.push(Recipient {
            id,
            campaign_id,
            contact_id,
            status_id: RecipientStatus::Pending.id(),
            provider_message_id: None,
            sent_at: None,
            delivered_at: None,
            failed_at: None,
            error_message: None,
            created_at: now,
        });
        id
    }

    /// Force a recipient into `sent` at a given time, as if a dispatch ran
    /// then (used by sweep and SMS reconciliation tests).
    pub fn force_sent(&self, recipient_id: DbId, sent_at: Timestamp, message_id: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        let recipient = inner
            .recipients
            .iter_mut()
            .find(|r| r.id == recipient_id)
            .expect("unknown recipient");
        recipient.status_id = RecipientStatus::Sent.id();
        recipient.sent_at = Some(sent_at);
        recipient.provider_message_id = message_id.map(String::from);
    }

    pub fn seed_call_log(
        &self,
        campaign_id: DbId,
        contact_id: DbId,
        provider_call_id: &str,
        status: CallStatus,
    ) -> DbId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let now = inner.next_time();
        inner.call_logs.push(CallLogEntry {
            id,
            campaign_id,
            contact_id,
            provider_call_id: provider_call_id.to_string(),
            status_id: status.id(),
            answered: false,
            duration_seconds: 0,
            answered_at: None,
            ended_at: None,
            created_at: now,
        });
        id
    }

    // --- Inspection ---

    pub fn campaign_row(&self, id: DbId) -> Campaign {
        let inner = self.inner.lock().unwrap();
        inner
            .campaigns
            .iter()
            .find(|c| c.id == id)
            .expect("unknown campaign")
            .clone()
    }

    pub fn recipient_row(&self, id: DbId) -> Recipient {
        let inner = self.inner.lock().unwrap();
        inner
            .recipients
            .iter()
            .find(|r| r.id == id)
            .expect("unknown recipient")
            .clone()
    }

    pub fn recipients_for(&self, campaign_id: DbId) -> Vec<Recipient> {
        let inner = self.inner.lock().unwrap();
        inner
            .recipients
            .iter()
            .filter(|r| r.campaign_id == campaign_id)
            .cloned()
            .collect()
    }

    pub fn call_log_row(&self, provider_call_id: &str) -> Option<CallLogEntry> {
        let inner = self.inner.lock().unwrap();
        inner
            .call_logs
            .iter()
            .find(|l| l.provider_call_id == provider_call_id)
            .cloned()
    }

    pub fn call_logs_for(&self, campaign_id: DbId) -> Vec<CallLogEntry> {
        let inner = self.inner.lock().unwrap();
        inner
            .call_logs
            .iter()
            .filter(|l| l.campaign_id == campaign_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DeliveryStore for MemoryStore {
    async fn insert_campaign(&self, input: &NewCampaign) -> Result<Campaign, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let now = inner.next_time();
        let status = if input.scheduled_for.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Draft
        };
        let campaign = Campaign {
            id,
            name: input.name.clone(),
            kind_id: input.kind_id,
            message: input.message.clone(),
            audio_url: input.audio_url.clone(),
            status_id: status.id(),
            scheduled_for: input.scheduled_for,
            sent_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.campaigns.push(campaign.clone());
        Ok(campaign)
    }

    async fn campaign(&self, id: DbId) -> Result<Option<Campaign>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn try_begin_sending(&self, id: DbId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(campaign) = inner.campaigns.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        if campaign.status_id == CampaignStatus::Sending.id()
            || campaign.status_id == CampaignStatus::Completed.id()
        {
            return Ok(false);
        }
        campaign.status_id = CampaignStatus::Sending.id();
        campaign.sent_at = Some(Utc::now());
        campaign.updated_at = Utc::now();
        Ok(true)
    }

    async fn finish_campaign(&self, id: DbId, status: CampaignStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(campaign) = inner.campaigns.iter_mut().find(|c| c.id == id) {
            campaign.status_id = status.id();
            campaign.completed_at = Some(Utc::now());
            campaign.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn due_campaigns(&self, now: Timestamp) -> Result<Vec<Campaign>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut due: Vec<Campaign> = inner
            .campaigns
            .iter()
            .filter(|c| {
                c.status_id == CampaignStatus::Scheduled.id()
                    && c.scheduled_for.is_some_and(|t| t <= now)
            })
            .cloned()
            .collect();
        due.sort_by_key(|c| c.scheduled_for);
        Ok(due)
    }

    async fn insert_recipient(
        &self,
        campaign_id: DbId,
        contact_id: DbId,
    ) -> Result<Recipient, StoreError> {
        let id = self.seed_recipient(campaign_id, contact_id);
        Ok(self.recipient_row(id))
    }

    async fn pending_recipients(
        &self,
        campaign_id: DbId,
    ) -> Result<Vec<RecipientContact>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<RecipientContact> = inner
            .recipients
            .iter()
            .filter(|r| {
                r.campaign_id == campaign_id && r.status_id == RecipientStatus::Pending.id()
            })
            .map(|r| {
                let phone = inner
                    .contacts
                    .iter()
                    .find(|c| c.id == r.contact_id)
                    .map(|c| c.phone_number.clone())
                    .unwrap_or_default();
                RecipientContact {
                    id: r.id,
                    campaign_id: r.campaign_id,
                    contact_id: r.contact_id,
                    status_id: r.status_id,
                    phone_number: phone,
                    sent_at: r.sent_at,
                    created_at: r.created_at,
                }
            })
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn mark_recipient_sent(
        &self,
        id: DbId,
        provider_message_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(recipient) = inner.recipients.iter_mut().find(|r| r.id == id) {
            recipient.status_id = RecipientStatus::Sent.id();
            recipient.sent_at = Some(Utc::now());
            if let Some(mid) = provider_message_id {
                recipient.provider_message_id = Some(mid.to_string());
            }
        }
        Ok(())
    }

    async fn mark_recipient_failed(&self, id: DbId, error: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(recipient) = inner.recipients.iter_mut().find(|r| r.id == id) {
            recipient.status_id = RecipientStatus::Failed.id();
            recipient.failed_at = Some(Utc::now());
            recipient.error_message = Some(error.to_string());
        }
        Ok(())
    }

    async fn update_recipient_by_message_id(
        &self,
        message_id: &str,
        status: RecipientStatus,
        error: Option<&str>,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let mut changed = 0;
        for recipient in inner.recipients.iter_mut().filter(|r| {
            r.provider_message_id.as_deref() == Some(message_id)
                && !recipient_terminal(r.status_id)
        }) {
            apply_recipient_transition(recipient, status, error, true);
            changed += 1;
        }
        Ok(changed)
    }

    async fn update_recipient_by_campaign_contact(
        &self,
        campaign_id: DbId,
        contact_id: DbId,
        status: RecipientStatus,
        error: Option<&str>,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let mut changed = 0;
        for recipient in inner.recipients.iter_mut().filter(|r| {
            r.campaign_id == campaign_id
                && r.contact_id == contact_id
                && !recipient_terminal(r.status_id)
        }) {
            apply_recipient_transition(recipient, status, error, false);
            changed += 1;
        }
        Ok(changed)
    }

    async fn active_recipients_by_phone(
        &self,
        phone: &str,
    ) -> Result<Vec<RecipientContact>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let contact_ids: HashSet<DbId> = inner
            .contacts
            .iter()
            .filter(|c| c.phone_number == phone)
            .map(|c| c.id)
            .collect();
        let mut rows: Vec<RecipientContact> = inner
            .recipients
            .iter()
            .filter(|r| {
                contact_ids.contains(&r.contact_id)
                    && (r.status_id == RecipientStatus::Pending.id()
                        || r.status_id == RecipientStatus::Sent.id())
            })
            .map(|r| RecipientContact {
                id: r.id,
                campaign_id: r.campaign_id,
                contact_id: r.contact_id,
                status_id: r.status_id,
                phone_number: phone.to_string(),
                sent_at: r.sent_at,
                created_at: r.created_at,
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn stuck_recipients(&self, cutoff: Timestamp) -> Result<Vec<Recipient>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Recipient> = inner
            .recipients
            .iter()
            .filter(|r| {
                r.status_id == RecipientStatus::Sent.id() && r.sent_at.is_some_and(|t| t < cutoff)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.sent_at);
        Ok(rows)
    }

    async fn insert_call_log(&self, input: &NewCallLog) -> Result<CallLogEntry, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let now = inner.next_time();
        let log = CallLogEntry {
            id,
            campaign_id: input.campaign_id,
            contact_id: input.contact_id,
            provider_call_id: input.provider_call_id.clone(),
            status_id: input.status_id,
            answered: false,
            duration_seconds: 0,
            answered_at: None,
            ended_at: None,
            created_at: now,
        };
        inner.call_logs.push(log.clone());
        Ok(log)
    }

    async fn call_log(&self, provider_call_id: &str) -> Result<Option<CallLogEntry>, StoreError> {
        Ok(self.call_log_row(provider_call_id))
    }

    async fn call_log_for(
        &self,
        campaign_id: DbId,
        contact_id: DbId,
    ) -> Result<Option<CallLogEntry>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .call_logs
            .iter()
            .filter(|l| l.campaign_id == campaign_id && l.contact_id == contact_id)
            .max_by_key(|l| l.created_at)
            .cloned())
    }

    async fn update_call_status(
        &self,
        provider_call_id: &str,
        status: CallStatus,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let mut changed = 0;
        for log in inner.call_logs.iter_mut().filter(|l| {
            l.provider_call_id == provider_call_id && !call_terminal(l.status_id)
        }) {
            log.status_id = status.id();
            changed += 1;
        }
        Ok(changed)
    }

    async fn close_call(
        &self,
        provider_call_id: &str,
        status: CallStatus,
        answered: bool,
        duration_seconds: i32,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let mut changed = 0;
        for log in inner.call_logs.iter_mut().filter(|l| {
            l.provider_call_id == provider_call_id && !call_terminal(l.status_id)
        }) {
            log.status_id = status.id();
            log.answered = answered;
            log.duration_seconds = duration_seconds;
            log.answered_at = answered.then(Utc::now);
            log.ended_at = Some(Utc::now());
            changed += 1;
        }
        Ok(changed)
    }

    async fn healthy(&self) -> bool {
        true
    }
}

/// Mirror of the SQL transition columns: per-status timestamps plus
/// error COALESCE. The message-id path also stamps `sent_at`.
fn apply_recipient_transition(
    recipient: &mut Recipient,
    status: RecipientStatus,
    error: Option<&str>,
    stamp_sent: bool,
) {
    recipient.status_id = status.id();
    match status {
        RecipientStatus::Sent if stamp_sent => recipient.sent_at = Some(Utc::now()),
        RecipientStatus::Delivered => recipient.delivered_at = Some(Utc::now()),
        RecipientStatus::Failed => recipient.failed_at = Some(Utc::now()),
        _ => {}
    }
    if let Some(error) = error {
        recipient.error_message = Some(error.to_string());
    }
}

// ---------------------------------------------------------------------------
// Fake provider
// ---------------------------------------------------------------------------

/// One recorded provider send.
#[derive(Debug, Clone)]
pub struct FakeSend {
    pub kind: &'static str,
    pub to: String,
    pub provider_id: String,
}

/// Scripted [`ProviderAdapter`].
///
/// Every send sleeps briefly so concurrent sends within a batch overlap,
/// which makes the recorded high-water mark of in-flight sends equal the
/// dispatcher's batch width.
pub struct FakeProvider {
    delay: Duration,
    counter: AtomicUsize,
    inflight: AtomicUsize,
    max_inflight: AtomicUsize,
    fail_numbers: Mutex<HashSet<String>>,
    snapshots: Mutex<HashMap<String, CallSnapshot>>,
    sends: Mutex<Vec<FakeSend>>,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::from_millis(5),
            counter: AtomicUsize::new(0),
            inflight: AtomicUsize::new(0),
            max_inflight: AtomicUsize::new(0),
            fail_numbers: Mutex::new(HashSet::new()),
            snapshots: Mutex::new(HashMap::new()),
            sends: Mutex::new(Vec::new()),
        })
    }

    /// Make sends to this number fail with a provider rejection.
    pub fn fail_for(&self, number: &str) {
        self.fail_numbers.lock().unwrap().insert(number.to_string());
    }

    /// Script the snapshot returned for a call id poll.
    pub fn set_snapshot(&self, call_id: &str, snapshot: CallSnapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(call_id.to_string(), snapshot);
    }

    pub fn total_sends(&self) -> usize {
        self.sends.lock().unwrap().len()
    }

    pub fn sends(&self) -> Vec<FakeSend> {
        self.sends.lock().unwrap().clone()
    }

    /// Highest number of sends that were in flight at once.
    pub fn max_inflight(&self) -> usize {
        self.max_inflight.load(Ordering::SeqCst)
    }

    async fn track_send(
        &self,
        kind: &'static str,
        prefix: &str,
        to: &str,
    ) -> Result<String, ProviderError> {
        let now = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_inflight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inflight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_numbers.lock().unwrap().contains(to) {
            return Err(ProviderError::Api {
                code: Some("30007".into()),
                message: "Simulated provider rejection".into(),
            });
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let provider_id = format!("{prefix}{n:04}");
        self.sends.lock().unwrap().push(FakeSend {
            kind,
            to: to.to_string(),
            provider_id: provider_id.clone(),
        });
        Ok(provider_id)
    }
}

#[async_trait]
impl ProviderAdapter for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn send_message(&self, to: &str, _body: &str) -> Result<String, ProviderError> {
        self.track_send("sms", "SM", to).await
    }

    async fn initiate_call(
        &self,
        to: &str,
        _audio_url: &str,
        _callback_url: &str,
    ) -> Result<String, ProviderError> {
        self.track_send("call", "CA", to).await
    }

    async fn call_snapshot(&self, call_id: &str) -> Result<CallSnapshot, ProviderError> {
        self.snapshots
            .lock()
            .unwrap()
            .get(call_id)
            .cloned()
            .ok_or(ProviderError::Api {
                code: Some("20404".into()),
                message: format!("Unknown call: {call_id}"),
            })
    }
}

// ---------------------------------------------------------------------------
// App construction and request helpers
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults and fast dispatch timing.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        public_url: "http://localhost:3000".to_string(),
        cron_secret: None,
        provider: "fake".to_string(),
        dispatch_batch_size: 20,
        dispatch_batch_delay_ms: 1,
        sweep_interval_secs: 60,
        sweep_stuck_after_secs: 300,
    }
}

pub fn test_state(
    config: ServerConfig,
    store: Arc<MemoryStore>,
    provider: Arc<FakeProvider>,
) -> AppState {
    AppState::new(Arc::new(config), store, provider)
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app(store: Arc<MemoryStore>, provider: Arc<FakeProvider>) -> Router {
    build_app_with_config(test_config(), store, provider)
}

pub fn build_app_with_config(
    config: ServerConfig,
    store: Arc<MemoryStore>,
    provider: Arc<FakeProvider>,
) -> Router {
    let state = test_state(config, store, provider);

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

pub async fn get(app: Router, path: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_empty(app: Router, path: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, path: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_form(app: Router, path: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll the store until the campaign reaches a terminal status (the send
/// endpoint returns before the spawned dispatch finishes).
pub async fn wait_for_campaign_finish(store: &MemoryStore, campaign_id: DbId) -> Campaign {
    for _ in 0..200 {
        let campaign = store.campaign_row(campaign_id);
        let status = CampaignStatus::from_id(campaign.status_id);
        if matches!(
            status,
            Some(CampaignStatus::Completed) | Some(CampaignStatus::Failed)
        ) {
            return campaign;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("campaign {campaign_id} did not finish in time");
}
