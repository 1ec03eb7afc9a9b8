//! Dashboard shipment list and status-tab coordination.
//!
//! Every fetch fully replaces the collection. Each call takes a
//! request-sequence ticket; a response is applied only if no newer fetch has
//! been issued since, so the most recent tab click always wins. If the latest
//! fetch is dropped before it resolves, `loading` is still turned off.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{Shipment, ShipperId, StatusFilter},
    error::ApiErrorBody,
    protocol::DataEnvelope,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch shipments.";
pub const FETCH_UNEXPECTED_MESSAGE: &str = "An error occurred while fetching shipments.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("server responded with status {status}")]
    Status { status: u16, message: Option<String> },
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Decode(String),
}

impl FetchError {
    /// Text shown next to the dashboard tabs.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            FetchError::Status { message: None, .. } => FETCH_FAILED_MESSAGE.to_string(),
            FetchError::Transport(message) | FetchError::Decode(message) => {
                if message.trim().is_empty() {
                    FETCH_UNEXPECTED_MESSAGE.to_string()
                } else {
                    message.clone()
                }
            }
        }
    }
}

#[async_trait]
pub trait ShipmentSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<Shipment>, FetchError>;
}

/// Reads `{ data: Shipment[] }` from a dashboard endpoint.
#[derive(Clone)]
pub struct HttpShipmentSource {
    http: Client,
    bearer_token: Option<String>,
}

impl HttpShipmentSource {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

impl Default for HttpShipmentSource {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl ShipmentSource for HttpShipmentSource {
    async fn fetch(&self, url: &str) -> Result<Vec<Shipment>, FetchError> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ApiErrorBody>().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: body.message().map(str::to_string),
            });
        }

        let envelope: DataEnvelope<Vec<Shipment>> = response
            .json()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))?;
        Ok(envelope.data)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub shipments: Vec<Shipment>,
    pub active_status: StatusFilter,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum StoreEvent {
    Changed(StoreSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Failed,
    /// A newer fetch was issued while this one was in flight.
    Superseded,
}

struct StoreState {
    snapshot: StoreSnapshot,
    latest_request: u64,
}

pub struct ShipmentStatusStore {
    source: Arc<dyn ShipmentSource>,
    inner: Mutex<StoreState>,
    events: broadcast::Sender<StoreEvent>,
}

impl ShipmentStatusStore {
    pub fn new(source: Arc<dyn ShipmentSource>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            source,
            inner: Mutex::new(StoreState {
                snapshot: StoreSnapshot::default(),
                latest_request: 0,
            }),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state().snapshot.clone()
    }

    /// Switches the active tab and reloads it from `url`. The caller owns
    /// the filter-to-URL mapping (see [`ShipmentEndpoints`]).
    pub async fn fetch_shipments(&self, filter: StatusFilter, url: &str) -> FetchOutcome {
        let ticket = {
            let mut guard = self.state();
            guard.latest_request += 1;
            guard.snapshot.loading = true;
            guard.snapshot.active_status = filter;
            guard.snapshot.error = None;
            self.publish(&guard.snapshot);
            guard.latest_request
        };
        debug!(request = ticket, status = %filter, url, "fetching shipments");

        let mut pending = PendingFetch {
            store: self,
            ticket,
            armed: true,
        };
        let result = self.source.fetch(url).await;
        pending.armed = false;

        let mut guard = self.state();
        if guard.latest_request != ticket {
            debug!(
                request = ticket,
                latest = guard.latest_request,
                "discarding stale shipment response"
            );
            return FetchOutcome::Superseded;
        }

        let outcome = match result {
            Ok(shipments) => {
                debug!(request = ticket, count = shipments.len(), "shipments loaded");
                guard.snapshot.shipments = shipments;
                guard.snapshot.error = None;
                FetchOutcome::Applied
            }
            Err(err) => {
                warn!(request = ticket, status = %filter, error = %err, "shipment fetch failed");
                guard.snapshot.error = Some(err.user_message());
                FetchOutcome::Failed
            }
        };
        guard.snapshot.loading = false;
        self.publish(&guard.snapshot);
        outcome
    }

    /// Adds a freshly created shipment without refetching.
    pub async fn append_shipment(&self, shipment: Shipment) {
        let mut guard = self.state();
        guard.snapshot.shipments.push(shipment);
        self.publish(&guard.snapshot);
    }

    /// Surfaces a failure through the same channel as fetch errors. A blank
    /// message clears the error.
    pub async fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        let mut guard = self.state();
        guard.snapshot.error = if message.trim().is_empty() {
            None
        } else {
            Some(message)
        };
        self.publish(&guard.snapshot);
    }

    /// Never held across an `.await`.
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: &StoreSnapshot) {
        let _ = self.events.send(StoreEvent::Changed(snapshot.clone()));
    }
}

/// Clears `loading` when an in-flight fetch is dropped while it is still the
/// latest request.
struct PendingFetch<'a> {
    store: &'a ShipmentStatusStore,
    ticket: u64,
    armed: bool,
}

impl Drop for PendingFetch<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut guard = self.store.state();
        if guard.latest_request != self.ticket || !guard.snapshot.loading {
            return;
        }
        debug!(request = self.ticket, "shipment fetch dropped before completion");
        guard.snapshot.loading = false;
        self.store.publish(&guard.snapshot);
    }
}

/// Dashboard URLs for one shipper, one per status tab.
#[derive(Debug, Clone)]
pub struct ShipmentEndpoints {
    base: String,
    shipper_id: ShipperId,
}

impl ShipmentEndpoints {
    pub fn for_shipper(base_url: &str, shipper_id: ShipperId) -> Result<Self, url::ParseError> {
        let base = Url::parse(base_url)?;
        Ok(Self {
            base: base.as_str().trim_end_matches('/').to_string(),
            shipper_id,
        })
    }

    pub fn url(&self, filter: StatusFilter) -> String {
        let all = format!("{}/shipments/shipper/{}", self.base, self.shipper_id);
        match filter.status() {
            Some(status) => format!("{all}/{}", status.as_str()),
            None => all,
        }
    }

    pub fn tabs(&self) -> Vec<(StatusFilter, String)> {
        StatusFilter::ALL_TABS
            .into_iter()
            .map(|filter| (filter, self.url(filter)))
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/shipment_store_tests.rs"]
mod tests;
