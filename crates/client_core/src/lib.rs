use std::sync::Arc;

use bid_ledger::WalletAddress;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Shipment, UserProfile},
    error::{ApiErrorBody, DraftError},
    protocol::{
        CreateShipmentRequest, CreatedShipment, DataEnvelope, LoginRequest, ProfileUpdate,
        RegisterRequest, ShipmentDraft, WalletLinkRequest,
    },
};
use thiserror::Error;
use tracing::{info, warn};

pub mod bids;
pub mod config;
pub mod onboarding;
pub mod session;
pub mod shipment_store;

pub use bids::{BidDirectory, BidError};
pub use onboarding::{
    ActorAnswers, ActorKind, DashboardRoute, OnboardingError, OnboardingFlowController,
    OrganizationDetails, StepView, WizardStep,
};
pub use session::{MemorySessionStore, Session, SessionState, SessionStore};
pub use shipment_store::{
    FetchError, FetchOutcome, HttpShipmentSource, ShipmentEndpoints, ShipmentSource,
    ShipmentStatusStore, StoreEvent, StoreSnapshot,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not signed in")]
    NotSignedIn,
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server did not return a session token")]
    MissingToken,
    #[error("session storage failed: {0:#}")]
    Session(anyhow::Error),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Onboarding(#[from] OnboardingError),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

/// REST client for the marketplace backend. The bearer token comes from the
/// injected [`SessionState`].
pub struct MarketplaceClient {
    http: Client,
    base_url: String,
    session: Arc<SessionState>,
}

impl MarketplaceClient {
    pub fn new(base_url: impl Into<String>, session: Arc<SessionState>) -> Self {
        Self::with_http(Client::new(), base_url, session)
    }

    pub fn with_http(http: Client, base_url: impl Into<String>, session: Arc<SessionState>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    /// Dashboard source carrying the current bearer token, if any.
    pub async fn shipment_source(&self) -> HttpShipmentSource {
        let source = HttpShipmentSource::new(self.http.clone());
        match self.session.token().await {
            Some(token) => source.with_bearer_token(token),
            None => source,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        let response = self
            .http
            .post(self.url("/users/auth/login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let user = self.start_session(response).await?;
        info!("auth: signed in as {}", user.email);
        Ok(user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ClientError> {
        let response = self
            .http
            .post(self.url("/users/auth/register"))
            .json(request)
            .send()
            .await?;
        let user = self.start_session(response).await?;
        info!("auth: registered {} as {}", user.email, request.role.as_str());
        Ok(user)
    }

    /// Ends the session locally even when the server call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let remote = match self.session.token().await {
            Some(token) => self
                .http
                .post(self.url("/users/auth/logout"))
                .bearer_auth(token)
                .send()
                .await
                .map_err(ClientError::from),
            None => return Err(ClientError::NotSignedIn),
        };
        self.session.sign_out().await.map_err(ClientError::Session)?;

        match remote {
            Ok(response) if !response.status().is_success() => {
                let err = api_error(response).await;
                warn!("auth: server rejected logout: {err}");
            }
            Ok(_) => {}
            Err(err) => warn!("auth: logout request failed: {err}"),
        }
        info!("auth: signed out");
        Ok(())
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ClientError> {
        let request = self.authorized(self.http.put(self.url("/users/update"))).await?;
        let envelope: DataEnvelope<UserProfile> =
            read_envelope(request.json(update).send().await?).await?;
        self.session
            .update_user(envelope.data.clone())
            .await
            .map_err(ClientError::Session)?;
        Ok(envelope.data)
    }

    pub async fn link_wallet(
        &self,
        address: &WalletAddress,
        chain_id: u64,
    ) -> Result<(), ClientError> {
        let request = self.authorized(self.http.post(self.url("/user/wallet"))).await?;
        let response = request
            .json(&WalletLinkRequest {
                address: address.to_string(),
                chain_id,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        info!("wallet: linked {address} on chain {chain_id}");
        Ok(())
    }

    pub async fn create_shipment(
        &self,
        request: &CreateShipmentRequest,
    ) -> Result<Shipment, ClientError> {
        let builder = self.authorized(self.http.post(self.url("/shipment"))).await?;
        let envelope: DataEnvelope<CreatedShipment> =
            read_envelope(builder.json(request).send().await?).await?;
        Ok(envelope.data.shipment)
    }

    async fn start_session(&self, response: Response) -> Result<UserProfile, ClientError> {
        let envelope: DataEnvelope<UserProfile> = read_envelope(response).await?;
        let token = envelope.token.ok_or(ClientError::MissingToken)?;
        self.session
            .sign_in(Session {
                token,
                user: envelope.data.clone(),
            })
            .await
            .map_err(ClientError::Session)?;
        Ok(envelope.data)
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.session.token().await.ok_or(ClientError::NotSignedIn)?;
        Ok(builder.bearer_auth(token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn read_envelope<T: DeserializeOwned>(
    response: Response,
) -> Result<DataEnvelope<T>, ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    Ok(response.json().await?)
}

async fn api_error(response: Response) -> ClientError {
    let status = response.status();
    let body = response.json::<ApiErrorBody>().await.unwrap_or_default();
    let message = body
        .message()
        .map(str::to_string)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Validates and submits the creation form. On success the new shipment is
/// appended to `store`; any failure is also shown through the store's error.
pub async fn create_and_track_shipment(
    client: &MarketplaceClient,
    store: &ShipmentStatusStore,
    draft: &ShipmentDraft,
) -> Result<Shipment, ClientError> {
    let request = match draft.validate() {
        Ok(request) => request,
        Err(err) => {
            store
                .set_error(err.first_message().unwrap_or("Shipment form is incomplete"))
                .await;
            return Err(err.into());
        }
    };

    match client.create_shipment(&request).await {
        Ok(shipment) => {
            store.set_error("").await;
            store.append_shipment(shipment.clone()).await;
            Ok(shipment)
        }
        Err(err) => {
            warn!("shipments: creation failed: {err}");
            store.set_error(err.to_string()).await;
            Err(err)
        }
    }
}

/// Sends the finished questionnaire to the profile endpoint and returns the
/// dashboard to open. On failure the flow is left on its confirmation step
/// so the caller can retry.
pub async fn complete_onboarding(
    client: &MarketplaceClient,
    flow: &OnboardingFlowController,
) -> Result<DashboardRoute, ClientError> {
    let destination = flow.compute_destination()?;
    let update = flow.profile_update()?;
    client.update_profile(&update).await?;
    info!("onboarding: profile completed, opening {}", destination.path());
    Ok(destination)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
