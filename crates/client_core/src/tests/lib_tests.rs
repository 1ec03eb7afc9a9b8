use super::*;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{Role, ShipmentStatus, StatusFilter},
    protocol::AccountType,
};
use tokio::{net::TcpListener, sync::Mutex};

const TOKEN: &str = "jwt-abc";

#[derive(Clone, Default)]
struct BackendState {
    authorizations: Arc<Mutex<Vec<Option<String>>>>,
    wallet_links: Arc<Mutex<Vec<Value>>>,
    profile_updates: Arc<Mutex<Vec<Value>>>,
    created: Arc<Mutex<Vec<Value>>>,
    reject_profile_update: bool,
}

impl BackendState {
    async fn record_auth(&self, headers: &HeaderMap) -> bool {
        let value = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let ok = value.as_deref() == Some("Bearer jwt-abc");
        self.authorizations.lock().await.push(value);
        ok
    }
}

fn user_json(role: &str) -> Value {
    json!({
        "id": "u-1",
        "email": "ada@example.com",
        "first_name": "Ada",
        "last_name": "Okafor",
        "country": "NG",
        "role": role,
        "shipper_id": "sh-1",
        "wallet_connected": false
    })
}

fn shipment_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "status": status,
        "origin": { "postal_code": "10115", "city": "Berlin", "country": "DE" },
        "destination": { "postal_code": "20095", "city": "Hamburg", "country": "DE" },
        "cargo_load": 7.25,
        "created_at": "2024-10-01T10:00:00Z",
        "estimated_delivery_date": "2024-10-03T10:00:00Z",
        "distance": 289.0,
        "cargo_type": "electronics"
    })
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Missing Authorization Header" })),
    )
}

async fn handle_login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "Secret123" {
        (
            StatusCode::OK,
            Json(json!({ "message": "Logged in.", "data": user_json("shipper"), "token": TOKEN })),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": 400, "message": "Invalid email or password.", "error": "400 Bad Request" })),
        )
    }
}

async fn handle_register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let role = body["role"].as_str().unwrap_or("shipper").to_string();
    // Registration without a token in the body simulates a cookie-only backend.
    if body["email"] == "cookie@example.com" {
        return (StatusCode::CREATED, Json(json!({ "data": user_json(&role) })));
    }
    (
        StatusCode::CREATED,
        Json(json!({ "data": user_json(&role), "token": TOKEN })),
    )
}

async fn handle_logout(State(state): State<BackendState>, headers: HeaderMap) -> StatusCode {
    state.record_auth(&headers).await;
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn handle_profile_update(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !state.record_auth(&headers).await {
        return unauthorized();
    }
    if state.reject_profile_update {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Internal Server Error" })),
        );
    }
    let role = body["role"].as_str().unwrap_or("shipper").to_string();
    state.profile_updates.lock().await.push(body);
    let mut user = user_json(&role);
    user["first_name"] = json!("Updated");
    (StatusCode::OK, Json(json!({ "data": user })))
}

async fn handle_wallet(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !state.record_auth(&headers).await {
        return unauthorized();
    }
    state.wallet_links.lock().await.push(body);
    (StatusCode::OK, Json(json!({ "data": {} })))
}

async fn handle_create_shipment(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !state.record_auth(&headers).await {
        return unauthorized();
    }
    if body["origin_code"] == "00000" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Unknown postal code." })),
        );
    }
    state.created.lock().await.push(body);
    (
        StatusCode::CREATED,
        Json(json!({ "data": { "shipment": shipment_json("new-1", "waiting") } })),
    )
}

async fn handle_all_shipments(
    State(state): State<BackendState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !state.record_auth(&headers).await {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({ "data": [shipment_json("a", "active"), shipment_json("b", "delivered")] })),
    )
}

async fn spawn_backend(state: BackendState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/users/auth/login", post(handle_login))
        .route("/users/auth/register", post(handle_register))
        .route("/users/auth/logout", post(handle_logout))
        .route("/users/update", put(handle_profile_update))
        .route("/user/wallet", post(handle_wallet))
        .route("/shipment", post(handle_create_shipment))
        .route("/shipments/shipper/:id", get(handle_all_shipments))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn signed_in_client(state: BackendState) -> (MarketplaceClient, Arc<MemorySessionStore>) {
    let base = spawn_backend(state).await;
    let store = Arc::new(MemorySessionStore::new());
    let client = MarketplaceClient::new(base, SessionState::new(store.clone()));
    client
        .login("ada@example.com", "Secret123")
        .await
        .expect("login");
    (client, store)
}

fn individual_shipper_flow() -> OnboardingFlowController {
    let mut flow = OnboardingFlowController::new();
    flow.choose_actor_kind(ActorKind::Individual).expect("kind");
    flow.advance().expect("step 2");
    flow.choose_sub_role(Role::Shipper).expect("role");
    flow.advance().expect("step 3");
    flow
}

#[tokio::test]
async fn login_persists_token_and_user() {
    let (client, store) = signed_in_client(BackendState::default()).await;

    let stored = store.load().await.expect("load").expect("session");
    assert_eq!(stored.token, TOKEN);
    assert_eq!(stored.user.role, Some(Role::Shipper));
    assert!(client.session().is_logged_in().await);
}

#[tokio::test]
async fn failed_login_surfaces_server_message() {
    let base = spawn_backend(BackendState::default()).await;
    let client = MarketplaceClient::new(
        base,
        SessionState::new(Arc::new(MemorySessionStore::new())),
    );

    let err = client
        .login("ada@example.com", "wrong")
        .await
        .expect_err("bad password");
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.to_string(), "Invalid email or password.");
    assert!(!client.session().is_logged_in().await);
}

#[tokio::test]
async fn register_starts_a_session() {
    let base = spawn_backend(BackendState::default()).await;
    let client = MarketplaceClient::new(
        base,
        SessionState::new(Arc::new(MemorySessionStore::new())),
    );

    let user = client
        .register(&RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Okafor".into(),
            email: "ada@example.com".into(),
            password: "Secret123".into(),
            country: "NG".into(),
            role: Role::Carrier,
        })
        .await
        .expect("register");
    assert_eq!(user.role, Some(Role::Carrier));
    assert_eq!(client.session().token().await.as_deref(), Some(TOKEN));
}

#[tokio::test]
async fn register_without_token_is_rejected() {
    let base = spawn_backend(BackendState::default()).await;
    let client = MarketplaceClient::new(
        base,
        SessionState::new(Arc::new(MemorySessionStore::new())),
    );

    let err = client
        .register(&RegisterRequest {
            first_name: "C".into(),
            last_name: "K".into(),
            email: "cookie@example.com".into(),
            password: "Secret123".into(),
            country: "DE".into(),
            role: Role::Shipper,
        })
        .await
        .expect_err("no token");
    assert!(matches!(err, ClientError::MissingToken));
    assert!(!client.session().is_logged_in().await);
}

#[tokio::test]
async fn logout_clears_session_even_if_server_fails() {
    let state = BackendState::default();
    let (client, store) = signed_in_client(state.clone()).await;

    client.logout().await.expect("logout");
    assert!(!client.session().is_logged_in().await);
    assert!(store.load().await.expect("load").is_none());
    assert_eq!(
        state.authorizations.lock().await.as_slice(),
        &[Some(format!("Bearer {TOKEN}"))]
    );
}

#[tokio::test]
async fn authorized_calls_require_a_session() {
    let base = spawn_backend(BackendState::default()).await;
    let client = MarketplaceClient::new(
        base,
        SessionState::new(Arc::new(MemorySessionStore::new())),
    );

    let err = client
        .create_shipment(&CreateShipmentRequest {
            origin_code: "10115".into(),
            destination_code: "20095".into(),
            cargo_load: 1.0,
        })
        .await
        .expect_err("no session");
    assert!(matches!(err, ClientError::NotSignedIn));
    assert!(matches!(
        client.logout().await,
        Err(ClientError::NotSignedIn)
    ));
}

#[tokio::test]
async fn create_and_track_appends_created_shipment() {
    let state = BackendState::default();
    let (client, _) = signed_in_client(state.clone()).await;
    let store = ShipmentStatusStore::new(Arc::new(client.shipment_source().await));
    store.set_error("previous failure").await;

    let shipment = create_and_track_shipment(
        &client,
        &store,
        &ShipmentDraft {
            origin_code: "10115".into(),
            destination_code: "20095".into(),
            cargo_load: 7.25,
        },
    )
    .await
    .expect("created");

    assert_eq!(shipment.status, ShipmentStatus::Waiting);
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.shipments, vec![shipment]);
    assert_eq!(snapshot.error, None);

    let created = state.created.lock().await;
    assert_eq!(
        created[0],
        json!({ "origin_code": "10115", "destination_code": "20095", "cargo_load": 7.25 })
    );
}

#[tokio::test]
async fn invalid_draft_is_reported_through_the_store() {
    let state = BackendState::default();
    let (client, _) = signed_in_client(state.clone()).await;
    let store = ShipmentStatusStore::new(Arc::new(client.shipment_source().await));

    let err = create_and_track_shipment(
        &client,
        &store,
        &ShipmentDraft {
            origin_code: "10115".into(),
            destination_code: "20095".into(),
            cargo_load: 0.0,
        },
    )
    .await
    .expect_err("invalid load");

    assert!(matches!(err, ClientError::Draft(_)));
    assert_eq!(
        store.snapshot().await.error.as_deref(),
        Some("Cargo load must be a valid number greater than 0")
    );
    assert!(state.created.lock().await.is_empty());
}

#[tokio::test]
async fn rejected_creation_keeps_collection_and_sets_error() {
    let (client, _) = signed_in_client(BackendState::default()).await;
    let store = ShipmentStatusStore::new(Arc::new(client.shipment_source().await));

    let err = create_and_track_shipment(
        &client,
        &store,
        &ShipmentDraft {
            origin_code: "00000".into(),
            destination_code: "20095".into(),
            cargo_load: 1.0,
        },
    )
    .await
    .expect_err("rejected");

    assert_eq!(err.status(), Some(400));
    let snapshot = store.snapshot().await;
    assert!(snapshot.shipments.is_empty());
    assert_eq!(snapshot.error.as_deref(), Some("Unknown postal code."));
}

#[tokio::test]
async fn dashboard_fetch_sends_bearer_token() {
    let state = BackendState::default();
    let (client, _) = signed_in_client(state.clone()).await;
    let user = client.session().current().await.expect("session").user;
    let endpoints = ShipmentEndpoints::for_shipper(
        client.base_url(),
        user.shipper_id.expect("shipper id"),
    )
    .expect("endpoints");
    let store = ShipmentStatusStore::new(Arc::new(client.shipment_source().await));

    let outcome = store
        .fetch_shipments(StatusFilter::All, &endpoints.url(StatusFilter::All))
        .await;
    assert_eq!(outcome, FetchOutcome::Applied);
    assert_eq!(store.snapshot().await.shipments.len(), 2);
    assert_eq!(
        state.authorizations.lock().await.last().cloned().flatten(),
        Some(format!("Bearer {TOKEN}"))
    );
}

#[tokio::test]
async fn link_wallet_posts_address_and_chain() {
    let state = BackendState::default();
    let (client, _) = signed_in_client(state.clone()).await;
    let address =
        WalletAddress::parse("0x52908400098527886E0F7030069857D2E4169EE7").expect("address");

    client.link_wallet(&address, 80002).await.expect("link");
    let links = state.wallet_links.lock().await;
    assert_eq!(
        links[0],
        json!({ "address": "0x52908400098527886e0f7030069857d2e4169ee7", "chainId": 80002 })
    );
}

#[tokio::test]
async fn complete_onboarding_updates_profile_and_returns_route() {
    let state = BackendState::default();
    let (client, store) = signed_in_client(state.clone()).await;

    let route = complete_onboarding(&client, &individual_shipper_flow())
        .await
        .expect("complete");
    assert_eq!(route, DashboardRoute::Shipper);

    let updates = state.profile_updates.lock().await;
    assert_eq!(updates[0], json!({ "type": "individual", "role": "shipper" }));
    let stored = store.load().await.expect("load").expect("session");
    assert_eq!(stored.user.first_name, "Updated");
    assert_eq!(stored.token, TOKEN);
}

#[tokio::test]
async fn failed_onboarding_submission_leaves_flow_on_confirmation() {
    let state = BackendState {
        reject_profile_update: true,
        ..BackendState::default()
    };
    let (client, _) = signed_in_client(state).await;
    let flow = individual_shipper_flow();

    let err = complete_onboarding(&client, &flow)
        .await
        .expect_err("server error");
    assert_eq!(err.status(), Some(500));
    assert_eq!(flow.step(), WizardStep::Confirmation);
    assert_eq!(
        flow.profile_update().expect("retryable").account_type,
        AccountType::Individual
    );
}

#[tokio::test]
async fn incomplete_onboarding_is_not_submitted() {
    let state = BackendState::default();
    let (client, _) = signed_in_client(state.clone()).await;

    let err = complete_onboarding(&client, &OnboardingFlowController::new())
        .await
        .expect_err("not finished");
    assert!(matches!(
        err,
        ClientError::Onboarding(OnboardingError::NotAtTerminalStep { step: 1 })
    ));
    assert!(state.profile_updates.lock().await.is_empty());
}
