// src/services/api_server.rs
//! API Server for the dgen DID registries
//!
//! This module exposes the resolver, the profile reads and the registry writes as a
//! JSON REST API built with Axum:
//! - identifier resolution (name, linked account, bare or prefixed subject)
//! - DID profiles with per-section errors and the caller's write access
//! - self-registration eligibility and registration
//! - key, service-account, linked-account and name management
//! - payment token allowance, faucet and transfers
//!
//! Failures are answered with `{"error": "..."}` and a status derived from the error
//! kind: 400 for bad input, 403 without write access, 503 without a signing wallet and
//! 502 when the chain call itself failed.

use crate::config::ContractAddresses;
use crate::contracts::Registry;
use crate::error::{DidError, Result};
use crate::identity::initial_input;
use crate::models::did::{parse_address, Did};
use crate::models::records::{NewKey, ServiceAccountRecord};
use crate::services::directory::Directory;
use crate::services::registrar::{LinkRequest, Registrar};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use ethers::types::{Address, H256, U256};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

// API request and response structures

/// Query parameters for resolution
#[derive(Deserialize)]
struct ResolveQuery {
    q: Option<String>,
    connected: Option<String>,
}

/// Query parameters for profile reads
#[derive(Deserialize)]
struct ProfileQuery {
    connected: Option<String>,
}

/// Request payload for registering a name
#[derive(Deserialize)]
struct NameRequest {
    name: String,
}

/// Request payload for approving a registry as spender
#[derive(Deserialize)]
struct AllowanceRequest {
    /// Defaults to the key registry
    spender: Option<Address>,
    /// Defaults to the registration fee
    #[serde(default, deserialize_with = "optional_amount")]
    amount: Option<U256>,
}

/// Request payload for sending payment tokens
#[derive(Deserialize)]
struct TransferRequest {
    to: Address,
    #[serde(deserialize_with = "amount")]
    amount: U256,
}

/// Token amount as sent by clients: a JSON number, a decimal string or a `0x` hex string
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountInput {
    Number(u64),
    Text(String),
}

fn parse_amount(input: AmountInput) -> std::result::Result<U256, String> {
    match input {
        AmountInput::Number(n) => Ok(U256::from(n)),
        AmountInput::Text(text) => {
            let text = text.trim();
            let parsed = match text.strip_prefix("0x") {
                Some(hex) if !hex.is_empty() => U256::from_str_radix(hex, 16).ok(),
                None if !text.is_empty() => U256::from_dec_str(text).ok(),
                _ => None,
            };
            parsed.ok_or_else(|| format!("invalid token amount: {text:?}"))
        }
    }
}

fn amount<'de, D>(deserializer: D) -> std::result::Result<U256, D::Error>
where
    D: serde::Deserializer<'de>,
{
    parse_amount(AmountInput::deserialize(deserializer)?).map_err(serde::de::Error::custom)
}

fn optional_amount<'de, D>(deserializer: D) -> std::result::Result<Option<U256>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<AmountInput>::deserialize(deserializer)?
        .map(parse_amount)
        .transpose()
        .map_err(serde::de::Error::custom)
}

/// Reads the optional `connected` query parameter.
fn connected_address(raw: Option<&str>) -> Result<Option<Address>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_address(raw)
            .map(Some)
            .ok_or_else(|| DidError::InvalidAddress(raw.to_string())),
    }
}

/// Response for every confirmed transaction
#[derive(Serialize, Deserialize)]
struct TxResponse {
    tx_hash: String,
}

/// API server state containing all service dependencies
pub struct ApiServer<R> {
    /// Read side: resolution, profiles, eligibility
    directory: Directory<R>,

    /// Write side: signed registry and token transactions
    registrar: Registrar<R>,

    /// Spender and amount used when an allowance request leaves them out
    default_spender: Address,
    required: U256,
}

impl<R: Registry> ApiServer<R> {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `registry` - Chain client implementing the registry reads and writes
    /// * `contracts` - Deployed contract addresses
    /// * `required` - Token amount the key registry pulls on registration
    pub fn new(registry: Arc<R>, contracts: ContractAddresses, required: U256) -> Self {
        ApiServer {
            directory: Directory::new(registry.clone(), contracts.key_registry, required),
            registrar: Registrar::new(registry, contracts),
            default_spender: contracts.key_registry,
            required,
        }
    }

    /// Builds the route table.
    pub fn router(self) -> Router {
        Router::new()
            .route("/resolve", get(Self::resolve_handler))
            .route("/did/:did", get(Self::profile_handler))
            .route("/registration/:address", get(Self::registration_handler))
            .route("/register", post(Self::register_handler))
            .route("/did/:did/keys", post(Self::add_key_handler))
            .route("/did/:did/keys/:id", delete(Self::remove_key_handler))
            .route("/did/:did/service-accounts", post(Self::add_service_account_handler))
            .route(
                "/did/:did/service-accounts/:id",
                delete(Self::remove_service_account_handler),
            )
            .route("/did/:did/linked-accounts", post(Self::link_account_handler))
            .route(
                "/did/:did/linked-accounts/:id",
                delete(Self::unlink_account_handler),
            )
            .route(
                "/did/:did/name",
                put(Self::register_name_handler).delete(Self::unregister_name_handler),
            )
            .route("/allowance", post(Self::allowance_handler))
            .route("/faucet", post(Self::faucet_handler))
            .route("/transfer", post(Self::transfer_handler))
            .with_state(Arc::new(self))
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    pub async fn run(self, addr: SocketAddr) -> std::io::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server running at http://{addr}");
        axum::serve(listener, app).await
    }

    // =====================
    // Resolution & Profiles
    // =====================

    /// Resolves a user-entered identifier
    ///
    /// # Endpoint
    /// GET /resolve?q=&connected=
    ///
    /// Without `q` the connected wallet's own DID is resolved.
    ///
    /// # Responses
    /// - 200 OK: Returns the session snapshot (input, resolution, lookups)
    /// - 400 Bad Request: Malformed `connected` address
    async fn resolve_handler(
        State(state): State<Arc<Self>>,
        Query(query): Query<ResolveQuery>,
    ) -> Response {
        let connected = match connected_address(query.connected.as_deref()) {
            Ok(connected) => connected,
            Err(e) => return error_response(e),
        };
        let input = initial_input(query.q.as_deref(), connected);
        let session = state.directory.session(&input);
        let snapshot = session.search(&input).await;
        (StatusCode::OK, Json(snapshot)).into_response()
    }

    /// Loads a DID profile
    ///
    /// # Endpoint
    /// GET /did/:did?connected=
    ///
    /// # Responses
    /// - 200 OK: Returns the profile; unreadable sections carry their own error
    /// - 400 Bad Request: Malformed DID or `connected` address
    async fn profile_handler(
        State(state): State<Arc<Self>>,
        Path(did): Path<String>,
        Query(query): Query<ProfileQuery>,
    ) -> Response {
        let document = match (Did::parse(&did), connected_address(query.connected.as_deref())) {
            (Ok(did), Ok(connected)) => state.directory.document(&did, connected).await,
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        match document {
            Ok(document) => (StatusCode::OK, Json(document)).into_response(),
            Err(e) => error_response(e),
        }
    }

    /// Reports what an address must do before self-registering
    ///
    /// # Endpoint
    /// GET /registration/:address
    async fn registration_handler(
        State(state): State<Arc<Self>>,
        Path(address): Path<String>,
    ) -> Response {
        let Some(address) = parse_address(&address) else {
            return error_response(DidError::InvalidAddress(address));
        };
        let status = state.directory.registration_status(Some(address)).await;
        (StatusCode::OK, Json(status)).into_response()
    }

    // =====================
    // DID Management Handlers
    // =====================

    /// Registers the signing wallet's DID with its default key
    ///
    /// # Endpoint
    /// POST /register
    async fn register_handler(State(state): State<Arc<Self>>) -> Response {
        tx_response(state.registrar.register().await)
    }

    /// Adds a key to a DID
    ///
    /// # Endpoint
    /// POST /did/:did/keys
    ///
    /// # Request Body
    /// `{ "id", "key_type", "key_usages": ["0x…"], "public_key": "0x…", "sudo" }`
    async fn add_key_handler(
        State(state): State<Arc<Self>>,
        Path(did): Path<String>,
        Json(payload): Json<NewKey>,
    ) -> Response {
        let did = match Did::parse(&did) {
            Ok(did) => did,
            Err(e) => return error_response(e),
        };
        tx_response(state.registrar.add_key(&did, payload).await)
    }

    /// Revokes a key
    ///
    /// # Endpoint
    /// DELETE /did/:did/keys/:id
    async fn remove_key_handler(
        State(state): State<Arc<Self>>,
        Path((did, id)): Path<(String, String)>,
    ) -> Response {
        let did = match Did::parse(&did) {
            Ok(did) => did,
            Err(e) => return error_response(e),
        };
        tx_response(state.registrar.remove_key(&did, &id).await)
    }

    /// Adds a service account
    ///
    /// # Endpoint
    /// POST /did/:did/service-accounts
    async fn add_service_account_handler(
        State(state): State<Arc<Self>>,
        Path(did): Path<String>,
        Json(payload): Json<ServiceAccountRecord>,
    ) -> Response {
        let did = match Did::parse(&did) {
            Ok(did) => did,
            Err(e) => return error_response(e),
        };
        tx_response(state.registrar.add_service_account(&did, payload).await)
    }

    /// DELETE /did/:did/service-accounts/:id
    async fn remove_service_account_handler(
        State(state): State<Arc<Self>>,
        Path((did, id)): Path<(String, String)>,
    ) -> Response {
        let did = match Did::parse(&did) {
            Ok(did) => did,
            Err(e) => return error_response(e),
        };
        tx_response(state.registrar.remove_service_account(&did, &id).await)
    }

    /// Links an account to a DID
    ///
    /// # Endpoint
    /// POST /did/:did/linked-accounts
    ///
    /// # Request Body
    /// `{ "id", "account", "purpose", "signature"? }`; the signature is the account's
    /// consent and may be left out only when the account is the signing wallet.
    async fn link_account_handler(
        State(state): State<Arc<Self>>,
        Path(did): Path<String>,
        Json(payload): Json<LinkRequest>,
    ) -> Response {
        let did = match Did::parse(&did) {
            Ok(did) => did,
            Err(e) => return error_response(e),
        };
        tx_response(state.registrar.link_account(&did, payload).await)
    }

    /// DELETE /did/:did/linked-accounts/:id
    async fn unlink_account_handler(
        State(state): State<Arc<Self>>,
        Path((did, id)): Path<(String, String)>,
    ) -> Response {
        let did = match Did::parse(&did) {
            Ok(did) => did,
            Err(e) => return error_response(e),
        };
        tx_response(state.registrar.unlink_account(&did, &id).await)
    }

    /// PUT /did/:did/name
    async fn register_name_handler(
        State(state): State<Arc<Self>>,
        Path(did): Path<String>,
        Json(payload): Json<NameRequest>,
    ) -> Response {
        let did = match Did::parse(&did) {
            Ok(did) => did,
            Err(e) => return error_response(e),
        };
        tx_response(state.registrar.register_name(&did, &payload.name).await)
    }

    /// DELETE /did/:did/name
    async fn unregister_name_handler(
        State(state): State<Arc<Self>>,
        Path(did): Path<String>,
    ) -> Response {
        let did = match Did::parse(&did) {
            Ok(did) => did,
            Err(e) => return error_response(e),
        };
        tx_response(state.registrar.unregister_name(&did).await)
    }

    // =====================
    // Payment Token
    // =====================

    /// Approves a registry to pull payment tokens
    ///
    /// # Endpoint
    /// POST /allowance
    async fn allowance_handler(
        State(state): State<Arc<Self>>,
        Json(payload): Json<AllowanceRequest>,
    ) -> Response {
        let spender = payload.spender.unwrap_or(state.default_spender);
        let amount = payload.amount.unwrap_or(state.required);
        tx_response(state.registrar.approve(spender, amount).await)
    }

    /// POST /faucet
    async fn faucet_handler(State(state): State<Arc<Self>>) -> Response {
        tx_response(state.registrar.request_tokens().await)
    }

    /// POST /transfer
    async fn transfer_handler(
        State(state): State<Arc<Self>>,
        Json(payload): Json<TransferRequest>,
    ) -> Response {
        tx_response(state.registrar.transfer(payload.to, payload.amount).await)
    }
}

fn tx_response(result: Result<H256>) -> Response {
    match result {
        Ok(tx_hash) => {
            debug!("answered with {tx_hash:?}");
            (
                StatusCode::OK,
                Json(TxResponse { tx_hash: format!("0x{:x}", tx_hash) }),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

fn status_for(err: &DidError) -> StatusCode {
    match err {
        DidError::InvalidAddress(_)
        | DidError::InvalidDid(_)
        | DidError::Validation(_)
        | DidError::Signature(_) => StatusCode::BAD_REQUEST,
        DidError::Forbidden(_) => StatusCode::FORBIDDEN,
        DidError::NoSigner | DidError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        DidError::Provider(_)
        | DidError::Contract(_)
        | DidError::Reverted(_)
        | DidError::Abi(_)
        | DidError::Transaction(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: DidError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        warn!("request failed: {err}");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::directory::tests::{alice, FakeRegistry};
    use crate::services::registrar::tests::contracts;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app(registry: FakeRegistry) -> (Arc<FakeRegistry>, Router) {
        let registry = Arc::new(registry);
        let server = ApiServer::new(registry.clone(), contracts(), U256::from(100));
        (registry, server.router())
    }

    async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn did_path() -> String {
        format!("/did/{}", Did::for_subject(alice()))
    }

    #[tokio::test]
    async fn resolve_returns_resolved_did() {
        let mut registry = FakeRegistry::default();
        registry.names.insert("alice".into(), alice());
        let (_, app) = app(registry);

        let (status, body) = call(app, Method::GET, "/resolve?q=alice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["resolved"],
            "did:dgen:zksync:0x1111111111111111111111111111111111111111"
        );
        assert_eq!(body["resolution"]["status"], "resolved");
    }

    #[tokio::test]
    async fn resolve_defaults_to_connected_wallet() {
        let (_, app) = app(FakeRegistry::default().with_key(alice(), alice()));
        let uri = format!("/resolve?connected={:?}", alice());

        let (status, body) = call(app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["input"], Did::for_subject(alice()).as_str());
        assert_eq!(body["resolved"], Did::for_subject(alice()).as_str());
    }

    #[tokio::test]
    async fn profile_reports_access_and_section_errors() {
        let mut registry = FakeRegistry::default().with_key(alice(), alice());
        registry.broken_linked_accounts = true;
        let (_, app) = app(registry);
        let uri = format!("{}?connected={:?}", did_path(), alice());

        let (status, body) = call(app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["found"], true);
        assert_eq!(body["write_access"], true);
        assert_eq!(body["keys"]["data"].as_array().map(Vec::len), Some(1));
        assert!(body["linked_accounts"]["data"].is_null());
        assert!(body["linked_accounts"]["error"].is_string());
    }

    #[tokio::test]
    async fn malformed_did_is_a_bad_request() {
        let (_, app) = app(FakeRegistry::default());
        let (status, body) = call(app, Method::GET, "/did/did:web:example.com", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid DID"));
    }

    #[tokio::test]
    async fn registration_reports_next_step() {
        let (_, app) = app(FakeRegistry::default());
        let uri = format!("/registration/{:?}", Address::repeat_byte(0x44));

        let (status, body) = call(app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step"], "request_tokens");
    }

    #[tokio::test]
    async fn writes_require_a_signer() {
        let (_, app) = app(FakeRegistry::default().with_key(alice(), alice()));
        let (status, _) = call(app, Method::POST, "/faucet", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn owner_registers_name() {
        let fake = FakeRegistry::default().with_key(alice(), alice()).with_signer(alice());
        let (registry, app) = app(fake);
        let uri = format!("{}/name", did_path());

        let (status, body) = call(app, Method::PUT, &uri, Some(json!({ "name": "alice" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["tx_hash"].as_str().unwrap().starts_with("0x"));
        assert_eq!(registry.sent(), vec![format!("registerName({:?}, alice)", alice())]);
    }

    #[tokio::test]
    async fn stranger_gets_forbidden() {
        let fake = FakeRegistry::default()
            .with_key(alice(), alice())
            .with_signer(Address::repeat_byte(0x99));
        let (registry, app) = app(fake);
        let uri = format!("{}/keys/default", did_path());

        let (status, _) = call(app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(registry.sent().is_empty());
    }

    #[tokio::test]
    async fn allowance_defaults_to_key_registry_and_fee() {
        let (registry, app) = app(FakeRegistry::default().with_signer(alice()));
        let (status, _) = call(app, Method::POST, "/allowance", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            registry.sent(),
            vec![format!("approve({:?}, 100)", contracts().key_registry)]
        );
    }

    #[tokio::test]
    async fn malformed_connected_address_is_a_json_error() {
        let (registry, app) = app(FakeRegistry::default());
        let (status, body) = call(app.clone(), Method::GET, "/resolve?connected=0xnope", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("0xnope"));

        let uri = format!("{}?connected=bob", did_path());
        let (status, body) = call(app.clone(), Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert_eq!(registry.lookups_served(), 0);

        let (status, _) = call(app, Method::GET, "/resolve?q=&connected=", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn transfer_amounts_are_decimal_unless_prefixed() {
        let fake = FakeRegistry::default().with_signer(alice());
        let (registry, app) = app(fake);
        let to = Address::repeat_byte(0x22);

        for amount in [json!(100), json!("100"), json!("0x64")] {
            let payload = json!({ "to": format!("{to:?}"), "amount": amount });
            let (status, _) = call(app.clone(), Method::POST, "/transfer", Some(payload)).await;
            assert_eq!(status, StatusCode::OK);
        }
        assert_eq!(registry.sent(), vec![format!("transfer({to:?}, 100)"); 3]);
    }

    #[tokio::test]
    async fn allowance_amount_is_read_as_decimal() {
        let (registry, app) = app(FakeRegistry::default().with_signer(alice()));
        let payload = json!({ "amount": "250" });

        let (status, _) = call(app, Method::POST, "/allowance", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            registry.sent(),
            vec![format!("approve({:?}, 250)", contracts().key_registry)]
        );
    }

    #[test]
    fn unreadable_amounts_are_refused() {
        let text = |s: &str| AmountInput::Text(s.to_string());
        assert_eq!(parse_amount(text(" 1000 ")), Ok(U256::from(1000)));
        assert_eq!(parse_amount(text("0xff")), Ok(U256::from(255)));
        assert!(parse_amount(text("0x")).is_err());
        assert!(parse_amount(text("ff")).is_err());
        assert!(parse_amount(text("-5")).is_err());
        assert!(parse_amount(text("")).is_err());
    }

    #[test]
    fn chain_failures_map_to_bad_gateway() {
        assert_eq!(
            status_for(&DidError::Transaction("reverted".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_for(&DidError::Validation("x".into())), StatusCode::BAD_REQUEST);
    }
}
