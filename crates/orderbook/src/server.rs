//! A minimal in-memory marketplace API, for local stacks and tests.
//!
//! Implements the routes [`crate::OrderbookClient`] talks to: the EIP-712
//! challenge, publish/unpublish with an authorization header, single order
//! lookup, orderbook listing and requester deals.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use alloy::dyn_abi::TypedData;
use alloy::primitives::{Address, Bytes, B256};
use alloy::sol_types::Eip712Domain;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use dashmap::{DashMap, DashSet};
use iexec_core::{typed, AnySignedOrder, DealId, OrderHash, OrderKind};
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::types::{parse_route_name, MarketDeal, PublishedOrder};

pub struct MarketplaceState {
    pub chain_id: u64,
    domain: Eip712Domain,
    orders: DashMap<OrderHash, StoredOrder>,
    deals: DashMap<DealId, MarketDeal>,
    issued_challenges: DashSet<B256>,
}

#[derive(Clone)]
struct StoredOrder {
    kind: OrderKind,
    order: Value,
    signer: Address,
    resource: Address,
    category: Option<u64>,
    remaining: u64,
}

impl MarketplaceState {
    pub fn new(chain_id: u64, hub: Address) -> Self {
        Self {
            chain_id,
            domain: typed::domain(chain_id, hub),
            orders: DashMap::new(),
            deals: DashMap::new(),
            issued_challenges: DashSet::new(),
        }
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn contains(&self, hash: &OrderHash) -> bool {
        self.orders.contains_key(hash)
    }

    /// Indexes a deal as the marketplace does once `OrdersMatched` is mined.
    pub fn insert_deal(&self, deal: MarketDeal) {
        self.deals.insert(deal.deal_id, deal);
    }

    fn published(&self, hash: OrderHash, stored: &StoredOrder) -> PublishedOrder {
        PublishedOrder {
            order_hash: hash,
            chain_id: self.chain_id,
            order: stored.order.clone(),
            remaining: stored.remaining,
            status: "open".to_string(),
            signer: Some(stored.signer),
            publication_timestamp: None,
        }
    }
}

pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "ok": false, "error": self.1 }))).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError(StatusCode::BAD_REQUEST, message.into())
}

pub fn router(state: Arc<MarketplaceState>) -> Router {
    Router::new()
        .route("/challenge", get(challenge))
        .route("/deals", get(list_deals))
        .route("/{kind}", get(list_orders).post(publish).put(unpublish))
        .route("/{kind}/{hash}", get(fetch_order))
        .with_state(state)
}

/// Serves the marketplace on an ephemeral local port.
pub async fn spawn(state: Arc<MarketplaceState>) -> std::io::Result<Url> {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::warn!(error = %e, "marketplace server stopped");
        }
    });
    Url::parse(&format!("http://{addr}/"))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
}

fn challenge_typed_data(chain_id: u64, challenge: &str) -> Value {
    json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" }
            ],
            "Challenge": [{ "name": "challenge", "type": "string" }]
        },
        "domain": { "name": "iExec Gateway", "version": "1", "chainId": chain_id },
        "primaryType": "Challenge",
        "message": { "challenge": challenge }
    })
}

async fn challenge(
    State(state): State<Arc<MarketplaceState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    if params.get("address").is_none() {
        return Err(bad_request("missing address"));
    }
    let nonce: [u8; 32] = rand::thread_rng().gen();
    let data = challenge_typed_data(state.chain_id, &hex::encode(nonce));
    let typed: TypedData =
        serde_json::from_value(data.clone()).map_err(|e| bad_request(e.to_string()))?;
    let hash = typed
        .eip712_signing_hash()
        .map_err(|e| bad_request(e.to_string()))?;
    state.issued_challenges.insert(hash);
    Ok(Json(json!({ "ok": true, "data": data })))
}

fn authorize(state: &MarketplaceState, headers: &HeaderMap) -> Result<Address, ApiError> {
    let unauthorized = |msg: &str| ApiError(StatusCode::UNAUTHORIZED, msg.to_string());
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("missing authorization"))?;
    let parts: Vec<&str> = header.split('_').collect();
    let [hash, sign, address] = parts.as_slice() else {
        return Err(unauthorized("malformed authorization"));
    };
    let hash: B256 = hash.parse().map_err(|_| unauthorized("malformed authorization"))?;
    let sign: Bytes = sign.parse().map_err(|_| unauthorized("malformed authorization"))?;
    let address: Address = address
        .parse()
        .map_err(|_| unauthorized("malformed authorization"))?;
    if !state.issued_challenges.contains(&hash) {
        return Err(unauthorized("unknown challenge"));
    }
    match typed::recover_signer(hash, &sign) {
        Ok(signer) if signer == address => Ok(address),
        _ => Err(unauthorized("invalid authorization signature")),
    }
}

fn route_kind(route: &str) -> Result<OrderKind, ApiError> {
    parse_route_name(route)
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, format!("no route {route}")))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishBody {
    chain_id: u64,
    order: Value,
}

async fn publish(
    State(state): State<Arc<MarketplaceState>>,
    Path(route): Path<String>,
    headers: HeaderMap,
    Json(body): Json<PublishBody>,
) -> Result<Json<Value>, ApiError> {
    let kind = route_kind(&route)?;
    authorize(&state, &headers)?;
    if body.chain_id != state.chain_id {
        return Err(bad_request(format!("unsupported chain {}", body.chain_id)));
    }
    let signed = AnySignedOrder::from_json(kind, body.order.clone())
        .map_err(|e| bad_request(e.to_string()))?;
    let hash = signed.order_hash(&state.domain);
    let signer = typed::recover_signer(hash.0, signed.sign())
        .map_err(|_| bad_request("invalid order signature"))?;

    let (resource, category, volume) = match &signed {
        AnySignedOrder::App(o) => (o.order.app, None, o.order.volume),
        AnySignedOrder::Dataset(o) => (o.order.dataset, None, o.order.volume),
        AnySignedOrder::Workerpool(o) => {
            (o.order.workerpool, Some(o.order.category), o.order.volume)
        }
        AnySignedOrder::Request(o) => (o.order.requester, Some(o.order.category), o.order.volume),
    };
    state.orders.insert(
        hash,
        StoredOrder {
            kind,
            order: body.order,
            signer,
            resource,
            category,
            remaining: volume,
        },
    );
    tracing::debug!(%kind, %hash, "order stored");
    Ok(Json(json!({ "ok": true, "published": { "orderHash": hash } })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnpublishBody {
    chain_id: u64,
    order_hash: OrderHash,
}

async fn unpublish(
    State(state): State<Arc<MarketplaceState>>,
    Path(route): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UnpublishBody>,
) -> Result<Json<Value>, ApiError> {
    let kind = route_kind(&route)?;
    let caller = authorize(&state, &headers)?;
    if body.chain_id != state.chain_id {
        return Err(bad_request(format!("unsupported chain {}", body.chain_id)));
    }
    let signer = state
        .orders
        .get(&body.order_hash)
        .filter(|stored| stored.kind == kind)
        .map(|stored| stored.signer)
        .ok_or_else(|| {
            ApiError(
                StatusCode::NOT_FOUND,
                format!("{kind} {} not found", body.order_hash),
            )
        })?;
    if signer != caller {
        return Err(ApiError(
            StatusCode::FORBIDDEN,
            "only the order signer can unpublish".to_string(),
        ));
    }
    state.orders.remove(&body.order_hash);
    Ok(Json(json!({ "ok": true, "unpublished": [body.order_hash] })))
}

async fn fetch_order(
    State(state): State<Arc<MarketplaceState>>,
    Path((route, hash)): Path<(String, String)>,
) -> Result<Json<PublishedOrder>, ApiError> {
    let kind = route_kind(&route)?;
    let hash = OrderHash::parse_field(&hash, "orderHash").map_err(|e| bad_request(e.to_string()))?;
    let stored = state
        .orders
        .get(&hash)
        .filter(|stored| stored.kind == kind)
        .map(|stored| stored.clone())
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, format!("{kind} {hash} not found")))?;
    Ok(Json(state.published(hash, &stored)))
}

async fn list_orders(
    State(state): State<Arc<MarketplaceState>>,
    Path(route): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let kind = route_kind(&route)?;
    let category = params
        .get("category")
        .map(|c| c.parse::<u64>())
        .transpose()
        .map_err(|_| bad_request("invalid category"))?;
    let resource = ["app", "dataset", "workerpool", "requester"]
        .iter()
        .find_map(|name| params.get(*name))
        .map(|a| a.parse::<Address>())
        .transpose()
        .map_err(|_| bad_request("invalid address"))?;

    let orders: Vec<PublishedOrder> = state
        .orders
        .iter()
        .filter(|entry| entry.kind == kind)
        .filter(|entry| resource.map_or(true, |r| entry.resource == r))
        .filter(|entry| category.map_or(true, |c| entry.category == Some(c)))
        .map(|entry| state.published(*entry.key(), entry.value()))
        .collect();
    Ok(Json(json!({ "ok": true, "count": orders.len(), "orders": orders })))
}

async fn list_deals(
    State(state): State<Arc<MarketplaceState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let address = |name: &str| {
        params
            .get(name)
            .map(|a| a.parse::<Address>())
            .transpose()
            .map_err(|_| bad_request(format!("invalid {name}")))
    };
    let requester = address("requester")?.ok_or_else(|| bad_request("missing requester"))?;
    let app = address("app")?;
    let dataset = address("dataset")?;
    let workerpool = address("workerpool")?;
    let before = params.get("beforeTimestamp");

    let mut deals: Vec<MarketDeal> = state
        .deals
        .iter()
        .filter(|deal| deal.requester == requester)
        .filter(|deal| app.map_or(true, |a| deal.app.pointer == a))
        .filter(|deal| dataset.map_or(true, |d| deal.dataset.pointer == d))
        .filter(|deal| workerpool.map_or(true, |w| deal.workerpool.pointer == w))
        .filter(|deal| match (before, &deal.block_timestamp) {
            (Some(before), Some(created)) => created < before,
            _ => true,
        })
        .map(|deal| deal.value().clone())
        .collect();
    deals.sort_by(|a, b| b.block_timestamp.cmp(&a.block_timestamp));
    Ok(Json(json!({ "ok": true, "count": deals.len(), "deals": deals })))
}
