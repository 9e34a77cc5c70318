use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use alloy::primitives::{eip191_hash_message, Address, Bytes, B256};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use contract_client::mock::MockHub;
use contract_client::Hub;
use dashmap::DashMap;
use iexec_core::typed::recover_signer;
use iexec_core::{ErrorKind, SdkError};
use serde::Deserialize;
use sms_client::challenge::{web2_secret_challenge, web3_secret_challenge};
use sms_client::{PushResult, SmsClient, RESULT_ENCRYPTION_KEY_NAME};
use url::Url;

const PEM: &str = "-----BEGIN PUBLIC KEY-----\nMIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8A\n-----END PUBLIC KEY-----";
const DATASET: Address = Address::new([0xda; 20]);

#[derive(Default)]
struct SmsState {
    web2: DashMap<(Address, String), String>,
    web3: DashMap<Address, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Web2Body {
    owner_address: Address,
    secret_name: String,
    secret_value: String,
}

fn authorized_by(headers: &HeaderMap, challenge: B256) -> Option<Address> {
    let sign: Bytes = headers.get("authorization")?.to_str().ok()?.parse().ok()?;
    recover_signer(eip191_hash_message(challenge), &sign).ok()
}

async fn check_web2(
    State(state): State<Arc<SmsState>>,
    Query(q): Query<HashMap<String, String>>,
) -> StatusCode {
    let owner: Address = q["ownerAddress"].parse().unwrap();
    if state.web2.contains_key(&(owner, q["secretName"].clone())) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn write_web2(state: &SmsState, headers: &HeaderMap, body: Web2Body, update: bool) -> StatusCode {
    let challenge = web2_secret_challenge(body.owner_address, &body.secret_name, &body.secret_value);
    if authorized_by(headers, challenge) != Some(body.owner_address) {
        return StatusCode::UNAUTHORIZED;
    }
    let key = (body.owner_address, body.secret_name);
    match (state.web2.contains_key(&key), update) {
        (true, false) => StatusCode::CONFLICT,
        (false, true) => StatusCode::NOT_FOUND,
        _ => {
            state.web2.insert(key, body.secret_value);
            StatusCode::NO_CONTENT
        }
    }
}

async fn check_web3(
    State(state): State<Arc<SmsState>>,
    Query(q): Query<HashMap<String, String>>,
) -> StatusCode {
    let address: Address = q["secretAddress"].parse().unwrap();
    if state.web3.contains_key(&address) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn serve() -> (Arc<SmsState>, Url) {
    let state = Arc::new(SmsState::default());
    let router = Router::new()
        .route(
            "/secrets/web2",
            get(check_web2)
                .post(
                    |State(s): State<Arc<SmsState>>, h: HeaderMap, Json(b): Json<Web2Body>| async move {
                        write_web2(&s, &h, b, false).await
                    },
                )
                .put(
                    |State(s): State<Arc<SmsState>>, h: HeaderMap, Json(b): Json<Web2Body>| async move {
                        write_web2(&s, &h, b, true).await
                    },
                ),
        )
        .route(
            "/secrets/web3",
            get(check_web3).post(
                |State(s): State<Arc<SmsState>>,
                 Query(q): Query<HashMap<String, String>>,
                 h: HeaderMap,
                 body: String| async move {
                    let address: Address = q["secretAddress"].parse().unwrap();
                    if authorized_by(&h, web3_secret_challenge(address, &body)).is_none() {
                        return StatusCode::UNAUTHORIZED;
                    }
                    s.web3.insert(address, body);
                    StatusCode::NO_CONTENT
                },
            ),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    (state, format!("http://{addr}").parse().unwrap())
}

#[tokio::test]
async fn result_key_is_pushed_then_updated_on_request() {
    let (state, url) = serve().await;
    let sms = SmsClient::new(url);
    let hub = MockHub::with_random_signer();
    let owner = hub.signer_address().unwrap();

    assert!(!sms.check_result_encryption_key_exists(owner).await.unwrap());
    let pushed = sms.push_result_encryption_key(&hub, PEM, false).await.unwrap();
    assert_eq!(
        pushed,
        PushResult {
            is_pushed: true,
            is_updated: false
        }
    );
    assert!(sms.check_result_encryption_key_exists(owner).await.unwrap());

    let err: SdkError = sms
        .push_result_encryption_key(&hub, PEM, false)
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let updated_pem = PEM.replace("MIIB", "MIIC");
    let updated = sms
        .push_result_encryption_key(&hub, &updated_pem, true)
        .await
        .unwrap();
    assert!(updated.is_updated);
    assert_eq!(
        state.web2.get(&(owner, RESULT_ENCRYPTION_KEY_NAME.to_string())).unwrap().as_str(),
        updated_pem
    );
}

#[tokio::test]
async fn pushing_requires_a_signer() {
    let (_state, url) = serve().await;
    let err: SdkError = SmsClient::new(url)
        .push_result_encryption_key(&MockHub::read_only(), PEM, false)
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), ErrorKind::Signature);
}

#[tokio::test]
async fn malformed_public_key_is_rejected_locally() {
    let sms = SmsClient::new("http://127.0.0.1:1".parse().unwrap());
    let err: SdkError = sms
        .push_result_encryption_key(&MockHub::with_random_signer(), "not a key", false)
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.field(), Some("publicKey"));
}

#[tokio::test]
async fn dataset_secret_is_pushed_once() {
    let (state, url) = serve().await;
    let sms = SmsClient::new(url);
    let hub = MockHub::with_random_signer();

    assert!(sms.push_dataset_secret(&hub, DATASET, "c2VjcmV0").await.unwrap());
    assert_eq!(state.web3.get(&DATASET).unwrap().as_str(), "c2VjcmV0");
    assert!(sms.check_web3_secret_exists(DATASET).await.unwrap());

    let err: SdkError = sms
        .push_dataset_secret(&hub, DATASET, "b3RoZXI=")
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn missing_secret_endpoint_fails_both_pushes_alike() {
    let router = Router::new()
        .route(
            "/secrets/web2",
            get(|| async { StatusCode::NOT_FOUND }).post(|| async { StatusCode::NOT_FOUND }),
        )
        .route(
            "/secrets/web3",
            get(|| async { StatusCode::NOT_FOUND }).post(|| async { StatusCode::NOT_FOUND }),
        );
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    let sms = SmsClient::new(format!("http://{addr}").parse().unwrap());
    let hub = MockHub::with_random_signer();

    let dataset: SdkError = sms
        .push_dataset_secret(&hub, DATASET, "c2VjcmV0")
        .await
        .unwrap_err()
        .into();
    assert_eq!(dataset.kind(), ErrorKind::Api);
    assert!(matches!(dataset, SdkError::Api { status: 404, .. }), "{dataset}");

    let web2: SdkError = sms
        .push_result_encryption_key(&hub, PEM, false)
        .await
        .unwrap_err()
        .into();
    assert_eq!(web2.kind(), ErrorKind::Api);
    assert!(matches!(web2, SdkError::Api { status: 404, .. }), "{web2}");
}

#[tokio::test]
async fn unreachable_sms_is_a_network_error() {
    let sms = SmsClient::new("http://127.0.0.1:1".parse().unwrap());
    let err: SdkError = sms
        .check_result_encryption_key_exists(Address::repeat_byte(1))
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), ErrorKind::Network);
}
