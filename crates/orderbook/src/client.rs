use alloy::dyn_abi::TypedData;
use alloy::primitives::Address;
use contract_client::{ContractError, Hub};
use iexec_core::{AnySignedOrder, OrderHash, OrderKind};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::error::OrderbookError;
use crate::types::{route_name, DealsFilter, DealsPage, OrderbookFilter, OrderbookPage, PublishedOrder};

/// HTTP client for the off-chain marketplace.
#[derive(Clone, Debug)]
pub struct OrderbookClient {
    http: Client,
    base_url: Url,
    chain_id: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Published {
    order_hash: OrderHash,
}

#[derive(Deserialize)]
struct PublishResponse {
    published: Published,
}

impl OrderbookClient {
    pub fn new(base_url: Url, chain_id: u64) -> Self {
        Self {
            http: Client::new(),
            base_url,
            chain_id,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, OrderbookError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| OrderbookError::Decode(format!("invalid endpoint {joined}: {e}")))
    }

    /// Signs the marketplace's EIP-712 challenge and formats the result as
    /// `<hash>_<signature>_<address>`.
    pub async fn get_authorization<H>(&self, hub: &H) -> Result<String, OrderbookError>
    where
        H: Hub + ?Sized,
    {
        let address = hub.signer_address().ok_or(ContractError::SignerRequired)?;
        let url = self.endpoint("challenge")?;
        let response = self
            .http
            .get(url.clone())
            .query(&[
                ("chainId", self.chain_id.to_string()),
                ("address", address.to_string()),
            ])
            .send()
            .await
            .map_err(|e| http_error(&url, e))?;
        let body = read_json(response).await?;
        let challenge = body.get("data").cloned().unwrap_or(body);
        tracing::debug!(%challenge, "marketplace challenge");

        let typed: TypedData = serde_json::from_value(challenge)
            .map_err(|e| OrderbookError::Authorization(format!("malformed challenge: {e}")))?;
        let hash = typed
            .eip712_signing_hash()
            .map_err(|e| OrderbookError::Authorization(e.to_string()))?;
        let sign = hub.sign_hash(hash).await?;
        Ok(format!("{hash}_0x{}_{address}", hex::encode(&sign)))
    }

    pub async fn publish<H>(
        &self,
        hub: &H,
        order: &AnySignedOrder,
    ) -> Result<OrderHash, OrderbookError>
    where
        H: Hub + ?Sized,
    {
        let authorization = self.get_authorization(hub).await?;
        let url = self.endpoint(&route_name(order.kind()))?;
        let response = self
            .http
            .post(url.clone())
            .header("authorization", authorization)
            .json(&json!({ "chainId": self.chain_id, "order": order }))
            .send()
            .await
            .map_err(|e| http_error(&url, e))?;
        let body: PublishResponse = decode(read_json(response).await?)?;
        tracing::info!(
            kind = %order.kind(),
            order_hash = %body.published.order_hash,
            "order published"
        );
        Ok(body.published.order_hash)
    }

    pub async fn unpublish<H>(
        &self,
        hub: &H,
        kind: OrderKind,
        order_hash: OrderHash,
    ) -> Result<OrderHash, OrderbookError>
    where
        H: Hub + ?Sized,
    {
        let authorization = self.get_authorization(hub).await?;
        let url = self.endpoint(&route_name(kind))?;
        let response = self
            .http
            .put(url.clone())
            .header("authorization", authorization)
            .json(&json!({ "chainId": self.chain_id, "orderHash": order_hash }))
            .send()
            .await
            .map_err(|e| http_error(&url, e))?;
        read_json(response).await?;
        tracing::info!(%kind, %order_hash, "order unpublished");
        Ok(order_hash)
    }

    pub async fn fetch_published_order(
        &self,
        kind: OrderKind,
        order_hash: OrderHash,
    ) -> Result<PublishedOrder, OrderbookError> {
        let url = self.endpoint(&format!("{}/{order_hash}", route_name(kind)))?;
        let response = self
            .http
            .get(url.clone())
            .query(&[("chainId", self.chain_id.to_string())])
            .send()
            .await
            .map_err(|e| http_error(&url, e))?;
        decode(read_json(response).await?)
    }

    pub async fn fetch_orderbook(
        &self,
        kind: OrderKind,
        filter: OrderbookFilter,
    ) -> Result<OrderbookPage, OrderbookError> {
        let url = self.endpoint(&route_name(kind))?;
        let (param, value) = filter.query_param(kind);
        let response = self
            .http
            .get(url.clone())
            .query(&[("chainId", self.chain_id.to_string()), (param, value)])
            .send()
            .await
            .map_err(|e| http_error(&url, e))?;
        decode(read_json(response).await?)
    }

    /// Deals of `requester` known to the marketplace, most recent first.
    pub async fn fetch_requester_deals(
        &self,
        requester: Address,
        filter: &DealsFilter,
    ) -> Result<DealsPage, OrderbookError> {
        let url = self.endpoint("deals")?;
        let mut query = vec![
            ("chainId", self.chain_id.to_string()),
            ("requester", requester.to_string()),
        ];
        query.extend(filter.query());
        let response = self
            .http
            .get(url.clone())
            .query(&query)
            .send()
            .await
            .map_err(|e| http_error(&url, e))?;
        decode(read_json(response).await?)
    }
}

fn http_error(url: &Url, err: reqwest::Error) -> OrderbookError {
    OrderbookError::Http {
        url: url.to_string(),
        message: err.to_string(),
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, OrderbookError> {
    serde_json::from_value(body).map_err(|e| OrderbookError::Decode(e.to_string()))
}

async fn read_json(response: Response) -> Result<Value, OrderbookError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| OrderbookError::Decode(e.to_string()))?;
    let body: Option<Value> = serde_json::from_str(&text).ok();

    let refused = body
        .as_ref()
        .and_then(|b| b.get("ok"))
        .and_then(Value::as_bool)
        == Some(false);
    if !status.is_success() || refused {
        let message = body
            .as_ref()
            .and_then(|b| b.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(text);
        return Err(OrderbookError::Api {
            status: status.as_u16(),
            message,
        });
    }
    body.ok_or_else(|| OrderbookError::Decode(format!("expected JSON, got {text}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_the_base_path() {
        let client = OrderbookClient::new("http://market.example/v1".parse().unwrap(), 1);
        assert_eq!(
            client.endpoint("apporders").unwrap().as_str(),
            "http://market.example/v1/apporders"
        );

        let slashed = OrderbookClient::new("http://market.example/v1/".parse().unwrap(), 1);
        assert_eq!(
            slashed.endpoint("/apporders/0x01").unwrap().as_str(),
            "http://market.example/v1/apporders/0x01"
        );

        let bare = OrderbookClient::new("http://market.example".parse().unwrap(), 1);
        assert_eq!(bare.endpoint("challenge").unwrap().as_str(), "http://market.example/challenge");
    }
}
