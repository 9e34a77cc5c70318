use alloy::primitives::{Address, B256};
use iexec_core::deal::Resource;
use iexec_core::{AnySignedOrder, DealId, OrderHash, OrderKind, SdkError, TxHash};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An order as listed by the marketplace, with its fill state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedOrder {
    pub order_hash: OrderHash,
    pub chain_id: u64,
    pub order: Value,
    pub remaining: u64,
    pub status: String,
    #[serde(default)]
    pub signer: Option<Address>,
    #[serde(default)]
    pub publication_timestamp: Option<String>,
}

impl PublishedOrder {
    pub fn signed_order(&self, kind: OrderKind) -> Result<AnySignedOrder, SdkError> {
        AnySignedOrder::from_json(kind, self.order.clone())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookPage {
    pub orders: Vec<PublishedOrder>,
    pub count: u64,
}

/// Orderbook selection: app and dataset orders are listed per resource,
/// workerpool and request orders usually per category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderbookFilter {
    Resource(Address),
    Category(u64),
}

impl OrderbookFilter {
    pub(crate) fn query_param(&self, kind: OrderKind) -> (&'static str, String) {
        match self {
            Self::Resource(address) => {
                let name = match kind {
                    OrderKind::App => "app",
                    OrderKind::Dataset => "dataset",
                    OrderKind::Workerpool => "workerpool",
                    OrderKind::Request => "requester",
                };
                (name, address.to_string())
            }
            Self::Category(category) => ("category", category.to_string()),
        }
    }
}

/// A deal as indexed by the marketplace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDeal {
    #[serde(rename = "dealid")]
    pub deal_id: DealId,
    pub app: Resource,
    pub dataset: Resource,
    pub workerpool: Resource,
    pub requester: Address,
    #[serde(default)]
    pub beneficiary: Address,
    pub category: u64,
    pub trust: u64,
    #[serde(default)]
    pub tag: B256,
    pub bot_first: u64,
    pub bot_size: u64,
    #[serde(default)]
    pub block_timestamp: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<TxHash>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DealsPage {
    pub deals: Vec<MarketDeal>,
    pub count: u64,
}

/// Narrows a requester's deals down to some resources or to older deals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DealsFilter {
    pub app: Option<Address>,
    pub dataset: Option<Address>,
    pub workerpool: Option<Address>,
    /// ISO 8601 date; only deals created before it are listed.
    pub before_timestamp: Option<String>,
}

impl DealsFilter {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let addresses = [
            ("app", self.app),
            ("dataset", self.dataset),
            ("workerpool", self.workerpool),
        ];
        addresses
            .into_iter()
            .filter_map(|(name, address)| address.map(|a| (name, a.to_string())))
            .chain(
                self.before_timestamp
                    .clone()
                    .map(|before| ("beforeTimestamp", before)),
            )
            .collect()
    }
}

/// `apporders`, `datasetorders`, ... as used in marketplace routes.
pub fn route_name(kind: OrderKind) -> String {
    format!("{}s", kind.order_name())
}

pub fn parse_route_name(route: &str) -> Option<OrderKind> {
    route.strip_suffix("orders")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_names_round_trip() {
        for kind in OrderKind::ALL {
            assert_eq!(parse_route_name(&route_name(kind)), Some(kind));
        }
        assert_eq!(route_name(OrderKind::Workerpool), "workerpoolorders");
        assert_eq!(parse_route_name("deals"), None);
    }

    #[test]
    fn deals_filter_only_sends_what_is_set() {
        assert!(DealsFilter::default().query().is_empty());
        let filter = DealsFilter {
            workerpool: Some(Address::repeat_byte(2)),
            before_timestamp: Some("2024-01-01T00:00:00.000Z".to_string()),
            ..DealsFilter::default()
        };
        let names: Vec<_> = filter.query().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["workerpool", "beforeTimestamp"]);
    }

    #[test]
    fn request_resource_filter_targets_requester() {
        let filter = OrderbookFilter::Resource(Address::ZERO);
        assert_eq!(filter.query_param(OrderKind::Request).0, "requester");
        assert_eq!(
            OrderbookFilter::Category(3).query_param(OrderKind::Workerpool),
            ("category", "3".to_string())
        );
    }
}
