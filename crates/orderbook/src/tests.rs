use std::sync::Arc;

use alloy::primitives::Address;
use contract_client::mock::{MockHub, MOCK_CHAIN_ID, MOCK_HUB};
use contract_client::Hub;
use iexec_core::{AnySignedOrder, AppOrder, ErrorKind, Order, OrderKind, SdkError, SignedOrder};
use iexec_core::deal::Resource;
use iexec_core::DealId;

use crate::server::{self, MarketplaceState};
use crate::{DealsFilter, MarketDeal, OrderbookClient, OrderbookError, OrderbookFilter};

const APP: &str = "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1";

async fn setup() -> (Arc<MarketplaceState>, OrderbookClient) {
    let state = Arc::new(MarketplaceState::new(MOCK_CHAIN_ID, MOCK_HUB));
    let url = server::spawn(state.clone()).await.unwrap();
    (state, OrderbookClient::new(url, MOCK_CHAIN_ID))
}

async fn signed_apporder(hub: &MockHub, volume: u64) -> AnySignedOrder {
    let order = AppOrder {
        app: APP.parse().unwrap(),
        appprice: 0,
        volume,
        tag: Default::default(),
        datasetrestrict: Address::ZERO,
        workerpoolrestrict: Address::ZERO,
        requesterrestrict: Address::ZERO,
        salt: iexec_core::builder::random_salt(),
    };
    let sign = hub.sign_hash(order.order_hash(&hub.domain()).0).await.unwrap();
    AnySignedOrder::App(SignedOrder { order, sign })
}

#[tokio::test]
async fn publish_then_fetch_returns_same_order() {
    let (state, client) = setup().await;
    let hub = MockHub::with_random_signer();
    let order = signed_apporder(&hub, 10).await;

    let hash = client.publish(&hub, &order).await.unwrap();
    assert_eq!(hash, order.order_hash(&hub.domain()));
    assert!(state.contains(&hash));

    let published = client.fetch_published_order(OrderKind::App, hash).await.unwrap();
    assert_eq!(published.order_hash, hash);
    assert_eq!(published.remaining, 10);
    assert_eq!(published.signer, hub.signer_address());
    assert_eq!(published.signed_order(OrderKind::App).unwrap(), order);
}

#[tokio::test]
async fn unpublish_removes_order() {
    let (state, client) = setup().await;
    let hub = MockHub::with_random_signer();
    let order = signed_apporder(&hub, 1).await;
    let hash = client.publish(&hub, &order).await.unwrap();

    let removed = client.unpublish(&hub, OrderKind::App, hash).await.unwrap();
    assert_eq!(removed, hash);
    assert_eq!(state.order_count(), 0);

    let err = client.fetch_published_order(OrderKind::App, hash).await.unwrap_err();
    assert!(matches!(err, OrderbookError::Api { status: 404, .. }));
}

#[tokio::test]
async fn only_signer_can_unpublish() {
    let (_state, client) = setup().await;
    let owner = MockHub::with_random_signer();
    let stranger = MockHub::with_random_signer();
    let hash = client
        .publish(&owner, &signed_apporder(&owner, 1).await)
        .await
        .unwrap();

    let err: SdkError = client
        .unpublish(&stranger, OrderKind::App, hash)
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), ErrorKind::Api);
}

#[tokio::test]
async fn authorization_requires_a_signer() {
    let (_state, client) = setup().await;
    let signer = MockHub::with_random_signer();
    let order = signed_apporder(&signer, 1).await;

    let err: SdkError = client
        .publish(&MockHub::read_only(), &order)
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), ErrorKind::Signature);
}

#[tokio::test]
async fn orderbook_lists_orders_for_a_resource() {
    let (_state, client) = setup().await;
    let hub = MockHub::with_random_signer();
    for volume in [1, 2, 3] {
        client
            .publish(&hub, &signed_apporder(&hub, volume).await)
            .await
            .unwrap();
    }

    let page = client
        .fetch_orderbook(OrderKind::App, OrderbookFilter::Resource(APP.parse().unwrap()))
        .await
        .unwrap();
    assert_eq!(page.count, 3);

    let empty = client
        .fetch_orderbook(OrderKind::App, OrderbookFilter::Resource(Address::repeat_byte(7)))
        .await
        .unwrap();
    assert!(empty.orders.is_empty());
}

#[tokio::test]
async fn unreachable_marketplace_is_a_network_error() {
    let client = OrderbookClient::new("http://127.0.0.1:1/".parse().unwrap(), MOCK_CHAIN_ID);
    let err: SdkError = client
        .fetch_published_order(OrderKind::App, iexec_core::OrderHash::new([1; 32]))
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), ErrorKind::Network);
}

fn market_deal(id: u8, requester: Address, workerpool: Address, created: &str) -> MarketDeal {
    let resource = |pointer| Resource {
        pointer,
        owner: pointer,
        price: 0,
    };
    MarketDeal {
        deal_id: DealId::new([id; 32]),
        app: resource(APP.parse().unwrap()),
        dataset: resource(Address::ZERO),
        workerpool: resource(workerpool),
        requester,
        beneficiary: requester,
        category: 0,
        trust: 1,
        tag: Default::default(),
        bot_first: 0,
        bot_size: 1,
        block_timestamp: Some(created.to_string()),
        transaction_hash: None,
    }
}

#[tokio::test]
async fn requester_deals_are_listed_newest_first() {
    let (state, client) = setup().await;
    let requester = Address::repeat_byte(0x44);
    let pool = Address::repeat_byte(0x22);
    state.insert_deal(market_deal(1, requester, pool, "2024-01-01T00:00:00.000Z"));
    state.insert_deal(market_deal(2, requester, Address::repeat_byte(0x23), "2024-03-01T00:00:00.000Z"));
    state.insert_deal(market_deal(3, requester, pool, "2024-02-01T00:00:00.000Z"));
    state.insert_deal(market_deal(4, Address::repeat_byte(0x45), pool, "2024-02-01T00:00:00.000Z"));

    let all = client
        .fetch_requester_deals(requester, &DealsFilter::default())
        .await
        .unwrap();
    assert_eq!(all.count, 3);
    let ids: Vec<_> = all.deals.iter().map(|d| d.deal_id).collect();
    assert_eq!(ids, [DealId::new([2; 32]), DealId::new([3; 32]), DealId::new([1; 32])]);

    let filtered = client
        .fetch_requester_deals(
            requester,
            &DealsFilter {
                workerpool: Some(pool),
                before_timestamp: Some("2024-01-15T00:00:00.000Z".to_string()),
                ..DealsFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(filtered.count, 1);
    assert_eq!(filtered.deals[0].deal_id, DealId::new([1; 32]));
}
