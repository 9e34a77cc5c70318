use contract_client::Hub;
use iexec_core::{AnySignedOrder, OrderHash, OrderKind, SdkError, TxHash};
use orderbook::{OrderbookClient, PublishedOrder};

use crate::sign::check_signature;

fn check_same_chain<H: Hub + ?Sized>(orderbook: &OrderbookClient, hub: &H) -> Result<(), SdkError> {
    if orderbook.chain_id() != hub.chain_id() {
        return Err(SdkError::Configuration(format!(
            "marketplace is configured for chain {} but the hub is on chain {}",
            orderbook.chain_id(),
            hub.chain_id()
        )));
    }
    Ok(())
}

fn require_signature<H: Hub + ?Sized>(hub: &H, order: &AnySignedOrder) -> Result<(), SdkError> {
    check_signature(order.kind(), order.order_hash(&hub.domain()), order.sign())
}

/// Makes a signed order visible on the marketplace. Orders without a valid
/// signature are refused before any request is made.
pub async fn publish_order<H>(
    orderbook: &OrderbookClient,
    hub: &H,
    order: &AnySignedOrder,
) -> Result<OrderHash, SdkError>
where
    H: Hub + ?Sized,
{
    require_signature(hub, order)?;
    check_same_chain(orderbook, hub)?;
    Ok(orderbook.publish(hub, order).await?)
}

/// Withdraws an order from the marketplace. The order stays valid on-chain;
/// see [`cancel_order`] to invalidate it.
pub async fn unpublish_order<H>(
    orderbook: &OrderbookClient,
    hub: &H,
    kind: OrderKind,
    order_hash: OrderHash,
) -> Result<OrderHash, SdkError>
where
    H: Hub + ?Sized,
{
    check_same_chain(orderbook, hub)?;
    Ok(orderbook.unpublish(hub, kind, order_hash).await?)
}

pub async fn fetch_published_order(
    orderbook: &OrderbookClient,
    kind: OrderKind,
    order_hash: OrderHash,
) -> Result<PublishedOrder, SdkError> {
    Ok(orderbook.fetch_published_order(kind, order_hash).await?)
}

/// Invalidates a signed order on-chain (`manageXOrder` with `CLOSE`).
pub async fn cancel_order<H>(hub: &H, order: &AnySignedOrder) -> Result<TxHash, SdkError>
where
    H: Hub + ?Sized,
{
    require_signature(hub, order)?;
    if hub.signer_address().is_none() {
        return Err(SdkError::signer_required());
    }
    Ok(hub.close_order(order).await?)
}
