use alloy::primitives::Address;
use alloy::sol_types::Eip712Domain;
use contract_client::Hub;
use iexec_core::{
    typed, AnyOrder, AnySignedOrder, DatasetOrder, Order, OrderHash, OrderKind, SdkError,
    SignedOrder,
};

/// Signs the EIP-712 hash of `order` with the hub's signer.
///
/// The order is re-validated first, so a deserialized order that bypassed the
/// builder still cannot be signed with a missing resource address.
pub async fn sign_order<H, O>(hub: &H, order: O) -> Result<SignedOrder<O>, SdkError>
where
    H: Hub + ?Sized,
    O: Order,
{
    order.validate()?;
    if hub.signer_address().is_none() {
        return Err(SdkError::signer_required());
    }
    let hash = order.order_hash(&hub.domain());
    let sign = hub.sign_hash(hash.0).await?;
    tracing::info!(kind = %O::KIND, order_hash = %hash, "order signed");
    Ok(SignedOrder { order, sign })
}

pub async fn sign_any_order<H>(hub: &H, order: AnyOrder) -> Result<AnySignedOrder, SdkError>
where
    H: Hub + ?Sized,
{
    Ok(match order {
        AnyOrder::App(o) => AnySignedOrder::App(sign_order(hub, o).await?),
        AnyOrder::Dataset(o) => AnySignedOrder::Dataset(sign_order(hub, o).await?),
        AnyOrder::Workerpool(o) => AnySignedOrder::Workerpool(sign_order(hub, o).await?),
        AnyOrder::Request(o) => AnySignedOrder::Request(sign_order(hub, o).await?),
    })
}

pub fn verify_signed_order<O: Order>(
    order: &SignedOrder<O>,
    domain: &Eip712Domain,
    expected_signer: Address,
) -> Result<(), SdkError> {
    if !order.is_signed() {
        return Err(SdkError::Signature(format!("{} is not signed", O::KIND)));
    }
    order.verify(domain, expected_signer)
}

pub(crate) fn check_signature(
    kind: OrderKind,
    hash: OrderHash,
    sign: &[u8],
) -> Result<(), SdkError> {
    if sign.is_empty() {
        return Err(SdkError::Signature(format!("{kind} is not signed")));
    }
    typed::recover_signer(hash.0, sign)
        .map_err(|e| SdkError::Signature(format!("{kind} {hash} has an invalid signature: {e}")))?;
    Ok(())
}

/// The "no dataset" order passed to `matchOrders` for requests without a dataset.
pub fn null_datasetorder() -> SignedOrder<DatasetOrder> {
    SignedOrder::<DatasetOrder>::null()
}
