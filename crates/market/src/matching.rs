use alloy::sol_types::Eip712Domain;
use contract_client::{Hub, MatchReceipt};
use iexec_core::{
    AppOrder, DatasetOrder, Order, RequestOrder, SdkError, SignedOrder, WorkerpoolOrder,
};

use crate::sign::{check_signature, null_datasetorder};

fn require_signed<O: Order>(order: &SignedOrder<O>, domain: &Eip712Domain) -> Result<(), SdkError> {
    check_signature(O::KIND, order.order_hash(domain), &order.sign)
}

/// Smallest declared volume among the orders taking part in a match. The null
/// dataset order does not constrain it.
pub fn matchable_volume(
    app: &AppOrder,
    dataset: Option<&DatasetOrder>,
    workerpool: &WorkerpoolOrder,
    request: &RequestOrder,
) -> u64 {
    let volume = app.volume.min(workerpool.volume).min(request.volume);
    match dataset.filter(|d| !d.is_null()) {
        Some(dataset) => volume.min(dataset.volume),
        None => volume,
    }
}

/// Volume of `order` not yet consumed on-chain.
pub async fn remaining_volume<H, O>(hub: &H, order: &O) -> Result<u64, SdkError>
where
    H: Hub + ?Sized,
    O: Order,
{
    let consumed = hub.view_consumed(order.order_hash(&hub.domain())).await?;
    Ok(order.volume().saturating_sub(consumed))
}

/// Submits the four orders to `matchOrders` and reports the created deal.
///
/// Orders must carry a recoverable signature, except the null dataset order used
/// when `dataset` is `None`. Compatibility between the orders is left to the chain; a revert
/// surfaces as `SdkError::ContractCall` carrying the revert reason. Nothing is
/// retried.
pub async fn match_orders<H>(
    hub: &H,
    app: &SignedOrder<AppOrder>,
    dataset: Option<&SignedOrder<DatasetOrder>>,
    workerpool: &SignedOrder<WorkerpoolOrder>,
    request: &SignedOrder<RequestOrder>,
) -> Result<MatchReceipt, SdkError>
where
    H: Hub + ?Sized,
{
    if hub.signer_address().is_none() {
        return Err(SdkError::signer_required());
    }
    let domain = hub.domain();
    require_signed(app, &domain)?;
    let null_dataset = null_datasetorder();
    let dataset = match dataset {
        Some(dataset) if !dataset.order.is_null() => {
            require_signed(dataset, &domain)?;
            dataset
        }
        _ => &null_dataset,
    };
    require_signed(workerpool, &domain)?;
    require_signed(request, &domain)?;

    tracing::debug!(
        volume = matchable_volume(
            &app.order,
            Some(&dataset.order),
            &workerpool.order,
            &request.order
        ),
        "submitting matchOrders"
    );
    let receipt = hub.match_orders(app, dataset, workerpool, request).await?;
    if receipt.volume == 0 {
        return Err(SdkError::InvariantViolation(format!(
            "deal {} was created with a volume of 0",
            receipt.deal_id
        )));
    }
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, B256};

    use super::*;

    fn app(volume: u64) -> AppOrder {
        AppOrder {
            app: Address::repeat_byte(1),
            appprice: 0,
            volume,
            tag: B256::ZERO,
            datasetrestrict: Address::ZERO,
            workerpoolrestrict: Address::ZERO,
            requesterrestrict: Address::ZERO,
            salt: B256::ZERO,
        }
    }

    fn dataset(volume: u64) -> DatasetOrder {
        DatasetOrder {
            dataset: Address::repeat_byte(2),
            volume,
            ..DatasetOrder::null()
        }
    }

    fn workerpool(volume: u64) -> WorkerpoolOrder {
        WorkerpoolOrder {
            workerpool: Address::repeat_byte(3),
            workerpoolprice: 0,
            volume,
            tag: B256::ZERO,
            category: 0,
            trust: 1,
            apprestrict: Address::ZERO,
            datasetrestrict: Address::ZERO,
            requesterrestrict: Address::ZERO,
            salt: B256::ZERO,
        }
    }

    fn request(volume: u64) -> RequestOrder {
        RequestOrder {
            app: Address::repeat_byte(1),
            appmaxprice: 0,
            dataset: Address::ZERO,
            datasetmaxprice: 0,
            workerpool: Address::ZERO,
            workerpoolmaxprice: 0,
            requester: Address::repeat_byte(4),
            volume,
            tag: B256::ZERO,
            category: 0,
            trust: 1,
            beneficiary: Address::repeat_byte(4),
            callback: Address::ZERO,
            params: String::new(),
            salt: B256::ZERO,
        }
    }

    #[test]
    fn smallest_volume_wins() {
        assert_eq!(
            matchable_volume(&app(3), Some(&dataset(5)), &workerpool(2), &request(10)),
            2
        );
        assert_eq!(
            matchable_volume(&app(3), Some(&dataset(1)), &workerpool(2), &request(10)),
            1
        );
    }

    #[test]
    fn null_dataset_does_not_constrain() {
        assert_eq!(
            matchable_volume(&app(3), Some(&DatasetOrder::null()), &workerpool(5), &request(4)),
            3
        );
        assert_eq!(matchable_volume(&app(3), None, &workerpool(5), &request(4)), 3);
    }
}
