//! EIP-712 typed-data encoding of orders, matching the hub's `iExecODB` domain.

use std::borrow::Cow;

use alloy_primitives::{Address, Signature, B256, U256};
use alloy_sol_types::{Eip712Domain, SolStruct};

use crate::error::SdkError;
use crate::order::{AppOrder, DatasetOrder, RequestOrder, WorkerpoolOrder};

pub const DOMAIN_NAME: &str = "iExecODB";
pub const DOMAIN_VERSION: &str = "5.0.0";

mod eip712 {
    alloy_sol_types::sol! {
        struct AppOrder {
            address app;
            uint256 appprice;
            uint256 volume;
            bytes32 tag;
            address datasetrestrict;
            address workerpoolrestrict;
            address requesterrestrict;
            bytes32 salt;
        }

        struct DatasetOrder {
            address dataset;
            uint256 datasetprice;
            uint256 volume;
            bytes32 tag;
            address apprestrict;
            address workerpoolrestrict;
            address requesterrestrict;
            bytes32 salt;
        }

        struct WorkerpoolOrder {
            address workerpool;
            uint256 workerpoolprice;
            uint256 volume;
            bytes32 tag;
            uint256 category;
            uint256 trust;
            address apprestrict;
            address datasetrestrict;
            address requesterrestrict;
            bytes32 salt;
        }

        struct RequestOrder {
            address app;
            uint256 appmaxprice;
            address dataset;
            uint256 datasetmaxprice;
            address workerpool;
            uint256 workerpoolmaxprice;
            address requester;
            uint256 volume;
            bytes32 tag;
            uint256 category;
            uint256 trust;
            address beneficiary;
            address callback;
            string params;
            bytes32 salt;
        }
    }
}

pub fn domain(chain_id: u64, hub: Address) -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(DOMAIN_NAME)),
        Some(Cow::Borrowed(DOMAIN_VERSION)),
        Some(U256::from(chain_id)),
        Some(hub),
        None,
    )
}

pub(crate) fn app_order_hash(order: &AppOrder, domain: &Eip712Domain) -> B256 {
    eip712::AppOrder {
        app: order.app,
        appprice: U256::from(order.appprice),
        volume: U256::from(order.volume),
        tag: order.tag,
        datasetrestrict: order.datasetrestrict,
        workerpoolrestrict: order.workerpoolrestrict,
        requesterrestrict: order.requesterrestrict,
        salt: order.salt,
    }
    .eip712_signing_hash(domain)
}

pub(crate) fn dataset_order_hash(order: &DatasetOrder, domain: &Eip712Domain) -> B256 {
    eip712::DatasetOrder {
        dataset: order.dataset,
        datasetprice: U256::from(order.datasetprice),
        volume: U256::from(order.volume),
        tag: order.tag,
        apprestrict: order.apprestrict,
        workerpoolrestrict: order.workerpoolrestrict,
        requesterrestrict: order.requesterrestrict,
        salt: order.salt,
    }
    .eip712_signing_hash(domain)
}

pub(crate) fn workerpool_order_hash(order: &WorkerpoolOrder, domain: &Eip712Domain) -> B256 {
    eip712::WorkerpoolOrder {
        workerpool: order.workerpool,
        workerpoolprice: U256::from(order.workerpoolprice),
        volume: U256::from(order.volume),
        tag: order.tag,
        category: U256::from(order.category),
        trust: U256::from(order.trust),
        apprestrict: order.apprestrict,
        datasetrestrict: order.datasetrestrict,
        requesterrestrict: order.requesterrestrict,
        salt: order.salt,
    }
    .eip712_signing_hash(domain)
}

pub(crate) fn request_order_hash(order: &RequestOrder, domain: &Eip712Domain) -> B256 {
    eip712::RequestOrder {
        app: order.app,
        appmaxprice: U256::from(order.appmaxprice),
        dataset: order.dataset,
        datasetmaxprice: U256::from(order.datasetmaxprice),
        workerpool: order.workerpool,
        workerpoolmaxprice: U256::from(order.workerpoolmaxprice),
        requester: order.requester,
        volume: U256::from(order.volume),
        tag: order.tag,
        category: U256::from(order.category),
        trust: U256::from(order.trust),
        beneficiary: order.beneficiary,
        callback: order.callback,
        params: order.params.clone(),
        salt: order.salt,
    }
    .eip712_signing_hash(domain)
}

/// Recovers the address that produced `sign` over `hash`.
pub fn recover_signer(hash: B256, sign: &[u8]) -> Result<Address, SdkError> {
    let signature = Signature::try_from(sign)
        .map_err(|e| SdkError::Signature(format!("malformed signature: {e}")))?;
    signature
        .recover_address_from_prehash(&hash)
        .map_err(|e| SdkError::Signature(format!("signature recovery failed: {e}")))
}
