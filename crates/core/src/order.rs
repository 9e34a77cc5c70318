use std::fmt;

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::Eip712Domain;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::enums::OrderKind;
use crate::error::SdkError;
use crate::ids::OrderHash;
use crate::typed;

pub const NULL_ADDRESS: Address = Address::ZERO;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppOrder {
    pub app: Address,
    pub appprice: u64,
    pub volume: u64,
    pub tag: B256,
    pub datasetrestrict: Address,
    pub workerpoolrestrict: Address,
    pub requesterrestrict: Address,
    pub salt: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetOrder {
    pub dataset: Address,
    pub datasetprice: u64,
    pub volume: u64,
    pub tag: B256,
    pub apprestrict: Address,
    pub workerpoolrestrict: Address,
    pub requesterrestrict: Address,
    pub salt: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerpoolOrder {
    pub workerpool: Address,
    pub workerpoolprice: u64,
    pub volume: u64,
    pub tag: B256,
    pub category: u64,
    pub trust: u64,
    pub apprestrict: Address,
    pub datasetrestrict: Address,
    pub requesterrestrict: Address,
    pub salt: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOrder {
    pub app: Address,
    pub appmaxprice: u64,
    pub dataset: Address,
    pub datasetmaxprice: u64,
    pub workerpool: Address,
    pub workerpoolmaxprice: u64,
    pub requester: Address,
    pub volume: u64,
    pub tag: B256,
    pub category: u64,
    pub trust: u64,
    pub beneficiary: Address,
    pub callback: Address,
    pub params: String,
    pub salt: B256,
}

/// Common surface of the four order kinds.
pub trait Order:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: OrderKind;

    fn volume(&self) -> u64;

    /// Re-checks invariants that the field types alone do not enforce.
    fn validate(&self) -> Result<(), SdkError>;

    fn order_hash(&self, domain: &Eip712Domain) -> OrderHash;

    fn into_any(signed: SignedOrder<Self>) -> AnySignedOrder;
}

fn require_non_null(address: Address, field: &str) -> Result<(), SdkError> {
    if address == NULL_ADDRESS {
        return Err(SdkError::validation(field, "must not be the zero address"));
    }
    Ok(())
}

impl Order for AppOrder {
    const KIND: OrderKind = OrderKind::App;

    fn volume(&self) -> u64 {
        self.volume
    }

    fn validate(&self) -> Result<(), SdkError> {
        require_non_null(self.app, "app")
    }

    fn order_hash(&self, domain: &Eip712Domain) -> OrderHash {
        OrderHash(typed::app_order_hash(self, domain))
    }

    fn into_any(signed: SignedOrder<Self>) -> AnySignedOrder {
        AnySignedOrder::App(signed)
    }
}

impl Order for DatasetOrder {
    const KIND: OrderKind = OrderKind::Dataset;

    fn volume(&self) -> u64 {
        self.volume
    }

    fn validate(&self) -> Result<(), SdkError> {
        require_non_null(self.dataset, "dataset")
    }

    fn order_hash(&self, domain: &Eip712Domain) -> OrderHash {
        OrderHash(typed::dataset_order_hash(self, domain))
    }

    fn into_any(signed: SignedOrder<Self>) -> AnySignedOrder {
        AnySignedOrder::Dataset(signed)
    }
}

impl Order for WorkerpoolOrder {
    const KIND: OrderKind = OrderKind::Workerpool;

    fn volume(&self) -> u64 {
        self.volume
    }

    fn validate(&self) -> Result<(), SdkError> {
        require_non_null(self.workerpool, "workerpool")
    }

    fn order_hash(&self, domain: &Eip712Domain) -> OrderHash {
        OrderHash(typed::workerpool_order_hash(self, domain))
    }

    fn into_any(signed: SignedOrder<Self>) -> AnySignedOrder {
        AnySignedOrder::Workerpool(signed)
    }
}

impl Order for RequestOrder {
    const KIND: OrderKind = OrderKind::Request;

    fn volume(&self) -> u64 {
        self.volume
    }

    fn validate(&self) -> Result<(), SdkError> {
        require_non_null(self.app, "app")?;
        require_non_null(self.requester, "requester")?;
        require_non_null(self.beneficiary, "beneficiary")
    }

    fn order_hash(&self, domain: &Eip712Domain) -> OrderHash {
        OrderHash(typed::request_order_hash(self, domain))
    }

    fn into_any(signed: SignedOrder<Self>) -> AnySignedOrder {
        AnySignedOrder::Request(signed)
    }
}

impl DatasetOrder {
    /// The "no dataset" order accepted by `matchOrders` when a request uses no dataset.
    pub fn null() -> Self {
        Self {
            dataset: NULL_ADDRESS,
            datasetprice: 0,
            volume: 0,
            tag: B256::ZERO,
            apprestrict: NULL_ADDRESS,
            workerpoolrestrict: NULL_ADDRESS,
            requesterrestrict: NULL_ADDRESS,
            salt: B256::ZERO,
        }
    }

    pub fn is_null(&self) -> bool {
        self.dataset == NULL_ADDRESS
    }
}

/// An order together with the signature binding all of its fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOrder<O> {
    #[serde(flatten)]
    pub order: O,
    pub sign: Bytes,
}

impl<O: Order> SignedOrder<O> {
    pub fn is_signed(&self) -> bool {
        !self.sign.is_empty()
    }

    pub fn order_hash(&self, domain: &Eip712Domain) -> OrderHash {
        self.order.order_hash(domain)
    }

    /// Checks that the signature recovers to `expected` over this exact field set.
    pub fn verify(&self, domain: &Eip712Domain, expected: Address) -> Result<(), SdkError> {
        let hash = self.order_hash(domain);
        let signer = typed::recover_signer(hash.0, &self.sign)?;
        if signer != expected {
            return Err(SdkError::Signature(format!(
                "{} {hash} is signed by {signer}, expected {expected}",
                O::KIND
            )));
        }
        Ok(())
    }
}

impl SignedOrder<DatasetOrder> {
    /// Unsigned sentinel standing for "no dataset"; never published, never signed.
    pub fn null() -> Self {
        Self {
            order: DatasetOrder::null(),
            sign: Bytes::new(),
        }
    }
}

/// An unsigned order of any kind, as produced by the builder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnyOrder {
    App(AppOrder),
    Dataset(DatasetOrder),
    Workerpool(WorkerpoolOrder),
    Request(RequestOrder),
}

impl AnyOrder {
    pub fn kind(&self) -> OrderKind {
        match self {
            Self::App(_) => OrderKind::App,
            Self::Dataset(_) => OrderKind::Dataset,
            Self::Workerpool(_) => OrderKind::Workerpool,
            Self::Request(_) => OrderKind::Request,
        }
    }

    pub fn order_hash(&self, domain: &Eip712Domain) -> OrderHash {
        match self {
            Self::App(o) => o.order_hash(domain),
            Self::Dataset(o) => o.order_hash(domain),
            Self::Workerpool(o) => o.order_hash(domain),
            Self::Request(o) => o.order_hash(domain),
        }
    }
}

/// A signed order of any kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnySignedOrder {
    App(SignedOrder<AppOrder>),
    Dataset(SignedOrder<DatasetOrder>),
    Workerpool(SignedOrder<WorkerpoolOrder>),
    Request(SignedOrder<RequestOrder>),
}

impl AnySignedOrder {
    pub fn kind(&self) -> OrderKind {
        match self {
            Self::App(_) => OrderKind::App,
            Self::Dataset(_) => OrderKind::Dataset,
            Self::Workerpool(_) => OrderKind::Workerpool,
            Self::Request(_) => OrderKind::Request,
        }
    }

    pub fn sign(&self) -> &Bytes {
        match self {
            Self::App(o) => &o.sign,
            Self::Dataset(o) => &o.sign,
            Self::Workerpool(o) => &o.sign,
            Self::Request(o) => &o.sign,
        }
    }

    pub fn order_hash(&self, domain: &Eip712Domain) -> OrderHash {
        match self {
            Self::App(o) => o.order_hash(domain),
            Self::Dataset(o) => o.order_hash(domain),
            Self::Workerpool(o) => o.order_hash(domain),
            Self::Request(o) => o.order_hash(domain),
        }
    }

    /// Parses a signed order of a known kind from its JSON document.
    pub fn from_json(kind: OrderKind, value: serde_json::Value) -> Result<Self, SdkError> {
        let invalid = |e: serde_json::Error| SdkError::validation(kind.order_name(), e.to_string());
        Ok(match kind {
            OrderKind::App => Self::App(serde_json::from_value(value).map_err(invalid)?),
            OrderKind::Dataset => Self::Dataset(serde_json::from_value(value).map_err(invalid)?),
            OrderKind::Workerpool => {
                Self::Workerpool(serde_json::from_value(value).map_err(invalid)?)
            }
            OrderKind::Request => Self::Request(serde_json::from_value(value).map_err(invalid)?),
        })
    }
}
