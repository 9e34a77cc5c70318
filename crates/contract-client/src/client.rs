use std::str::FromStr;

use alloy::contract::{CallBuilder, CallDecoder};
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy::sol_types::{Revert, SolError};
use async_trait::async_trait;
use iexec_core::{
    AnySignedOrder, AppOrder, DatasetOrder, Deal, DealId, OrderHash, RequestOrder, SignedOrder,
    Task, TaskId, TxHash, WorkerpoolOrder,
};
use url::Url;

use crate::account::Account;
use crate::config::ChainConfig;
use crate::conversions::{
    decode_deal, decode_task, encode_app_order, encode_dataset_order, encode_request_order,
    encode_workerpool_order, u256_to_u64,
};
use crate::error::ContractError;
use crate::hub::{Hub, MatchReceipt};
use crate::registry::{App, Dataset, Deployed, ResourceKind, Workerpool};
use crate::{IexecHub, ORDER_OPERATION_CLOSE};

/// Alloy-backed handle on the iExec hub. Providers are built per call, so the
/// handle itself holds no connection and is cheap to share.
pub struct ContractClient {
    rpc_url: Url,
    pub hub_address: Address,
    chain_id: u64,
    signer: Option<PrivateKeySigner>,
    confirmations: u64,
    gas_price: Option<u128>,
    pub(crate) ens_registry: Option<Address>,
    pub(crate) native_token: bool,
}

impl ContractClient {
    pub fn new(config: &ChainConfig, private_key: Option<&str>) -> Result<Self, ContractError> {
        config.validate()?;
        let signer = private_key
            .map(|key| {
                PrivateKeySigner::from_str(key)
                    .map_err(|e| ContractError::InvalidConfig(format!("invalid private key: {e}")))
            })
            .transpose()?
            .map(|signer| signer.with_chain_id(Some(config.chain_id)));
        Ok(Self {
            rpc_url: config.rpc_url.clone(),
            hub_address: config.hub_address,
            chain_id: config.chain_id,
            signer,
            confirmations: config.confirmations,
            gas_price: config.gas_price,
            ens_registry: config.ens_registry,
            native_token: config.native_token,
        })
    }

    pub fn signer(&self) -> Result<&PrivateKeySigner, ContractError> {
        self.signer.as_ref().ok_or(ContractError::SignerRequired)
    }

    pub(crate) fn read_provider(&self) -> impl Provider + Clone {
        ProviderBuilder::new().connect_http(self.rpc_url.clone())
    }

    pub(crate) fn write_provider(&self) -> Result<impl Provider + Clone, ContractError> {
        let wallet = EthereumWallet::from(self.signer()?.clone());
        Ok(ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(self.rpc_url.clone()))
    }

    pub(crate) fn gas_price(&self) -> Option<u128> {
        self.gas_price
    }

    pub(crate) fn confirmations(&self) -> u64 {
        self.confirmations
    }

    pub(crate) async fn send_and_confirm<P, D>(
        &self,
        call: CallBuilder<P, D>,
    ) -> Result<TransactionReceipt, ContractError>
    where
        P: Provider,
        D: CallDecoder,
    {
        let call = match self.gas_price {
            Some(price) => call.gas_price(price),
            None => call,
        };
        let pending = call.send().await.map_err(send_error)?;
        let tx_hash = *pending.tx_hash();
        tracing::debug!(tx_hash = %tx_hash, "transaction sent");

        let receipt = pending
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .map_err(|e| ContractError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(ContractError::Reverted {
                reason: format!("transaction {tx_hash} reverted"),
            });
        }
        Ok(receipt)
    }
}

pub(crate) fn revert_reason(err: &alloy::contract::Error) -> Option<String> {
    if let Some(data) = err.as_revert_data() {
        if let Ok(revert) = Revert::abi_decode(&data) {
            return Some(revert.reason);
        }
    }
    let message = err.to_string();
    message
        .split_once("execution reverted: ")
        .map(|(_, reason)| reason.trim().to_string())
}

pub(crate) fn send_error(err: alloy::contract::Error) -> ContractError {
    match revert_reason(&err) {
        Some(reason) => ContractError::Reverted { reason },
        None => ContractError::TransactionFailed(err.to_string()),
    }
}

pub(crate) fn call_error(err: alloy::contract::Error) -> ContractError {
    match revert_reason(&err) {
        Some(reason) => ContractError::Reverted { reason },
        None => ContractError::CallFailed(err.to_string()),
    }
}

#[async_trait]
impl Hub for ContractClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn hub_address(&self) -> Address {
        self.hub_address
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    async fn sign_hash(&self, hash: B256) -> Result<Bytes, ContractError> {
        let signature = self
            .signer()?
            .sign_hash(&hash)
            .await
            .map_err(|e| ContractError::SigningFailed(e.to_string()))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }

    async fn view_deal(&self, deal_id: DealId) -> Result<Deal, ContractError> {
        let hub = IexecHub::new(self.hub_address, self.read_provider());
        let raw = hub.viewDeal(deal_id.0).call().await.map_err(call_error)?;
        if raw.app.pointer == Address::ZERO {
            return Err(ContractError::NotFound(format!("deal {deal_id}")));
        }
        decode_deal(deal_id, raw)
    }

    async fn view_task(&self, task_id: TaskId) -> Result<Task, ContractError> {
        let hub = IexecHub::new(self.hub_address, self.read_provider());
        let raw = hub.viewTask(task_id.0).call().await.map_err(call_error)?;
        decode_task(task_id, raw)
    }

    async fn view_consumed(&self, order_hash: OrderHash) -> Result<u64, ContractError> {
        let hub = IexecHub::new(self.hub_address, self.read_provider());
        let consumed = hub
            .viewConsumed(order_hash.0)
            .call()
            .await
            .map_err(call_error)?;
        u256_to_u64(consumed, "consumed")
    }

    async fn match_orders(
        &self,
        app: &SignedOrder<AppOrder>,
        dataset: &SignedOrder<DatasetOrder>,
        workerpool: &SignedOrder<WorkerpoolOrder>,
        request: &SignedOrder<RequestOrder>,
    ) -> Result<MatchReceipt, ContractError> {
        let hub = IexecHub::new(self.hub_address, self.write_provider()?);
        let call = hub.matchOrders(
            encode_app_order(app),
            encode_dataset_order(dataset),
            encode_workerpool_order(workerpool),
            encode_request_order(request),
        );
        let receipt = self.send_and_confirm(call).await?;
        let tx_hash = TxHash(receipt.transaction_hash);

        let matched = receipt
            .inner
            .logs()
            .iter()
            .filter(|log| log.inner.address == self.hub_address)
            .find_map(|log| log.log_decode::<IexecHub::OrdersMatched>().ok())
            .ok_or(ContractError::EventNotFound {
                event: "OrdersMatched",
                tx_hash,
            })?
            .inner
            .data;

        let receipt = MatchReceipt {
            deal_id: DealId(matched.dealid),
            volume: u256_to_u64(matched.volume, "volume")?,
            tx_hash,
        };
        tracing::info!(
            deal_id = %receipt.deal_id,
            volume = receipt.volume,
            tx_hash = %receipt.tx_hash,
            "orders matched"
        );
        Ok(receipt)
    }

    async fn close_order(&self, order: &AnySignedOrder) -> Result<TxHash, ContractError> {
        let hub = IexecHub::new(self.hub_address, self.write_provider()?);
        let receipt = match order {
            AnySignedOrder::App(o) => {
                let operation = IexecHub::AppOrderOperation {
                    order: encode_app_order(o),
                    operation: ORDER_OPERATION_CLOSE,
                    sign: Bytes::new(),
                };
                self.send_and_confirm(hub.manageAppOrder(operation)).await?
            }
            AnySignedOrder::Dataset(o) => {
                let operation = IexecHub::DatasetOrderOperation {
                    order: encode_dataset_order(o),
                    operation: ORDER_OPERATION_CLOSE,
                    sign: Bytes::new(),
                };
                self.send_and_confirm(hub.manageDatasetOrder(operation)).await?
            }
            AnySignedOrder::Workerpool(o) => {
                let operation = IexecHub::WorkerpoolOrderOperation {
                    order: encode_workerpool_order(o),
                    operation: ORDER_OPERATION_CLOSE,
                    sign: Bytes::new(),
                };
                self.send_and_confirm(hub.manageWorkerpoolOrder(operation)).await?
            }
            AnySignedOrder::Request(o) => {
                let operation = IexecHub::RequestOrderOperation {
                    order: encode_request_order(o),
                    operation: ORDER_OPERATION_CLOSE,
                    sign: Bytes::new(),
                };
                self.send_and_confirm(hub.manageRequestOrder(operation)).await?
            }
        };
        let tx_hash = TxHash(receipt.transaction_hash);
        tracing::info!(kind = %order.kind(), tx_hash = %tx_hash, "order closed on-chain");
        Ok(tx_hash)
    }

    async fn claim_task(&self, task_id: TaskId) -> Result<TxHash, ContractError> {
        let hub = IexecHub::new(self.hub_address, self.write_provider()?);
        let receipt = self.send_and_confirm(hub.claim(task_id.0)).await?;
        let tx_hash = TxHash(receipt.transaction_hash);
        tracing::info!(task_id = %task_id, tx_hash = %tx_hash, "task claimed");
        Ok(tx_hash)
    }

    async fn final_deadline_ratio(&self) -> Result<u64, ContractError> {
        let hub = IexecHub::new(self.hub_address, self.read_provider());
        let ratio = hub.final_deadline_ratio().call().await.map_err(call_error)?;
        u256_to_u64(ratio, "finalDeadlineRatio")
    }

    async fn view_account(&self, address: Address) -> Result<Account, ContractError> {
        self.escrow_view_account(address).await
    }

    async fn deposit(&self, nrlc: U256) -> Result<TxHash, ContractError> {
        self.escrow_deposit(nrlc).await
    }

    async fn withdraw(&self, nrlc: U256) -> Result<TxHash, ContractError> {
        self.escrow_withdraw(nrlc).await
    }

    async fn create_app(&self, app: &App) -> Result<Deployed, ContractError> {
        self.registry_create_app(app).await
    }

    async fn create_dataset(&self, dataset: &Dataset) -> Result<Deployed, ContractError> {
        self.registry_create_dataset(dataset).await
    }

    async fn create_workerpool(&self, workerpool: &Workerpool) -> Result<Deployed, ContractError> {
        self.registry_create_workerpool(workerpool).await
    }

    async fn view_app(&self, address: Address) -> Result<App, ContractError> {
        self.registry_view_app(address).await
    }

    async fn view_dataset(&self, address: Address) -> Result<Dataset, ContractError> {
        self.registry_view_dataset(address).await
    }

    async fn view_workerpool(&self, address: Address) -> Result<Workerpool, ContractError> {
        self.registry_view_workerpool(address).await
    }

    async fn count_owned(&self, kind: ResourceKind, owner: Address) -> Result<u64, ContractError> {
        self.registry_count(kind, owner).await
    }

    async fn owned_by_index(
        &self,
        kind: ResourceKind,
        owner: Address,
        index: u64,
    ) -> Result<Address, ContractError> {
        self.registry_token_of_owner(kind, owner, index).await
    }

    async fn lookup_address(&self, address: Address) -> Result<Option<String>, ContractError> {
        self.ens_lookup_address(address).await
    }

    async fn read_text_record(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<String>, ContractError> {
        self.ens_read_text_record(name, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANVIL_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn builds_read_only_client() {
        let client = ContractClient::new(&ChainConfig::default(), None).unwrap();
        assert_eq!(client.signer_address(), None);
        assert!(matches!(client.signer(), Err(ContractError::SignerRequired)));
        assert!(matches!(client.write_provider(), Err(ContractError::SignerRequired)));
    }

    #[test]
    fn rejects_malformed_private_key() {
        let err = ContractClient::new(&ChainConfig::default(), Some("0x1234")).err();
        assert!(matches!(err, Some(ContractError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn signs_digest_with_configured_key() {
        let client = ContractClient::new(&ChainConfig::default(), Some(ANVIL_KEY_0)).unwrap();
        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        assert_eq!(client.signer_address(), Some(expected));

        let hash = B256::repeat_byte(0xab);
        let sign = client.sign_hash(hash).await.unwrap();
        assert_eq!(sign.len(), 65);
        assert_eq!(iexec_core::typed::recover_signer(hash, &sign).unwrap(), expected);
    }
}
