use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::Eip712Domain;
use async_trait::async_trait;
use iexec_core::{
    typed, AnySignedOrder, AppOrder, DatasetOrder, Deal, DealId, OrderHash, RequestOrder,
    SignedOrder, Task, TaskId, TxHash, WorkerpoolOrder,
};
use serde::Serialize;

use crate::account::Account;
use crate::error::ContractError;
use crate::registry::{App, Dataset, Deployed, ResourceKind, Workerpool};

/// Outcome of a mined `matchOrders`, read back from the `OrdersMatched` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatchReceipt {
    pub deal_id: DealId,
    pub volume: u64,
    pub tx_hash: TxHash,
}

/// Everything the marketplace and tracking flows need from the chain.
///
/// Implemented by [`crate::ContractClient`] against a live node, and by
/// `mock::MockHub` in tests.
#[async_trait]
pub trait Hub: Send + Sync {
    fn chain_id(&self) -> u64;

    fn hub_address(&self) -> Address;

    fn domain(&self) -> Eip712Domain {
        typed::domain(self.chain_id(), self.hub_address())
    }

    /// Address of the configured signer, `None` for a read-only handle.
    fn signer_address(&self) -> Option<Address>;

    /// Signs a 32-byte digest (EIP-712 signing hash) without any prefix.
    async fn sign_hash(&self, hash: B256) -> Result<Bytes, ContractError>;

    async fn view_deal(&self, deal_id: DealId) -> Result<Deal, ContractError>;

    /// Uninitialized tasks come back with status `UNSET` and a zero deal id.
    async fn view_task(&self, task_id: TaskId) -> Result<Task, ContractError>;

    async fn view_consumed(&self, order_hash: OrderHash) -> Result<u64, ContractError>;

    async fn match_orders(
        &self,
        app: &SignedOrder<AppOrder>,
        dataset: &SignedOrder<DatasetOrder>,
        workerpool: &SignedOrder<WorkerpoolOrder>,
        request: &SignedOrder<RequestOrder>,
    ) -> Result<MatchReceipt, ContractError>;

    async fn close_order(&self, order: &AnySignedOrder) -> Result<TxHash, ContractError>;

    /// Marks a task past its final deadline as FAILED and refunds the requester.
    async fn claim_task(&self, task_id: TaskId) -> Result<TxHash, ContractError>;

    /// Multiplier applied to a category's work clock to get a task's final deadline.
    async fn final_deadline_ratio(&self) -> Result<u64, ContractError>;

    async fn view_account(&self, address: Address) -> Result<Account, ContractError>;

    async fn deposit(&self, nrlc: U256) -> Result<TxHash, ContractError>;

    async fn withdraw(&self, nrlc: U256) -> Result<TxHash, ContractError>;

    async fn create_app(&self, app: &App) -> Result<Deployed, ContractError>;

    async fn create_dataset(&self, dataset: &Dataset) -> Result<Deployed, ContractError>;

    async fn create_workerpool(&self, workerpool: &Workerpool) -> Result<Deployed, ContractError>;

    /// `NotFound` unless `address` is registered as an app.
    async fn view_app(&self, address: Address) -> Result<App, ContractError>;

    async fn view_dataset(&self, address: Address) -> Result<Dataset, ContractError>;

    async fn view_workerpool(&self, address: Address) -> Result<Workerpool, ContractError>;

    async fn count_owned(&self, kind: ResourceKind, owner: Address) -> Result<u64, ContractError>;

    async fn owned_by_index(
        &self,
        kind: ResourceKind,
        owner: Address,
        index: u64,
    ) -> Result<Address, ContractError>;

    /// Reverse ENS resolution. `None` when the address has no primary name.
    async fn lookup_address(&self, address: Address) -> Result<Option<String>, ContractError>;

    /// `None` when the name has no resolver or the record is empty.
    async fn read_text_record(&self, name: &str, key: &str)
        -> Result<Option<String>, ContractError>;
}
