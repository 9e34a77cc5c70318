//! In-memory hub used by tests across the workspace.
//!
//! Matching follows the on-chain rules the clients depend on: signatures must
//! recover to a non-zero signer, the dataset order may be the null sentinel,
//! and the deal volume is the smallest remaining volume of the orders involved.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use dashmap::DashMap;
use iexec_core::deal::Resource;
use iexec_core::{
    compute_task_id, typed, AnySignedOrder, AppOrder, DatasetOrder, Deal, DealId, Order,
    OrderHash, RequestOrder, SignedOrder, Task, TaskId, TaskStatus, TxHash, WorkerpoolOrder,
};

use crate::account::Account;
use crate::error::ContractError;
use crate::hub::{Hub, MatchReceipt};
use crate::registry::{App, Dataset, Deployed, ResourceKind, Workerpool};

pub const MOCK_CHAIN_ID: u64 = 65535;
pub const MOCK_HUB: Address = Address::new([0x3e; 20]);
pub const MOCK_FINAL_DEADLINE_RATIO: u64 = 10;

pub struct MockHub {
    chain_id: u64,
    hub_address: Address,
    signer: Option<PrivateKeySigner>,
    deals: DashMap<DealId, Deal>,
    tasks: DashMap<TaskId, Task>,
    consumed: DashMap<OrderHash, u64>,
    names: DashMap<Address, String>,
    text_records: DashMap<(String, String), String>,
    apps: DashMap<Address, App>,
    datasets: DashMap<Address, Dataset>,
    workerpools: DashMap<Address, Workerpool>,
    owned: DashMap<(ResourceKind, Address), Vec<Address>>,
    accounts: DashMap<Address, Account>,
    wallets: DashMap<Address, U256>,
    ens_supported: AtomicBool,
    fail_lookups: AtomicBool,
    emit_match_event: AtomicBool,
    emit_mint_event: AtomicBool,
    tx_counter: AtomicU64,
    now: AtomicU64,
}

impl MockHub {
    pub fn new(signer: Option<PrivateKeySigner>) -> Self {
        Self {
            chain_id: MOCK_CHAIN_ID,
            hub_address: MOCK_HUB,
            signer,
            deals: DashMap::new(),
            tasks: DashMap::new(),
            consumed: DashMap::new(),
            names: DashMap::new(),
            text_records: DashMap::new(),
            apps: DashMap::new(),
            datasets: DashMap::new(),
            workerpools: DashMap::new(),
            owned: DashMap::new(),
            accounts: DashMap::new(),
            wallets: DashMap::new(),
            ens_supported: AtomicBool::new(true),
            fail_lookups: AtomicBool::new(false),
            emit_match_event: AtomicBool::new(true),
            emit_mint_event: AtomicBool::new(true),
            tx_counter: AtomicU64::new(0),
            now: AtomicU64::new(1_700_000_000),
        }
    }

    pub fn read_only() -> Self {
        Self::new(None)
    }

    pub fn with_random_signer() -> Self {
        Self::new(Some(PrivateKeySigner::random()))
    }

    pub fn disable_ens(&self) {
        self.ens_supported.store(false, Ordering::SeqCst);
    }

    /// Reverse lookups fail as an unreachable resolver would.
    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    /// Subsequent matches are mined without an `OrdersMatched` log.
    pub fn drop_match_events(&self) {
        self.emit_match_event.store(false, Ordering::SeqCst);
    }

    /// Subsequent deployments are mined without the registry's `Transfer` log.
    pub fn drop_mint_events(&self) {
        self.emit_mint_event.store(false, Ordering::SeqCst);
    }

    /// nRLC held in `address`'s wallet, outside the hub.
    pub fn set_wallet_nrlc(&self, address: Address, nrlc: U256) {
        self.wallets.insert(address, nrlc);
    }

    pub fn wallet_nrlc(&self, address: Address) -> U256 {
        self.wallets.get(&address).map(|w| *w).unwrap_or_default()
    }

    pub fn set_account(&self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    pub fn set_name(&self, address: Address, name: &str) {
        self.names.insert(address, name.to_string());
    }

    pub fn set_text_record(&self, name: &str, key: &str, value: &str) {
        self.text_records
            .insert((name.to_string(), key.to_string()), value.to_string());
    }

    pub fn insert_deal(&self, deal: Deal) {
        self.deals.insert(deal.deal_id, deal);
    }

    pub fn insert_task(&self, task: Task) {
        self.tasks.insert(task.task_id, task);
    }

    /// Moves a task to `status`, initializing it from its deal if needed.
    pub fn set_task_status(&self, task_id: TaskId, status: TaskStatus) {
        self.tasks
            .entry(task_id)
            .and_modify(|task| task.status = status)
            .or_insert_with(|| Task {
                status,
                ..unset_task(task_id)
            });
    }

    pub fn set_task_results(&self, task_id: TaskId, results: &[u8]) {
        if let Some(mut task) = self.tasks.get_mut(&task_id) {
            task.results = Bytes::copy_from_slice(results);
        }
    }

    pub fn deal_count(&self) -> usize {
        self.deals.len()
    }

    pub fn consumed(&self, hash: &OrderHash) -> u64 {
        self.consumed.get(hash).map(|c| *c).unwrap_or(0)
    }

    pub fn set_now(&self, timestamp: u64) {
        self.now.store(timestamp, Ordering::SeqCst);
    }

    fn next_tx_hash(&self) -> TxHash {
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        TxHash(keccak256(n.to_be_bytes()))
    }

    fn require_signer(&self) -> Result<&PrivateKeySigner, ContractError> {
        self.signer.as_ref().ok_or(ContractError::SignerRequired)
    }

    fn check_signature<O: Order>(&self, order: &SignedOrder<O>) -> Result<(), ContractError> {
        let hash = order.order_hash(&self.domain());
        match typed::recover_signer(hash.0, &order.sign) {
            Ok(signer) if signer != Address::ZERO => Ok(()),
            _ => Err(ContractError::Reverted {
                reason: format!("iExecV5-matchOrders-0x21 invalid {} signature", O::KIND),
            }),
        }
    }

    /// Registries deploy with CREATE2, so the same arguments always land on the
    /// same address and cannot be deployed twice.
    fn mint(
        &self,
        kind: ResourceKind,
        owner: Address,
        salt: &[u8],
    ) -> Result<Deployed, ContractError> {
        self.require_signer()?;
        let mut seed = kind.to_string().into_bytes();
        seed.extend_from_slice(owner.as_slice());
        seed.extend_from_slice(salt);
        let address = Address::from_slice(&keccak256(seed)[12..]);
        let taken = match kind {
            ResourceKind::App => self.apps.contains_key(&address),
            ResourceKind::Dataset => self.datasets.contains_key(&address),
            ResourceKind::Workerpool => self.workerpools.contains_key(&address),
        };
        if taken {
            return Err(ContractError::Reverted {
                reason: "Create2: Failed on deploy".to_string(),
            });
        }
        self.owned.entry((kind, owner)).or_default().push(address);

        let tx_hash = self.next_tx_hash();
        if !self.emit_mint_event.load(Ordering::SeqCst) {
            return Err(ContractError::EventNotFound {
                event: "Transfer",
                tx_hash,
            });
        }
        Ok(Deployed { address, tx_hash })
    }

    fn remaining<O: Order>(&self, order: &SignedOrder<O>) -> (OrderHash, u64) {
        let hash = order.order_hash(&self.domain());
        let remaining = order.order.volume().saturating_sub(self.consumed(&hash));
        (hash, remaining)
    }
}

fn unset_task(task_id: TaskId) -> Task {
    Task {
        task_id,
        status: TaskStatus::Unset,
        deal_id: DealId(B256::ZERO),
        idx: 0,
        timeref: 0,
        contribution_deadline: 0,
        reveal_deadline: 0,
        final_deadline: 0,
        consensus_value: B256::ZERO,
        reveal_counter: 0,
        winner_counter: 0,
        contributors: Vec::new(),
        result_digest: B256::ZERO,
        results: Bytes::new(),
        results_timestamp: 0,
        results_callback: Bytes::new(),
    }
}

fn revert(code: &str) -> ContractError {
    ContractError::Reverted {
        reason: format!("iExecV5-matchOrders-{code}"),
    }
}

#[async_trait]
impl Hub for MockHub {
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
            .require_signer()?
            .sign_hash(&hash)
            .await
            .map_err(|e| ContractError::SigningFailed(e.to_string()))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }

    async fn view_deal(&self, deal_id: DealId) -> Result<Deal, ContractError> {
        self.deals
            .get(&deal_id)
            .map(|deal| deal.clone())
            .ok_or_else(|| ContractError::NotFound(format!("deal {deal_id}")))
    }

    async fn view_task(&self, task_id: TaskId) -> Result<Task, ContractError> {
        Ok(self
            .tasks
            .get(&task_id)
            .map(|task| task.clone())
            .unwrap_or_else(|| unset_task(task_id)))
    }

    async fn view_consumed(&self, order_hash: OrderHash) -> Result<u64, ContractError> {
        Ok(self.consumed(&order_hash))
    }

    async fn match_orders(
        &self,
        app: &SignedOrder<AppOrder>,
        dataset: &SignedOrder<DatasetOrder>,
        workerpool: &SignedOrder<WorkerpoolOrder>,
        request: &SignedOrder<RequestOrder>,
    ) -> Result<MatchReceipt, ContractError> {
        self.require_signer()?;
        let with_dataset = !dataset.order.is_null();

        if request.order.category != workerpool.order.category {
            return Err(revert("0x00"));
        }
        if request.order.trust > workerpool.order.trust {
            return Err(revert("0x01"));
        }
        if request.order.app != app.order.app {
            return Err(revert("0x10"));
        }
        if request.order.dataset != dataset.order.dataset {
            return Err(revert("0x11"));
        }

        self.check_signature(app)?;
        if with_dataset {
            self.check_signature(dataset)?;
        }
        self.check_signature(workerpool)?;
        self.check_signature(request)?;

        let (app_hash, app_left) = self.remaining(app);
        let (dataset_hash, dataset_left) = self.remaining(dataset);
        let (workerpool_hash, workerpool_left) = self.remaining(workerpool);
        let (request_hash, request_left) = self.remaining(request);

        let mut volume = app_left.min(workerpool_left).min(request_left);
        if with_dataset {
            volume = volume.min(dataset_left);
        }
        if volume == 0 {
            return Err(revert("0x60"));
        }

        let bot_first = self.consumed(&request_hash);
        let mut seed = [0u8; 64];
        seed[..32].copy_from_slice(request_hash.as_bytes());
        seed[32..].copy_from_slice(&U256::from(bot_first).to_be_bytes::<32>());
        let deal_id = DealId(keccak256(seed));

        let resource = |pointer: Address, price: u64| Resource {
            pointer,
            owner: pointer,
            price,
        };
        let deal = Deal {
            deal_id,
            app: resource(app.order.app, app.order.appprice),
            dataset: resource(dataset.order.dataset, dataset.order.datasetprice),
            workerpool: resource(workerpool.order.workerpool, workerpool.order.workerpoolprice),
            trust: request.order.trust,
            category: request.order.category,
            tag: app.order.tag | dataset.order.tag | request.order.tag,
            requester: request.order.requester,
            beneficiary: request.order.beneficiary,
            callback: request.order.callback,
            params: request.order.params.clone(),
            start_time: self.now.load(Ordering::SeqCst),
            bot_first,
            bot_size: volume,
            worker_stake: U256::ZERO,
            scheduler_reward_ratio: 1,
        };
        for idx in bot_first..bot_first + volume {
            let task_id = compute_task_id(deal_id, idx);
            self.tasks.insert(
                task_id,
                Task {
                    status: TaskStatus::Active,
                    deal_id,
                    idx,
                    timeref: 300,
                    final_deadline: deal.start_time + 300 * MOCK_FINAL_DEADLINE_RATIO,
                    ..unset_task(task_id)
                },
            );
        }
        self.deals.insert(deal_id, deal);

        let consume = |hash: OrderHash| {
            *self.consumed.entry(hash).or_insert(0) += volume;
        };
        consume(app_hash);
        if with_dataset {
            consume(dataset_hash);
        }
        consume(workerpool_hash);
        consume(request_hash);

        let tx_hash = self.next_tx_hash();
        if !self.emit_match_event.load(Ordering::SeqCst) {
            return Err(ContractError::EventNotFound {
                event: "OrdersMatched",
                tx_hash,
            });
        }
        Ok(MatchReceipt {
            deal_id,
            volume,
            tx_hash,
        })
    }

    async fn close_order(&self, order: &AnySignedOrder) -> Result<TxHash, ContractError> {
        self.require_signer()?;
        let hash = order.order_hash(&self.domain());
        let volume = match order {
            AnySignedOrder::App(o) => o.order.volume(),
            AnySignedOrder::Dataset(o) => o.order.volume(),
            AnySignedOrder::Workerpool(o) => o.order.volume(),
            AnySignedOrder::Request(o) => o.order.volume(),
        };
        self.consumed.insert(hash, volume);
        Ok(self.next_tx_hash())
    }

    async fn claim_task(&self, task_id: TaskId) -> Result<TxHash, ContractError> {
        self.require_signer()?;
        let now = self.now.load(Ordering::SeqCst);
        let mut task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| ContractError::Reverted {
                reason: "iExecV5-claim-0x01".to_string(),
            })?;
        let claimable = matches!(task.status, TaskStatus::Active | TaskStatus::Revealing);
        if !claimable || now < task.final_deadline {
            return Err(ContractError::Reverted {
                reason: "iExecV5-claim-0x01".to_string(),
            });
        }
        task.status = TaskStatus::Failed;
        Ok(self.next_tx_hash())
    }

    async fn final_deadline_ratio(&self) -> Result<u64, ContractError> {
        Ok(MOCK_FINAL_DEADLINE_RATIO)
    }

    async fn view_account(&self, address: Address) -> Result<Account, ContractError> {
        Ok(self.accounts.get(&address).map(|a| *a).unwrap_or_default())
    }

    async fn deposit(&self, nrlc: U256) -> Result<TxHash, ContractError> {
        let owner = self.require_signer()?.address();
        let available = self.wallet_nrlc(owner);
        if nrlc > available {
            return Err(ContractError::Rejected(format!(
                "deposit amount exceeds wallet balance ({available} nRLC)"
            )));
        }
        self.wallets.insert(owner, available - nrlc);
        self.accounts.entry(owner).or_default().stake += nrlc;
        Ok(self.next_tx_hash())
    }

    async fn withdraw(&self, nrlc: U256) -> Result<TxHash, ContractError> {
        let owner = self.require_signer()?.address();
        let mut account = self.accounts.entry(owner).or_default();
        if nrlc > account.stake {
            return Err(ContractError::Reverted {
                reason: "panic: arithmetic underflow or overflow".to_string(),
            });
        }
        account.stake -= nrlc;
        drop(account);
        *self.wallets.entry(owner).or_default() += nrlc;
        Ok(self.next_tx_hash())
    }

    async fn create_app(&self, app: &App) -> Result<Deployed, ContractError> {
        let salt = [
            app.name.as_bytes(),
            app.app_type.as_bytes(),
            app.multiaddr.as_bytes(),
            app.checksum.as_slice(),
            app.mrenclave.as_bytes(),
        ]
        .concat();
        let deployed = self.mint(ResourceKind::App, app.owner, &salt)?;
        self.apps.insert(deployed.address, app.clone());
        Ok(deployed)
    }

    async fn create_dataset(&self, dataset: &Dataset) -> Result<Deployed, ContractError> {
        let salt = [
            dataset.name.as_bytes(),
            dataset.multiaddr.as_bytes(),
            dataset.checksum.as_slice(),
        ]
        .concat();
        let deployed = self.mint(ResourceKind::Dataset, dataset.owner, &salt)?;
        self.datasets.insert(deployed.address, dataset.clone());
        Ok(deployed)
    }

    async fn create_workerpool(&self, workerpool: &Workerpool) -> Result<Deployed, ContractError> {
        let deployed = self.mint(
            ResourceKind::Workerpool,
            workerpool.owner,
            workerpool.description.as_bytes(),
        )?;
        self.workerpools.insert(
            deployed.address,
            Workerpool {
                worker_stake_ratio_policy: 30,
                scheduler_reward_ratio_policy: 1,
                ..workerpool.clone()
            },
        );
        Ok(deployed)
    }

    async fn view_app(&self, address: Address) -> Result<App, ContractError> {
        self.apps
            .get(&address)
            .map(|app| app.clone())
            .ok_or_else(|| ContractError::NotFound(format!("app {address}")))
    }

    async fn view_dataset(&self, address: Address) -> Result<Dataset, ContractError> {
        self.datasets
            .get(&address)
            .map(|dataset| dataset.clone())
            .ok_or_else(|| ContractError::NotFound(format!("dataset {address}")))
    }

    async fn view_workerpool(&self, address: Address) -> Result<Workerpool, ContractError> {
        self.workerpools
            .get(&address)
            .map(|pool| pool.clone())
            .ok_or_else(|| ContractError::NotFound(format!("workerpool {address}")))
    }

    async fn count_owned(&self, kind: ResourceKind, owner: Address) -> Result<u64, ContractError> {
        Ok(self.owned.get(&(kind, owner)).map_or(0, |list| list.len() as u64))
    }

    async fn owned_by_index(
        &self,
        kind: ResourceKind,
        owner: Address,
        index: u64,
    ) -> Result<Address, ContractError> {
        self.owned
            .get(&(kind, owner))
            .and_then(|list| usize::try_from(index).ok().and_then(|i| list.get(i).copied()))
            .ok_or_else(|| ContractError::Reverted {
                reason: "ERC721Enumerable: owner index out of bounds".to_string(),
            })
    }

    async fn lookup_address(&self, address: Address) -> Result<Option<String>, ContractError> {
        if !self.ens_supported.load(Ordering::SeqCst) {
            return Err(ContractError::EnsUnsupported);
        }
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(ContractError::CallFailed(format!(
                "reverse resolution of {address} timed out"
            )));
        }
        Ok(self.names.get(&address).map(|name| name.clone()))
    }

    async fn read_text_record(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<String>, ContractError> {
        if !self.ens_supported.load(Ordering::SeqCst) {
            return Err(ContractError::EnsUnsupported);
        }
        Ok(self
            .text_records
            .get(&(name.to_string(), key.to_string()))
            .map(|value| value.clone()))
    }
}
