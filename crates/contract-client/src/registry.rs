//! App, dataset and workerpool registries.
//!
//! Every deployed resource is an ERC721 token of its registry whose id is the
//! resource address. Deploying mints the token, so the new address is read from
//! the `Transfer` event of the creation transaction.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::{Log, TransactionReceipt};
use alloy::sol;
use iexec_core::TxHash;
use serde::{Deserialize, Serialize};

use crate::client::{call_error, ContractClient};
use crate::conversions::{decode_mrenclave, decode_multiaddr, encode_multiaddr, u256_to_u64};
use crate::error::ContractError;
use crate::hub::Hub;
use crate::IexecHub;

/// The only app type the workers run.
pub const APP_TYPE_DOCKER: &str = "DOCKER";

sol! {
    #[sol(rpc)]
    interface IRegistry {
        function isRegistered(address entry) external view returns (bool);
        function balanceOf(address owner) external view returns (uint256);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);

        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
    }

    #[sol(rpc)]
    interface IAppRegistry {
        function createApp(
            address appOwner,
            string calldata appName,
            string calldata appType,
            bytes calldata appMultiaddr,
            bytes32 appChecksum,
            bytes calldata appMREnclave
        ) external returns (address);
    }

    #[sol(rpc)]
    interface IDatasetRegistry {
        function createDataset(
            address datasetOwner,
            string calldata datasetName,
            bytes calldata datasetMultiaddr,
            bytes32 datasetChecksum
        ) external returns (address);
    }

    #[sol(rpc)]
    interface IWorkerpoolRegistry {
        function createWorkerpool(address workerpoolOwner, string calldata workerpoolDescription)
            external returns (address);
    }

    #[sol(rpc)]
    interface IApp {
        function owner() external view returns (address);
        function m_appName() external view returns (string);
        function m_appType() external view returns (string);
        function m_appMultiaddr() external view returns (bytes);
        function m_appChecksum() external view returns (bytes32);
        function m_appMREnclave() external view returns (bytes);
    }

    #[sol(rpc)]
    interface IDataset {
        function owner() external view returns (address);
        function m_datasetName() external view returns (string);
        function m_datasetMultiaddr() external view returns (bytes);
        function m_datasetChecksum() external view returns (bytes32);
    }

    #[sol(rpc)]
    interface IWorkerpool {
        function owner() external view returns (address);
        function m_workerpoolDescription() external view returns (string);
        function m_workerStakeRatioPolicy() external view returns (uint256);
        function m_schedulerRewardRatioPolicy() external view returns (uint256);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    App,
    Dataset,
    Workerpool,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::App => "app",
            Self::Dataset => "dataset",
            Self::Workerpool => "workerpool",
        })
    }
}

impl FromStr for ResourceKind {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "app" => Ok(Self::App),
            "dataset" => Ok(Self::Dataset),
            "workerpool" => Ok(Self::Workerpool),
            other => Err(invalid("kind", format!("unknown resource kind {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub owner: Address,
    pub name: String,
    #[serde(rename = "type")]
    pub app_type: String,
    pub multiaddr: String,
    pub checksum: B256,
    /// JSON enclave description for TEE apps, empty otherwise.
    #[serde(default)]
    pub mrenclave: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub owner: Address,
    pub name: String,
    pub multiaddr: String,
    #[serde(default)]
    pub checksum: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workerpool {
    pub owner: Address,
    pub description: String,
    #[serde(default)]
    pub worker_stake_ratio_policy: u64,
    #[serde(default)]
    pub scheduler_reward_ratio_policy: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployed {
    pub address: Address,
    pub tx_hash: TxHash,
}

fn invalid(field: &str, message: impl Into<String>) -> ContractError {
    ContractError::InvalidArgument {
        field: field.to_string(),
        message: message.into(),
    }
}

fn require_owner(owner: Address) -> Result<(), ContractError> {
    if owner == Address::ZERO {
        return Err(invalid("owner", "cannot be the zero address"));
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<(), ContractError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "is a required field"));
    }
    Ok(())
}

impl App {
    pub fn validate(&self) -> Result<(), ContractError> {
        require_owner(self.owner)?;
        require_text("name", &self.name)?;
        if self.app_type != APP_TYPE_DOCKER {
            return Err(invalid("type", format!("must be {APP_TYPE_DOCKER}")));
        }
        require_text("multiaddr", &self.multiaddr)?;
        if self.checksum == B256::ZERO {
            return Err(invalid("checksum", "is a required field"));
        }
        if !self.mrenclave.is_empty() && !self.mrenclave.trim_start().starts_with('{') {
            return Err(invalid("mrenclave", "must be a JSON object"));
        }
        Ok(())
    }
}

impl Dataset {
    pub fn validate(&self) -> Result<(), ContractError> {
        require_owner(self.owner)?;
        require_text("name", &self.name)?;
        require_text("multiaddr", &self.multiaddr)
    }
}

impl Workerpool {
    pub fn validate(&self) -> Result<(), ContractError> {
        require_owner(self.owner)?;
        require_text("description", &self.description)
    }
}

pub async fn deploy_app<H: Hub + ?Sized>(hub: &H, app: &App) -> Result<Deployed, ContractError> {
    app.validate()?;
    hub.create_app(app).await
}

pub async fn deploy_dataset<H: Hub + ?Sized>(
    hub: &H,
    dataset: &Dataset,
) -> Result<Deployed, ContractError> {
    dataset.validate()?;
    hub.create_dataset(dataset).await
}

pub async fn deploy_workerpool<H: Hub + ?Sized>(
    hub: &H,
    workerpool: &Workerpool,
) -> Result<Deployed, ContractError> {
    workerpool.validate()?;
    hub.create_workerpool(workerpool).await
}

pub async fn show_app<H: Hub + ?Sized>(hub: &H, address: Address) -> Result<App, ContractError> {
    hub.view_app(address).await
}

pub async fn show_dataset<H: Hub + ?Sized>(
    hub: &H,
    address: Address,
) -> Result<Dataset, ContractError> {
    hub.view_dataset(address).await
}

pub async fn show_workerpool<H: Hub + ?Sized>(
    hub: &H,
    address: Address,
) -> Result<Workerpool, ContractError> {
    hub.view_workerpool(address).await
}

pub async fn count_user_apps<H: Hub + ?Sized>(hub: &H, owner: Address) -> Result<u64, ContractError> {
    hub.count_owned(ResourceKind::App, owner).await
}

pub async fn count_user_datasets<H: Hub + ?Sized>(
    hub: &H,
    owner: Address,
) -> Result<u64, ContractError> {
    hub.count_owned(ResourceKind::Dataset, owner).await
}

pub async fn count_user_workerpools<H: Hub + ?Sized>(
    hub: &H,
    owner: Address,
) -> Result<u64, ContractError> {
    hub.count_owned(ResourceKind::Workerpool, owner).await
}

/// Address of the `index`-th resource of `kind` held by `owner`.
pub async fn user_resource_address<H: Hub + ?Sized>(
    hub: &H,
    kind: ResourceKind,
    owner: Address,
    index: u64,
) -> Result<Address, ContractError> {
    let count = hub.count_owned(kind, owner).await?;
    if index >= count {
        return Err(ContractError::NotFound(format!(
            "{kind} {index} of {owner} (only {count} {kind}s)"
        )));
    }
    hub.owned_by_index(kind, owner, index).await
}

pub async fn show_user_app<H: Hub + ?Sized>(
    hub: &H,
    owner: Address,
    index: u64,
) -> Result<(Address, App), ContractError> {
    let address = user_resource_address(hub, ResourceKind::App, owner, index).await?;
    Ok((address, hub.view_app(address).await?))
}

pub async fn show_user_dataset<H: Hub + ?Sized>(
    hub: &H,
    owner: Address,
    index: u64,
) -> Result<(Address, Dataset), ContractError> {
    let address = user_resource_address(hub, ResourceKind::Dataset, owner, index).await?;
    Ok((address, hub.view_dataset(address).await?))
}

pub async fn show_user_workerpool<H: Hub + ?Sized>(
    hub: &H,
    owner: Address,
    index: u64,
) -> Result<(Address, Workerpool), ContractError> {
    let address = user_resource_address(hub, ResourceKind::Workerpool, owner, index).await?;
    Ok((address, hub.view_workerpool(address).await?))
}

/// Registry tokens are minted with the resource address as id.
pub fn token_id_to_address(token_id: U256) -> Address {
    Address::from_slice(&token_id.to_be_bytes::<32>()[12..])
}

/// Resource minted by `registry` among the logs of a mined creation transaction.
pub(crate) fn minted_address(
    logs: &[Log],
    registry: Address,
    tx_hash: TxHash,
) -> Result<Address, ContractError> {
    logs.iter()
        .filter(|log| log.inner.address == registry)
        .filter_map(|log| log.log_decode::<IRegistry::Transfer>().ok())
        .map(|log| log.inner.data)
        .find(|transfer| transfer.from == Address::ZERO)
        .map(|transfer| token_id_to_address(transfer.tokenId))
        .ok_or(ContractError::EventNotFound {
            event: "Transfer",
            tx_hash,
        })
}

impl ContractClient {
    pub(crate) async fn registry_address(&self, kind: ResourceKind) -> Result<Address, ContractError> {
        let hub = IexecHub::new(self.hub_address, self.read_provider());
        let registry = match kind {
            ResourceKind::App => hub.appregistry().call().await,
            ResourceKind::Dataset => hub.datasetregistry().call().await,
            ResourceKind::Workerpool => hub.workerpoolregistry().call().await,
        }
        .map_err(call_error)?;
        Ok(registry)
    }

    async fn require_registered(
        &self,
        kind: ResourceKind,
        address: Address,
    ) -> Result<(), ContractError> {
        let registry = IRegistry::new(self.registry_address(kind).await?, self.read_provider());
        let registered = registry
            .isRegistered(address)
            .call()
            .await
            .map_err(call_error)?;
        if !registered {
            return Err(ContractError::NotFound(format!("{kind} {address}")));
        }
        Ok(())
    }

    fn deployed(
        &self,
        kind: ResourceKind,
        receipt: &TransactionReceipt,
        registry: Address,
    ) -> Result<Deployed, ContractError> {
        let tx_hash = TxHash(receipt.transaction_hash);
        let address = minted_address(receipt.inner.logs(), registry, tx_hash)?;
        tracing::info!(%kind, %address, tx_hash = %tx_hash, "resource deployed");
        Ok(Deployed { address, tx_hash })
    }

    pub(crate) async fn registry_create_app(&self, app: &App) -> Result<Deployed, ContractError> {
        let registry = self.registry_address(ResourceKind::App).await?;
        let contract = IAppRegistry::new(registry, self.write_provider()?);
        let call = contract.createApp(
            app.owner,
            app.name.clone(),
            app.app_type.clone(),
            encode_multiaddr(&app.multiaddr),
            app.checksum,
            app.mrenclave.as_bytes().to_vec().into(),
        );
        let receipt = self.send_and_confirm(call).await?;
        self.deployed(ResourceKind::App, &receipt, registry)
    }

    pub(crate) async fn registry_create_dataset(
        &self,
        dataset: &Dataset,
    ) -> Result<Deployed, ContractError> {
        let registry = self.registry_address(ResourceKind::Dataset).await?;
        let contract = IDatasetRegistry::new(registry, self.write_provider()?);
        let call = contract.createDataset(
            dataset.owner,
            dataset.name.clone(),
            encode_multiaddr(&dataset.multiaddr),
            dataset.checksum,
        );
        let receipt = self.send_and_confirm(call).await?;
        self.deployed(ResourceKind::Dataset, &receipt, registry)
    }

    pub(crate) async fn registry_create_workerpool(
        &self,
        workerpool: &Workerpool,
    ) -> Result<Deployed, ContractError> {
        let registry = self.registry_address(ResourceKind::Workerpool).await?;
        let contract = IWorkerpoolRegistry::new(registry, self.write_provider()?);
        let call = contract.createWorkerpool(workerpool.owner, workerpool.description.clone());
        let receipt = self.send_and_confirm(call).await?;
        self.deployed(ResourceKind::Workerpool, &receipt, registry)
    }

    pub(crate) async fn registry_view_app(&self, address: Address) -> Result<App, ContractError> {
        self.require_registered(ResourceKind::App, address).await?;
        let app = IApp::new(address, self.read_provider());
        Ok(App {
            owner: app.owner().call().await.map_err(call_error)?,
            name: app.m_appName().call().await.map_err(call_error)?,
            app_type: app.m_appType().call().await.map_err(call_error)?,
            multiaddr: decode_multiaddr(&app.m_appMultiaddr().call().await.map_err(call_error)?),
            checksum: app.m_appChecksum().call().await.map_err(call_error)?,
            mrenclave: decode_mrenclave(&app.m_appMREnclave().call().await.map_err(call_error)?)?,
        })
    }

    pub(crate) async fn registry_view_dataset(
        &self,
        address: Address,
    ) -> Result<Dataset, ContractError> {
        self.require_registered(ResourceKind::Dataset, address).await?;
        let dataset = IDataset::new(address, self.read_provider());
        Ok(Dataset {
            owner: dataset.owner().call().await.map_err(call_error)?,
            name: dataset.m_datasetName().call().await.map_err(call_error)?,
            multiaddr: decode_multiaddr(
                &dataset.m_datasetMultiaddr().call().await.map_err(call_error)?,
            ),
            checksum: dataset.m_datasetChecksum().call().await.map_err(call_error)?,
        })
    }

    pub(crate) async fn registry_view_workerpool(
        &self,
        address: Address,
    ) -> Result<Workerpool, ContractError> {
        self.require_registered(ResourceKind::Workerpool, address).await?;
        let pool = IWorkerpool::new(address, self.read_provider());
        let stake_ratio = pool.m_workerStakeRatioPolicy().call().await.map_err(call_error)?;
        let reward_ratio = pool
            .m_schedulerRewardRatioPolicy()
            .call()
            .await
            .map_err(call_error)?;
        Ok(Workerpool {
            owner: pool.owner().call().await.map_err(call_error)?,
            description: pool.m_workerpoolDescription().call().await.map_err(call_error)?,
            worker_stake_ratio_policy: u256_to_u64(stake_ratio, "workerStakeRatioPolicy")?,
            scheduler_reward_ratio_policy: u256_to_u64(
                reward_ratio,
                "schedulerRewardRatioPolicy",
            )?,
        })
    }

    pub(crate) async fn registry_count(
        &self,
        kind: ResourceKind,
        owner: Address,
    ) -> Result<u64, ContractError> {
        let registry = IRegistry::new(self.registry_address(kind).await?, self.read_provider());
        let count = registry.balanceOf(owner).call().await.map_err(call_error)?;
        u256_to_u64(count, "balance")
    }

    pub(crate) async fn registry_token_of_owner(
        &self,
        kind: ResourceKind,
        owner: Address,
        index: u64,
    ) -> Result<Address, ContractError> {
        let registry = IRegistry::new(self.registry_address(kind).await?, self.read_provider());
        let token_id = registry
            .tokenOfOwnerByIndex(owner, U256::from(index))
            .call()
            .await
            .map_err(call_error)?;
        Ok(token_id_to_address(token_id))
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, LogData};
    use alloy::sol_types::SolEvent;

    use super::*;
    use crate::mock::MockHub;

    fn app() -> App {
        App {
            owner: Address::repeat_byte(1),
            name: "vanity".to_string(),
            app_type: APP_TYPE_DOCKER.to_string(),
            multiaddr: "registry.hub.docker.com/iexechub/vanityeth:1.1.1".to_string(),
            checksum: B256::repeat_byte(0xcc),
            mrenclave: String::new(),
        }
    }

    #[test]
    fn app_validation_names_the_field() {
        assert!(app().validate().is_ok());
        let cases = [
            (App { owner: Address::ZERO, ..app() }, "owner"),
            (App { name: String::new(), ..app() }, "name"),
            (App { app_type: "WASM".to_string(), ..app() }, "type"),
            (App { checksum: B256::ZERO, ..app() }, "checksum"),
            (App { mrenclave: "scone".to_string(), ..app() }, "mrenclave"),
        ];
        for (app, expected) in cases {
            assert!(
                matches!(app.validate(), Err(ContractError::InvalidArgument { field, .. }) if field == expected),
                "{expected}"
            );
        }
    }

    #[test]
    fn token_id_is_the_resource_address() {
        let resource = address!("90f8bf6a479f320ead074411a4b0e7944ea8c9c1");
        let token_id = U256::from_be_slice(resource.as_slice());
        assert_eq!(token_id_to_address(token_id), resource);
    }

    #[test]
    fn resource_kind_parses_and_prints() {
        assert_eq!("Workerpool".parse::<ResourceKind>().unwrap(), ResourceKind::Workerpool);
        assert_eq!(ResourceKind::Dataset.to_string(), "dataset");
        assert!("category".parse::<ResourceKind>().is_err());
    }

    fn transfer_log(registry: Address, from: Address, minted: Address) -> Log {
        let event = IRegistry::Transfer {
            from,
            to: Address::repeat_byte(0x01),
            tokenId: U256::from_be_slice(minted.as_slice()),
        };
        let data: LogData = event.encode_log_data();
        Log {
            inner: alloy::primitives::Log {
                address: registry,
                data,
            },
            ..Default::default()
        }
    }

    #[test]
    fn minted_address_comes_from_the_registry_mint() {
        let registry = Address::repeat_byte(0xa0);
        let minted = Address::repeat_byte(0x5e);
        let logs = vec![
            transfer_log(Address::repeat_byte(0xb0), Address::ZERO, Address::repeat_byte(9)),
            transfer_log(registry, Address::repeat_byte(3), Address::repeat_byte(8)),
            transfer_log(registry, Address::ZERO, minted),
        ];
        let tx_hash = TxHash::new([0x77; 32]);
        assert_eq!(minted_address(&logs, registry, tx_hash).unwrap(), minted);
    }

    #[test]
    fn creation_without_mint_is_event_not_found() {
        let tx_hash = TxHash::new([0x77; 32]);
        assert!(matches!(
            minted_address(&[], Address::repeat_byte(0xa0), tx_hash),
            Err(ContractError::EventNotFound { event: "Transfer", .. })
        ));
    }

    #[tokio::test]
    async fn deployed_app_is_counted_and_shown() {
        let hub = MockHub::with_random_signer();
        let owner = app().owner;

        let deployed = deploy_app(&hub, &app()).await.unwrap();
        assert_eq!(show_app(&hub, deployed.address).await.unwrap(), app());
        assert_eq!(count_user_apps(&hub, owner).await.unwrap(), 1);
        assert_eq!(count_user_datasets(&hub, owner).await.unwrap(), 0);

        let (address, shown) = show_user_app(&hub, owner, 0).await.unwrap();
        assert_eq!(address, deployed.address);
        assert_eq!(shown.name, "vanity");
        assert!(matches!(
            show_user_app(&hub, owner, 1).await,
            Err(ContractError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn same_app_cannot_be_deployed_twice() {
        let hub = MockHub::with_random_signer();
        deploy_app(&hub, &app()).await.unwrap();
        assert!(matches!(
            deploy_app(&hub, &app()).await,
            Err(ContractError::Reverted { .. })
        ));
        let renamed = App {
            name: "vanity-2".to_string(),
            ..app()
        };
        deploy_app(&hub, &renamed).await.unwrap();
        assert_eq!(count_user_apps(&hub, renamed.owner).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn invalid_resources_are_refused_before_sending() {
        let hub = MockHub::with_random_signer();
        let dataset = Dataset {
            owner: Address::repeat_byte(2),
            name: "cat pictures".to_string(),
            multiaddr: String::new(),
            checksum: B256::ZERO,
        };
        assert!(matches!(
            deploy_dataset(&hub, &dataset).await,
            Err(ContractError::InvalidArgument { field, .. }) if field == "multiaddr"
        ));
        assert_eq!(count_user_datasets(&hub, dataset.owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deploying_requires_a_signer() {
        let pool = Workerpool {
            owner: Address::repeat_byte(3),
            description: "my pool".to_string(),
            worker_stake_ratio_policy: 0,
            scheduler_reward_ratio_policy: 0,
        };
        assert!(matches!(
            deploy_workerpool(&MockHub::read_only(), &pool).await,
            Err(ContractError::SignerRequired)
        ));
    }

    #[tokio::test]
    async fn deployed_dataset_and_workerpool_read_back() {
        let hub = MockHub::with_random_signer();
        let owner = Address::repeat_byte(4);
        let dataset = Dataset {
            owner,
            name: "cat pictures".to_string(),
            multiaddr: "/ipfs/QmW2WQi7j6c7UgJTarActp7tDNikE4B2qXtFCfLPdsgaTQ".to_string(),
            checksum: B256::repeat_byte(0x0d),
        };
        let pool = Workerpool {
            owner,
            description: "my pool".to_string(),
            worker_stake_ratio_policy: 0,
            scheduler_reward_ratio_policy: 0,
        };

        let dataset_address = deploy_dataset(&hub, &dataset).await.unwrap().address;
        let pool_address = deploy_workerpool(&hub, &pool).await.unwrap().address;
        assert_ne!(dataset_address, pool_address);

        assert_eq!(show_dataset(&hub, dataset_address).await.unwrap(), dataset);
        let (address, shown) = show_user_workerpool(&hub, owner, 0).await.unwrap();
        assert_eq!(address, pool_address);
        assert_eq!(shown.description, "my pool");
        assert_eq!(count_user_workerpools(&hub, owner).await.unwrap(), 1);
        assert!(matches!(
            show_workerpool(&hub, dataset_address).await,
            Err(ContractError::NotFound(_))
        ));
        assert!(matches!(
            show_user_dataset(&hub, Address::repeat_byte(5), 0).await,
            Err(ContractError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn deployment_without_mint_event_is_event_not_found() {
        let hub = MockHub::with_random_signer();
        hub.drop_mint_events();
        assert!(matches!(
            deploy_app(&hub, &app()).await,
            Err(ContractError::EventNotFound { event: "Transfer", .. })
        ));
    }
}
