//! Environment for the end-to-end scenario against a running iExec stack
//! (chain, marketplace API, scheduler).

use alloy::primitives::Address;
use contract_client::{ChainConfig, ContractClient, ContractError};

/// Well-known dev chain keys, used when no key is given for a role.
pub const ANVIL_KEY_0: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const ANVIL_KEY_1: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const ANVIL_KEY_2: &str = "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

pub struct E2eEnv {
    pub config: ChainConfig,
    pub app: Address,
    pub workerpool: Address,
    pub category: u64,
    pub app_owner_key: String,
    pub workerpool_owner_key: String,
    pub requester_key: String,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn address_var(name: &str) -> Result<Address, String> {
    let value = std::env::var(name).map_err(|_| format!("{name} must be set"))?;
    value.parse().map_err(|e| format!("{name}: {e}"))
}

impl E2eEnv {
    /// `None` unless `RUN_E2E` is set.
    ///
    /// Reads `E2E_CHAIN_CONFIG` (a chain.toml, local dev chain by default),
    /// `E2E_APP`, `E2E_WORKERPOOL`, `E2E_CATEGORY` and the optional
    /// `E2E_APP_OWNER_KEY`, `E2E_WORKERPOOL_OWNER_KEY`, `E2E_REQUESTER_KEY`.
    pub fn from_env() -> Option<Result<Self, String>> {
        std::env::var("RUN_E2E").ok()?;
        Some(Self::load())
    }

    fn load() -> Result<Self, String> {
        let config = match std::env::var("E2E_CHAIN_CONFIG") {
            Ok(path) => ChainConfig::from_file(&path).map_err(|e| e.to_string())?,
            Err(_) => ChainConfig::default(),
        };
        Ok(Self {
            config,
            app: address_var("E2E_APP")?,
            workerpool: address_var("E2E_WORKERPOOL")?,
            category: var_or("E2E_CATEGORY", "0")
                .parse()
                .map_err(|e| format!("E2E_CATEGORY: {e}"))?,
            app_owner_key: var_or("E2E_APP_OWNER_KEY", ANVIL_KEY_0),
            workerpool_owner_key: var_or("E2E_WORKERPOOL_OWNER_KEY", ANVIL_KEY_1),
            requester_key: var_or("E2E_REQUESTER_KEY", ANVIL_KEY_2),
        })
    }

    pub fn client(&self, key: &str) -> Result<ContractClient, ContractError> {
        ContractClient::new(&self.config, Some(key))
    }

    pub fn read_only(&self) -> Result<ContractClient, ContractError> {
        ContractClient::new(&self.config, None)
    }
}
