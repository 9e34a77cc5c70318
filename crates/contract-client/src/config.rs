//! Chain configuration, loaded from `chain.toml`.

use std::path::Path;

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ContractError;

pub const BELLECOUR_CHAIN_ID: u64 = 134;
pub const BELLECOUR_HUB: Address = address!("3eca1B216A7DF1C7689aEb259fFB83ADFB894E7f");
pub const BELLECOUR_ENS_REGISTRY: Address = address!("5f5B93fca68c9C79318d1F3868A354EE67D8c006");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_url: Url,
    pub chain_id: u64,
    pub hub_address: Address,

    /// `None` on networks without ENS; debug lookups then fail with a configuration error.
    #[serde(default)]
    pub ens_registry: Option<Address>,

    pub orderbook_url: Url,
    pub sms_url: Url,

    /// SMS serving Gramine enclaves, when it differs from `sms_url`.
    #[serde(default)]
    pub sms_gramine_url: Option<Url>,

    pub ipfs_gateway_url: Url,

    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    /// Fixed gas price in wei; the node's suggestion is used when absent.
    #[serde(default)]
    pub gas_price: Option<u128>,

    /// RLC is the chain's native currency (sidechains), not an ERC20 token.
    #[serde(default)]
    pub native_token: bool,
}

fn default_confirmations() -> u64 {
    1
}

fn builtin_url(s: &'static str) -> Url {
    Url::parse(s).expect("built-in url")
}

impl Default for ChainConfig {
    /// A local development stack: node, marketplace API and SMS on localhost.
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            rpc_url: builtin_url("http://localhost:8545"),
            chain_id: 65535,
            hub_address: BELLECOUR_HUB,
            ens_registry: Some(BELLECOUR_ENS_REGISTRY),
            orderbook_url: builtin_url("http://localhost:3000"),
            sms_url: builtin_url("http://localhost:13300"),
            sms_gramine_url: None,
            ipfs_gateway_url: builtin_url("http://localhost:8080"),
            confirmations: 1,
            gas_price: Some(0),
            native_token: true,
        }
    }
}

impl ChainConfig {
    pub fn bellecour() -> Self {
        Self {
            name: "bellecour".to_string(),
            rpc_url: builtin_url("https://bellecour.iex.ec"),
            chain_id: BELLECOUR_CHAIN_ID,
            hub_address: BELLECOUR_HUB,
            ens_registry: Some(BELLECOUR_ENS_REGISTRY),
            orderbook_url: builtin_url("https://api.market.v8-bellecour.iex.ec"),
            sms_url: builtin_url("https://sms.scone-prod.v8-bellecour.iex.ec"),
            sms_gramine_url: Some(builtin_url("https://sms.gramine-prod.v8-bellecour.iex.ec")),
            ipfs_gateway_url: builtin_url("https://ipfs-gateway.v8-bellecour.iex.ec"),
            confirmations: 1,
            gas_price: Some(0),
            native_token: true,
        }
    }

    /// Looks up a built-in preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "local" | "dev" => Some(Self::default()),
            "bellecour" | "134" => Some(Self::bellecour()),
            _ => None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ContractError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ContractError> {
        let config: Self =
            toml::from_str(toml).map_err(|e| ContractError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ContractError> {
        if self.name.trim().is_empty() {
            return Err(ContractError::InvalidConfig("name cannot be empty".to_string()));
        }
        for (field, url) in [
            ("rpc_url", &self.rpc_url),
            ("orderbook_url", &self.orderbook_url),
            ("sms_url", &self.sms_url),
            ("ipfs_gateway_url", &self.ipfs_gateway_url),
        ] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ContractError::InvalidConfig(format!(
                    "{field} must start with http:// or https://"
                )));
            }
        }
        if self.hub_address == Address::ZERO {
            return Err(ContractError::InvalidConfig(
                "hub_address cannot be the zero address".to_string(),
            ));
        }
        if self.confirmations == 0 {
            return Err(ContractError::InvalidConfig(
                "confirmations must be > 0".to_string(),
            ));
        }
        if self.confirmations > 100 {
            return Err(ContractError::InvalidConfig(
                "confirmations too large (max 100)".to_string(),
            ));
        }
        Ok(())
    }

    /// SMS endpoint for the given enclave framework.
    pub fn sms_url_for(&self, gramine: bool) -> &Url {
        match (&self.sms_gramine_url, gramine) {
            (Some(url), true) => url,
            _ => &self.sms_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(ChainConfig::default().validate().is_ok());
        assert!(ChainConfig::bellecour().validate().is_ok());
    }

    #[test]
    fn presets_resolve_by_name_and_chain_id() {
        assert_eq!(ChainConfig::preset("dev"), Some(ChainConfig::default()));
        let bellecour = ChainConfig::preset("134").unwrap();
        assert_eq!(bellecour.chain_id, BELLECOUR_CHAIN_ID);
        assert_eq!(bellecour.rpc_url.as_str(), "https://bellecour.iex.ec/");
        assert_eq!(ChainConfig::preset("mainnet"), None);
    }

    #[test]
    fn zero_confirmations_rejected() {
        let config = ChainConfig {
            confirmations: 0,
            ..ChainConfig::default()
        };
        assert!(matches!(config.validate(), Err(ContractError::InvalidConfig(_))));
    }

    #[test]
    fn parses_minimal_toml() {
        let config = ChainConfig::from_toml_str(
            r#"
            name = "bellecour"
            rpc_url = "https://bellecour.iex.ec"
            chain_id = 134
            hub_address = "0x3eca1B216A7DF1C7689aEb259fFB83ADFB894E7f"
            orderbook_url = "https://api.market.v8-bellecour.iex.ec"
            sms_url = "https://sms.scone-prod.v8-bellecour.iex.ec"
            ipfs_gateway_url = "https://ipfs-gateway.v8-bellecour.iex.ec"
            "#,
        )
        .unwrap();
        assert_eq!(config.chain_id, 134);
        assert_eq!(config.confirmations, 1);
        assert_eq!(config.ens_registry, None);
        assert!(!config.native_token);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_schemes() {
        let unknown = ChainConfig::from_toml_str(
            r#"
            name = "x"
            rpc_url = "http://localhost:8545"
            chain_id = 1
            hub_address = "0x3eca1B216A7DF1C7689aEb259fFB83ADFB894E7f"
            orderbook_url = "http://localhost:3000"
            sms_url = "http://localhost:13300"
            ipfs_gateway_url = "http://localhost:8080"
            colour = "blue"
            "#,
        );
        assert!(unknown.is_err());

        let config = ChainConfig {
            rpc_url: Url::parse("ws://localhost:8546").unwrap(),
            ..ChainConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn gramine_sms_falls_back_to_default() {
        let local = ChainConfig::default();
        assert_eq!(local.sms_url_for(true), &local.sms_url);
        let bellecour = ChainConfig::bellecour();
        assert_ne!(bellecour.sms_url_for(true), &bellecour.sms_url);
    }
}
