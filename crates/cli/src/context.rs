use std::path::Path;

use anyhow::{anyhow, Context as _, Result};
use contract_client::{ChainConfig, ContractClient, Hub};
use iexec_core::{SdkError, TeeFramework};
use orderbook::OrderbookClient;
use sms_client::SmsClient;

use crate::cli::Cli;

const DEFAULT_CHAIN_FILE: &str = "chain.toml";

/// Everything a command needs: the chain, its off-chain services and how to print.
pub struct Context {
    pub config: ChainConfig,
    pub hub: ContractClient,
    pub http: reqwest::Client,
    pub raw: bool,
}

/// `--chain` may name a preset or a TOML file; without it `./chain.toml` is used
/// when present, the local dev chain otherwise.
pub fn load_chain_config(chain: Option<&str>) -> Result<ChainConfig> {
    let config = match chain {
        Some(name) => match ChainConfig::preset(name) {
            Some(preset) => preset,
            None if Path::new(name).is_file() => ChainConfig::from_file(name)
                .map_err(SdkError::from)
                .with_context(|| format!("loading {name}"))?,
            None => return Err(anyhow!("unknown chain {name}: not a preset nor a file")),
        },
        None if Path::new(DEFAULT_CHAIN_FILE).is_file() => {
            ChainConfig::from_file(DEFAULT_CHAIN_FILE).map_err(SdkError::from)?
        }
        None => ChainConfig::default(),
    };
    Ok(config)
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = load_chain_config(cli.chain.as_deref())?;
        let hub = ContractClient::new(&config, cli.private_key.as_deref()).map_err(SdkError::from)?;
        tracing::debug!(
            chain = %config.name,
            chain_id = config.chain_id,
            hub = %config.hub_address,
            signer = ?hub.signer_address(),
            "chain loaded"
        );
        Ok(Self {
            config,
            hub,
            http: reqwest::Client::new(),
            raw: cli.raw,
        })
    }

    pub fn orderbook(&self) -> OrderbookClient {
        OrderbookClient::new(self.config.orderbook_url.clone(), self.config.chain_id)
    }

    pub fn sms(&self, tee_framework: TeeFramework) -> SmsClient {
        let gramine = tee_framework == TeeFramework::Gramine;
        SmsClient::new(self.config.sms_url_for(gramine).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_resolve_by_name() {
        assert_eq!(load_chain_config(Some("bellecour")).unwrap().chain_id, 134);
        assert_eq!(
            load_chain_config(Some("local")).unwrap(),
            ChainConfig::default()
        );
    }

    #[test]
    fn unknown_chain_is_an_error() {
        assert!(load_chain_config(Some("no-such-chain.toml")).is_err());
    }
}
