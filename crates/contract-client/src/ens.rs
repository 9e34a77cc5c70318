//! ENS reverse resolution and text records.

use alloy::primitives::{keccak256, Address, B256};
use alloy::sol;

use crate::client::{call_error, ContractClient};
use crate::error::ContractError;

/// Text record holding a workerpool's off-chain API URL.
pub const WORKERPOOL_API_URL_KEY: &str = "iexec:workerpool-api:url";

sol! {
    #[sol(rpc)]
    interface ENSRegistry {
        function resolver(bytes32 node) external view returns (address);
    }

    #[sol(rpc)]
    interface ENSResolver {
        function addr(bytes32 node) external view returns (address);
        function name(bytes32 node) external view returns (string);
        function text(bytes32 node, string key) external view returns (string);
    }
}

/// EIP-137 namehash.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let mut packed = [0u8; 64];
        packed[..32].copy_from_slice(node.as_slice());
        packed[32..].copy_from_slice(keccak256(label.as_bytes()).as_slice());
        node = keccak256(packed);
    }
    node
}

/// `<lowercase hex address>.addr.reverse`
pub fn reverse_name(address: Address) -> String {
    format!("{}.addr.reverse", hex::encode(address))
}

impl ContractClient {
    fn ens_registry(&self) -> Result<Address, ContractError> {
        self.ens_registry.ok_or(ContractError::EnsUnsupported)
    }

    async fn resolver_for(&self, node: B256) -> Result<Option<Address>, ContractError> {
        let registry = ENSRegistry::new(self.ens_registry()?, self.read_provider());
        let resolver = registry.resolver(node).call().await.map_err(call_error)?;
        Ok((resolver != Address::ZERO).then_some(resolver))
    }

    pub(crate) async fn ens_lookup_address(
        &self,
        address: Address,
    ) -> Result<Option<String>, ContractError> {
        let reverse_node = namehash(&reverse_name(address));
        let Some(resolver) = self.resolver_for(reverse_node).await? else {
            return Ok(None);
        };
        let name = ENSResolver::new(resolver, self.read_provider())
            .name(reverse_node)
            .call()
            .await
            .map_err(call_error)?;
        if name.is_empty() {
            return Ok(None);
        }

        let forward_node = namehash(&name);
        let Some(forward_resolver) = self.resolver_for(forward_node).await? else {
            return Ok(None);
        };
        let resolved = ENSResolver::new(forward_resolver, self.read_provider())
            .addr(forward_node)
            .call()
            .await
            .map_err(call_error)?;
        if resolved != address {
            tracing::debug!(%address, %name, %resolved, "reverse record does not resolve back");
            return Ok(None);
        }
        Ok(Some(name))
    }

    pub(crate) async fn ens_read_text_record(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<String>, ContractError> {
        let node = namehash(name);
        let Some(resolver) = self.resolver_for(node).await? else {
            return Ok(None);
        };
        let value = ENSResolver::new(resolver, self.read_provider())
            .text(node, key.to_string())
            .call()
            .await
            .map_err(call_error)?;
        Ok((!value.is_empty()).then_some(value))
    }
}
