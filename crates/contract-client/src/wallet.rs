//! Native and RLC transfers, and wallet sweeping.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use iexec_core::TxHash;
use serde::Serialize;

use crate::client::{call_error, ContractClient};
use crate::error::ContractError;
use crate::{IexecHub, IERC20};

/// nRLC has 9 decimals, the native coin of an RLC sidechain has 18.
pub const NRLC_TO_WEI: u64 = 1_000_000_000;

/// Gas used by a plain value transfer.
pub const TRANSFER_GAS: u64 = 21_000;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_erc20_tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_native_tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Balances {
    pub wei: U256,
    pub nrlc: U256,
}

pub fn nrlc_to_wei(nrlc: U256) -> U256 {
    nrlc * U256::from(NRLC_TO_WEI)
}

/// What is left to send once the transfer fee is set aside; `None` when the fee
/// eats the whole balance.
pub fn sweepable_native(balance: U256, gas_price: u128) -> Option<U256> {
    let fee = U256::from(gas_price) * U256::from(TRANSFER_GAS);
    (balance > fee).then(|| balance - fee)
}

impl ContractClient {
    pub async fn balances(&self, address: Address) -> Result<Balances, ContractError> {
        let provider = self.read_provider();
        let wei = provider
            .get_balance(address)
            .await
            .map_err(|e| ContractError::CallFailed(e.to_string()))?;
        let nrlc = if self.native_token {
            wei / U256::from(NRLC_TO_WEI)
        } else {
            let token = IexecHub::new(self.hub_address, provider.clone())
                .token()
                .call()
                .await
                .map_err(call_error)?;
            IERC20::new(token, provider)
                .balanceOf(address)
                .call()
                .await
                .map_err(call_error)?
        };
        Ok(Balances { wei, nrlc })
    }

    async fn effective_gas_price(&self) -> Result<u128, ContractError> {
        match self.gas_price() {
            Some(price) => Ok(price),
            None => self
                .read_provider()
                .get_gas_price()
                .await
                .map_err(|e| ContractError::CallFailed(e.to_string())),
        }
    }

    async fn send_native_token(
        &self,
        value: U256,
        to: Address,
        gas_price: Option<u128>,
    ) -> Result<TxHash, ContractError> {
        let provider = self.write_provider()?;
        let mut tx = TransactionRequest::default().with_to(to).with_value(value);
        if let Some(price) = gas_price.or(self.gas_price()) {
            tx = tx.with_gas_price(price);
        }
        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| ContractError::TransactionFailed(e.to_string()))?;
        let receipt = pending
            .with_required_confirmations(self.confirmations())
            .get_receipt()
            .await
            .map_err(|e| ContractError::TransactionFailed(e.to_string()))?;
        let tx_hash = TxHash(receipt.transaction_hash);
        tracing::info!(%to, %value, tx_hash = %tx_hash, "native transfer mined");
        Ok(tx_hash)
    }

    async fn send_erc20(&self, nrlc: U256, to: Address) -> Result<TxHash, ContractError> {
        let provider = self.write_provider()?;
        let token = IexecHub::new(self.hub_address, provider.clone())
            .token()
            .call()
            .await
            .map_err(call_error)?;
        let rlc = IERC20::new(token, provider);
        let receipt = self.send_and_confirm(rlc.transfer(to, nrlc)).await?;
        let tx_hash = TxHash(receipt.transaction_hash);
        tracing::info!(%to, %nrlc, tx_hash = %tx_hash, "RLC transfer mined");
        Ok(tx_hash)
    }

    /// Sends the chain's native coin, in wei. Disabled where RLC is the native coin.
    pub async fn send_native(&self, amount_wei: U256, to: Address) -> Result<TxHash, ContractError> {
        let from = self.signer()?.address();
        if self.native_token {
            return Err(ContractError::Rejected(
                "sending ETH is disabled on sidechain, send RLC instead".to_string(),
            ));
        }
        let balances = self.balances(from).await?;
        if balances.wei < amount_wei {
            return Err(ContractError::Rejected(
                "Amount to send exceed wallet balance".to_string(),
            ));
        }
        self.send_native_token(amount_wei, to, None).await
    }

    /// Sends RLC, in nRLC: an ERC20 transfer, or a native transfer on sidechains.
    pub async fn send_rlc(&self, nrlc: U256, to: Address) -> Result<TxHash, ContractError> {
        let from = self.signer()?.address();
        let balances = self.balances(from).await?;
        if balances.nrlc < nrlc {
            return Err(ContractError::Rejected(
                "Amount to send exceed wallet balance".to_string(),
            ));
        }
        if self.native_token {
            tracing::debug!("send native token");
            return self.send_native_token(nrlc_to_wei(nrlc), to, None).await;
        }
        tracing::debug!("send ERC20 token");
        self.send_erc20(nrlc, to).await
    }

    /// Empties the wallet into `to`.
    ///
    /// The RLC transfer runs first and a failure there aborts the sweep. The
    /// native transfer runs last; its failure is recorded in `errors` and the
    /// call still succeeds.
    pub async fn sweep(&self, to: Address) -> Result<SweepResult, ContractError> {
        let from = self.signer()?.address();
        let code = self
            .read_provider()
            .get_code_at(to)
            .await
            .map_err(|e| ContractError::CallFailed(e.to_string()))?;
        if !code.is_empty() {
            return Err(ContractError::Rejected("Cannot sweep to a contract".to_string()));
        }

        let mut result = SweepResult::default();
        let mut balances = self.balances(from).await?;
        if !self.native_token && balances.nrlc > U256::ZERO {
            match self.send_erc20(balances.nrlc, to).await {
                Ok(tx_hash) => result.send_erc20_tx_hash = Some(tx_hash),
                Err(e) => {
                    return Err(ContractError::Rejected(format!(
                        "Failed to sweep ERC20, sweep aborted. errors: Failed to transfer ERC20: {e}"
                    )));
                }
            }
            balances = self.balances(from).await?;
        }

        let gas_price = self.effective_gas_price().await?;
        match sweepable_native(balances.wei, gas_price) {
            Some(value) => match self.send_native_token(value, to, Some(gas_price)).await {
                Ok(tx_hash) => result.send_native_tx_hash = Some(tx_hash),
                Err(e) => {
                    tracing::warn!(error = %e, "native sweep failed");
                    result
                        .errors
                        .push(format!("Failed to transfer native token: {e}"));
                }
            },
            None => result.errors.push(
                "Failed to transfer native token: Tx fees are greater than wallet balance"
                    .to_string(),
            ),
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweepable_native_keeps_transfer_fee() {
        let gas_price = 1_000_000_000u128;
        let fee = U256::from(21_000u64) * U256::from(gas_price);
        let balance = fee + U256::from(5u8);
        assert_eq!(sweepable_native(balance, gas_price), Some(U256::from(5u8)));
        assert_eq!(sweepable_native(fee, gas_price), None);
        assert_eq!(sweepable_native(U256::ZERO, 0), None);
        assert_eq!(sweepable_native(U256::from(7u8), 0), Some(U256::from(7u8)));
    }

    #[test]
    fn nrlc_has_nine_decimals() {
        assert_eq!(
            nrlc_to_wei(U256::from(1_000_000_000u64)),
            U256::from(10u64).pow(U256::from(18u64))
        );
    }

    #[test]
    fn sweep_result_omits_empty_fields() {
        let json = serde_json::to_value(SweepResult::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
