//! The requester's escrow account on the hub, in nRLC.

use alloy::primitives::{Address, Bytes, U256};
use iexec_core::TxHash;
use serde::Serialize;

use crate::client::{call_error, ContractClient};
use crate::conversions::decode_account;
use crate::error::ContractError;
use crate::hub::Hub;
use crate::wallet::nrlc_to_wei;
use crate::{IexecEscrowNative, IexecHub, IERC20};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Free to withdraw or to pay for new deals.
    pub stake: U256,
    /// Held for running deals.
    pub locked: U256,
}

fn require_positive(amount: U256) -> Result<(), ContractError> {
    if amount.is_zero() {
        return Err(ContractError::InvalidArgument {
            field: "amount".to_string(),
            message: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

pub async fn check_balance<H: Hub + ?Sized>(
    hub: &H,
    address: Address,
) -> Result<Account, ContractError> {
    hub.view_account(address).await
}

/// Moves `amount` nRLC from the signer's wallet to its account.
pub async fn deposit<H: Hub + ?Sized>(hub: &H, amount: U256) -> Result<TxHash, ContractError> {
    require_positive(amount)?;
    hub.deposit(amount).await
}

/// Moves `amount` nRLC of free stake back to the signer's wallet.
pub async fn withdraw<H: Hub + ?Sized>(hub: &H, amount: U256) -> Result<TxHash, ContractError> {
    require_positive(amount)?;
    let owner = hub.signer_address().ok_or(ContractError::SignerRequired)?;
    let account = hub.view_account(owner).await?;
    if amount > account.stake {
        return Err(ContractError::InvalidArgument {
            field: "amount".to_string(),
            message: format!("cannot withdraw more than the stake ({} nRLC)", account.stake),
        });
    }
    hub.withdraw(amount).await
}

impl ContractClient {
    pub(crate) async fn escrow_view_account(
        &self,
        address: Address,
    ) -> Result<Account, ContractError> {
        let hub = IexecHub::new(self.hub_address, self.read_provider());
        let raw = hub.viewAccount(address).call().await.map_err(call_error)?;
        Ok(decode_account(raw))
    }

    pub(crate) async fn escrow_deposit(&self, nrlc: U256) -> Result<TxHash, ContractError> {
        let owner = self.signer()?.address();
        let available = self.balances(owner).await?.nrlc;
        if nrlc > available {
            return Err(ContractError::Rejected(format!(
                "deposit amount exceeds wallet balance ({available} nRLC)"
            )));
        }

        let provider = self.write_provider()?;
        let receipt = if self.native_token {
            let escrow = IexecEscrowNative::new(self.hub_address, provider);
            self.send_and_confirm(escrow.deposit().value(nrlc_to_wei(nrlc)))
                .await?
        } else {
            let token = IexecHub::new(self.hub_address, provider.clone())
                .token()
                .call()
                .await
                .map_err(call_error)?;
            let rlc = IERC20::new(token, provider);
            self.send_and_confirm(rlc.approveAndCall(self.hub_address, nrlc, Bytes::new()))
                .await?
        };
        let tx_hash = TxHash(receipt.transaction_hash);
        tracing::info!(%owner, %nrlc, tx_hash = %tx_hash, "deposit mined");
        Ok(tx_hash)
    }

    pub(crate) async fn escrow_withdraw(&self, nrlc: U256) -> Result<TxHash, ContractError> {
        let hub = IexecHub::new(self.hub_address, self.write_provider()?);
        let receipt = self.send_and_confirm(hub.withdraw(nrlc)).await?;
        let tx_hash = TxHash(receipt.transaction_hash);
        tracing::info!(%nrlc, tx_hash = %tx_hash, "withdraw mined");
        Ok(tx_hash)
    }
}
