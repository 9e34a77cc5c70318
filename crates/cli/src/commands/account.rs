use anyhow::Result;
use contract_client::{account, Hub};
use iexec_core::SdkError;
use serde_json::json;

use crate::cli::AccountCommand;
use crate::context::Context;
use crate::output::emit;

pub async fn run(ctx: &Context, cmd: AccountCommand) -> Result<()> {
    match cmd {
        AccountCommand::Show { address } => {
            let address = address
                .or_else(|| ctx.hub.signer_address())
                .ok_or_else(SdkError::signer_required)?;
            let balance = account::check_balance(&ctx.hub, address)
                .await
                .map_err(SdkError::from)?;
            emit(
                ctx.raw,
                &balance,
                format!(
                    "{address}\n  stake:  {} nRLC\n  locked: {} nRLC",
                    balance.stake, balance.locked
                ),
            )
        }
        AccountCommand::Deposit { amount } => {
            let tx_hash = account::deposit(&ctx.hub, amount)
                .await
                .map_err(SdkError::from)?;
            emit(
                ctx.raw,
                &json!({ "txHash": tx_hash, "amount": amount.to_string() }),
                format!("Deposited {amount} nRLC to your account (tx {tx_hash})"),
            )
        }
        AccountCommand::Withdraw { amount } => {
            let tx_hash = account::withdraw(&ctx.hub, amount)
                .await
                .map_err(SdkError::from)?;
            emit(
                ctx.raw,
                &json!({ "txHash": tx_hash, "amount": amount.to_string() }),
                format!("Withdrew {amount} nRLC from your account (tx {tx_hash})"),
            )
        }
    }
}
