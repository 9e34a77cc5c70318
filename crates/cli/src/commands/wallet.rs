use anyhow::Result;
use contract_client::Hub;
use iexec_core::SdkError;
use serde_json::json;

use crate::cli::WalletCommand;
use crate::context::Context;
use crate::output::{emit, pretty};

pub async fn run(ctx: &Context, cmd: WalletCommand) -> Result<()> {
    match cmd {
        WalletCommand::Show { address } => {
            let address = address
                .or_else(|| ctx.hub.signer_address())
                .ok_or_else(SdkError::signer_required)?;
            let balances = ctx.hub.balances(address).await.map_err(SdkError::from)?;
            emit(
                ctx.raw,
                &balances,
                format!("{address}\n  wei:  {}\n  nRLC: {}", balances.wei, balances.nrlc),
            )
        }
        WalletCommand::SendEth { amount, to } => {
            let tx_hash = ctx.hub.send_native(amount, to).await.map_err(SdkError::from)?;
            emit(
                ctx.raw,
                &json!({ "txHash": tx_hash, "amount": amount.to_string(), "to": to }),
                format!("Sent {amount} wei to {to} (tx {tx_hash})"),
            )
        }
        WalletCommand::SendRlc { amount, to } => {
            let tx_hash = ctx.hub.send_rlc(amount, to).await.map_err(SdkError::from)?;
            emit(
                ctx.raw,
                &json!({ "txHash": tx_hash, "amount": amount.to_string(), "to": to }),
                format!("Sent {amount} nRLC to {to} (tx {tx_hash})"),
            )
        }
        WalletCommand::Sweep { to } => {
            let result = ctx.hub.sweep(to).await.map_err(SdkError::from)?;
            for error in &result.errors {
                tracing::warn!(%error, "sweep incomplete");
            }
            emit(ctx.raw, &result, pretty(&result))
        }
    }
}
