use anyhow::{Context as _, Result};
use contract_client::Hub;
use iexec_core::SdkError;
use serde_json::json;

use crate::cli::ResultCommand;
use crate::context::Context;
use crate::output::emit;

pub async fn run(ctx: &Context, cmd: ResultCommand) -> Result<()> {
    match cmd {
        ResultCommand::CheckKey {
            address,
            tee_framework,
        } => {
            let address = address
                .or_else(|| ctx.hub.signer_address())
                .ok_or_else(SdkError::signer_required)?;
            let exists = ctx
                .sms(tee_framework)
                .check_result_encryption_key_exists(address)
                .await
                .map_err(SdkError::from)?;
            let text = if exists {
                format!("Result encryption key found for {address}")
            } else {
                format!("No result encryption key for {address}")
            };
            emit(ctx.raw, &json!({ "isPushed": exists }), text)
        }
        ResultCommand::PushKey {
            public_key,
            force,
            tee_framework,
        } => {
            let pem = std::fs::read_to_string(&public_key)
                .with_context(|| format!("reading {}", public_key.display()))?;
            let result = ctx
                .sms(tee_framework)
                .push_result_encryption_key(&ctx.hub, &pem, force)
                .await
                .map_err(SdkError::from)?;
            let text = if result.is_updated {
                "Result encryption key updated"
            } else {
                "Result encryption key pushed"
            };
            emit(ctx.raw, &result, text)
        }
    }
}
