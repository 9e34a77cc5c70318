use anyhow::{Context as _, Result};
use contract_client::{Dataset, ResourceKind};
use iexec_core::SdkError;
use serde_json::json;

use super::{resource, write_file};
use crate::cli::DatasetCommand;
use crate::context::Context;
use crate::output::emit;

pub async fn run(ctx: &Context, cmd: DatasetCommand) -> Result<()> {
    match cmd {
        DatasetCommand::Deploy {
            name,
            multiaddr,
            checksum,
            owner,
        } => {
            let dataset = Dataset {
                owner: resource::owner_or_signer(ctx, owner)?,
                name,
                multiaddr,
                checksum,
            };
            resource::deploy_dataset(ctx, dataset).await
        }
        DatasetCommand::Show(args) => resource::show_dataset(ctx, args).await,
        DatasetCommand::Count { user } => resource::count(ctx, ResourceKind::Dataset, user).await,
        DatasetCommand::GenerateKey => {
            let key = encryption::generate_aes256_key();
            emit(ctx.raw, &json!({ "key": key }), &key)
        }
        DatasetCommand::Encrypt { file, key, out } => {
            let plaintext =
                std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let encrypted = encryption::encrypt_aes256_cbc(&plaintext, &key)?;
            let out = out.unwrap_or_else(|| {
                let mut name = file.clone().into_os_string();
                name.push(".enc");
                name.into()
            });
            write_file(&out, &encrypted)?;
            emit(
                ctx.raw,
                &json!({ "encryptedFile": out, "size": encrypted.len() }),
                format!("Encrypted {} into {}", file.display(), out.display()),
            )
        }
        DatasetCommand::Decrypt { file, key, out } => {
            let encrypted =
                std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let plaintext = encryption::decrypt_aes256_cbc(&encrypted, &key)?;
            write_file(&out, &plaintext)?;
            emit(
                ctx.raw,
                &json!({ "decryptedFile": out }),
                format!("Decrypted {} into {}", file.display(), out.display()),
            )
        }
        DatasetCommand::PushSecret {
            dataset,
            key,
            tee_framework,
        } => {
            let pushed = ctx
                .sms(tee_framework)
                .push_dataset_secret(&ctx.hub, dataset, &key)
                .await
                .map_err(SdkError::from)?;
            emit(
                ctx.raw,
                &json!({ "isPushed": pushed }),
                format!("Secret of dataset {dataset} pushed: {pushed}"),
            )
        }
    }
}
