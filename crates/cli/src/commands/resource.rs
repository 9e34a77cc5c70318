use alloy::primitives::Address;
use anyhow::Result;
use contract_client::registry;
use contract_client::{App, Dataset, Deployed, Hub, ResourceKind, Workerpool};
use iexec_core::SdkError;
use serde::Serialize;
use serde_json::json;

use crate::cli::{AppCommand, ResourceRef, ShowArgs, WorkerpoolCommand};
use crate::context::Context;
use crate::output::{emit, pretty};

pub(super) fn owner_or_signer(ctx: &Context, owner: Option<Address>) -> Result<Address> {
    Ok(owner
        .or_else(|| ctx.hub.signer_address())
        .ok_or_else(SdkError::signer_required)?)
}

fn emit_deployed(ctx: &Context, kind: ResourceKind, deployed: &Deployed) -> Result<()> {
    emit(
        ctx.raw,
        deployed,
        format!("Deployed new {kind} at {} (tx {})", deployed.address, deployed.tx_hash),
    )
}

fn emit_shown<T: Serialize>(ctx: &Context, address: Address, resource: &T) -> Result<()> {
    emit(
        ctx.raw,
        &json!({ "address": address, "resource": resource }),
        format!("{address}\n{}", pretty(resource)),
    )
}

pub async fn count(ctx: &Context, kind: ResourceKind, user: Option<Address>) -> Result<()> {
    let user = owner_or_signer(ctx, user)?;
    let count = match kind {
        ResourceKind::App => registry::count_user_apps(&ctx.hub, user).await,
        ResourceKind::Dataset => registry::count_user_datasets(&ctx.hub, user).await,
        ResourceKind::Workerpool => registry::count_user_workerpools(&ctx.hub, user).await,
    }
    .map_err(SdkError::from)?;
    emit(
        ctx.raw,
        &json!({ "count": count }),
        format!("{user} has {count} {kind}(s)"),
    )
}

pub async fn show_app(ctx: &Context, args: ShowArgs) -> Result<()> {
    let (address, app) = match args.target {
        ResourceRef::Address(address) => (
            address,
            registry::show_app(&ctx.hub, address).await.map_err(SdkError::from)?,
        ),
        ResourceRef::Index(index) => {
            let user = owner_or_signer(ctx, args.user)?;
            registry::show_user_app(&ctx.hub, user, index)
                .await
                .map_err(SdkError::from)?
        }
    };
    emit_shown(ctx, address, &app)
}

pub async fn show_dataset(ctx: &Context, args: ShowArgs) -> Result<()> {
    let (address, dataset) = match args.target {
        ResourceRef::Address(address) => (
            address,
            registry::show_dataset(&ctx.hub, address)
                .await
                .map_err(SdkError::from)?,
        ),
        ResourceRef::Index(index) => {
            let user = owner_or_signer(ctx, args.user)?;
            registry::show_user_dataset(&ctx.hub, user, index)
                .await
                .map_err(SdkError::from)?
        }
    };
    emit_shown(ctx, address, &dataset)
}

pub async fn show_workerpool(ctx: &Context, args: ShowArgs) -> Result<()> {
    let (address, workerpool) = match args.target {
        ResourceRef::Address(address) => (
            address,
            registry::show_workerpool(&ctx.hub, address)
                .await
                .map_err(SdkError::from)?,
        ),
        ResourceRef::Index(index) => {
            let user = owner_or_signer(ctx, args.user)?;
            registry::show_user_workerpool(&ctx.hub, user, index)
                .await
                .map_err(SdkError::from)?
        }
    };
    emit_shown(ctx, address, &workerpool)
}

pub async fn deploy_dataset(ctx: &Context, dataset: Dataset) -> Result<()> {
    let deployed = registry::deploy_dataset(&ctx.hub, &dataset)
        .await
        .map_err(SdkError::from)?;
    emit_deployed(ctx, ResourceKind::Dataset, &deployed)
}

pub async fn run_app(ctx: &Context, cmd: AppCommand) -> Result<()> {
    match cmd {
        AppCommand::Deploy {
            name,
            multiaddr,
            checksum,
            app_type,
            mrenclave,
            owner,
        } => {
            let app = App {
                owner: owner_or_signer(ctx, owner)?,
                name,
                app_type,
                multiaddr,
                checksum,
                mrenclave,
            };
            let deployed = registry::deploy_app(&ctx.hub, &app)
                .await
                .map_err(SdkError::from)?;
            emit_deployed(ctx, ResourceKind::App, &deployed)
        }
        AppCommand::Show(args) => show_app(ctx, args).await,
        AppCommand::Count { user } => count(ctx, ResourceKind::App, user).await,
    }
}

pub async fn run_workerpool(ctx: &Context, cmd: WorkerpoolCommand) -> Result<()> {
    match cmd {
        WorkerpoolCommand::Deploy { description, owner } => {
            let workerpool = Workerpool {
                owner: owner_or_signer(ctx, owner)?,
                description,
                worker_stake_ratio_policy: 0,
                scheduler_reward_ratio_policy: 0,
            };
            let deployed = registry::deploy_workerpool(&ctx.hub, &workerpool)
                .await
                .map_err(SdkError::from)?;
            emit_deployed(ctx, ResourceKind::Workerpool, &deployed)
        }
        WorkerpoolCommand::Show(args) => show_workerpool(ctx, args).await,
        WorkerpoolCommand::Count { user } => count(ctx, ResourceKind::Workerpool, user).await,
    }
}
