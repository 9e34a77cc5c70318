use std::time::Duration;

use anyhow::Result;
use contract_client::Hub;
use iexec_core::SdkError;
use serde_json::json;
use tracker::WaitOptions;

use super::write_file;
use crate::cli::TaskCommand;
use crate::context::Context;
use crate::output::{emit, pretty};

pub async fn run(ctx: &Context, cmd: TaskCommand) -> Result<()> {
    match cmd {
        TaskCommand::Show { task_id } => {
            let view = tracker::show_task(&ctx.hub, task_id).await?;
            let mut text = pretty(&view);
            if view.timed_out {
                text.push_str("\nTask timed out, claim it with `iexec task claim`");
            }
            emit(ctx.raw, &view, text)
        }
        TaskCommand::Wait {
            task_id,
            from,
            timeout,
            interval,
        } => {
            let from = match from {
                Some(status) => status,
                None => ctx.hub.view_task(task_id).await.map_err(SdkError::from)?.status,
            };
            let options = WaitOptions {
                timeout: Duration::from_secs(timeout),
                poll_interval: Duration::from_secs(interval),
            };
            tracing::info!(%task_id, %from, "waiting for status change");
            let task = tracker::wait_for_task_status_change(&ctx.hub, task_id, from, options).await?;
            emit(
                ctx.raw,
                &task,
                format!("Task {task_id} is now {}", task.status),
            )
        }
        TaskCommand::Results { task_id, download } => {
            let results = tracker::fetch_results(&ctx.hub, task_id).await?;
            if let Some(path) = &download {
                let archive =
                    tracker::download_results(&ctx.http, &ctx.config.ipfs_gateway_url, &results)
                        .await?;
                write_file(path, &archive)?;
                tracing::info!(path = %path.display(), bytes = archive.len(), "results saved");
            }
            let location = results
                .location
                .as_ref()
                .map(|l| l.location().to_string())
                .unwrap_or_else(|| "no result location".to_string());
            emit(ctx.raw, &results, format!("Task {task_id} results: {location}"))
        }
        TaskCommand::Debug { task_id } => {
            let info = tracker::fetch_task_offchain_info(&ctx.hub, &ctx.http, task_id).await?;
            emit(ctx.raw, &json!({ "offchainData": info }), pretty(&info))
        }
        TaskCommand::Claim { task_id } => {
            let tx_hash = tracker::claim_task(&ctx.hub, task_id).await?;
            emit(
                ctx.raw,
                &json!({ "txHash": tx_hash }),
                format!("Task {task_id} claimed (tx {tx_hash})"),
            )
        }
        TaskCommand::Stdout { task_id, worker } => {
            let stdout = tracker::fetch_replicate_stdout(&ctx.hub, &ctx.http, task_id, worker).await?;
            emit(ctx.raw, &json!({ "stdout": stdout }), stdout)
        }
    }
}
