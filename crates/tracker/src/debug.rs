//! Off-chain task information served by the workerpool's scheduler API.
//!
//! The API is found through the workerpool's ENS name and its
//! `iexec:workerpool-api:url` text record.

use alloy::primitives::Address;
use contract_client::ens::WORKERPOOL_API_URL_KEY;
use contract_client::{ContractError, Hub};
use iexec_core::{SdkError, TaskId};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::http::{endpoint, get_json};
use crate::task::is_uninitialized;

/// Resolves the scheduler API of `workerpool`. `None` when the workerpool has
/// no ENS name (or the reverse lookup fails), no URL record, or a record that is
/// not an http(s) URL. A network without ENS is a configuration error.
pub async fn get_workerpool_api_url<H>(
    hub: &H,
    workerpool: Address,
) -> Result<Option<Url>, SdkError>
where
    H: Hub + ?Sized,
{
    let name = match hub.lookup_address(workerpool).await {
        Ok(name) => name,
        Err(ContractError::EnsUnsupported) => return Err(ContractError::EnsUnsupported.into()),
        Err(e) => {
            tracing::debug!(%workerpool, error = %e, "reverse lookup failed");
            None
        }
    };
    let Some(name) = name else {
        tracing::debug!(%workerpool, "workerpool has no ENS name");
        return Ok(None);
    };
    let Some(record) = hub.read_text_record(&name, WORKERPOOL_API_URL_KEY).await? else {
        tracing::debug!(%workerpool, %name, "workerpool has no API url record");
        return Ok(None);
    };
    Ok(Url::parse(&record)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https")))
}

async fn task_api_url<H>(hub: &H, task_id: TaskId) -> Result<Url, SdkError>
where
    H: Hub + ?Sized,
{
    let task = hub.view_task(task_id).await?;
    if is_uninitialized(&task) {
        return Err(SdkError::NotFound(format!("task {task_id}")));
    }
    let deal = hub.view_deal(task.deal_id).await?;
    let workerpool = deal.workerpool.pointer;
    if workerpool == Address::ZERO {
        return Err(SdkError::InvariantViolation(format!(
            "deal {} has no workerpool",
            task.deal_id
        )));
    }
    get_workerpool_api_url(hub, workerpool)
        .await?
        .ok_or_else(|| SdkError::NotFound(format!("API url for workerpool {workerpool}")))
}

pub async fn fetch_task_offchain_info<H>(
    hub: &H,
    http: &Client,
    task_id: TaskId,
) -> Result<Value, SdkError>
where
    H: Hub + ?Sized,
{
    let api = task_api_url(hub, task_id).await?;
    let url = endpoint(&api, &format!("tasks/{task_id}"))?;
    Ok(get_json(http, &url).await?)
}

/// Stdout of the replicate computed by `worker` for `task_id`.
pub async fn fetch_replicate_stdout<H>(
    hub: &H,
    http: &Client,
    task_id: TaskId,
    worker: Address,
) -> Result<String, SdkError>
where
    H: Hub + ?Sized,
{
    let api = task_api_url(hub, task_id).await?;
    let worker = worker.to_string().to_lowercase();
    let url = endpoint(&api, &format!("tasks/{task_id}/replicates/{worker}/stdout"))?;
    let body = get_json(http, &url).await?;
    body.get("stdout")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SdkError::Network(format!("{url} returned no stdout")))
}
