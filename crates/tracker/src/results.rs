use alloy::primitives::Bytes;
use contract_client::Hub;
use iexec_core::{ResultLocation, SdkError, TaskId, TaskStatus};
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::http::{endpoint, get_bytes};
use crate::task::is_uninitialized;

/// What a completed task left on-chain about its results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResults {
    pub task_id: TaskId,
    pub results: Bytes,
    pub location: Option<ResultLocation>,
    pub results_timestamp: u64,
}

pub async fn fetch_results<H>(hub: &H, task_id: TaskId) -> Result<TaskResults, SdkError>
where
    H: Hub + ?Sized,
{
    let task = hub.view_task(task_id).await?;
    if is_uninitialized(&task) {
        return Err(SdkError::NotFound(format!("task {task_id}")));
    }
    if task.status != TaskStatus::Completed {
        return Err(SdkError::validation(
            "taskid",
            format!(
                "task {task_id} is {}, results are only available once it is {}",
                task.status,
                TaskStatus::Completed
            ),
        ));
    }
    let location = task.result_location();
    Ok(TaskResults {
        task_id,
        results: task.results,
        location,
        results_timestamp: task.results_timestamp,
    })
}

/// Downloads a result archive stored on IPFS through `gateway`.
pub async fn download_results(
    http: &Client,
    gateway: &Url,
    results: &TaskResults,
) -> Result<Vec<u8>, SdkError> {
    let location = match &results.location {
        Some(ResultLocation::Storage { storage, location }) if storage == "ipfs" => location,
        Some(ResultLocation::Raw(location)) if location.starts_with("/ipfs/") => location,
        Some(other) => {
            return Err(SdkError::Configuration(format!(
                "results of task {} are not stored on IPFS: {}",
                results.task_id,
                other.location()
            )))
        }
        None => {
            return Err(SdkError::NotFound(format!(
                "result location of task {}",
                results.task_id
            )))
        }
    };
    let url = endpoint(gateway, location)?;
    tracing::info!(task_id = %results.task_id, %url, "downloading results");
    Ok(get_bytes(http, &url).await?)
}
