use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::B256;
use contract_client::Hub;
use iexec_core::{SdkError, Task, TaskId, TaskStatus, TxHash};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    /// Final deadline passed while the task is still running. The chain is not
    /// told about it until someone claims the task.
    pub timed_out: bool,
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// An uninitialized task reads back as UNSET with no deal.
pub(crate) fn is_uninitialized(task: &Task) -> bool {
    task.status == TaskStatus::Unset && task.deal_id.0 == B256::ZERO
}

pub async fn show_task<H>(hub: &H, task_id: TaskId) -> Result<TaskView, SdkError>
where
    H: Hub + ?Sized,
{
    let task = hub.view_task(task_id).await?;
    if is_uninitialized(&task) {
        return Err(SdkError::NotFound(format!("task {task_id}")));
    }
    let timed_out = task.is_timed_out(unix_now());
    Ok(TaskView { task, timed_out })
}

/// Claims a task that missed its final deadline, refunding the requester.
/// Finished tasks and tasks still within their deadline are refused locally.
pub async fn claim_task<H>(hub: &H, task_id: TaskId) -> Result<TxHash, SdkError>
where
    H: Hub + ?Sized,
{
    let task = hub.view_task(task_id).await?;
    if is_uninitialized(&task) {
        return Err(SdkError::NotFound(format!("task {task_id}")));
    }
    if matches!(task.status, TaskStatus::Completed | TaskStatus::Failed) {
        return Err(SdkError::validation(
            "taskid",
            format!("cannot claim a {} task", task.status),
        ));
    }
    if unix_now() < task.final_deadline {
        return Err(SdkError::validation(
            "taskid",
            format!(
                "cannot claim a task before reaching its final deadline ({})",
                task.final_deadline
            ),
        ));
    }
    Ok(hub.claim_task(task_id).await?)
}
