use std::time::Duration;

use contract_client::Hub;
use iexec_core::{SdkError, Task, TaskId, TaskStatus};
use tokio::time::{interval, timeout, MissedTickBehavior};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitOptions {
    pub fn validate(&self) -> Result<(), SdkError> {
        if self.poll_interval.is_zero() {
            return Err(SdkError::validation("pollInterval", "must be greater than 0"));
        }
        if self.timeout.is_zero() {
            return Err(SdkError::validation("timeout", "must be greater than 0"));
        }
        Ok(())
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Polls the task until its status differs from `from` and returns the task as
/// first observed in the new status.
///
/// An uninitialized task is observed as `UNSET`, so waiting from `UNSET` covers
/// a deal whose tasks are not initialized yet. Fails with `SdkError::Timeout`
/// once `options.timeout` elapses; read errors end the wait immediately. Zero
/// durations are refused before the first read.
pub async fn wait_for_task_status_change<H>(
    hub: &H,
    task_id: TaskId,
    from: TaskStatus,
    options: WaitOptions,
) -> Result<Task, SdkError>
where
    H: Hub + ?Sized,
{
    options.validate()?;
    let poll = async {
        let mut poll_timer = interval(options.poll_interval);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            poll_timer.tick().await;
            let task = hub.view_task(task_id).await?;
            if task.status != from {
                tracing::info!(%task_id, %from, to = %task.status, "task status changed");
                return Ok::<Task, SdkError>(task);
            }
            tracing::debug!(%task_id, status = %task.status, "task status unchanged");
        }
    };

    match timeout(options.timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(SdkError::Timeout {
            what: format!("task {task_id} still {from}"),
            elapsed: options.timeout,
        }),
    }
}
