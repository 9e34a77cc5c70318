//! Following a deal from the chain down to its tasks' results.

pub mod deal;
pub mod debug;
pub mod error;
mod http;
pub mod results;
pub mod task;
pub mod wait;

pub use deal::{show_deal, DealView};
pub use debug::{fetch_replicate_stdout, fetch_task_offchain_info, get_workerpool_api_url};
pub use error::TrackerError;
pub use iexec_core::compute_task_id;
pub use results::{download_results, fetch_results, TaskResults};
pub use task::{claim_task, show_task, TaskView};
pub use wait::{wait_for_task_status_change, WaitOptions};
