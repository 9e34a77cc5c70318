use std::collections::BTreeMap;

use contract_client::Hub;
use iexec_core::{Deal, DealId, SdkError, TaskId};
use serde::Serialize;

/// A deal with the ids of the tasks it spawned, keyed by task index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DealView {
    #[serde(flatten)]
    pub deal: Deal,
    pub tasks: BTreeMap<u64, TaskId>,
}

pub async fn show_deal<H>(hub: &H, deal_id: DealId) -> Result<DealView, SdkError>
where
    H: Hub + ?Sized,
{
    let deal = hub.view_deal(deal_id).await?;
    let tasks = deal.task_ids();
    tracing::debug!(%deal_id, volume = deal.volume(), "deal loaded");
    Ok(DealView { deal, tasks })
}
