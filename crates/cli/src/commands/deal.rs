use anyhow::Result;
use contract_client::Hub;
use iexec_core::SdkError;
use orderbook::DealsFilter;

use crate::cli::DealCommand;
use crate::context::Context;
use crate::output::{emit, pretty};

pub async fn run(ctx: &Context, cmd: DealCommand) -> Result<()> {
    match cmd {
        DealCommand::Show { deal_id } => {
            let view = tracker::show_deal(&ctx.hub, deal_id).await?;
            emit(ctx.raw, &view, pretty(&view))
        }
        DealCommand::List {
            requester,
            app,
            dataset,
            workerpool,
            before,
        } => {
            let requester = requester
                .or_else(|| ctx.hub.signer_address())
                .ok_or_else(SdkError::signer_required)?;
            let filter = DealsFilter {
                app,
                dataset,
                workerpool,
                before_timestamp: before,
            };
            let page = ctx
                .orderbook()
                .fetch_requester_deals(requester, &filter)
                .await
                .map_err(SdkError::from)?;
            let text = page
                .deals
                .iter()
                .map(|d| format!("{} app {} ({} tasks)", d.deal_id, d.app.pointer, d.bot_size))
                .collect::<Vec<_>>()
                .join("\n");
            emit(ctx.raw, &page, format!("{} deal(s) of {requester}\n{text}", page.count))
        }
    }
}
