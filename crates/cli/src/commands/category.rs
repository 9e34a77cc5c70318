use anyhow::Result;
use contract_client::category::Category;
use contract_client::Hub;
use iexec_core::SdkError;
use serde_json::json;

use crate::cli::CategoryCommand;
use crate::context::Context;
use crate::output::{emit, pretty};

pub async fn run(ctx: &Context, cmd: CategoryCommand) -> Result<()> {
    match cmd {
        CategoryCommand::Show { index } => {
            let category = ctx.hub.show_category(index).await.map_err(SdkError::from)?;
            emit(ctx.raw, &category, pretty(&category))
        }
        CategoryCommand::Count => {
            let count = ctx.hub.count_category().await.map_err(SdkError::from)?;
            emit(ctx.raw, &json!({ "count": count }), count)
        }
        CategoryCommand::TimeoutRatio => {
            let ratio = ctx.hub.final_deadline_ratio().await.map_err(SdkError::from)?;
            emit(
                ctx.raw,
                &json!({ "timeoutRatio": ratio }),
                format!("Tasks time out after {ratio} x the category reference time"),
            )
        }
        CategoryCommand::Create {
            name,
            description,
            work_clock_time_ref,
        } => {
            let category = Category {
                name,
                description,
                work_clock_time_ref,
            };
            let created = ctx
                .hub
                .create_category(&category)
                .await
                .map_err(SdkError::from)?;
            emit(
                ctx.raw,
                &created,
                format!("Category {} created (tx {})", created.catid, created.tx_hash),
            )
        }
    }
}
