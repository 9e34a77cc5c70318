use anyhow::{anyhow, bail, Result};
use contract_client::Hub;
use iexec_core::{
    build_order, AnyOrder, AnySignedOrder, AppOrder, DatasetOrder, Order, OrderFields, OrderKind,
    RequestOrder, SdkError, SignedOrder, WorkerpoolOrder,
};
use orderbook::OrderbookFilter;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::{read_json_as, read_json_file, write_file};
use crate::cli::{MatchArgs, OrderCommand};
use crate::context::Context;
use crate::output::{emit, pretty};

pub async fn run(ctx: &Context, cmd: OrderCommand) -> Result<()> {
    match cmd {
        OrderCommand::Init {
            kind,
            fields,
            set,
            out,
        } => {
            let fields = collect_fields(&fields, &set)?;
            let order = build_order(kind, &fields)?;
            let document = serde_json::to_string_pretty(&order)?;
            if let Some(path) = &out {
                write_file(path, document.as_bytes())?;
            }
            emit(ctx.raw, &json!({ "order": order }), document)
        }
        OrderCommand::Sign { kind, order, out } => {
            let unsigned = parse_unsigned(kind, read_json_file(&order)?)?;
            let signed = market::sign_any_order(&ctx.hub, unsigned).await?;
            let hash = signed.order_hash(&ctx.hub.domain());
            let document = serde_json::to_string_pretty(&signed)?;
            if let Some(path) = &out {
                write_file(path, document.as_bytes())?;
            }
            emit(
                ctx.raw,
                &json!({ "orderHash": hash, "order": signed }),
                format!("{kind} signed: {hash}\n{document}"),
            )
        }
        OrderCommand::Publish { kind, order } => {
            let signed = AnySignedOrder::from_json(kind, read_json_file(&order)?)?;
            let hash = market::publish_order(&ctx.orderbook(), &ctx.hub, &signed).await?;
            emit(
                ctx.raw,
                &json!({ "orderHash": hash }),
                format!("{kind} published with orderHash {hash}"),
            )
        }
        OrderCommand::Unpublish { kind, order_hash } => {
            let hash =
                market::unpublish_order(&ctx.orderbook(), &ctx.hub, kind, order_hash).await?;
            emit(
                ctx.raw,
                &json!({ "orderHash": hash }),
                format!("{kind} {hash} unpublished"),
            )
        }
        OrderCommand::Cancel { kind, order } => {
            let signed = AnySignedOrder::from_json(kind, read_json_file(&order)?)?;
            let tx_hash = market::cancel_order(&ctx.hub, &signed).await?;
            emit(
                ctx.raw,
                &json!({ "txHash": tx_hash }),
                format!("{kind} cancelled (tx {tx_hash})"),
            )
        }
        OrderCommand::Show {
            kind,
            order_hash,
            resource,
            category,
        } => {
            let orderbook = ctx.orderbook();
            if let Some(hash) = order_hash {
                let published = market::fetch_published_order(&orderbook, kind, hash).await?;
                return emit(ctx.raw, &published, pretty(&published));
            }
            let filter = match (resource, category) {
                (Some(address), _) => OrderbookFilter::Resource(address),
                (None, Some(category)) => OrderbookFilter::Category(category),
                (None, None) => bail!("give an order hash, --resource or --category"),
            };
            let page = orderbook
                .fetch_orderbook(kind, filter)
                .await
                .map_err(SdkError::from)?;
            let text = page
                .orders
                .iter()
                .map(|o| format!("{} remaining {} ({})", o.order_hash, o.remaining, o.status))
                .collect::<Vec<_>>()
                .join("\n");
            emit(ctx.raw, &page, format!("{} {kind}(s)\n{text}", page.count))
        }
    }
}

pub async fn run_match(ctx: &Context, args: MatchArgs) -> Result<()> {
    let app: SignedOrder<AppOrder> = read_json_as(&args.app)?;
    let dataset: Option<SignedOrder<DatasetOrder>> =
        args.dataset.as_deref().map(read_json_as).transpose()?;
    let workerpool: SignedOrder<WorkerpoolOrder> = read_json_as(&args.workerpool)?;
    let request: SignedOrder<RequestOrder> = read_json_as(&args.request)?;

    let receipt =
        market::match_orders(&ctx.hub, &app, dataset.as_ref(), &workerpool, &request).await?;
    emit(
        ctx.raw,
        &receipt,
        format!(
            "Deal {} created with volume {} (tx {})",
            receipt.deal_id, receipt.volume, receipt.tx_hash
        ),
    )
}

/// Merges `--fields` JSON with repeated `--set key=value`. Values that parse as
/// JSON keep their type, anything else is a string.
fn collect_fields(fields: &str, set: &[String]) -> Result<OrderFields> {
    let mut map = match serde_json::from_str::<Value>(fields)? {
        Value::Object(map) => map,
        _ => bail!("--fields must be a JSON object"),
    };
    for entry in set {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("--set expects KEY=VALUE, got {entry}"))?;
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

fn decode<O: Order + DeserializeOwned>(value: Value) -> Result<O, SdkError> {
    let order: O = serde_json::from_value(value)
        .map_err(|e| SdkError::validation(O::KIND.order_name(), e.to_string()))?;
    order.validate()?;
    Ok(order)
}

fn parse_unsigned(kind: OrderKind, value: Value) -> Result<AnyOrder, SdkError> {
    Ok(match kind {
        OrderKind::App => AnyOrder::App(decode(value)?),
        OrderKind::Dataset => AnyOrder::Dataset(decode(value)?),
        OrderKind::Workerpool => AnyOrder::Workerpool(decode(value)?),
        OrderKind::Request => AnyOrder::Request(decode(value)?),
    })
}
