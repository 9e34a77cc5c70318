use std::time::Duration;

use contract_client::Hub;
use e2e::E2eEnv;
use iexec_core::builder::{create_apporder, create_requestorder, create_workerpoolorder};
use iexec_core::{AnySignedOrder, OrderKind, TaskStatus};
use orderbook::OrderbookClient;
use serde_json::json;
use tracker::WaitOptions;

#[tokio::test]
async fn order_to_task_lifecycle() {
    let Some(env) = E2eEnv::from_env() else {
        eprintln!("Skipping E2E test. Set RUN_E2E=1 to run.");
        return;
    };
    let env = env.unwrap();
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let app_owner = env.client(&env.app_owner_key).unwrap();
    let pool_owner = env.client(&env.workerpool_owner_key).unwrap();
    let requester = env.client(&env.requester_key).unwrap();
    let orderbook = OrderbookClient::new(env.config.orderbook_url.clone(), env.config.chain_id);

    println!("=== iExec marketplace E2E ===");
    println!("chain {} hub {}", env.config.chain_id, env.config.hub_address);

    println!("\n[1] Signing orders...");
    let fields = |v: serde_json::Value| v.as_object().cloned().unwrap();
    let apporder = create_apporder(&fields(json!({ "app": env.app.to_string(), "volume": 10 })))
        .unwrap();
    let workerpoolorder = create_workerpoolorder(&fields(json!({
        "workerpool": env.workerpool.to_string(),
        "volume": 10,
        "category": env.category,
    })))
    .unwrap();
    let requestorder = create_requestorder(&fields(json!({
        "app": env.app.to_string(),
        "requester": requester.signer_address().unwrap().to_string(),
        "category": env.category,
        "volume": 1,
        "params": { "iexec_args": "e2e" },
    })))
    .unwrap();

    let app = market::sign_order(&app_owner, apporder).await.unwrap();
    let workerpool = market::sign_order(&pool_owner, workerpoolorder).await.unwrap();
    let request = market::sign_order(&requester, requestorder).await.unwrap();
    market::verify_signed_order(&app, &app_owner.domain(), app_owner.signer_address().unwrap())
        .unwrap();
    println!("    ✓ orders signed");

    println!("\n[2] Publishing the app order...");
    let published = AnySignedOrder::App(app.clone());
    let hash = market::publish_order(&orderbook, &app_owner, &published)
        .await
        .unwrap();
    let fetched = market::fetch_published_order(&orderbook, OrderKind::App, hash)
        .await
        .unwrap();
    assert_eq!(fetched.signed_order(OrderKind::App).unwrap(), published);
    println!("    ✓ published {hash}");

    println!("\n[3] Matching...");
    let receipt = market::match_orders(&requester, &app, None, &workerpool, &request)
        .await
        .unwrap();
    assert_eq!(receipt.volume, 1);
    println!("    ✓ deal {} (tx {})", receipt.deal_id, receipt.tx_hash);

    println!("\n[4] Following the deal...");
    let reader = env.read_only().unwrap();
    let deal = tracker::show_deal(&reader, receipt.deal_id).await.unwrap();
    assert_eq!(deal.tasks.len(), 1);
    let task_id = *deal.tasks.values().next().unwrap();
    assert_eq!(task_id, tracker::compute_task_id(receipt.deal_id, deal.deal.bot_first));

    let task = tracker::wait_for_task_status_change(
        &reader,
        task_id,
        TaskStatus::Unset,
        WaitOptions {
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
        },
    )
    .await
    .unwrap();
    println!("    ✓ task {task_id} is {}", task.status);

    println!("\n[5] Unpublishing and cancelling the app order...");
    market::unpublish_order(&orderbook, &app_owner, OrderKind::App, hash)
        .await
        .unwrap();
    market::cancel_order(&app_owner, &published).await.unwrap();
    assert_eq!(market::remaining_volume(&reader, &app.order).await.unwrap(), 0);
    println!("    ✓ app order closed");

    println!("\n=== E2E passed ===");
}
