pub mod account;
pub mod category;
pub mod dataset;
pub mod deal;
pub mod order;
pub mod resource;
pub mod result;
pub mod task;
pub mod wallet;

use std::path::Path;

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cli::Commands;
use crate::context::Context;

pub async fn run(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Order(cmd) => order::run(ctx, cmd).await,
        Commands::Match(args) => order::run_match(ctx, args).await,
        Commands::Deal(cmd) => deal::run(ctx, cmd).await,
        Commands::Task(cmd) => task::run(ctx, cmd).await,
        Commands::Category(cmd) => category::run(ctx, cmd).await,
        Commands::Wallet(cmd) => wallet::run(ctx, cmd).await,
        Commands::Account(cmd) => account::run(ctx, cmd).await,
        Commands::App(cmd) => resource::run_app(ctx, cmd).await,
        Commands::Dataset(cmd) => dataset::run(ctx, cmd).await,
        Commands::Workerpool(cmd) => resource::run_workerpool(ctx, cmd).await,
        Commands::Result(cmd) => result::run(ctx, cmd).await,
    }
}

pub(crate) fn read_json_file(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

pub(crate) fn read_json_as<T: DeserializeOwned>(path: &Path) -> Result<T> {
    serde_json::from_value(read_json_file(path)?)
        .with_context(|| format!("{} does not hold the expected document", path.display()))
}

pub(crate) fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))
}
