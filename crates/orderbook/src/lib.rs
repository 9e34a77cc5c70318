pub mod client;
pub mod error;
#[cfg(any(test, feature = "server"))]
pub mod server;
#[cfg(test)]
mod tests;
pub mod types;

pub use client::OrderbookClient;
pub use error::OrderbookError;
pub use types::{DealsFilter, DealsPage, MarketDeal, OrderbookFilter, OrderbookPage, PublishedOrder};
