//! Order lifecycle on the iExec marketplace: sign, publish, unpublish, cancel
//! and match.

pub mod matching;
pub mod publish;
pub mod sign;

pub use contract_client::MatchReceipt;
pub use matching::{match_orders, matchable_volume, remaining_volume};
pub use publish::{cancel_order, fetch_published_order, publish_order, unpublish_order};
pub use sign::{null_datasetorder, sign_any_order, sign_order, verify_signed_order};
