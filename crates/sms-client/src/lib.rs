//! Client for the Secret Management Service (SMS), which hands secrets to
//! enclaves running iExec tasks.

pub mod challenge;
pub mod client;
pub mod error;

pub use client::{PushResult, SmsClient, RESULT_ENCRYPTION_KEY_NAME};
pub use error::SmsError;
