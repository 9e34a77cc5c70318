use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// On-chain task status, in `TaskStatusEnum` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Unset,
    Active,
    Revealing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unset),
            1 => Some(Self::Active),
            2 => Some(Self::Revealing),
            3 => Some(Self::Completed),
            4 => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unset => "UNSET",
            Self::Active => "ACTIVE",
            Self::Revealing => "REVEALING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

impl FromStr for TaskStatus {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UNSET" => Ok(Self::Unset),
            "ACTIVE" => Ok(Self::Active),
            "REVEALING" => Ok(Self::Revealing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(SdkError::validation("status", format!("unknown task status {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    App,
    Dataset,
    Workerpool,
    Request,
}

impl OrderKind {
    pub const ALL: [OrderKind; 4] = [Self::App, Self::Dataset, Self::Workerpool, Self::Request];

    /// `apporder`, `datasetorder`, ... as used in JSON documents and API paths.
    pub fn order_name(&self) -> &'static str {
        match self {
            Self::App => "apporder",
            Self::Dataset => "datasetorder",
            Self::Workerpool => "workerpoolorder",
            Self::Request => "requestorder",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.order_name())
    }
}

impl FromStr for OrderKind {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.strip_suffix("order").unwrap_or(&lower) {
            "app" => Ok(Self::App),
            "dataset" => Ok(Self::Dataset),
            "workerpool" => Ok(Self::Workerpool),
            "request" => Ok(Self::Request),
            _ => Err(SdkError::validation("order kind", format!("unknown order kind {s}"))),
        }
    }
}

/// TEE framework selecting which Secret Management Service to talk to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeeFramework {
    #[default]
    Scone,
    Gramine,
}

impl FromStr for TeeFramework {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scone" => Ok(Self::Scone),
            "gramine" => Ok(Self::Gramine),
            other => Err(SdkError::validation(
                "teeFramework",
                format!("{other} is not one of scone, gramine"),
            )),
        }
    }
}
