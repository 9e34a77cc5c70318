use std::fmt;
use std::str::FromStr;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::error::SdkError;

macro_rules! bytes32_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub B256);

        impl $name {
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(B256::new(bytes))
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0 .0
            }

            /// Parses a `0x`-prefixed 32-byte hex string, reporting failures against `field`.
            pub fn parse_field(s: &str, field: &str) -> Result<Self, SdkError> {
                parse_bytes32(s, field).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = SdkError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse_field(s, $label)
            }
        }

        impl From<B256> for $name {
            fn from(value: B256) -> Self {
                Self(value)
            }
        }
    };
}

bytes32_id!(
    /// On-chain identifier of a deal, emitted by `OrdersMatched`.
    DealId,
    "dealid"
);
bytes32_id!(
    /// `keccak256(dealid ‖ index)`.
    TaskId,
    "taskid"
);
bytes32_id!(
    /// EIP-712 hash of an order, as used on-chain and by the orderbook.
    OrderHash,
    "orderHash"
);
bytes32_id!(TxHash, "txHash");

/// Strict bytes32 check: `0x` prefix and exactly 64 hex digits.
pub fn parse_bytes32(s: &str, field: &str) -> Result<B256, SdkError> {
    let Some(digits) = s.strip_prefix("0x") else {
        return Err(SdkError::validation(field, format!("{s} is not a 0x-prefixed bytes32")));
    };
    if digits.len() != 64 {
        return Err(SdkError::validation(
            field,
            format!("{s} must be 32 bytes long, got {} hex digits", digits.len()),
        ));
    }
    let bytes = hex::decode(digits)
        .map_err(|e| SdkError::validation(field, format!("{s} is not valid hex: {e}")))?;
    Ok(B256::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deal_id_display_roundtrips() {
        let id = DealId::new([0xab; 32]);
        let parsed: DealId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!(id.to_string().starts_with("0x"));
        assert_eq!(id.to_string().len(), 66);
    }

    #[test]
    fn rejects_short_and_unprefixed_values() {
        let err = "0x1234".parse::<TaskId>().unwrap_err();
        assert_eq!(err.field(), Some("taskid"));

        let unprefixed = "ab".repeat(32);
        assert!(unprefixed.parse::<TaskId>().is_err());
    }

    #[test]
    fn reports_the_requested_field_name() {
        let err = OrderHash::parse_field("nope", "apporderHash").unwrap_err();
        assert_eq!(err.field(), Some("apporderHash"));
    }
}
