//! Capability tags: a bytes32 bitfield where each named capability owns one bit.

use alloy_primitives::{B256, U256};

use crate::error::SdkError;

pub const NULL_TAG: B256 = B256::ZERO;

const TAG_BITS: [(&str, usize); 4] = [("tee", 0), ("scone", 1), ("gramine", 2), ("gpu", 8)];

pub fn encode_tag<S: AsRef<str>>(names: &[S]) -> Result<B256, SdkError> {
    let mut tag = U256::ZERO;
    for name in names {
        let name = name.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        let bit = TAG_BITS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, bit)| *bit)
            .ok_or_else(|| SdkError::validation("tag", format!("unknown tag {name}")))?;
        tag |= U256::from(1u8) << bit;
    }
    Ok(B256::from(tag))
}

pub fn decode_tag(tag: B256) -> Result<Vec<&'static str>, SdkError> {
    let value = U256::from_be_bytes(tag.0);
    let mut names = Vec::new();
    for bit in 0..256 {
        if !value.bit(bit) {
            continue;
        }
        match TAG_BITS.iter().find(|(_, known)| *known == bit) {
            Some((name, _)) => names.push(*name),
            None => {
                return Err(SdkError::validation("tag", format!("unknown bit {bit} in tag")));
            }
        }
    }
    Ok(names)
}

/// True when every bit set in `required` is also set in `offered`.
pub fn tag_satisfies(offered: B256, required: B256) -> bool {
    let offered = U256::from_be_bytes(offered.0);
    let required = U256::from_be_bytes(required.0);
    offered & required == required
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_names() {
        let tag = encode_tag(&["tee", "scone"]).unwrap();
        assert_eq!(
            tag.to_string(),
            "0x0000000000000000000000000000000000000000000000000000000000000003"
        );
        assert_eq!(decode_tag(tag).unwrap(), vec!["tee", "scone"]);
    }

    #[test]
    fn gpu_sits_on_bit_eight() {
        let tag = encode_tag(&["gpu"]).unwrap();
        assert_eq!(tag.0[30], 1);
        assert_eq!(tag.0[31], 0);
    }

    #[test]
    fn rejects_unknown_names_and_bits() {
        assert_eq!(encode_tag(&["sgx"]).unwrap_err().field(), Some("tag"));

        let mut raw = [0u8; 32];
        raw[31] = 0b1000;
        assert!(decode_tag(B256::new(raw)).is_err());
    }

    #[test]
    fn requirement_subset() {
        let offered = encode_tag(&["tee", "scone", "gpu"]).unwrap();
        let required = encode_tag(&["tee", "scone"]).unwrap();
        assert!(tag_satisfies(offered, required));
        assert!(!tag_satisfies(required, offered));
        assert!(tag_satisfies(offered, NULL_TAG));
    }
}
