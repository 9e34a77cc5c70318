//! Challenges proving that a secret push comes from the secret's owner.
//!
//! A challenge is a keccak digest over the SMS domain tag, the owner address
//! and the hashed secret fields. The owner signs it as an Ethereum personal
//! message and sends the signature in the `Authorization` header.

use alloy::primitives::{eip191_hash_message, keccak256, Address, B256};
use contract_client::Hub;

use crate::error::SmsError;

pub const SMS_DOMAIN: &str = "IEXEC_SMS_DOMAIN";

/// Challenge for pushing (or updating) the web2 secret `name` owned by `owner`.
pub fn web2_secret_challenge(owner: Address, name: &str, value: &str) -> B256 {
    let mut packed = Vec::with_capacity(32 + 20 + 32 + 32);
    packed.extend_from_slice(keccak256(SMS_DOMAIN).as_slice());
    packed.extend_from_slice(owner.as_slice());
    packed.extend_from_slice(keccak256(name).as_slice());
    packed.extend_from_slice(keccak256(value).as_slice());
    keccak256(packed)
}

/// Challenge for pushing the secret attached to an on-chain resource (dataset).
pub fn web3_secret_challenge(resource: Address, value: &str) -> B256 {
    let mut packed = Vec::with_capacity(32 + 20 + 32);
    packed.extend_from_slice(keccak256(SMS_DOMAIN).as_slice());
    packed.extend_from_slice(resource.as_slice());
    packed.extend_from_slice(keccak256(value).as_slice());
    keccak256(packed)
}

/// Signs `challenge` as a personal message and returns the `0x`-prefixed signature.
pub async fn sign_challenge<H>(hub: &H, challenge: B256) -> Result<String, SmsError>
where
    H: Hub + ?Sized,
{
    let digest = eip191_hash_message(challenge);
    let sign = hub.sign_hash(digest).await?;
    Ok(format!("0x{}", alloy::hex::encode(&sign)))
}

#[cfg(test)]
mod tests {
    use contract_client::mock::MockHub;
    use iexec_core::typed::recover_signer;

    use super::*;

    #[test]
    fn challenge_binds_every_field() {
        let owner = Address::repeat_byte(1);
        let base = web2_secret_challenge(owner, "key", "value");
        assert_eq!(base, web2_secret_challenge(owner, "key", "value"));
        assert_ne!(base, web2_secret_challenge(Address::repeat_byte(2), "key", "value"));
        assert_ne!(base, web2_secret_challenge(owner, "other", "value"));
        assert_ne!(base, web2_secret_challenge(owner, "key", "other"));
        assert_ne!(base, web3_secret_challenge(owner, "value"));
    }

    #[tokio::test]
    async fn signature_recovers_to_the_owner() {
        let hub = MockHub::with_random_signer();
        let owner = hub.signer_address().unwrap();
        let challenge = web2_secret_challenge(owner, "key", "value");

        let sign = sign_challenge(&hub, challenge).await.unwrap();
        let bytes: alloy::primitives::Bytes = sign.parse().unwrap();
        assert_eq!(
            recover_signer(eip191_hash_message(challenge), &bytes).unwrap(),
            owner
        );
    }
}
